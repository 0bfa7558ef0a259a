use std::fs;
use std::path::Path;

use anyhow::Context;
use thiserror::Error;

pub const DAYS_PER_PLAN: usize = 7;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum PlanError {
    #[error("weekly plan must contain exactly 7 lines, found {0}")]
    WrongLineCount(usize),
}

/// Seven plan lines, one per day, today first.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WeeklyPlan {
    lines: [String; DAYS_PER_PLAN],
}

impl WeeklyPlan {
    #[cfg(test)]
    pub fn new(lines: [String; DAYS_PER_PLAN]) -> Self {
        Self { lines }
    }

    /// One day per non-blank line.
    pub fn from_text(text: &str) -> Result<Self, PlanError> {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        Self::try_from(lines)
    }

    pub fn lines(&self) -> &[String; DAYS_PER_PLAN] {
        &self.lines
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(index, line)| (index, line.as_str()))
    }
}

impl TryFrom<Vec<String>> for WeeklyPlan {
    type Error = PlanError;

    fn try_from(lines: Vec<String>) -> Result<Self, Self::Error> {
        let count = lines.len();
        let lines: [String; DAYS_PER_PLAN] = lines
            .try_into()
            .map_err(|_| PlanError::WrongLineCount(count))?;
        Ok(Self { lines })
    }
}

pub fn load_weekly_plan(path: &Path) -> anyhow::Result<WeeklyPlan> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read plan file {}", path.display()))?;
    Ok(WeeklyPlan::from_text(&content)?)
}
