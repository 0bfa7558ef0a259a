use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::plan::line::TimeOfDay;
use crate::reminder::scheduler::{ScheduleOptions, ThemeTimes};

const SETTINGS_VERSION: u32 = 1;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReminderSettings {
    pub require_time: bool,
    pub nudge_time: Option<TimeOfDay>,
    pub theme_times: ThemeTimes,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            require_time: true,
            nudge_time: TimeOfDay::new(21, 0),
            theme_times: ThemeTimes::suggested(),
        }
    }
}

impl ReminderSettings {
    pub fn schedule_options(&self) -> ScheduleOptions {
        ScheduleOptions {
            require_time: self.require_time,
            theme_times: (!self.require_time).then(|| self.theme_times.clone()),
            nudge_time: self.nudge_time,
        }
    }
}

pub fn load_settings(path: &Path) -> Result<ReminderSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read settings file {}", path.display()))?;
    parse_settings_text(&content)
}

pub fn parse_settings_text(content: &str) -> Result<ReminderSettings> {
    let raw = serde_json::from_str::<SettingsFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != SETTINGS_VERSION {
        bail!(
            "unsupported settings version {}; expected version {SETTINGS_VERSION}",
            raw.version
        );
    }

    let nudge_time = raw
        .nudge_time
        .as_deref()
        .map(|text| parse_time_setting("nudge_time", text))
        .transpose()?;

    let theme_times = match raw.theme_times {
        Some(table) => {
            let mut times = BTreeMap::new();
            for (theme, text) in table {
                let time = parse_time_setting(&format!("theme_times.{theme}"), &text)?;
                times.insert(theme, time);
            }
            ThemeTimes::new(times)
        }
        None => ThemeTimes::suggested(),
    };

    Ok(ReminderSettings {
        require_time: raw.require_time,
        nudge_time,
        theme_times,
    })
}

pub fn save_settings(path: &Path, settings: &ReminderSettings) -> Result<()> {
    let payload = SettingsFile {
        version: SETTINGS_VERSION,
        require_time: settings.require_time,
        nudge_time: settings.nudge_time.map(|time| time.to_string()),
        theme_times: Some(
            settings
                .theme_times
                .iter()
                .map(|(theme, time)| (theme.to_string(), time.to_string()))
                .collect(),
        ),
    };
    let text = serde_json::to_string_pretty(&payload)?;
    fs::write(path, format!("{text}\n"))
        .with_context(|| format!("unable to write settings file {}", path.display()))?;
    Ok(())
}

fn parse_time_setting(field: &str, text: &str) -> Result<TimeOfDay> {
    text.parse::<TimeOfDay>()
        .with_context(|| format!("invalid {field}"))
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    version: u32,
    #[serde(default = "default_require_time")]
    require_time: bool,
    #[serde(default = "default_nudge_time")]
    nudge_time: Option<String>,
    #[serde(default)]
    theme_times: Option<BTreeMap<String, String>>,
}

fn default_require_time() -> bool {
    true
}

fn default_nudge_time() -> Option<String> {
    Some("21:00".to_string())
}
