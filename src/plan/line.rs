use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;
use thiserror::Error;

static DAY_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^Day\s*(\d+)\s*:\s*(.*)$").ok());

static DAY_PREFIX_STRIP: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^Day\s*\d+:\s*").ok());

// First em-dash or hyphen splits theme from body.
static THEME_SEPARATOR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*[—-]\s*(.*)$").ok());

static LINE_THEME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^Day\s*\d+:\s*([^—:\-]+)\s*[—:\-]").ok());

static TIME_24H: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").ok());

static TIME_12H: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(1[0-2]|0?\d):([0-5]\d)\s*(am|pm)\b").ok());

static MERIDIEM_SUFFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(am|pm)\b").ok());

/// Wall-clock hour and minute, 24-hour.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("invalid time '{0}', expected HH:MM")]
pub struct TimeOfDayParseError(pub String);

impl FromStr for TimeOfDay {
    type Err = TimeOfDayParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || TimeOfDayParseError(input.to_string());
        let (hour, minute) = input.trim().split_once(':').ok_or_else(invalid)?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour = hour.parse::<u32>().map_err(|_| invalid())?;
        let minute = minute.parse::<u32>().map_err(|_| invalid())?;
        TimeOfDay::new(hour, minute).ok_or_else(invalid)
    }
}

/// A plan line broken into its day number, theme label and body text.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PlanLine {
    pub day: Option<u32>,
    pub theme: String,
    pub body: String,
}

/// Splits `"Day 3: Sleep — Go to bed by 22:15"` into day, theme and body.
///
/// Lines without a `Day N:` prefix keep an unset day, and lines without a
/// dash separator keep an empty theme with the whole text as body.
pub fn split_plan_line(line: &str) -> PlanLine {
    let mut day = None;
    let mut body = line.trim().to_string();

    if let Some(caps) = DAY_PREFIX.as_ref().and_then(|re| re.captures(&body)) {
        day = caps[1].parse::<u32>().ok();
        body = caps[2].trim().to_string();
    }

    let mut theme = String::new();
    if let Some(caps) = THEME_SEPARATOR.as_ref().and_then(|re| re.captures(&body)) {
        theme = caps[1].trim().to_string();
        body = caps[2].trim().to_string();
    }

    PlanLine { day, theme, body }
}

/// Removes a leading `Day N:` prefix, leaving the text shown in a reminder.
pub fn strip_day_prefix(line: &str) -> String {
    match DAY_PREFIX_STRIP.as_ref() {
        Some(re) => re.replace(line, "").trim().to_string(),
        None => line.trim().to_string(),
    }
}

/// Theme label used for default-time lookup.
///
/// Stricter than [`split_plan_line`]: requires the `Day N:` prefix and stops
/// at the first colon, dash or em-dash.
pub fn theme_from_line(line: &str) -> Option<String> {
    let caps = LINE_THEME.as_ref()?.captures(line)?;
    let theme = caps[1].trim();
    (!theme.is_empty()).then(|| theme.to_string())
}

/// First clock time mentioned in the line.
///
/// 24-hour times win over 12-hour ones, except that a match directly
/// followed by `am`/`pm` belongs to the 12-hour form.
pub fn parse_time(line: &str) -> Option<TimeOfDay> {
    parse_time_24h(line).or_else(|| parse_time_12h(line))
}

fn parse_time_24h(line: &str) -> Option<TimeOfDay> {
    let re = TIME_24H.as_ref()?;
    for caps in re.captures_iter(line) {
        let whole = caps.get(0)?;
        let followed_by_meridiem = MERIDIEM_SUFFIX
            .as_ref()
            .is_some_and(|suffix| suffix.is_match(&line[whole.end()..]));
        if followed_by_meridiem {
            continue;
        }
        let hour = caps[1].parse::<u32>().ok()?;
        let minute = caps[2].parse::<u32>().ok()?;
        return TimeOfDay::new(hour, minute);
    }
    None
}

fn parse_time_12h(line: &str) -> Option<TimeOfDay> {
    let caps = TIME_12H.as_ref()?.captures(line)?;
    let mut hour = caps[1].parse::<u32>().ok()?;
    let minute = caps[2].parse::<u32>().ok()?;
    let is_pm = caps[3].eq_ignore_ascii_case("pm");
    if is_pm && hour != 12 {
        hour += 12;
    }
    if !is_pm && hour == 12 {
        hour = 0;
    }
    TimeOfDay::new(hour, minute)
}

/// Number of lines that carry an explicit clock time.
pub fn count_timed_lines<S: AsRef<str>>(lines: &[S]) -> usize {
    lines
        .iter()
        .filter(|line| parse_time(line.as_ref()).is_some())
        .count()
}
