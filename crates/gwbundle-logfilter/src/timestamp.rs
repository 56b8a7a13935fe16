use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::FilterError;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%b/%Y"];

/// Separator between the date and time parts of a log timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `2026-10-15 12:00:00`
    Space,
    /// `2026-10-15T12:00:00` (ISO-8601, as written by haproxy)
    T,
}

impl Delimiter {
    fn as_regex(self) -> &'static str {
        match self {
            Self::Space => " ",
            Self::T => "T",
        }
    }
}

/// How a log category writes timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    pub date_regex: String,
    pub time_regex: String,
    pub delimiter: Delimiter,
}

impl TimestampFormat {
    #[must_use]
    pub fn new(
        date_regex: impl Into<String>,
        time_regex: impl Into<String>,
        delimiter: Delimiter,
    ) -> Self {
        Self {
            date_regex: date_regex.into(),
            time_regex: time_regex.into(),
            delimiter,
        }
    }

    pub fn compile(&self) -> Result<TimestampParser, FilterError> {
        let pattern = format!(
            "(?P<date>{}){}(?P<time>{})",
            self.date_regex,
            self.delimiter.as_regex(),
            self.time_regex
        );
        let re = Regex::new(&pattern).map_err(|e| FilterError::InvalidFormat {
            reason: e.to_string(),
        })?;
        Ok(TimestampParser { re })
    }
}

/// Compiled [`TimestampFormat`].
#[derive(Debug, Clone)]
pub struct TimestampParser {
    re: Regex,
}

impl TimestampParser {
    /// First timestamp found in `line`, if any.
    #[must_use]
    pub fn parse_line(&self, line: &str) -> Option<NaiveDateTime> {
        let caps = self.re.captures(line)?;
        let date_text = caps.name("date")?.as_str();
        let time_text = caps.name("time")?.as_str();

        let date = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(date_text, fmt).ok())?;
        let time = NaiveTime::parse_from_str(time_text, "%H:%M:%S%.f").ok()?;
        Some(date.and_time(time))
    }
}
