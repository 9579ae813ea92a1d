//! Lap time rendering
//!
//! Patterns use the host's placeholders:
//! - `{m}` minutes, unpadded
//! - `{s}` seconds, 2 digits
//! - `{d}` milliseconds, 3 digits
//!
//! The default `{m}:{s}.{d}` renders 350 ms as `0:00.350`.

use crate::constants::DEFAULT_TIME_FORMAT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormat {
    pattern: String,
}

impl TimeFormat {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Pattern from a host option, blank or missing means default
    pub fn from_option(value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(pattern) => Self::new(pattern),
            None => Self::default(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render milliseconds; negative values get a leading '-'
    pub fn format(&self, millis: i64) -> String {
        let sign = if millis < 0 { "-" } else { "" };
        let abs = millis.unsigned_abs();
        let minutes = abs / 60_000;
        let seconds = (abs / 1_000) % 60;
        let ms = abs % 1_000;

        let body = self
            .pattern
            .replace("{m}", &minutes.to_string())
            .replace("{s}", &format!("{:02}", seconds))
            .replace("{d}", &format!("{:03}", ms));
        format!("{}{}", sign, body)
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_FORMAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pattern() {
        let fmt = TimeFormat::default();
        assert_eq!(fmt.format(350), "0:00.350");
        assert_eq!(fmt.format(21_100), "0:21.100");
        assert_eq!(fmt.format(83_456), "1:23.456");
        assert_eq!(fmt.format(0), "0:00.000");
    }

    #[test]
    fn test_negative() {
        assert_eq!(TimeFormat::default().format(-1_250), "-0:01.250");
    }

    #[test]
    fn test_custom_pattern() {
        let fmt = TimeFormat::new("{s}.{d}s");
        assert_eq!(fmt.format(9_870), "09.870s");
    }

    #[test]
    fn test_from_option() {
        assert_eq!(TimeFormat::from_option(None).pattern(), "{m}:{s}.{d}");
        assert_eq!(TimeFormat::from_option(Some("  ")).pattern(), "{m}:{s}.{d}");
        assert_eq!(TimeFormat::from_option(Some("{m}m{s}")).format(61_000), "1m01");
    }
}
