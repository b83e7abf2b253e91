//! Coercion rules for raw configuration strings.
//!
//! Every parser returns `None` for values it cannot interpret; [`ConfigReader`]
//! turns that into the documented default and logs the fallback.

use std::fmt::Display;
use std::str::FromStr;

use tracing::debug;

use crate::source::ConfigSource;

/// Parse a boolean flag.
///
/// Accepts `true/false`, `1/0`, `yes/no`, `y/n` and `on/off`, case-insensitively.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a non-negative integer.
///
/// Falls back to truncating a finite, non-negative float (`"1.5e3"` -> 1500).
pub fn parse_u64(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<u64>() {
        return Some(value);
    }
    let value = trimmed.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0 && value <= u64::MAX as f64).then(|| value.trunc() as u64)
}

/// Parse a finite float.
pub fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Split a comma-separated list, trimming items and dropping empty ones.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Typed accessors over a [`ConfigSource`] with default fallback.
pub struct ConfigReader<'a, S: ConfigSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ConfigSource + ?Sized> ConfigReader<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Raw, trimmed value. Empty strings count as absent.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.source
            .get(key)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    pub fn bool(&self, key: &str, default: bool) -> bool {
        self.parsed(key, default, parse_bool)
    }

    pub fn u64(&self, key: &str, default: u64) -> u64 {
        self.parsed(key, default, parse_u64)
    }

    pub fn u32(&self, key: &str, default: u32) -> u32 {
        self.parsed(key, default, |raw| {
            parse_u64(raw).and_then(|v| u32::try_from(v).ok())
        })
    }

    pub fn u16(&self, key: &str, default: u16) -> u16 {
        self.parsed(key, default, |raw| {
            parse_u64(raw).and_then(|v| u16::try_from(v).ok())
        })
    }

    pub fn usize(&self, key: &str, default: usize) -> usize {
        self.parsed(key, default, |raw| {
            parse_u64(raw).and_then(|v| usize::try_from(v).ok())
        })
    }

    pub fn f64(&self, key: &str, default: f64) -> f64 {
        self.parsed(key, default, parse_f64)
    }

    /// Optional integer: absent or malformed yields `None`.
    pub fn opt_u64(&self, key: &str) -> Option<u64> {
        let raw = self.raw(key)?;
        let value = parse_u64(&raw);
        if value.is_none() {
            debug!(key, value = %raw, "ignoring malformed optional integer");
        }
        value
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        self.raw(key).map(|raw| parse_list(&raw)).unwrap_or_default()
    }

    /// List whose items must parse as `T`; malformed items are skipped.
    pub fn parsed_list<T>(&self, key: &str) -> Vec<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.list(key)
            .into_iter()
            .filter_map(|item| match item.parse::<T>() {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(key, item = %item, %err, "skipping malformed list entry");
                    None
                }
            })
            .collect()
    }

    fn parsed<T: Copy + std::fmt::Debug>(
        &self,
        key: &str,
        default: T,
        parse: impl Fn(&str) -> Option<T>,
    ) -> T {
        let Some(raw) = self.raw(key) else {
            return default;
        };
        match parse(&raw) {
            Some(value) => value,
            None => {
                debug!(key, value = %raw, ?default, "malformed value, using default");
                default
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::IpAddr;

    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        for raw in ["true", "TRUE", "1", "yes", "Y", " on "] {
            assert_eq!(parse_bool(raw), Some(true), "{raw}");
        }
        for raw in ["false", "0", "No", "n", "OFF"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_parse_u64_float_fallback() {
        assert_eq!(parse_u64("42"), Some(42));
        assert_eq!(parse_u64("1.5e3"), Some(1500));
        assert_eq!(parse_u64("7.9"), Some(7));
        assert_eq!(parse_u64("NaN"), None);
        assert_eq!(parse_u64("inf"), None);
        assert_eq!(parse_u64("-3"), None);
        assert_eq!(parse_u64("abc"), None);
    }

    #[test]
    fn test_parse_f64_rejects_non_finite() {
        assert_eq!(parse_f64("0.25"), Some(0.25));
        assert_eq!(parse_f64("-inf"), None);
        assert_eq!(parse_f64("nan"), None);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn test_reader_falls_back_to_default() {
        let source: HashMap<String, String> = [
            ("FLAG".to_string(), "perhaps".to_string()),
            ("COUNT".to_string(), "NaN".to_string()),
            ("EMPTY".to_string(), "   ".to_string()),
        ]
        .into_iter()
        .collect();
        let reader = ConfigReader::new(&source);

        assert!(reader.bool("FLAG", true));
        assert_eq!(reader.u64("COUNT", 9), 9);
        assert_eq!(reader.u64("EMPTY", 3), 3);
        assert_eq!(reader.u64("MISSING", 5), 5);
        assert_eq!(reader.opt_u64("COUNT"), None);
    }

    #[test]
    fn test_parsed_list_skips_malformed() {
        let source: HashMap<String, String> =
            [("IPS".to_string(), "10.0.0.1, nope, ::1".to_string())]
                .into_iter()
                .collect();
        let reader = ConfigReader::new(&source);
        let ips: Vec<IpAddr> = reader.parsed_list("IPS");
        assert_eq!(ips.len(), 2);
    }
}
