use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Parsed `KEY = VALUE` settings file: case-insensitive keys, `#` comments,
/// blank lines ignored. The rest of the program only ever sees this lookup,
/// never the file format.
#[derive(Debug, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    pub fn parse(text: &str) -> Self {
        let mut values = HashMap::new();
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_lowercase(), value.trim().to_string());
            } else {
                log::warn!("ignoring malformed settings line: {}", line);
            }
        }
        Self { values }
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Typed lookup; a present but unparsable value is a configuration error,
    /// not a silent default.
    pub fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| Error::InvalidSetting {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_case_insensitively() {
        let settings = Settings::parse("Serial_Port = /dev/ttyUSB0\nBAUD = 115200\n");
        assert_eq!(settings.get("serial_port"), Some("/dev/ttyUSB0"));
        assert_eq!(settings.get("Baud"), Some("115200"));
    }

    #[test]
    fn strips_comments_and_blanks() {
        let settings = Settings::parse(
            "# lighting rig\n\nbaud = 9600  # slow link\n   \nparity = even\n",
        );
        assert_eq!(settings.len(), 2);
        assert_eq!(settings.get("baud"), Some("9600"));
        assert_eq!(settings.get("parity"), Some("even"));
    }

    #[test]
    fn typed_lookup_rejects_garbage() {
        let settings = Settings::parse("baud = fast\n");
        assert!(settings.get_parsed::<u32>("baud").is_err());
        assert_eq!(settings.get_parsed::<u32>("missing").unwrap(), None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let settings = Settings::parse("just some words\nport = COM3\n");
        assert_eq!(settings.len(), 1);
    }
}
