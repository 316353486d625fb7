//! INI file configuration adapter.

use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| EngineError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, EngineError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| EngineError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, EngineError> {
        self.config
            .getint(section, key)
            .map(|value| value.unwrap_or(default))
            .map_err(|reason| EngineError::config_invalid(section, key, reason))
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, EngineError> {
        self.config
            .getfloat(section, key)
            .map(|value| value.unwrap_or(default))
            .map_err(|reason| EngineError::config_invalid(section, key, reason))
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, EngineError> {
        match self.config.get(section, key) {
            Some(raw) => Self::parse_bool(&raw).ok_or_else(|| {
                EngineError::config_invalid(section, key, format!("'{}' is not a boolean", raw.trim()))
            }),
            None => Ok(default),
        }
    }
}
