//! Configuration access port.

use crate::domain::error::EngineError;

/// Typed read access to sectioned key/value configuration.
///
/// Typed getters return `default` for a missing key and `ConfigInvalid`
/// for a value that does not parse.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, EngineError>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, EngineError>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, EngineError>;

    /// Non-negative integer; negative values are reported as invalid.
    fn get_usize(&self, section: &str, key: &str, default: usize) -> Result<usize, EngineError> {
        let raw = self.get_int(section, key, default as i64)?;
        usize::try_from(raw)
            .map_err(|_| EngineError::config_invalid(section, key, "must be non-negative"))
    }
}
