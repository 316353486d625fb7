//! Persistence port for accepted strategies.

use crate::domain::error::EngineError;
use crate::domain::walk_forward::StrategyRecord;

/// Receives strategies that passed walk-forward acceptance. The engine never
/// reads them back.
pub trait StrategySink {
    fn persist(&self, record: &StrategyRecord) -> Result<(), EngineError>;
}
