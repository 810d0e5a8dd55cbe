//! External evaluator integration.
//!
//! The monitoring algorithm itself lives outside this crate. An evaluator is
//! probed once at startup; the resulting `Option<EvaluatorHandle>` is passed
//! explicitly to every phase, and `None` means placeholder mode.

pub mod command;

pub use command::CommandEvaluator;

use crate::error::EvaluatorError;
use crate::models::{Metrics, Sample};
use tracing::{info, warn};

/// Something that can score samples at a detection threshold.
pub trait Evaluator: Send + Sync {
    /// Human readable name, recorded in the run metadata.
    fn name(&self) -> &str;

    /// Evaluate the samples at the given threshold.
    fn evaluate(&self, samples: &[Sample], threshold: f64) -> Result<Metrics, EvaluatorError>;
}

/// Owned reference to an available evaluator.
pub type EvaluatorHandle = Box<dyn Evaluator>;

/// Resolve the configured evaluator command, if any.
pub fn discover(command: Option<&str>) -> Option<EvaluatorHandle> {
    let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) else {
        warn!("No water monitoring evaluator configured - using placeholder mode");
        return None;
    };

    match CommandEvaluator::discover(command) {
        Some(evaluator) => {
            info!("✓ Water monitoring evaluator found: {}", evaluator.name());
            Some(Box::new(evaluator))
        }
        None => {
            warn!(
                "⚠ Water monitoring evaluator not available ({}) - using placeholder mode",
                command
            );
            None
        }
    }
}
