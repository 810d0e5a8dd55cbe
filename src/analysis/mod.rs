//! Test phases and result aggregation.
//!
//! Every phase returns a `PhaseResult`. When no evaluator is available each
//! phase falls back to deterministic placeholder results of the same shape.

pub mod accuracy;
pub mod aggregator;
pub mod benchmark;
pub mod night_vision;

pub use accuracy::run_accuracy_phase;
pub use aggregator::summarize;
pub use benchmark::run_performance_phase;
pub use night_vision::run_night_vision_phase;
