//! Test data preparation.
//!
//! Samples come either from configured sources on disk or from the seeded
//! synthetic generator.

pub mod feeder;
pub mod synthetic;

pub use feeder::DataFeeder;
pub use synthetic::SyntheticDataGenerator;
