//! Campaign data ingestion: CSV loading with per-row validation, and a
//! seeded synthetic data generator for dry runs.

pub mod loader;
pub mod simulator;

pub use loader::{DataLoader, LoadOutcome};
pub use simulator::DataSimulator;
