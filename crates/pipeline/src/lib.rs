//! Marketing analysis pipeline: load or simulate, analyze, render, report.
//! Stages run strictly in sequence and a run either fully succeeds or
//! leaves no new output behind.

pub mod output;
pub mod runner;

pub use output::StagedOutput;
pub use runner::MarketingAnalyzer;
