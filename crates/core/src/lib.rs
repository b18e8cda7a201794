//! Shared model for the marketing performance analyzer: campaign records,
//! metric summaries, the error taxonomy, and application configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, InvalidRowPolicy};
pub use error::{CampaignError, CampaignResult, RecordError, RecordFault, Stage};
pub use types::{
    CampaignRecord, CampaignTable, ChartKind, GroupBy, MetricSummary, MetricTotals, RecordRow,
    RunMode, REQUIRED_COLUMNS,
};
