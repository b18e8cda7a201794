//! Campaign performance analytics: per-platform and per-campaign
//! aggregation, platform ROI ranking, and daily series.

pub mod analyzer;

pub use analyzer::{
    AnalysisResults, DailyPoint, DailySeries, DataAnalyzer, PlatformComparison, PlatformMix,
};
