//! Run report: counts, generated artifacts, and top-line metrics for one
//! pipeline run, exported as JSON and as a short text summary.

use campaign_analytics::AnalysisResults;
use campaign_core::types::{MetricSummary, RunMode};
use campaign_core::{CampaignError, CampaignResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

pub const REPORT_FILE_NAME: &str = "run_report.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCampaign {
    pub rank: usize,
    pub campaign: String,
    pub revenue: f64,
    pub roi: f64,
    pub dominant_platform: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub source: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub records_processed: usize,
    pub records_rejected: usize,
    /// One line per rejected row, e.g. `"week1.csv row 3: clicks (5) exceed impressions (0)"`.
    pub rejected_rows: Vec<String>,
    pub chart_paths: Vec<PathBuf>,
    pub simulated_data_path: Option<PathBuf>,
    pub report_path: PathBuf,
    pub overall: MetricSummary,
    /// Best-ROI platform.
    pub best_platform: Option<String>,
    pub top_campaigns: Vec<TopCampaign>,
}

impl RunReport {
    /// First `n` campaigns of the revenue ordering.
    pub fn top_campaigns(results: &AnalysisResults, n: usize) -> Vec<TopCampaign> {
        results
            .campaigns
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, s)| TopCampaign {
                rank: i + 1,
                campaign: s.key.clone(),
                revenue: s.revenue,
                roi: s.roi,
                dominant_platform: s.dominant_platform.clone(),
            })
            .collect()
    }

    pub fn to_json(&self) -> CampaignResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> CampaignResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| CampaignError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!(path = %path.display(), "Run report written");
        Ok(())
    }

    /// Human-readable summary for the terminal.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Run {} ({})", self.run_id, self.mode);
        if let Some(source) = &self.source {
            let _ = writeln!(out, "  source:            {}", source.display());
        }
        let _ = writeln!(out, "  records processed: {}", self.records_processed);
        let _ = writeln!(out, "  records rejected:  {}", self.records_rejected);
        let _ = writeln!(out, "  total revenue:     {:.2}", self.overall.revenue);
        let _ = writeln!(out, "  total cost:        {:.2}", self.overall.cost);
        let _ = writeln!(out, "  CTR:               {:.4}", self.overall.ctr);
        let _ = writeln!(out, "  conversion rate:   {:.4}", self.overall.conversion_rate);
        let _ = writeln!(out, "  ROI:               {:.4}", self.overall.roi);
        if let Some(platform) = &self.best_platform {
            let _ = writeln!(out, "  best ROI platform: {platform}");
        }
        if !self.top_campaigns.is_empty() {
            let _ = writeln!(out, "  top campaigns by revenue:");
            for c in &self.top_campaigns {
                let _ = writeln!(out, "    {}. {}: {:.2}", c.rank, c.campaign, c.revenue);
            }
        }
        let _ = writeln!(out, "  charts:");
        for path in &self.chart_paths {
            let _ = writeln!(out, "    {}", path.display());
        }
        let _ = writeln!(out, "  report: {}", self.report_path.display());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_analytics::DataAnalyzer;
    use campaign_core::types::{CampaignRecord, CampaignTable, RecordRow};
    use chrono::NaiveDate;

    fn results() -> AnalysisResults {
        let rows = [("A", "social", 10.0), ("B", "search", 20.0), ("C", "social", 30.0)];
        let table: CampaignTable = rows
            .iter()
            .map(|(campaign, platform, revenue)| {
                CampaignRecord::try_from(RecordRow {
                    campaign_id: campaign.to_string(),
                    platform: platform.to_string(),
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    impressions: 1000,
                    clicks: 100,
                    conversions: 10,
                    cost: 5.0,
                    revenue: *revenue,
                })
                .unwrap()
            })
            .collect();
        DataAnalyzer::analyze(&table).unwrap()
    }

    fn report(results: &AnalysisResults) -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            mode: RunMode::DryRun,
            source: None,
            output_dir: PathBuf::from("out"),
            generated_at: Utc::now(),
            records_processed: 3,
            records_rejected: 0,
            rejected_rows: vec![],
            chart_paths: vec![PathBuf::from("out/bar-comparison-platform.svg")],
            simulated_data_path: None,
            report_path: PathBuf::from("out").join(REPORT_FILE_NAME),
            overall: results.overall.clone(),
            best_platform: results.best_platform().map(|c| c.platform.clone()),
            top_campaigns: RunReport::top_campaigns(results, 2),
        }
    }

    #[test]
    fn test_top_campaigns_follow_revenue_order() {
        let top = RunReport::top_campaigns(&results(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].campaign, "C");
        assert_eq!(top[0].rank, 1);
        assert_eq!(top[1].campaign, "B");
        assert_eq!(top[0].dominant_platform.as_deref(), Some("social"));
    }

    #[test]
    fn test_json_roundtrip_and_mode_spelling() {
        let data = results();
        let original = report(&data);
        let json = original.to_json().unwrap();
        assert!(json.contains("\"mode\": \"dry-run\""));
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_write_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REPORT_FILE_NAME);
        report(&results()).write_json(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["records_processed"], 3);
    }

    #[test]
    fn test_text_summary_mentions_key_figures() {
        let text = report(&results()).render_text();
        assert!(text.contains("records processed: 3"));
        assert!(text.contains("total revenue:     60.00"));
        assert!(text.contains("1. C: 30.00"));
        assert!(text.contains("bar-comparison-platform.svg"));
    }
}
