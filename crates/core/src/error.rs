use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Input not found: {}: {reason}", .path.display())]
    NotFound { path: PathBuf, reason: String },

    #[error("Schema error in {}: missing required columns: {}", .path.display(), .missing.join(", "))]
    Schema { path: PathBuf, missing: Vec<String> },

    #[error("Schema error in {}: unreadable header row: {reason}", .path.display())]
    Header { path: PathBuf, reason: String },

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("No campaign records to summarize")]
    EmptyTable,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Total {field} overflows a 64-bit counter")]
    Overflow { field: &'static str },

    #[error("Chart rendering error: {0}")]
    Render(String),

    #[error("Cannot write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    #[error("Pipeline failed at {stage} stage: {source}")]
    Pipeline {
        stage: Stage,
        source: Box<CampaignError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CampaignError {
    /// Taxonomy name used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CampaignError::NotFound { .. } => "NotFoundError",
            CampaignError::Schema { .. } | CampaignError::Header { .. } => "SchemaError",
            CampaignError::Record(_) => "RecordError",
            CampaignError::EmptyTable => "EmptyTableError",
            CampaignError::InvalidParameter(_) => "InvalidParameterError",
            CampaignError::Overflow { .. } => "OverflowError",
            CampaignError::Render(_) => "RenderError",
            CampaignError::Write { .. } => "WriteError",
            CampaignError::Pipeline { .. } => "PipelineError",
            CampaignError::Config(_) => "ConfigError",
            CampaignError::Serialization(_) => "SerializationError",
            CampaignError::Io(_) => "IoError",
        }
    }

    /// Wrap this error as a pipeline failure attributed to `stage`.
    /// An error that is already a pipeline failure keeps its original stage.
    pub fn at_stage(self, stage: Stage) -> CampaignError {
        match self {
            err @ CampaignError::Pipeline { .. } => err,
            other => CampaignError::Pipeline {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage that originated a pipeline failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CampaignError::Pipeline { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error of a pipeline failure, or `self` otherwise.
    pub fn root(&self) -> &CampaignError {
        match self {
            CampaignError::Pipeline { source, .. } => source.root(),
            other => other,
        }
    }
}

// ─── Pipeline Stages ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Simulate,
    Analyze,
    Render,
    Report,
}

impl Stage {
    /// Component responsible for the stage.
    pub fn component(&self) -> &'static str {
        match self {
            Stage::Load => "DataLoader",
            Stage::Simulate => "DataSimulator",
            Stage::Analyze => "DataAnalyzer",
            Stage::Render => "ChartCreator",
            Stage::Report => "ReportWriter",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Simulate => "simulate",
            Stage::Analyze => "analyze",
            Stage::Render => "render",
            Stage::Report => "report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Record Errors ──────────────────────────────────────────────────────────

/// A single input row that failed type coercion or a record invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordError {
    pub source_file: Option<PathBuf>,
    /// 1-based data row number, header excluded.
    pub row: usize,
    pub fault: RecordFault,
}

impl RecordError {
    pub fn new(source_file: Option<PathBuf>, row: usize, fault: RecordFault) -> Self {
        Self {
            source_file,
            row,
            fault,
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source_file {
            Some(path) => write!(f, "{} row {}: {}", path.display(), self.row, self.fault),
            None => write!(f, "row {}: {}", self.row, self.fault),
        }
    }
}

impl std::error::Error for RecordError {}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordFault {
    #[error("unparseable field: {0}")]
    Parse(String),

    #[error("empty {field}")]
    MissingKey { field: &'static str },

    #[error("clicks ({clicks}) exceed impressions ({impressions})")]
    ClicksExceedImpressions { clicks: u64, impressions: u64 },

    #[error("conversions ({conversions}) exceed clicks ({clicks})")]
    ConversionsExceedClicks { conversions: u64, clicks: u64 },

    #[error("{field} must be a non-negative finite amount, got {value}")]
    InvalidAmount { field: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_wrapping_keeps_original_stage() {
        let err = CampaignError::EmptyTable.at_stage(Stage::Analyze);
        let rewrapped = err.at_stage(Stage::Report);
        assert_eq!(rewrapped.stage(), Some(Stage::Analyze));
        assert_eq!(rewrapped.root().kind(), "EmptyTableError");
        assert_eq!(rewrapped.kind(), "PipelineError");
    }

    #[test]
    fn test_pipeline_message_names_stage_and_cause() {
        let err = CampaignError::InvalidParameter("row_count must be positive".into())
            .at_stage(Stage::Simulate);
        let msg = err.to_string();
        assert!(msg.contains("simulate"));
        assert!(msg.contains("row_count must be positive"));
    }

    #[test]
    fn test_record_error_display() {
        let err = RecordError::new(
            Some(PathBuf::from("week1.csv")),
            3,
            RecordFault::ClicksExceedImpressions {
                clicks: 5,
                impressions: 0,
            },
        );
        assert_eq!(
            err.to_string(),
            "week1.csv row 3: clicks (5) exceed impressions (0)"
        );
    }

    #[test]
    fn test_schema_error_lists_missing_columns() {
        let err = CampaignError::Schema {
            path: PathBuf::from("in.csv"),
            missing: vec!["clicks".into(), "revenue".into()],
        };
        assert!(err.to_string().ends_with("clicks, revenue"));
        assert_eq!(Stage::Render.component(), "ChartCreator");
    }
}
