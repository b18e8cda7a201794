//! CSV loader: reads campaign performance files into a validated
//! [`CampaignTable`], applying one invalid-row policy for the whole load.

use campaign_core::config::{InvalidRowPolicy, LoaderConfig};
use campaign_core::types::{CampaignRecord, CampaignTable, RecordRow, REQUIRED_COLUMNS};
use campaign_core::{CampaignError, CampaignResult, RecordError, RecordFault};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub table: CampaignTable,
    /// Rows dropped under [`InvalidRowPolicy::Skip`], in file/row order.
    pub rejected: Vec<RecordError>,
    /// Files read, in load order.
    pub files: Vec<PathBuf>,
}

pub struct DataLoader {
    policy: InvalidRowPolicy,
    delimiter: u8,
}

impl DataLoader {
    pub fn new(config: &LoaderConfig) -> CampaignResult<Self> {
        if !config.delimiter.is_ascii() {
            return Err(CampaignError::InvalidParameter(format!(
                "delimiter must be a single ASCII character, got {:?}",
                config.delimiter
            )));
        }
        Ok(Self {
            policy: config.invalid_rows,
            delimiter: config.delimiter as u8,
        })
    }

    pub fn with_policy(policy: InvalidRowPolicy) -> Self {
        Self {
            policy,
            delimiter: b',',
        }
    }

    /// Load a single CSV file, or every `*.csv` file of a directory in
    /// file-name order.
    pub fn load(&self, path: &Path) -> CampaignResult<LoadOutcome> {
        let files = discover(path)?;
        let mut records = Vec::new();
        let mut rejected = Vec::new();

        for file in &files {
            self.load_file(file, &mut records, &mut rejected)?;
        }

        metrics::counter!("ingest.rows_loaded").increment(records.len() as u64);
        info!(
            path = %path.display(),
            files = files.len(),
            records = records.len(),
            rejected = rejected.len(),
            policy = ?self.policy,
            "Campaign data loaded"
        );

        Ok(LoadOutcome {
            table: CampaignTable::new(records),
            rejected,
            files,
        })
    }

    fn load_file(
        &self,
        path: &Path,
        records: &mut Vec<CampaignRecord>,
        rejected: &mut Vec<RecordError>,
    ) -> CampaignResult<()> {
        let file = File::open(path).map_err(|e| not_found(path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(not_found(path, e)),
            Err(e) => {
                return Err(CampaignError::Header {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !headers.iter().any(|h| h == **column))
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CampaignError::Schema {
                path: path.to_path_buf(),
                missing,
            });
        }
        debug!(path = %path.display(), columns = headers.len(), "Header validated");

        for (index, result) in reader.deserialize::<RecordRow>().enumerate() {
            let row = index + 1;
            let parsed = match result {
                Ok(raw) => CampaignRecord::try_from(raw),
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                    return Err(not_found(path, e));
                }
                Err(e) => Err(RecordFault::Parse(describe(&e))),
            };

            match parsed {
                Ok(record) => records.push(record),
                Err(fault) => {
                    let err = RecordError::new(Some(path.to_path_buf()), row, fault);
                    if self.policy == InvalidRowPolicy::Abort {
                        return Err(err.into());
                    }
                    warn!(
                        file = %path.display(),
                        row,
                        reason = %err.fault,
                        "Rejected campaign record"
                    );
                    metrics::counter!("ingest.rows_rejected").increment(1);
                    rejected.push(err);
                }
            }
        }

        Ok(())
    }
}

fn discover(path: &Path) -> CampaignResult<Vec<PathBuf>> {
    let meta = std::fs::metadata(path).map_err(|e| not_found(path, e))?;
    if meta.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).map_err(|e| not_found(path, e))? {
        let candidate = entry.map_err(|e| not_found(path, e))?.path();
        let is_csv = candidate
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && candidate.is_file() {
            files.push(candidate);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(CampaignError::NotFound {
            path: path.to_path_buf(),
            reason: "no CSV files found".into(),
        });
    }
    Ok(files)
}

fn not_found(path: &Path, err: impl std::fmt::Display) -> CampaignError {
    CampaignError::NotFound {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Deserialize errors carry the offending field; everything else falls back
/// to the full csv message.
fn describe(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
        _ => err.to_string(),
    }
}
