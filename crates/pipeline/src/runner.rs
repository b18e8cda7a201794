//! Orchestrator: selects the loader or the simulator by run mode, analyzes
//! the table, renders charts, and writes the run report.

use crate::output::StagedOutput;
use campaign_analytics::DataAnalyzer;
use campaign_core::config::AppConfig;
use campaign_core::types::{CampaignTable, RunMode};
use campaign_core::{CampaignError, CampaignResult, RecordError, Stage};
use campaign_ingest::{DataLoader, DataSimulator};
use campaign_reporting::report::REPORT_FILE_NAME;
use campaign_reporting::{ChartCreator, RunReport};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const SIMULATED_DATA_FILE_NAME: &str = "simulated_data.csv";

struct Ingested {
    table: CampaignTable,
    rejected: Vec<RecordError>,
}

pub struct MarketingAnalyzer {
    config: AppConfig,
}

impl MarketingAnalyzer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the whole pipeline. Any failure comes back as
    /// [`CampaignError::Pipeline`] naming the stage it started in, and no
    /// new files are left in `output_dir`.
    pub fn run(
        &self,
        mode: RunMode,
        source: Option<&Path>,
        output_dir: &Path,
    ) -> CampaignResult<RunReport> {
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            mode = %mode,
            output_dir = %output_dir.display(),
            "Marketing analysis run started"
        );

        match self.execute(run_id, mode, source, output_dir) {
            Ok(report) => {
                info!(
                    %run_id,
                    records = report.records_processed,
                    rejected = report.records_rejected,
                    charts = report.chart_paths.len(),
                    "Marketing analysis run complete"
                );
                Ok(report)
            }
            Err(err) => {
                let stage = err.stage().unwrap_or(Stage::Report);
                let cause = err.root();
                error!(
                    %run_id,
                    stage = %stage,
                    component = stage.component(),
                    kind = cause.kind(),
                    error = %cause,
                    "Marketing analysis run failed"
                );
                Err(err.at_stage(stage))
            }
        }
    }

    fn execute(
        &self,
        run_id: Uuid,
        mode: RunMode,
        source: Option<&Path>,
        output_dir: &Path,
    ) -> CampaignResult<RunReport> {
        let ingested = match mode {
            RunMode::Live => run_stage(Stage::Load, || self.load(source))?,
            RunMode::DryRun => {
                if let Some(path) = source {
                    warn!(source = %path.display(), "Source ignored in dry-run mode");
                }
                run_stage(Stage::Simulate, || self.simulate())?
            }
        };

        if let Some((first, last)) = ingested.table.date_range() {
            info!(
                records = ingested.table.len(),
                platforms = ?ingested.table.platforms(),
                first_date = %first,
                last_date = %last,
                "Campaign table ready"
            );
        }

        let results = run_stage(Stage::Analyze, || DataAnalyzer::analyze(&ingested.table))?;
        info!(
            platforms = results.platforms.len(),
            campaigns = results.campaigns.len(),
            "Analysis complete"
        );

        let staged = run_stage(Stage::Render, || StagedOutput::create(output_dir))?;
        let creator = ChartCreator::new(&self.config.charts);
        let staged_charts = run_stage(Stage::Render, || {
            creator.render_all(&results, &self.config.charts.kinds, staged.staging_dir())
        })?;
        let chart_paths: Vec<PathBuf> = staged_charts
            .iter()
            .filter_map(|p| p.file_name())
            .map(|name| staged.final_dir().join(name))
            .collect();

        let save_simulated = mode == RunMode::DryRun && self.config.output.save_simulated_data;
        let simulated_data_path = if save_simulated {
            run_stage(Stage::Simulate, || {
                DataSimulator::write_csv(
                    &ingested.table,
                    &staged.staging_dir().join(SIMULATED_DATA_FILE_NAME),
                )
            })?;
            Some(staged.final_path(SIMULATED_DATA_FILE_NAME))
        } else {
            None
        };

        let report = RunReport {
            run_id,
            mode,
            source: match mode {
                RunMode::Live => source.map(Path::to_path_buf),
                RunMode::DryRun => None,
            },
            output_dir: output_dir.to_path_buf(),
            generated_at: Utc::now(),
            records_processed: ingested.table.len(),
            records_rejected: ingested.rejected.len(),
            rejected_rows: ingested.rejected.iter().map(ToString::to_string).collect(),
            chart_paths,
            simulated_data_path,
            report_path: staged.final_path(REPORT_FILE_NAME),
            overall: results.overall.clone(),
            best_platform: results.best_platform().map(|c| c.platform.clone()),
            top_campaigns: RunReport::top_campaigns(&results, self.config.report.top_n),
        };

        run_stage(Stage::Report, || {
            report.write_json(&staged.staging_dir().join(REPORT_FILE_NAME))?;
            staged.commit(REPORT_FILE_NAME)
        })?;

        for campaign in &report.top_campaigns {
            info!(
                rank = campaign.rank,
                campaign = %campaign.campaign,
                revenue = campaign.revenue,
                "Top campaign by revenue"
            );
        }
        Ok(report)
    }

    fn load(&self, source: Option<&Path>) -> CampaignResult<Ingested> {
        let path = source.ok_or_else(|| {
            CampaignError::InvalidParameter("live mode requires a source path".into())
        })?;
        let outcome = DataLoader::new(&self.config.loader)?.load(path)?;
        Ok(Ingested {
            table: outcome.table,
            rejected: outcome.rejected,
        })
    }

    fn simulate(&self) -> CampaignResult<Ingested> {
        let sim = &self.config.simulator;
        let table = DataSimulator::new(sim).generate(sim.row_count, sim.seed)?;
        Ok(Ingested {
            table,
            rejected: Vec::new(),
        })
    }
}

fn run_stage<T>(stage: Stage, f: impl FnOnce() -> CampaignResult<T>) -> CampaignResult<T> {
    info!(stage = %stage, component = stage.component(), "Stage started");
    let output = f().map_err(|e| e.at_stage(stage))?;
    info!(stage = %stage, component = stage.component(), "Stage finished");
    Ok(output)
}
