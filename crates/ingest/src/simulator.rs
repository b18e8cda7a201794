//! Synthetic campaign data for dry runs and tests.
//!
//! Every table is a pure function of `(row_count, seed)` and the simulator
//! settings: the generator is a `ChaCha8Rng` owned by the call, so repeated
//! or concurrent calls never share random state. Counts are drawn as
//! fractions of their parent count (clicks of impressions, conversions of
//! clicks), which keeps record invariants satisfied by construction.

use campaign_core::config::SimulatorConfig;
use campaign_core::types::{CampaignRecord, CampaignTable, RecordRow};
use campaign_core::{CampaignError, CampaignResult};
use chrono::{Days, NaiveDate};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use tracing::info;

pub const PLATFORMS: [&str; 4] = ["social", "search", "display", "video"];

const ADJECTIVES: [&str; 10] = [
    "Bold",
    "Smart",
    "Vibrant",
    "Sleek",
    "Dynamic",
    "Innovative",
    "Stellar",
    "Radiant",
    "Agile",
    "Zen",
];

const NOUNS: [&str; 10] = [
    "Vision", "Quest", "Journey", "Horizon", "Leap", "Spark", "Wave", "Pulse", "Orbit", "Nexus",
];

pub struct DataSimulator {
    campaign_count: usize,
    window_days: u32,
    start_date: NaiveDate,
}

impl DataSimulator {
    pub fn new(config: &SimulatorConfig) -> Self {
        Self {
            campaign_count: config.campaign_count,
            window_days: config.window_days,
            start_date: config.start_date,
        }
    }

    /// Generate `row_count` records from `seed`.
    pub fn generate(&self, row_count: usize, seed: u64) -> CampaignResult<CampaignTable> {
        if row_count == 0 {
            return Err(CampaignError::InvalidParameter(
                "row_count must be positive".into(),
            ));
        }
        if self.campaign_count == 0 {
            return Err(CampaignError::InvalidParameter(
                "campaign_count must be positive".into(),
            ));
        }
        if self.window_days == 0 {
            return Err(CampaignError::InvalidParameter(
                "window_days must be positive".into(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let campaigns = campaign_names(&mut rng, self.campaign_count);
        let table = (0..row_count)
            .map(|_| self.synthesize(&mut rng, &campaigns))
            .collect::<CampaignResult<CampaignTable>>()?;

        info!(
            rows = table.len(),
            seed,
            campaigns = campaigns.len(),
            "Simulated campaign data generated"
        );
        Ok(table)
    }

    fn synthesize(&self, rng: &mut ChaCha8Rng, campaigns: &[String]) -> CampaignResult<CampaignRecord> {
        let campaign_id = campaigns[rng.gen_range(0..campaigns.len())].clone();
        let platform = PLATFORMS[rng.gen_range(0..PLATFORMS.len())].to_string();
        let offset = rng.gen_range(0..self.window_days);
        let date = self
            .start_date
            .checked_add_days(Days::new(u64::from(offset)))
            .ok_or_else(|| {
                CampaignError::InvalidParameter(format!(
                    "simulation window overflows the calendar from {}",
                    self.start_date
                ))
            })?;

        let impressions: u64 = rng.gen_range(10_000..=1_000_000);
        let clicks = (impressions as f64 * rng.gen_range(0.002..0.05)).floor() as u64;
        let conversions = (clicks as f64 * rng.gen_range(0.01..0.2)).floor() as u64;
        let cost = round_cents(clicks as f64 * rng.gen_range(0.2..3.0));
        let revenue = round_cents(conversions as f64 * rng.gen_range(5.0..120.0));

        let row = RecordRow {
            campaign_id,
            platform,
            date,
            impressions,
            clicks,
            conversions,
            cost,
            revenue,
        };
        CampaignRecord::try_from(row).map_err(|fault| {
            CampaignError::InvalidParameter(format!("simulated record is invalid: {fault}"))
        })
    }

    /// Write a table in the input schema so a dry run can be replayed live.
    pub fn write_csv(table: &CampaignTable, path: &Path) -> CampaignResult<()> {
        let write_err = |e: csv::Error| CampaignError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
        for record in table {
            writer.serialize(record).map_err(write_err)?;
        }
        writer.flush().map_err(|e| CampaignError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(path = %path.display(), rows = table.len(), "Simulated data saved");
        Ok(())
    }
}

/// "<Adjective> <Noun> <NNN>" codenames, numbered from 1 so they stay unique.
fn campaign_names(rng: &mut ChaCha8Rng, count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| {
            let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
            let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
            format!("{adjective} {noun} {i:03}")
        })
        .collect()
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DataLoader;
    use campaign_core::config::InvalidRowPolicy;

    fn simulator() -> DataSimulator {
        DataSimulator::new(&SimulatorConfig {
            campaign_count: 12,
            ..SimulatorConfig::default()
        })
    }

    #[test]
    fn test_same_seed_same_table() {
        let sim = simulator();
        let a = sim.generate(500, 1234).unwrap();
        let b = sim.generate(500, 1234).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 500);
    }

    #[test]
    fn test_different_seed_different_table() {
        let sim = simulator();
        assert_ne!(sim.generate(50, 1).unwrap(), sim.generate(50, 2).unwrap());
    }

    #[test]
    fn test_zero_rows_is_invalid_parameter() {
        let err = simulator().generate(0, 1).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameterError");
    }

    #[test]
    fn test_zero_campaigns_is_invalid_parameter() {
        let sim = DataSimulator::new(&SimulatorConfig {
            campaign_count: 0,
            ..SimulatorConfig::default()
        });
        assert!(matches!(
            sim.generate(10, 1),
            Err(CampaignError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_generated_records_hold_invariants_and_bounds() {
        let config = SimulatorConfig::default();
        let sim = DataSimulator::new(&config);
        let table = sim.generate(2_000, 99).unwrap();
        let last_day = config.start_date + Days::new(u64::from(config.window_days - 1));

        for record in table.iter() {
            assert!(record.clicks() <= record.impressions());
            assert!(record.conversions() <= record.clicks());
            assert!(record.cost() >= 0.0 && record.revenue() >= 0.0);
            assert!(record.date() >= config.start_date && record.date() <= last_day);
            assert!(PLATFORMS.contains(&record.platform()));
        }
    }

    #[test]
    fn test_campaign_names_are_numbered_codenames() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let names = campaign_names(&mut rng, 3);
        assert_eq!(names.len(), 3);
        assert!(names[0].ends_with(" 001"));
        assert!(names[2].ends_with(" 003"));
        let words: Vec<&str> = names[1].split(' ').collect();
        assert!(ADJECTIVES.contains(&words[0]));
        assert!(NOUNS.contains(&words[1]));
    }

    #[test]
    fn test_written_csv_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simulated_data.csv");
        let table = simulator().generate(40, 7).unwrap();

        DataSimulator::write_csv(&table, &path).unwrap();
        let outcome = DataLoader::with_policy(InvalidRowPolicy::Abort)
            .load(&path)
            .unwrap();

        assert_eq!(outcome.table.len(), table.len());
        let first = &outcome.table.records()[0];
        assert_eq!(first.campaign_id(), table.records()[0].campaign_id());
        assert_eq!(first.date(), table.records()[0].date());
    }
}
