use crate::error::{CampaignError, CampaignResult, RecordFault};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column names every input file must carry, in canonical output order.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "campaign_id",
    "platform",
    "date",
    "impressions",
    "clicks",
    "conversions",
    "cost",
    "revenue",
];

/// Untrusted row shape as it comes off the wire. Convert with
/// [`CampaignRecord::try_from`] before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    pub campaign_id: String,
    pub platform: String,
    pub date: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub cost: f64,
    pub revenue: f64,
}

/// One validated campaign performance row.
///
/// Fields are private: the only way to obtain a record is through
/// [`CampaignRecord::try_from`], which enforces `clicks <= impressions`,
/// `conversions <= clicks` and non-negative finite money.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignRecord {
    campaign_id: String,
    platform: String,
    date: NaiveDate,
    impressions: u64,
    clicks: u64,
    conversions: u64,
    cost: f64,
    revenue: f64,
}

impl TryFrom<RecordRow> for CampaignRecord {
    type Error = RecordFault;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let campaign_id = row.campaign_id.trim().to_string();
        if campaign_id.is_empty() {
            return Err(RecordFault::MissingKey {
                field: "campaign_id",
            });
        }
        let platform = row.platform.trim().to_string();
        if platform.is_empty() {
            return Err(RecordFault::MissingKey { field: "platform" });
        }
        if row.clicks > row.impressions {
            return Err(RecordFault::ClicksExceedImpressions {
                clicks: row.clicks,
                impressions: row.impressions,
            });
        }
        if row.conversions > row.clicks {
            return Err(RecordFault::ConversionsExceedClicks {
                conversions: row.conversions,
                clicks: row.clicks,
            });
        }
        for (field, value) in [("cost", row.cost), ("revenue", row.revenue)] {
            if !value.is_finite() || value < 0.0 {
                return Err(RecordFault::InvalidAmount { field, value });
            }
        }

        Ok(Self {
            campaign_id,
            platform,
            date: row.date,
            impressions: row.impressions,
            clicks: row.clicks,
            conversions: row.conversions,
            cost: row.cost,
            revenue: row.revenue,
        })
    }
}

impl CampaignRecord {
    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn impressions(&self) -> u64 {
        self.impressions
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn revenue(&self) -> f64 {
        self.revenue
    }
}

/// Ordered, immutable collection of validated records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignTable {
    records: Vec<CampaignRecord>,
}

impl CampaignTable {
    pub fn new(records: Vec<CampaignRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CampaignRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CampaignRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct platform names, sorted.
    pub fn platforms(&self) -> Vec<String> {
        let mut platforms: Vec<String> = self.iter().map(|r| r.platform.clone()).collect();
        platforms.sort();
        platforms.dedup();
        platforms
    }

    /// Earliest and latest record dates, or `None` for an empty table.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.first()?.date;
        Some(self.iter().fold((first, first), |(lo, hi), r| {
            (lo.min(r.date), hi.max(r.date))
        }))
    }
}

impl FromIterator<CampaignRecord> for CampaignTable {
    fn from_iter<I: IntoIterator<Item = CampaignRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CampaignTable {
    type Item = &'a CampaignRecord;
    type IntoIter = std::slice::Iter<'a, CampaignRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ─── Grouping ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Platform,
    Campaign,
}

impl GroupBy {
    pub const ALL: [GroupBy; 2] = [GroupBy::Platform, GroupBy::Campaign];

    pub fn key<'a>(&self, record: &'a CampaignRecord) -> &'a str {
        match self {
            GroupBy::Platform => record.platform(),
            GroupBy::Campaign => record.campaign_id(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::Platform => "platform",
            GroupBy::Campaign => "campaign",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Run Mode ───────────────────────────────────────────────────────────────

/// Where a run's data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Load records from the given source path.
    Live,
    /// Simulate records with the seeded generator.
    DryRun,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Live => "live",
            RunMode::DryRun => "dry-run",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Chart Kinds ────────────────────────────────────────────────────────────

/// Fixed set of chart families. Each kind yields one file per [`GroupBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    BarComparison,
    TimeSeries,
    PlatformBreakdown,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::BarComparison,
        ChartKind::TimeSeries,
        ChartKind::PlatformBreakdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::BarComparison => "bar-comparison",
            ChartKind::TimeSeries => "time-series",
            ChartKind::PlatformBreakdown => "platform-breakdown",
        }
    }

    /// Deterministic output file name for this kind and grouping.
    pub fn file_name(&self, group_by: GroupBy) -> String {
        format!("{}-{}.svg", self.as_str(), group_by.as_str())
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Metrics ────────────────────────────────────────────────────────────────

/// `numerator / denominator`, or zero when the denominator is zero.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Running sums over a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub records: u64,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub cost: f64,
    pub revenue: f64,
}

impl MetricTotals {
    /// Fold one record into the sums. Counts that no longer fit in `u64`
    /// are an [`CampaignError::Overflow`]; the totals are left unchanged.
    pub fn add(&mut self, record: &CampaignRecord) -> CampaignResult<()> {
        let impressions = checked_sum(self.impressions, record.impressions, "impressions")?;
        let clicks = checked_sum(self.clicks, record.clicks, "clicks")?;
        let conversions = checked_sum(self.conversions, record.conversions, "conversions")?;
        let records = checked_sum(self.records, 1, "records")?;

        self.records = records;
        self.impressions = impressions;
        self.clicks = clicks;
        self.conversions = conversions;
        self.cost += record.cost;
        self.revenue += record.revenue;
        Ok(())
    }

    pub fn ctr(&self) -> f64 {
        safe_ratio(self.clicks as f64, self.impressions as f64)
    }

    pub fn conversion_rate(&self) -> f64 {
        safe_ratio(self.conversions as f64, self.clicks as f64)
    }

    pub fn roi(&self) -> f64 {
        safe_ratio(self.revenue - self.cost, self.cost)
    }
}

fn checked_sum(total: u64, value: u64, field: &'static str) -> CampaignResult<u64> {
    total
        .checked_add(value)
        .ok_or(CampaignError::Overflow { field })
}

/// Aggregated metrics for one grouping key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub key: String,
    pub records: u64,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub cost: f64,
    pub revenue: f64,
    pub ctr: f64,
    pub conversion_rate: f64,
    pub roi: f64,
    /// Highest-revenue platform of a campaign; absent for platform groups.
    pub dominant_platform: Option<String>,
}

impl MetricSummary {
    pub fn from_totals(key: impl Into<String>, totals: &MetricTotals) -> Self {
        Self {
            key: key.into(),
            records: totals.records,
            impressions: totals.impressions,
            clicks: totals.clicks,
            conversions: totals.conversions,
            cost: totals.cost,
            revenue: totals.revenue,
            ctr: totals.ctr(),
            conversion_rate: totals.conversion_rate(),
            roi: totals.roi(),
            dominant_platform: None,
        }
    }

    pub fn with_dominant_platform(mut self, platform: Option<String>) -> Self {
        self.dominant_platform = platform;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(clicks: u64, impressions: u64) -> RecordRow {
        RecordRow {
            campaign_id: "Bold Vision 001".into(),
            platform: "social".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            impressions,
            clicks,
            conversions: 0,
            cost: 10.0,
            revenue: 12.5,
        }
    }

    #[test]
    fn test_clicks_above_impressions_rejected() {
        let fault = CampaignRecord::try_from(row(5, 0)).unwrap_err();
        assert_eq!(
            fault,
            RecordFault::ClicksExceedImpressions {
                clicks: 5,
                impressions: 0
            }
        );
    }

    #[test]
    fn test_conversions_above_clicks_rejected() {
        let mut r = row(10, 100);
        r.conversions = 11;
        assert!(matches!(
            CampaignRecord::try_from(r),
            Err(RecordFault::ConversionsExceedClicks { .. })
        ));
    }

    #[test]
    fn test_negative_or_nan_money_rejected() {
        let mut r = row(1, 10);
        r.cost = -1.0;
        assert!(matches!(
            CampaignRecord::try_from(r),
            Err(RecordFault::InvalidAmount { field: "cost", .. })
        ));

        let mut r = row(1, 10);
        r.revenue = f64::NAN;
        assert!(matches!(
            CampaignRecord::try_from(r),
            Err(RecordFault::InvalidAmount {
                field: "revenue",
                ..
            })
        ));
    }

    #[test]
    fn test_blank_keys_rejected_and_trimmed() {
        let mut r = row(1, 10);
        r.platform = "   ".into();
        assert_eq!(
            CampaignRecord::try_from(r).unwrap_err(),
            RecordFault::MissingKey { field: "platform" }
        );

        let mut r = row(1, 10);
        r.platform = " search ".into();
        assert_eq!(CampaignRecord::try_from(r).unwrap().platform(), "search");
    }

    #[test]
    fn test_zero_denominators_yield_zero_rates() {
        let totals = MetricTotals::default();
        assert_eq!(totals.ctr(), 0.0);
        assert_eq!(totals.conversion_rate(), 0.0);
        assert_eq!(totals.roi(), 0.0);
        assert!(!totals.ctr().is_nan());
    }

    #[test]
    fn test_totals_and_rates() {
        let mut totals = MetricTotals::default();
        let mut r = row(50, 1000);
        r.conversions = 5;
        totals.add(&CampaignRecord::try_from(r).unwrap()).unwrap();

        let summary = MetricSummary::from_totals("social", &totals);
        assert_eq!(summary.records, 1);
        assert!((summary.ctr - 0.05).abs() < 1e-12);
        assert!((summary.conversion_rate - 0.1).abs() < 1e-12);
        assert!((summary.roi - 0.25).abs() < 1e-12);
        assert!(summary.dominant_platform.is_none());
    }

    #[test]
    fn test_count_overflow_is_an_error_not_a_wrap() {
        let record = CampaignRecord::try_from(row(0, u64::MAX / 2 + 1)).unwrap();

        let mut totals = MetricTotals::default();
        totals.add(&record).unwrap();
        let err = totals.add(&record).unwrap_err();
        assert_eq!(err.kind(), "OverflowError");
        assert!(err.to_string().contains("impressions"));
        assert_eq!(totals.records, 1);
        assert_eq!(totals.impressions, u64::MAX / 2 + 1);
    }

    #[test]
    fn test_chart_file_names_are_deterministic() {
        assert_eq!(
            ChartKind::TimeSeries.file_name(GroupBy::Campaign),
            "time-series-campaign.svg"
        );
        assert_eq!(
            ChartKind::PlatformBreakdown.file_name(GroupBy::Platform),
            "platform-breakdown-platform.svg"
        );
    }

    #[test]
    fn test_table_platforms_and_date_range() {
        let mut late = row(1, 10);
        late.platform = "search".into();
        late.date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        let table: CampaignTable = [row(1, 10), late, row(2, 10)]
            .into_iter()
            .map(|r| CampaignRecord::try_from(r).unwrap())
            .collect();

        assert_eq!(table.len(), 3);
        assert_eq!(table.platforms(), vec!["search", "social"]);
        let (lo, hi) = table.date_range().unwrap();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert!(CampaignTable::default().date_range().is_none());
    }
}
