//! Aggregation over a [`CampaignTable`]. Every function here is pure: the
//! table is only borrowed and nothing is written anywhere.
//!
//! Summaries are ordered by total revenue descending, ties broken by key
//! ascending, so identical input always yields identical output order.

use campaign_core::types::{CampaignTable, GroupBy, MetricSummary, MetricTotals};
use campaign_core::{CampaignError, CampaignResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

// ─── Types ──────────────────────────────────────────────────────────────────

/// One platform's position in the ROI ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformComparison {
    /// 1-based rank, best ROI first.
    pub rank: usize,
    pub platform: String,
    pub summary: MetricSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub cost: f64,
    pub revenue: f64,
    pub ctr: f64,
    pub conversion_rate: f64,
}

/// Date-ordered metrics for one grouping key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    pub key: String,
    pub points: Vec<DailyPoint>,
}

/// Revenue of one campaign split by platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMix {
    pub campaign: String,
    /// Sorted by platform name.
    pub revenue_by_platform: Vec<(String, f64)>,
    pub total_revenue: f64,
}

/// Everything the chart and report stages consume, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub overall: MetricSummary,
    pub platforms: Vec<MetricSummary>,
    pub campaigns: Vec<MetricSummary>,
    pub comparison: Vec<PlatformComparison>,
    pub platform_daily: Vec<DailySeries>,
    pub campaign_daily: Vec<DailySeries>,
    pub platform_mix: Vec<PlatformMix>,
}

impl AnalysisResults {
    pub fn summaries(&self, group_by: GroupBy) -> &[MetricSummary] {
        match group_by {
            GroupBy::Platform => &self.platforms,
            GroupBy::Campaign => &self.campaigns,
        }
    }

    pub fn daily(&self, group_by: GroupBy) -> &[DailySeries] {
        match group_by {
            GroupBy::Platform => &self.platform_daily,
            GroupBy::Campaign => &self.campaign_daily,
        }
    }

    /// Platform with the best ROI, if any platform exists.
    pub fn best_platform(&self) -> Option<&PlatformComparison> {
        self.comparison.first()
    }
}

// ─── Analyzer ───────────────────────────────────────────────────────────────

pub struct DataAnalyzer;

impl DataAnalyzer {
    /// Group records by `group_by` and aggregate totals and derived rates.
    pub fn summarize(
        table: &CampaignTable,
        group_by: GroupBy,
    ) -> CampaignResult<Vec<MetricSummary>> {
        ensure_not_empty(table)?;

        let mut groups: BTreeMap<&str, MetricTotals> = BTreeMap::new();
        for record in table {
            groups.entry(group_by.key(record)).or_default().add(record)?;
        }

        let dominant = match group_by {
            GroupBy::Campaign => dominant_platforms(table),
            GroupBy::Platform => BTreeMap::new(),
        };

        let mut summaries: Vec<MetricSummary> = groups
            .into_iter()
            .map(|(key, totals)| {
                MetricSummary::from_totals(key, &totals)
                    .with_dominant_platform(dominant.get(key).cloned())
            })
            .collect();
        summaries.sort_by(by_revenue_then_key);

        debug!(group_by = %group_by, groups = summaries.len(), "Summaries computed");
        Ok(summaries)
    }

    /// Platforms ranked by ROI descending, ties broken by platform name.
    pub fn compare_platforms(table: &CampaignTable) -> CampaignResult<Vec<PlatformComparison>> {
        let mut summaries = Self::summarize(table, GroupBy::Platform)?;
        summaries.sort_by(|a, b| b.roi.total_cmp(&a.roi).then_with(|| a.key.cmp(&b.key)));

        Ok(summaries
            .into_iter()
            .enumerate()
            .map(|(i, summary)| PlatformComparison {
                rank: i + 1,
                platform: summary.key.clone(),
                summary,
            })
            .collect())
    }

    /// Per-key daily aggregates. Series follow [`DataAnalyzer::summarize`]
    /// order; points are sorted by date.
    pub fn daily_series(
        table: &CampaignTable,
        group_by: GroupBy,
    ) -> CampaignResult<Vec<DailySeries>> {
        let order = Self::summarize(table, group_by)?;

        let mut days: BTreeMap<&str, BTreeMap<NaiveDate, MetricTotals>> = BTreeMap::new();
        for record in table {
            days.entry(group_by.key(record))
                .or_default()
                .entry(record.date())
                .or_default()
                .add(record)?;
        }

        Ok(order
            .iter()
            .map(|summary| DailySeries {
                key: summary.key.clone(),
                points: days
                    .get(summary.key.as_str())
                    .map(|by_date| {
                        by_date
                            .iter()
                            .map(|(date, totals)| daily_point(*date, totals))
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect())
    }

    /// Revenue per (campaign, platform), campaigns in summary order.
    pub fn platform_mix(table: &CampaignTable) -> CampaignResult<Vec<PlatformMix>> {
        let order = Self::summarize(table, GroupBy::Campaign)?;
        let revenue = revenue_by_campaign_platform(table);

        Ok(order
            .iter()
            .map(|summary| PlatformMix {
                campaign: summary.key.clone(),
                revenue_by_platform: revenue
                    .get(summary.key.as_str())
                    .map(|by_platform| {
                        by_platform
                            .iter()
                            .map(|(platform, amount)| (platform.to_string(), *amount))
                            .collect()
                    })
                    .unwrap_or_default(),
                total_revenue: summary.revenue,
            })
            .collect())
    }

    /// Totals across every record, keyed `"all"`.
    pub fn overall(table: &CampaignTable) -> CampaignResult<MetricSummary> {
        ensure_not_empty(table)?;
        let mut totals = MetricTotals::default();
        for record in table {
            totals.add(record)?;
        }
        Ok(MetricSummary::from_totals("all", &totals))
    }

    pub fn analyze(table: &CampaignTable) -> CampaignResult<AnalysisResults> {
        Ok(AnalysisResults {
            overall: Self::overall(table)?,
            platforms: Self::summarize(table, GroupBy::Platform)?,
            campaigns: Self::summarize(table, GroupBy::Campaign)?,
            comparison: Self::compare_platforms(table)?,
            platform_daily: Self::daily_series(table, GroupBy::Platform)?,
            campaign_daily: Self::daily_series(table, GroupBy::Campaign)?,
            platform_mix: Self::platform_mix(table)?,
        })
    }
}

fn ensure_not_empty(table: &CampaignTable) -> CampaignResult<()> {
    if table.is_empty() {
        Err(CampaignError::EmptyTable)
    } else {
        Ok(())
    }
}

fn by_revenue_then_key(a: &MetricSummary, b: &MetricSummary) -> Ordering {
    b.revenue
        .total_cmp(&a.revenue)
        .then_with(|| a.key.cmp(&b.key))
}

fn revenue_by_campaign_platform(table: &CampaignTable) -> BTreeMap<&str, BTreeMap<&str, f64>> {
    let mut revenue: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();
    for record in table {
        *revenue
            .entry(record.campaign_id())
            .or_default()
            .entry(record.platform())
            .or_default() += record.revenue();
    }
    revenue
}

/// Highest-revenue platform per campaign; ties go to the first name.
fn dominant_platforms(table: &CampaignTable) -> BTreeMap<&str, String> {
    revenue_by_campaign_platform(table)
        .into_iter()
        .filter_map(|(campaign, by_platform)| {
            by_platform
                .into_iter()
                .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(platform, _)| (campaign, platform.to_string()))
        })
        .collect()
}

fn daily_point(date: NaiveDate, totals: &MetricTotals) -> DailyPoint {
    DailyPoint {
        date,
        impressions: totals.impressions,
        clicks: totals.clicks,
        conversions: totals.conversions,
        cost: totals.cost,
        revenue: totals.revenue,
        ctr: totals.ctr(),
        conversion_rate: totals.conversion_rate(),
    }
}
