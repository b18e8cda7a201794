//! SVG chart rendering for aggregated campaign results.
//!
//! Each [`ChartKind`] produces exactly one file per [`GroupBy`], named by
//! [`ChartKind::file_name`], so repeated runs overwrite instead of piling up:
//!
//! | kind | platform | campaign |
//! |---|---|---|
//! | bar-comparison | revenue per platform | revenue per top-N campaign |
//! | time-series | daily revenue, CTR and conversion rate per platform | the same per top-N campaign |
//! | platform-breakdown | ROI per platform, best first | top-N campaign revenue stacked by platform |

use campaign_analytics::{AnalysisResults, DailyPoint, DailySeries, PlatformComparison, PlatformMix};
use campaign_core::config::ChartConfig;
use campaign_core::types::{ChartKind, GroupBy, MetricSummary};
use campaign_core::{CampaignError, CampaignResult};
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use plotters::coord::Shift;
use plotters::style::RGBAColor;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

const CAPTION_FONT: (&str, u32) = ("sans-serif", 28);

pub struct ChartCreator {
    width: u32,
    height: u32,
    top_n: usize,
}

impl ChartCreator {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            top_n: config.top_n.max(1),
        }
    }

    /// Render one chart kind for both groupings into `output_dir`, creating
    /// the directory if needed. Returns the written paths, platform first.
    pub fn render(
        &self,
        results: &AnalysisResults,
        kind: ChartKind,
        output_dir: &Path,
    ) -> CampaignResult<Vec<PathBuf>> {
        std::fs::create_dir_all(output_dir).map_err(|e| write_err(output_dir, e))?;

        let mut written = Vec::with_capacity(GroupBy::ALL.len());
        for group_by in GroupBy::ALL {
            let path = output_dir.join(kind.file_name(group_by));
            match (kind, group_by) {
                (ChartKind::BarComparison, _) => {
                    self.draw_revenue_bars(&path, group_by, results.summaries(group_by))
                }
                (ChartKind::TimeSeries, _) => {
                    self.draw_daily_metrics(&path, group_by, results.daily(group_by))
                }
                (ChartKind::PlatformBreakdown, GroupBy::Platform) => {
                    self.draw_platform_roi(&path, &results.comparison)
                }
                (ChartKind::PlatformBreakdown, GroupBy::Campaign) => {
                    self.draw_platform_mix(&path, &results.platform_mix)
                }
            }?;

            metrics::counter!("charts.rendered").increment(1);
            info!(kind = %kind, group_by = %group_by, path = %path.display(), "Chart saved");
            written.push(path);
        }
        Ok(written)
    }

    /// Render several kinds in order; paths are concatenated per kind.
    pub fn render_all(
        &self,
        results: &AnalysisResults,
        kinds: &[ChartKind],
        output_dir: &Path,
    ) -> CampaignResult<Vec<PathBuf>> {
        let mut written = Vec::new();
        for kind in kinds {
            written.extend(self.render(results, *kind, output_dir)?);
        }
        Ok(written)
    }

    fn draw_revenue_bars(
        &self,
        path: &Path,
        group_by: GroupBy,
        summaries: &[MetricSummary],
    ) -> CampaignResult<()> {
        let bars: Vec<(String, f64)> = summaries
            .iter()
            .take(self.top_n)
            .map(|s| (s.key.clone(), s.revenue))
            .collect();
        let title = match group_by {
            GroupBy::Platform => "Total revenue by platform".to_string(),
            GroupBy::Campaign => format!("Total revenue by campaign (top {})", bars.len()),
        };
        self.draw_bars(path, &title, "Revenue", &bars, BLUE.mix(0.6))
    }

    fn draw_platform_roi(&self, path: &Path, comparison: &[PlatformComparison]) -> CampaignResult<()> {
        let bars: Vec<(String, f64)> = comparison
            .iter()
            .map(|c| (c.platform.clone(), c.summary.roi))
            .collect();
        self.draw_bars(
            path,
            "Return on investment by platform",
            "ROI",
            &bars,
            GREEN.mix(0.6),
        )
    }

    fn draw_bars(
        &self,
        path: &Path,
        title: &str,
        y_desc: &str,
        bars: &[(String, f64)],
        color: RGBAColor,
    ) -> CampaignResult<()> {
        if bars.is_empty() {
            return Err(no_data(title));
        }
        let (low, high) = value_range(bars.iter().map(|(_, v)| *v));

        let root = SVGBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, CAPTION_FONT)
            .margin(20)
            .x_label_area_size(160)
            .y_label_area_size(90)
            .build_cartesian_2d((0..bars.len()).into_segmented(), low..high)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(bars.len())
            .x_label_formatter(&|v| segment_label(v, bars))
            .x_label_style(
                ("sans-serif", 12)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .y_desc(y_desc)
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
                    color.filled(),
                );
                bar.set_margin(0, 0, 6, 6);
                bar
            }))
            .map_err(render_err)?;

        root.present().map_err(|e| write_err(path, e))
    }

    /// Three stacked panels sharing one date axis: revenue, click-through
    /// rate and conversion rate per key.
    fn draw_daily_metrics(
        &self,
        path: &Path,
        group_by: GroupBy,
        series: &[DailySeries],
    ) -> CampaignResult<()> {
        let series = &series[..series.len().min(self.top_n)];
        let scope = match group_by {
            GroupBy::Platform => "by platform".to_string(),
            GroupBy::Campaign => format!("by campaign (top {})", series.len()),
        };

        let dates = series.iter().flat_map(|s| s.points.iter().map(|p| p.date));
        let (Some(start), Some(end)) = (dates.clone().min(), dates.max()) else {
            return Err(no_data(&format!("Daily metrics {scope}")));
        };
        let span = (end - start).num_days().max(1) as i32;

        let root = SVGBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let panels = root.split_evenly((DAILY_PANELS.len(), 1));
        for (area, (metric, value)) in panels.iter().zip(DAILY_PANELS) {
            draw_daily_panel(
                area,
                &format!("Daily {} {scope}", metric.to_lowercase()),
                metric,
                series,
                (start, span),
                value,
            )?;
        }

        root.present().map_err(|e| write_err(path, e))
    }

    fn draw_platform_mix(&self, path: &Path, mix: &[PlatformMix]) -> CampaignResult<()> {
        let mix = &mix[..mix.len().min(self.top_n)];
        let title = format!("Campaign revenue by platform (top {})", mix.len());
        if mix.is_empty() {
            return Err(no_data(&title));
        }

        let platforms: BTreeSet<&str> = mix
            .iter()
            .flat_map(|m| m.revenue_by_platform.iter().map(|(p, _)| p.as_str()))
            .collect();
        let (_, high) = value_range(mix.iter().map(|m| m.total_revenue));
        let labels: Vec<(String, f64)> = mix
            .iter()
            .map(|m| (m.campaign.clone(), m.total_revenue))
            .collect();

        let root = SVGBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&title, CAPTION_FONT)
            .margin(20)
            .x_label_area_size(160)
            .y_label_area_size(90)
            .build_cartesian_2d((0..mix.len()).into_segmented(), 0f64..high)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(mix.len())
            .x_label_formatter(&|v| segment_label(v, &labels))
            .x_label_style(
                ("sans-serif", 12)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .y_desc("Revenue")
            .draw()
            .map_err(render_err)?;

        for (j, platform) in platforms.iter().enumerate() {
            let color = Palette99::pick(j).to_rgba();
            let segments: Vec<_> = mix
                .iter()
                .enumerate()
                .filter_map(|(i, m)| {
                    let value = m
                        .revenue_by_platform
                        .iter()
                        .find(|(p, _)| p.as_str() == *platform)
                        .map(|(_, v)| *v)?;
                    // Platforms are stacked in name order.
                    let base: f64 = m
                        .revenue_by_platform
                        .iter()
                        .filter(|(p, _)| p.as_str() < *platform)
                        .map(|(_, v)| *v)
                        .sum();
                    let mut bar = Rectangle::new(
                        [
                            (SegmentValue::Exact(i), base),
                            (SegmentValue::Exact(i + 1), base + value),
                        ],
                        color.filled(),
                    );
                    bar.set_margin(0, 0, 6, 6);
                    Some(bar)
                })
                .collect();

            chart
                .draw_series(segments)
                .map_err(render_err)?
                .label(platform.to_string())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(render_err)?;

        root.present().map_err(|e| write_err(path, e))
    }
}

type DailyMetric = fn(&DailyPoint) -> f64;

const DAILY_PANELS: [(&str, DailyMetric); 3] = [
    ("Revenue", |p| p.revenue),
    ("Click-through rate", |p| p.ctr),
    ("Conversion rate", |p| p.conversion_rate),
];

fn draw_daily_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    caption: &str,
    y_desc: &str,
    series: &[DailySeries],
    (start, span): (NaiveDate, i32),
    value: DailyMetric,
) -> CampaignResult<()> {
    let (_, high) = value_range(series.iter().flat_map(|s| s.points.iter().map(value)));

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .margin(12)
        .x_label_area_size(36)
        .y_label_area_size(90)
        .build_cartesian_2d(0i32..span, 0f64..high)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_labels((span as usize + 1).min(12))
        .x_label_formatter(&|day| {
            (start + Duration::days(i64::from(*day)))
                .format("%Y-%m-%d")
                .to_string()
        })
        .y_desc(y_desc)
        .draw()
        .map_err(render_err)?;

    for (i, s) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(
                s.points
                    .iter()
                    .map(|p| ((p.date - start).num_days() as i32, value(p))),
                color.stroke_width(2),
            ))
            .map_err(render_err)?
            .label(s.key.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(render_err)?;
    Ok(())
}

fn segment_label(value: &SegmentValue<usize>, labels: &[(String, f64)]) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels
            .get(*i)
            .map(|(key, _)| key.clone())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Axis range covering every value and zero, padded by 10%.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let spread = if max - min > 0.0 { max - min } else { 1.0 };
    let low = if min < 0.0 { min - spread * 0.1 } else { 0.0 };
    (low, max + spread * 0.1)
}

fn no_data(title: &str) -> CampaignError {
    CampaignError::Render(format!("{title}: no data points to plot"))
}

fn render_err(err: impl std::fmt::Display) -> CampaignError {
    CampaignError::Render(err.to_string())
}

fn write_err(path: &Path, err: impl std::fmt::Display) -> CampaignError {
    CampaignError::Write {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
