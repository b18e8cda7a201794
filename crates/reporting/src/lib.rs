//! Campaign reporting: SVG charts for aggregated results and the
//! structured run report.

pub mod charts;
pub mod report;

pub use charts::ChartCreator;
pub use report::{RunReport, TopCampaign};
