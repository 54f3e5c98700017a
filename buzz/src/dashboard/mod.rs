//! Dashboard aggregation: one view-model assembled from six independent
//! sub-fetches, cached as a whole.

mod aggregator;
mod view_model;

pub use aggregator::DashboardAggregator;
pub use view_model::{DashboardSource, DashboardViewModel, SettledFetches, SourceOutcome};
