//! Client data layer for the BuzzConnect scheduler: cached resource stores,
//! optimistic mutations and the dashboard aggregator, all written against the
//! [`Backend`](ports::Backend) port so any transport can be plugged in.

pub mod cache_keys;
pub mod dashboard;
pub mod notifications;
pub mod planner;
pub mod ports;
pub mod query;
pub mod resources;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache_keys::{CacheKey, SharedCache, new_cache};
pub use dashboard::{DashboardAggregator, DashboardSource, DashboardViewModel, SourceOutcome};
pub use ports::{Backend, SessionRepository};
pub use query::{QueryClient, RequestGuard, ResourceState};
