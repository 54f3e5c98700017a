//! Typed resource stores. Each store mirrors one backend resource, serves
//! reads through the shared [`QueryClient`](crate::query::QueryClient) and
//! patches its local copy after successful mutations.

pub mod analytics;
pub mod assistant;
pub mod instagram;
pub mod media;
pub mod platforms;
pub mod posts;
pub mod scheduler;
pub mod user;

pub use analytics::AnalyticsResource;
pub use assistant::ContentAssistant;
pub use instagram::InstagramResource;
pub use media::MediaStore;
pub use platforms::{ConnectedPlatforms, PlatformConfig, PlatformStatus};
pub use posts::PostStore;
pub use scheduler::SchedulerResource;
pub use user::UserResource;
