//! HTTP implementation of the [`buzz::Backend`] port.

mod backend;
mod client;
mod errors;

pub use client::{ApiClient, build_url};
pub use errors::normalize_error;
