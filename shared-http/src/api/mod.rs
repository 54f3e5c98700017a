mod models;
mod requests;
mod responses;

pub use models::*;
pub use requests::*;
pub use responses::*;
