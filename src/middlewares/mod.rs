pub mod auth;
pub mod cors;

pub use auth::BearerToken;
pub use cors::{create_cors, preflight_no_content};
