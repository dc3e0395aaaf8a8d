pub mod hosted_auth;

pub use hosted_auth::*;
