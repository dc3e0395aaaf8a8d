pub mod code_generator;
pub mod email;
pub mod jwt;
pub mod money;
pub mod period;

pub use code_generator::generate_benefit_code;
pub use email::normalize_email;
pub use jwt::*;
pub use money::{from_cents, to_cents};
pub use period::{month_key, month_start, today_utc};
