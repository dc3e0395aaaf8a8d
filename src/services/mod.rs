pub mod code_service;
pub mod identity_service;
pub mod redemption_service;
pub mod savings_service;

pub use code_service::*;
pub use identity_service::*;
pub use redemption_service::*;
pub use savings_service::*;
