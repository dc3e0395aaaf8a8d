pub mod code;
pub mod redemption;

pub use code::*;
pub use redemption::*;
