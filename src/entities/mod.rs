pub mod codes;
pub mod redemptions;
pub mod users;

pub use codes as code_entity;
pub use codes::DisplayPolicy;
pub use redemptions as redemption_entity;
pub use redemptions::DiscountType;
pub use users as user_entity;
