pub mod assets;
pub mod codes;
pub mod redemption;

use actix_web::web;

pub use assets::{assets_config, not_found};
pub use codes::codes_config;
pub use redemption::redemption_config;

/// All public routes: static assets plus the `/api` scope.
pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.configure(assets_config).service(
        web::scope("/api")
            .configure(codes_config)
            .configure(redemption_config),
    );
}
