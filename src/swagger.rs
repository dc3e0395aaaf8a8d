use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::DisplayPolicy;
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            // 会员凭证
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
            // 员工核销口令，同样走 Bearer
            components.add_security_scheme(
                "staff_token",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::codes::my_codes,
        handlers::codes::validate,
        handlers::redemption::redeem,
    ),
    components(
        schemas(
            DisplayPolicy,
            MyCodesQuery,
            MemberCodeResponse,
            MyCodesResponse,
            ValidateQuery,
            ValidateResponse,
            RedeemRequest,
            RedeemResponse,
            SavingsSummary,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "codes", description = "Member perk codes API"),
        (name = "redemption", description = "Staff redemption API"),
    ),
    info(
        title = "Perk Codes API",
        version = "0.1.0",
        description = "Monthly member perk codes: listing, validation and staff redemption"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_all_endpoints() {
        let doc = ApiDoc::openapi();
        for path in ["/api/my-codes", "/api/validate", "/api/redeem"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
