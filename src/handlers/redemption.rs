use crate::error::AppError;
use crate::middlewares::BearerToken;
use crate::models::*;
use crate::services::RedemptionService;
use actix_web::{HttpResponse, Result, web};

#[utoipa::path(
    post,
    path = "/api/redeem",
    tag = "redemption",
    request_body = RedeemRequest,
    security(
        ("staff_token" = [])
    ),
    responses(
        (status = 200, description = "核销成功", body = RedeemResponse),
        (status = 400, description = "missing_fields / bad_discount_type / invalid_body"),
        (status = 401, description = "unauthorized"),
        (status = 403, description = "inactive"),
        (status = 404, description = "not_found"),
        (status = 409, description = "wrong_month / already_redeemed / duplicate_redemption")
    )
)]
pub async fn redeem(
    redemption_service: web::Data<RedemptionService>,
    bearer: BearerToken,
    body: web::Bytes,
) -> Result<HttpResponse> {
    // 先校验员工凭证再解析请求体，空请求体按 {} 处理
    match redemption_service
        .redeem_body(&body, bearer.as_deref())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.redemption_response()),
    }
}

async fn method_not_allowed() -> HttpResponse {
    AppError::MethodNotAllowed.redemption_response()
}

pub fn redemption_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/redeem")
            .route(web::post().to(redeem))
            .default_service(web::to(method_not_allowed)),
    );
}
