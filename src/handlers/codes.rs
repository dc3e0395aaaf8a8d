use crate::error::AppError;
use crate::middlewares::BearerToken;
use crate::models::*;
use crate::services::CodeService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/api/my-codes",
    tag = "codes",
    params(MyCodesQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "当月可用的福利码（会员过期时为空列表并附 reason）", body = MyCodesResponse),
        (status = 400, description = "missing_email"),
        (status = 401, description = "missing_token / invalid_token"),
        (status = 403, description = "unknown_member")
    )
)]
pub async fn my_codes(
    code_service: web::Data<CodeService>,
    query: web::Query<MyCodesQuery>,
    bearer: BearerToken,
) -> Result<HttpResponse> {
    match code_service
        .list_my_codes(query.email.as_deref(), bearer.as_deref())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/validate",
    tag = "codes",
    params(ValidateQuery),
    responses(
        (status = 200, description = "码可用", body = ValidateResponse),
        (status = 400, description = "missing_code"),
        (status = 403, description = "inactive"),
        (status = 404, description = "not_found"),
        (status = 409, description = "wrong_month / already_redeemed")
    )
)]
pub async fn validate(
    code_service: web::Data<CodeService>,
    query: web::Query<ValidateQuery>,
) -> Result<HttpResponse> {
    match code_service.validate(query.code.as_deref()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        // 缺少参数走通用错误格式，其余走 {valid:false, reason}
        Err(e @ AppError::MissingCode) => Ok(e.error_response()),
        Err(e) => Ok(e.validation_response()),
    }
}

pub fn codes_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/my-codes", web::get().to(my_codes))
        .route("/validate", web::get().to(validate));
}
