use actix_cors::Cors;
use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::{Method, StatusCode, header};
use actix_web::middleware::Next;
use actix_web::{Error, HttpResponse};

/// CORS for the embeddable widget and the staff page.
pub fn create_cors(allowed_origin: &str) -> Cors {
    let origin = allowed_origin.trim();
    let cors = if origin == "*" || origin.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        Cors::default().allowed_origin(origin)
    };
    cors.allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(3600)
}

/// OPTIONS 一律返回 204：预检成功时保留 CORS 头，其余情况返回空响应。
/// 被 CORS 拒绝的预检（4xx）原样透传。
pub async fn preflight_no_content(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<EitherBody<impl MessageBody>>, Error> {
    let is_options = req.method() == Method::OPTIONS;
    let mut res = next.call(req).await?;
    if !is_options {
        return Ok(res.map_into_left_body());
    }

    match res.status() {
        s if s.is_success() => {
            res.response_mut().head_mut().status = StatusCode::NO_CONTENT;
            Ok(res.map_into_left_body())
        }
        StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => {
            let (req, _) = res.into_parts();
            Ok(ServiceResponse::new(req, HttpResponse::NoContent().finish()).map_into_right_body())
        }
        _ => Ok(res.map_into_left_body()),
    }
}
