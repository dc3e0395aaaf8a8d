use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, web};
use serde_json::json;

const WIDGET_JS: &str = include_str!("../../public/widget.js");
const REDEEM_HTML: &str = include_str!("../../public/redeem.html");

pub async fn widget_js() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/javascript; charset=utf-8")
        .body(WIDGET_JS)
}

/// 员工核销页；不内嵌核销口令，由员工在页面上输入并保存在 localStorage
pub async fn redeem_page() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(REDEEM_HTML)
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "NOT_FOUND" }))
}

pub fn assets_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/public/widget.js", web::get().to(widget_js))
        .route("/public/redeem.html", web::get().to(redeem_page))
        .route("/redeem", web::get().to(redeem_page))
        .route("/health", web::get().to(health));
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_staff_page_does_not_embed_a_secret() {
        let page = super::REDEEM_HTML;
        assert!(page.contains("localStorage"));
        assert!(!page.contains("STAFF_REDEEM_TOKEN"));
    }
}
