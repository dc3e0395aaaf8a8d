use actix_web::{App, HttpServer, middleware::Logger, middleware::from_fn, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use perk_codes::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{create_cors, preflight_no_content},
    services::*,
    swagger::swagger_config,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    if config.perks.staff_redeem_token.is_empty() {
        log::warn!("STAFF_REDEEM_TOKEN is empty; every redemption will be refused");
    }

    // 创建服务
    let identity = build_identity_verifier(&config.identity);
    let code_service = CodeService::new(pool.clone(), identity);
    let savings: Arc<dyn SavingsAggregator> = Arc::new(DbSavingsAggregator::new(pool.clone()));
    let redemption_service = RedemptionService::new(
        pool.clone(),
        code_service.clone(),
        savings,
        config.perks.clone(),
    );

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let allowed_origin = config.perks.allowed_origin.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors(&allowed_origin))
            .wrap(from_fn(preflight_no_content))
            .app_data(web::Data::new(code_service.clone()))
            .app_data(web::Data::new(redemption_service.clone()))
            .configure(swagger_config)
            .configure(handlers::app_config)
            .default_service(web::to(handlers::not_found))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
