use actix_web::{App, HttpResponse, HttpServer, middleware::Logger, web};
use anyhow::Context;
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use giveaway_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::build_dispatcher,
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks::{self, LifecycleScheduler},
    utils::{JwtService, ThreadRngPicker, WinnerPicker},
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
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
    let config =
        Config::from_toml().map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database connection pool")?;

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    // 一次性维护：参与记录去重后退出
    if std::env::args().any(|arg| arg == "--dedup") {
        let report = DedupService::new(pool.clone()).run().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    // 创建JWT服务
    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    // 通知渠道
    let notifier = build_dispatcher(&config.notifications);
    let picker: Arc<dyn WinnerPicker> = Arc::new(ThreadRngPicker);

    // 创建服务
    let user_service = UserService::new(pool.clone());
    let auth_service = AuthService::new(jwt_service.clone(), user_service.clone());
    let giveaway_service = GiveawayService::new(pool.clone(), notifier.clone());
    let participation_service = ParticipationService::new(
        pool.clone(),
        notifier.clone(),
        config.participation.clone(),
    );
    let winner_service = WinnerService::new(pool.clone(), picker);
    let dedup_service = DedupService::new(pool.clone());

    // 启动过期活动调度器
    let scheduler = LifecycleScheduler::new(
        giveaway_service.clone(),
        winner_service.clone(),
        notifier.clone(),
        config.scheduler.clone(),
    );
    tasks::spawn_all(&scheduler, &config.scheduler);

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let cors_origins = config.server.cors_allowed_origins.clone();
    HttpServer::new({
        let scheduler = scheduler.clone();
        move || {
            App::new()
                .wrap(Logger::default())
                .wrap(AuthMiddleware::new(jwt_service.clone()))
                .wrap(create_cors(&cors_origins))
                .app_data(web::Data::new(auth_service.clone()))
                .app_data(web::Data::new(user_service.clone()))
                .app_data(web::Data::new(giveaway_service.clone()))
                .app_data(web::Data::new(participation_service.clone()))
                .app_data(web::Data::new(winner_service.clone()))
                .app_data(web::Data::new(dedup_service.clone()))
                .app_data(web::Data::new(notifier.clone()))
                .app_data(web::Data::new(scheduler.clone()))
                .configure(swagger_config)
                .route("/health", web::get().to(|| async { HttpResponse::Ok().body("ok") }))
                .service(
                    web::scope("/api/v1")
                        .configure(handlers::auth_config)
                        .configure(handlers::user_config)
                        .configure(handlers::giveaway_config)
                        .configure(handlers::participation_config)
                        .configure(handlers::winner_config)
                        .configure(handlers::admin_config),
                )
        }
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    scheduler.stop();
    Ok(())
}
