use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::external::NotificationDispatcher;
use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::{DedupService, GiveawayService, ParticipationService, WinnerService};
use crate::tasks::LifecycleScheduler;

macro_rules! admin_guard {
    ($req:expr) => {
        if let Err(e) = require_admin(&$req) {
            return Ok(e.error_response());
        }
    };
}

#[utoipa::path(
    post,
    path = "/admin/giveaways",
    tag = "admin",
    request_body = CreateGiveawayRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建活动成功", body = GiveawayResponse),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "无权限")
    )
)]
pub async fn create_giveaway(
    giveaway_service: web::Data<GiveawayService>,
    req: HttpRequest,
    request: web::Json<CreateGiveawayRequest>,
) -> Result<HttpResponse> {
    admin_guard!(req);

    match giveaway_service.create(request.into_inner()).await {
        Ok(giveaway) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": GiveawayResponse::from(giveaway)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/giveaways/{id}",
    tag = "admin",
    request_body = UpdateGiveawayRequest,
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新活动成功", body = GiveawayResponse),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn update_giveaway(
    giveaway_service: web::Data<GiveawayService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateGiveawayRequest>,
) -> Result<HttpResponse> {
    admin_guard!(req);

    match giveaway_service
        .update(path.into_inner(), request.into_inner())
        .await
    {
        Ok(giveaway) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": GiveawayResponse::from(giveaway)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/giveaways/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除活动成功", body = CascadeReport),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn delete_giveaway(
    giveaway_service: web::Data<GiveawayService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    admin_guard!(req);

    match giveaway_service.delete(path.into_inner()).await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report,
            "message": "活动已删除"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/giveaways/{id}/photos",
    tag = "admin",
    request_body = UploadPhotoRequest,
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "上传图片成功", body = PhotoResponse),
        (status = 400, description = "图片格式不支持")
    )
)]
pub async fn upload_photo(
    giveaway_service: web::Data<GiveawayService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UploadPhotoRequest>,
) -> Result<HttpResponse> {
    admin_guard!(req);

    match giveaway_service
        .add_photo(path.into_inner(), request.into_inner())
        .await
    {
        Ok(photo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": photo
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/giveaways/{id}/participations",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID"),
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取参与名单成功", body = Vec<ParticipationResponse>)
    )
)]
pub async fn list_participations(
    participation_service: web::Data<ParticipationService>,
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<ParticipationQuery>,
) -> Result<HttpResponse> {
    admin_guard!(req);

    match participation_service
        .list_for_giveaway(path.into_inner(), &query)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/giveaways/{id}/draw",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "抽奖成功", body = DrawResponse),
        (status = 400, description = "没有参与者"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn draw_winner(
    giveaway_service: web::Data<GiveawayService>,
    winner_service: web::Data<WinnerService>,
    notifier: web::Data<NotificationDispatcher>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    admin_guard!(req);
    let id = path.into_inner();

    let outcome = match winner_service.draw(id).await {
        Ok(outcome) => outcome,
        Err(e) => return Ok(e.error_response()),
    };
    match giveaway_service.refresh_counters(id).await {
        Ok(giveaway) => notifier.completed(&giveaway, &outcome.winners),
        Err(e) => log::warn!("Failed to refresh counters of giveaway {id}: {e}"),
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": DrawResponse::from(outcome)
    })))
}

#[utoipa::path(
    post,
    path = "/admin/scheduler/tick",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "手动执行一次过期扫描", body = TickReport)
    )
)]
pub async fn run_scheduler_tick(
    scheduler: web::Data<LifecycleScheduler>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_guard!(req);

    match scheduler.run_tick().await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/maintenance/dedup",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "参与记录去重完成", body = DedupReport)
    )
)]
pub async fn dedup_participations(
    dedup_service: web::Data<DedupService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_guard!(req);

    match dedup_service.run().await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report,
            "message": "去重完成"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/giveaways", web::post().to(create_giveaway))
            .route("/giveaways/{id}", web::put().to(update_giveaway))
            .route("/giveaways/{id}", web::delete().to(delete_giveaway))
            .route("/giveaways/{id}/photos", web::post().to(upload_photo))
            .route(
                "/giveaways/{id}/participations",
                web::get().to(list_participations),
            )
            .route("/giveaways/{id}/draw", web::post().to(draw_winner))
            .route("/scheduler/tick", web::post().to(run_scheduler_tick))
            .route("/maintenance/dedup", web::post().to(dedup_participations)),
    );
}
