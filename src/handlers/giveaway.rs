use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::{GiveawayService, WinnerService};

#[utoipa::path(
    get,
    path = "/giveaways",
    tag = "giveaway",
    params(
        ("status" = Option<String>, Query, description = "状态过滤 (active/paused/completed)"),
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    responses(
        (status = 200, description = "获取活动列表成功", body = Vec<GiveawayResponse>)
    )
)]
pub async fn list_giveaways(
    giveaway_service: web::Data<GiveawayService>,
    query: web::Query<GiveawayQuery>,
) -> Result<HttpResponse> {
    match giveaway_service.list(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/giveaways/{id}",
    tag = "giveaway",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    responses(
        (status = 200, description = "获取活动成功", body = GiveawayResponse),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_giveaway(
    giveaway_service: web::Data<GiveawayService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match giveaway_service.get_detail(path.into_inner()).await {
        Ok(giveaway) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": giveaway
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/giveaways/{id}/photos/{photo_id}",
    tag = "giveaway",
    params(
        ("id" = i64, Path, description = "活动ID"),
        ("photo_id" = i64, Path, description = "图片ID")
    ),
    responses(
        (status = 200, description = "获取图片成功（base64）"),
        (status = 404, description = "图片不存在")
    )
)]
pub async fn get_photo(
    giveaway_service: web::Data<GiveawayService>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (id, photo_id) = path.into_inner();
    match giveaway_service.get_photo(id, photo_id).await {
        Ok(photo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": {
                "id": photo.id,
                "mimetype": photo.mimetype,
                "data": photo.data
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/giveaways/{id}/winners",
    tag = "giveaway",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    responses(
        (status = 200, description = "获取活动中奖者成功", body = Vec<WinnerResponse>)
    )
)]
pub async fn get_giveaway_winners(
    winner_service: web::Data<WinnerService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match winner_service.list_for_giveaway(path.into_inner()).await {
        Ok(winners) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": winners
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn giveaway_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/giveaways")
            .route("", web::get().to(list_giveaways))
            .route("/{id}", web::get().to(get_giveaway))
            .route("/{id}/photos/{photo_id}", web::get().to(get_photo))
            .route("/{id}/winners", web::get().to(get_giveaway_winners)),
    );
}
