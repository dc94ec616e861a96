use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::current_identity;
use crate::models::*;
use crate::services::{ParticipationService, UserService};

#[utoipa::path(
    post,
    path = "/participations",
    tag = "participation",
    request_body = ParticipateRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "参与成功", body = ParticipateResponse),
        (status = 400, description = "活动已结束"),
        (status = 404, description = "活动不存在"),
        (status = 409, description = "已参与"),
        (status = 429, description = "参与过于频繁")
    )
)]
pub async fn participate(
    participation_service: web::Data<ParticipationService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<ParticipateRequest>,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };
    // 每次认证成功的请求都刷新一次用户资料
    if let Err(e) = user_service.upsert_identity(&identity).await {
        return Ok(e.error_response());
    }

    match participation_service
        .participate(&identity.discord_id, request.giveaway_id)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response,
            "message": "参与成功"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/participations/me",
    tag = "participation",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取参与记录成功", body = Vec<ParticipationResponse>),
        (status = 401, description = "未授权")
    )
)]
pub async fn my_participations(
    participation_service: web::Data<ParticipationService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    query: web::Query<ParticipationQuery>,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };
    let user = match user_service.get_by_discord_id(&identity.discord_id).await {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match participation_service.list_for_user(user.id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/participations/giveaways/{id}",
    tag = "participation",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "查询是否已参与"),
        (status = 401, description = "未授权")
    )
)]
pub async fn participation_status(
    participation_service: web::Data<ParticipationService>,
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };
    let giveaway_id = path.into_inner();

    // 尚未落库的用户自然没有参与记录
    let participated = match user_service.get_by_discord_id(&identity.discord_id).await {
        Ok(user) => participation_service.has_participated(user.id, giveaway_id).await,
        Err(crate::error::AppError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    };

    match participated {
        Ok(participated) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": {
                "giveaway_id": giveaway_id,
                "participated": participated
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn participation_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/participations")
            .route("", web::post().to(participate))
            .route("/me", web::get().to(my_participations))
            .route("/giveaways/{id}", web::get().to(participation_status)),
    );
}
