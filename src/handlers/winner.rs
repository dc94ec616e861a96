use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::models::*;
use crate::services::WinnerService;

#[utoipa::path(
    get,
    path = "/winners",
    tag = "winner",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    responses(
        (status = 200, description = "获取中奖历史成功", body = Vec<WinnerResponse>)
    )
)]
pub async fn list_winners(
    winner_service: web::Data<WinnerService>,
    query: web::Query<WinnerQuery>,
) -> Result<HttpResponse> {
    match winner_service.list_recent(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn winner_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/winners").route("", web::get().to(list_winners)));
}
