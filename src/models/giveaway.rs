use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{GiveawayStatus, giveaway_entity as giveaways, photo_entity as photos};

/// 创建活动请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateGiveawayRequest {
    #[schema(example = "Nitro Classic")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 开始时间 (默认当前时间)
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_days: i32,
    #[serde(default)]
    pub duration_hours: i32,
}

/// 更新活动请求（字段均可选）
///
/// status 只允许 active / paused，completed 由调度器设置
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateGiveawayRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<GiveawayStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub duration_days: Option<i32>,
    pub duration_hours: Option<i32>,
}

/// 活动列表查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct GiveawayQuery {
    pub status: Option<GiveawayStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GiveawayResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: GiveawayStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_days: i32,
    pub duration_hours: i32,
    pub participant_count: i64,
    pub winner_count: i64,
    /// 图片 ID（按顺序）
    pub photo_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl GiveawayResponse {
    pub fn with_photos(m: giveaways::Model, photo_ids: Vec<i64>) -> Self {
        GiveawayResponse {
            id: m.id,
            name: m.name,
            description: m.description,
            status: m.status,
            start_date: m.start_date,
            end_date: m.end_date,
            duration_days: m.duration_days,
            duration_hours: m.duration_hours,
            participant_count: m.participant_count,
            winner_count: m.winner_count,
            photo_ids,
            created_at: m.created_at,
        }
    }
}

impl From<giveaways::Model> for GiveawayResponse {
    fn from(m: giveaways::Model) -> Self {
        GiveawayResponse::with_photos(m, Vec::new())
    }
}

/// 上传图片请求（base64 编码）
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UploadPhotoRequest {
    #[schema(example = "image/png")]
    pub mimetype: String,
    /// base64 编码的图片内容
    pub data: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhotoResponse {
    pub id: i64,
    pub giveaway_id: i64,
    pub position: i32,
    pub mimetype: String,
}

impl From<photos::Model> for PhotoResponse {
    fn from(m: photos::Model) -> Self {
        PhotoResponse {
            id: m.id,
            giveaway_id: m.giveaway_id,
            position: m.position,
            mimetype: m.mimetype,
        }
    }
}

/// 级联删除统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CascadeReport {
    pub giveaways: u64,
    pub photos: u64,
    pub participations: u64,
}
