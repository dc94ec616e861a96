use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::participation_entity as participations;

/// 参与请求；不带 giveaway_id 表示通用参与
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ParticipateRequest {
    pub giveaway_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipationResponse {
    pub id: i64,
    pub giveaway_id: Option<i64>,
    pub participated_at: DateTime<Utc>,
}

impl From<participations::Model> for ParticipationResponse {
    fn from(m: participations::Model) -> Self {
        ParticipationResponse {
            id: m.id,
            giveaway_id: m.giveaway_id,
            participated_at: m.participated_at,
        }
    }
}

/// 参与成功的返回：记录 + 活动当前人数
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipateResponse {
    pub participation: ParticipationResponse,
    /// 通用参与或计数刷新失败时为空
    pub participant_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ParticipationQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
