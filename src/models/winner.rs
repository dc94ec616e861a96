use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::winner_entity as winners;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WinnerResponse {
    pub id: i64,
    pub giveaway_id: i64,
    pub giveaway_name: String,
    pub discord_id: String,
    pub name: String,
    pub won_at: DateTime<Utc>,
}

impl From<winners::Model> for WinnerResponse {
    fn from(m: winners::Model) -> Self {
        WinnerResponse {
            id: m.id,
            giveaway_id: m.giveaway_id,
            giveaway_name: m.giveaway_name,
            discord_id: m.discord_id,
            name: m.name,
            won_at: m.won_at,
        }
    }
}

/// 一次抽取的结果：本次中奖者 + 该活动累计中奖者
#[derive(Debug, Clone)]
pub struct DrawOutcome {
    pub winner: winners::Model,
    pub winners: Vec<winners::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawResponse {
    pub winner: WinnerResponse,
    pub winners: Vec<WinnerResponse>,
}

impl From<DrawOutcome> for DrawResponse {
    fn from(o: DrawOutcome) -> Self {
        DrawResponse {
            winner: o.winner.into(),
            winners: o.winners.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct WinnerQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
