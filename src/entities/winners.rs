use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 中奖记录
/// 说明:
/// - 不可变的历史快照，活动清理时不删除
/// - giveaway_id 只是回指，不做外键约束
/// - 同一活动可有多条（多次抽取累积）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "winners")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub giveaway_id: i64,
    /// 活动名称快照
    pub giveaway_name: String,
    pub user_id: Option<i64>,
    pub discord_id: String,
    /// 中奖时的用户名快照
    pub name: String,
    pub won_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
