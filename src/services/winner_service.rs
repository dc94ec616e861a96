use crate::entities::{
    giveaway_entity as giveaways, participation_entity as participations, user_entity as users,
    winner_entity as winners,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    DrawOutcome, PaginatedResponse, PaginationParams, WinnerQuery, WinnerResponse,
};
use crate::services::giveaway_service::count_subquery;
use crate::utils::WinnerPicker;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;

/// 开奖引擎
#[derive(Clone)]
pub struct WinnerService {
    pool: DatabaseConnection,
    picker: Arc<dyn WinnerPicker>,
}

impl WinnerService {
    pub fn new(pool: DatabaseConnection, picker: Arc<dyn WinnerPicker>) -> Self {
        Self { pool, picker }
    }

    /// 从活动当前参与者中均匀抽取一名中奖者
    ///
    /// 逻辑:
    /// 1. 按 (participated_at, id) 读取完整参与池
    /// 2. 在 [0, len) 上均匀取下标
    /// 3. 写入中奖快照（用户名、Discord ID、活动名）
    /// 4. 从中奖表重新统计 winner_count 写回活动
    ///
    /// 参与记录不会因开奖删除，多次调用各自独立地从同一池中抽取，
    /// 同一人可以在不同调用中重复中奖。
    pub async fn draw(&self, giveaway_id: i64) -> AppResult<DrawOutcome> {
        let giveaway = giveaways::Entity::find_by_id(giveaway_id)
            .one(&self.pool)
            .await?
            .ok_or(AppError::GiveawayNotFound(giveaway_id))?;

        let pool = participations::Entity::find()
            .filter(participations::Column::GiveawayId.eq(giveaway_id))
            .order_by_asc(participations::Column::ParticipatedAt)
            .order_by_asc(participations::Column::Id)
            .all(&self.pool)
            .await?;
        if pool.is_empty() {
            return Err(AppError::NoParticipants(giveaway_id));
        }

        let index = self.picker.pick(pool.len());
        let chosen = pool.get(index).ok_or_else(|| {
            AppError::InternalError(format!("Picked index {index} out of {}", pool.len()))
        })?;

        let user = users::Entity::find_by_id(chosen.user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", chosen.user_id)))?;

        let winner = winners::ActiveModel {
            giveaway_id: Set(giveaway.id),
            giveaway_name: Set(giveaway.name.clone()),
            user_id: Set(Some(user.id)),
            discord_id: Set(user.discord_id.clone()),
            name: Set(user.username.clone()),
            won_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        let all = self.winners_of(giveaway_id).await?;
        giveaways::Entity::update_many()
            .col_expr(
                giveaways::Column::WinnerCount,
                count_subquery(winners::Entity, winners::Column::GiveawayId, giveaway_id),
            )
            .col_expr(giveaways::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(giveaways::Column::Id.eq(giveaway_id))
            .exec(&self.pool)
            .await?;

        log::info!(
            "Giveaway {giveaway_id}: drew {} ({}) from {} participants",
            winner.name,
            winner.discord_id,
            pool.len()
        );
        Ok(DrawOutcome {
            winner,
            winners: all,
        })
    }

    async fn winners_of(&self, giveaway_id: i64) -> AppResult<Vec<winners::Model>> {
        Ok(winners::Entity::find()
            .filter(winners::Column::GiveawayId.eq(giveaway_id))
            .order_by_asc(winners::Column::WonAt)
            .order_by_asc(winners::Column::Id)
            .all(&self.pool)
            .await?)
    }

    /// 某活动的全部中奖记录（活动被清理后仍可查询）
    pub async fn list_for_giveaway(&self, giveaway_id: i64) -> AppResult<Vec<WinnerResponse>> {
        Ok(self
            .winners_of(giveaway_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// 中奖历史（最新在前）
    pub async fn list_recent(
        &self,
        query: &WinnerQuery,
    ) -> AppResult<PaginatedResponse<WinnerResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let total = winners::Entity::find().count(&self.pool).await?;
        let items = winners::Entity::find()
            .order_by_desc(winners::Column::WonAt)
            .order_by_desc(winners::Column::Id)
            .limit(params.limit())
            .offset(params.offset())
            .all(&self.pool)
            .await?;
        Ok(PaginatedResponse::new(
            items.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }
}
