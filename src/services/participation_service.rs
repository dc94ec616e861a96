use crate::config::ParticipationConfig;
use crate::entities::{
    GiveawayStatus, giveaway_entity as giveaways, participation_entity as participations,
    user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::external::NotificationDispatcher;
use crate::models::{
    PaginatedResponse, PaginationParams, ParticipateResponse, ParticipationQuery,
    ParticipationResponse,
};
use crate::services::giveaway_service::sync_participant_count;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

/// 参与守卫：决定一次参与是否被接受
#[derive(Clone)]
pub struct ParticipationService {
    pool: DatabaseConnection,
    notifier: NotificationDispatcher,
    settings: ParticipationConfig,
}

impl ParticipationService {
    pub fn new(
        pool: DatabaseConnection,
        notifier: NotificationDispatcher,
        settings: ParticipationConfig,
    ) -> Self {
        Self {
            pool,
            notifier,
            settings,
        }
    }

    pub async fn participate(
        &self,
        discord_id: &str,
        giveaway_id: Option<i64>,
    ) -> AppResult<ParticipateResponse> {
        self.participate_at(discord_id, giveaway_id, Utc::now()).await
    }

    /// 以给定时间点执行参与
    ///
    /// - 指定活动：活动必须存在且未过期；重复参与由唯一索引拒绝
    /// - 未指定活动：受防刷窗口限制
    pub async fn participate_at(
        &self,
        discord_id: &str,
        giveaway_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<ParticipateResponse> {
        let user = users::Entity::find()
            .filter(users::Column::DiscordId.eq(discord_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if !user.is_active {
            return Err(AppError::Forbidden);
        }

        match giveaway_id {
            Some(id) => self.enter_giveaway(&user, id, now).await,
            None => self.enter_general(&user, now).await,
        }
    }

    async fn enter_giveaway(
        &self,
        user: &users::Model,
        giveaway_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<ParticipateResponse> {
        let giveaway = giveaways::Entity::find_by_id(giveaway_id)
            .one(&self.pool)
            .await?
            .ok_or(AppError::GiveawayNotFound(giveaway_id))?;

        if giveaway.is_expired_at(now) || giveaway.status == GiveawayStatus::Completed {
            return Err(AppError::GiveawayExpired {
                end_date: giveaway.end_date,
            });
        }
        if giveaway.status == GiveawayStatus::Paused {
            return Err(AppError::ValidationError(
                "This giveaway is paused".to_string(),
            ));
        }

        // 不做先查后插：并发下由唯一索引决定谁成功
        let created = participations::ActiveModel {
            user_id: Set(user.id),
            giveaway_id: Set(Some(giveaway_id)),
            participated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(|e| {
            let err = AppError::from_participation_insert(e);
            if let AppError::DatabaseError(db_err) = &err {
                log::error!(
                    "Failed to insert participation user={} giveaway={giveaway_id}: {db_err}",
                    user.id
                );
            }
            err
        })?;

        // 参与记录已落库，计数与里程碑失败只记录日志
        let participant_count = match sync_participant_count(&self.pool, giveaway_id).await {
            Ok(count) => {
                if let Err(e) = self.check_milestone(&giveaway, count).await {
                    log::warn!("Milestone check failed for giveaway {giveaway_id}: {e}");
                }
                Some(count)
            }
            Err(e) => {
                log::warn!("Failed to refresh participant count of giveaway {giveaway_id}: {e}");
                None
            }
        };

        Ok(ParticipateResponse {
            participation: created.into(),
            participant_count,
        })
    }

    async fn enter_general(
        &self,
        user: &users::Model,
        now: DateTime<Utc>,
    ) -> AppResult<ParticipateResponse> {
        let last = participations::Entity::find()
            .filter(participations::Column::UserId.eq(user.id))
            .filter(participations::Column::GiveawayId.is_null())
            .order_by_desc(participations::Column::ParticipatedAt)
            .one(&self.pool)
            .await?;

        if let Some(last) = last {
            let retry_at = last.participated_at + self.settings.anti_spam_window();
            if now < retry_at {
                return Err(AppError::RateLimited { retry_at });
            }
        }

        let created = participations::ActiveModel {
            user_id: Set(user.id),
            giveaway_id: Set(None),
            participated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(ParticipateResponse {
            participation: created.into(),
            participant_count: None,
        })
    }

    /// 达到阈值时只通知一次：通过条件更新抢占 milestone_notified
    async fn check_milestone(&self, giveaway: &giveaways::Model, count: i64) -> AppResult<()> {
        let threshold = self.settings.milestone_threshold;
        if threshold <= 0 || count < threshold {
            return Ok(());
        }
        let claimed = giveaways::Entity::update_many()
            .col_expr(giveaways::Column::MilestoneNotified, Expr::value(true))
            .filter(giveaways::Column::Id.eq(giveaway.id))
            .filter(giveaways::Column::MilestoneNotified.eq(false))
            .exec(&self.pool)
            .await?
            .rows_affected
            == 1;
        if claimed {
            log::info!("Giveaway {} reached {count} participants", giveaway.id);
            let mut snapshot = giveaway.clone();
            snapshot.participant_count = count;
            snapshot.milestone_notified = true;
            self.notifier.milestone(&snapshot, count);
        }
        Ok(())
    }

    pub async fn has_participated(&self, user_id: i64, giveaway_id: i64) -> AppResult<bool> {
        let n = participations::Entity::find()
            .filter(participations::Column::UserId.eq(user_id))
            .filter(participations::Column::GiveawayId.eq(giveaway_id))
            .count(&self.pool)
            .await?;
        Ok(n > 0)
    }

    /// 用户的参与记录（最新在前）
    pub async fn list_for_user(
        &self,
        user_id: i64,
        query: &ParticipationQuery,
    ) -> AppResult<PaginatedResponse<ParticipationResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let base =
            participations::Entity::find().filter(participations::Column::UserId.eq(user_id));

        let total = base.clone().count(&self.pool).await?;
        let items = base
            .order_by_desc(participations::Column::ParticipatedAt)
            .order_by_desc(participations::Column::Id)
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

    /// 某活动的参与名单（按参与先后）
    pub async fn list_for_giveaway(
        &self,
        giveaway_id: i64,
        query: &ParticipationQuery,
    ) -> AppResult<PaginatedResponse<ParticipationResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let base = participations::Entity::find()
            .filter(participations::Column::GiveawayId.eq(giveaway_id));

        let total = base.clone().count(&self.pool).await?;
        let items = base
            .order_by_asc(participations::Column::ParticipatedAt)
            .order_by_asc(participations::Column::Id)
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
