use crate::entities::{
    GiveawayStatus, giveaway_entity as giveaways, participation_entity as participations,
    photo_entity as photos, winner_entity as winners,
};
use crate::error::{AppError, AppResult};
use crate::external::NotificationDispatcher;
use crate::models::{
    CascadeReport, CreateGiveawayRequest, GiveawayQuery, GiveawayResponse, PaginatedResponse,
    PaginationParams, PhotoResponse, UpdateGiveawayRequest, UploadPhotoRequest,
};
use crate::utils::compute_end_date;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

const MAX_PHOTO_BYTES: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct GiveawayService {
    pool: DatabaseConnection,
    notifier: NotificationDispatcher,
}

impl GiveawayService {
    pub fn new(pool: DatabaseConnection, notifier: NotificationDispatcher) -> Self {
        Self { pool, notifier }
    }

    /// 创建活动
    ///
    /// end_date = start_date + duration_days + duration_hours，
    /// 时长为 0 时活动创建即过期，由调度器下一次 tick 处理。
    pub async fn create(&self, req: CreateGiveawayRequest) -> AppResult<giveaways::Model> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("Name is required".into()));
        }
        let now = Utc::now();
        let start_date = req.start_date.unwrap_or(now);
        let end_date = compute_end_date(start_date, req.duration_days, req.duration_hours)?;

        let created = giveaways::ActiveModel {
            name: Set(name.to_string()),
            description: Set(req.description),
            status: Set(GiveawayStatus::Active),
            start_date: Set(start_date),
            end_date: Set(end_date),
            duration_days: Set(req.duration_days),
            duration_hours: Set(req.duration_hours),
            participant_count: Set(0),
            winner_count: Set(0),
            milestone_notified: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Giveaway {} created, ends at {}",
            created.id,
            created.end_date
        );
        self.notifier.created(&created);
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> AppResult<giveaways::Model> {
        giveaways::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or(AppError::GiveawayNotFound(id))
    }

    /// 活动详情（附带图片顺序）
    pub async fn get_detail(&self, id: i64) -> AppResult<GiveawayResponse> {
        let giveaway = self.get(id).await?;
        let photo_ids = self.photo_ids(id).await?;
        Ok(GiveawayResponse::with_photos(giveaway, photo_ids))
    }

    /// 分页列出活动（最新在前），可按状态过滤
    pub async fn list(&self, query: &GiveawayQuery) -> AppResult<PaginatedResponse<GiveawayResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base = giveaways::Entity::find();
        if let Some(status) = query.status {
            base = base.filter(giveaways::Column::Status.eq(status));
        }

        let total = base.clone().count(&self.pool).await?;
        let items = base
            .order_by_desc(giveaways::Column::CreatedAt)
            .order_by_desc(giveaways::Column::Id)
            .limit(params.limit())
            .offset(params.offset())
            .all(&self.pool)
            .await?;

        let mut data = Vec::with_capacity(items.len());
        for item in items {
            let photo_ids = self.photo_ids(item.id).await?;
            data.push(GiveawayResponse::with_photos(item, photo_ids));
        }
        Ok(PaginatedResponse::new(data, params, total))
    }

    /// 更新活动
    /// - 修改开始时间或时长时重新计算 end_date
    /// - status 只能在 active / paused 之间切换
    pub async fn update(&self, id: i64, req: UpdateGiveawayRequest) -> AppResult<giveaways::Model> {
        let current = self.get(id).await?;
        if current.status == GiveawayStatus::Completed {
            return Err(AppError::ValidationError(
                "Completed giveaways cannot be edited".into(),
            ));
        }
        if req.status == Some(GiveawayStatus::Completed) {
            return Err(AppError::ValidationError(
                "Status can only be set to active or paused".into(),
            ));
        }

        let start_date = req.start_date.unwrap_or(current.start_date);
        let duration_days = req.duration_days.unwrap_or(current.duration_days);
        let duration_hours = req.duration_hours.unwrap_or(current.duration_hours);
        let reschedule =
            req.start_date.is_some() || req.duration_days.is_some() || req.duration_hours.is_some();

        let mut am = current.into_active_model();
        if let Some(name) = req.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::ValidationError("Name is required".into()));
            }
            am.name = Set(name);
        }
        if let Some(description) = req.description {
            am.description = Set(description);
        }
        if let Some(status) = req.status {
            am.status = Set(status);
        }
        if reschedule {
            am.start_date = Set(start_date);
            am.duration_days = Set(duration_days);
            am.duration_hours = Set(duration_hours);
            am.end_date = Set(compute_end_date(start_date, duration_days, duration_hours)?);
        }
        am.updated_at = Set(Utc::now());

        Ok(am.update(&self.pool).await?)
    }

    /// 管理员删除活动：级联删除图片与参与记录，保留中奖记录
    pub async fn delete(&self, id: i64) -> AppResult<CascadeReport> {
        let giveaway = self.get(id).await?;
        let report = self.purge(id).await?;
        self.notifier.closed(&giveaway);
        Ok(report)
    }

    /// 上传图片，追加到图片列表末尾
    pub async fn add_photo(&self, id: i64, req: UploadPhotoRequest) -> AppResult<PhotoResponse> {
        self.get(id).await?;
        if !req.mimetype.starts_with("image/") {
            return Err(AppError::ValidationError("Only images are accepted".into()));
        }
        if req.data.is_empty() || req.data.len() > MAX_PHOTO_BYTES {
            return Err(AppError::ValidationError("Invalid photo payload".into()));
        }

        let position = photos::Entity::find()
            .filter(photos::Column::GiveawayId.eq(id))
            .count(&self.pool)
            .await? as i32;

        let photo = photos::ActiveModel {
            giveaway_id: Set(id),
            position: Set(position),
            mimetype: Set(req.mimetype),
            data: Set(req.data),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;
        Ok(photo.into())
    }

    pub async fn get_photo(&self, id: i64, photo_id: i64) -> AppResult<photos::Model> {
        photos::Entity::find_by_id(photo_id)
            .filter(photos::Column::GiveawayId.eq(id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Photo not found".to_string()))
    }

    async fn photo_ids(&self, id: i64) -> AppResult<Vec<i64>> {
        let ids = photos::Entity::find()
            .select_only()
            .column(photos::Column::Id)
            .filter(photos::Column::GiveawayId.eq(id))
            .order_by_asc(photos::Column::Position)
            .order_by_asc(photos::Column::Id)
            .into_tuple::<i64>()
            .all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// 已过截止时间且未完成的活动（按截止时间先后）
    pub async fn find_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<giveaways::Model>> {
        Ok(giveaways::Entity::find()
            .filter(giveaways::Column::EndDate.lte(now))
            .filter(giveaways::Column::Status.ne(GiveawayStatus::Completed))
            .order_by_asc(giveaways::Column::EndDate)
            .order_by_asc(giveaways::Column::Id)
            .all(&self.pool)
            .await?)
    }

    /// 已标记 completed 但尚未清理的活动
    pub async fn find_completed(&self) -> AppResult<Vec<giveaways::Model>> {
        Ok(giveaways::Entity::find()
            .filter(giveaways::Column::Status.eq(GiveawayStatus::Completed))
            .order_by_asc(giveaways::Column::Id)
            .all(&self.pool)
            .await?)
    }

    /// 条件更新为 completed；返回 false 表示已被其它流程完成
    pub async fn mark_completed(&self, id: i64) -> AppResult<bool> {
        let result = giveaways::Entity::update_many()
            .col_expr(
                giveaways::Column::Status,
                Expr::value(GiveawayStatus::Completed),
            )
            .col_expr(giveaways::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(giveaways::Column::Id.eq(id))
            .filter(giveaways::Column::Status.ne(GiveawayStatus::Completed))
            .exec(&self.pool)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// 级联删除：图片 -> 参与记录 -> 活动本身；中奖记录不在范围内
    pub async fn purge(&self, id: i64) -> AppResult<CascadeReport> {
        let txn = self.pool.begin().await?;

        let photos_deleted = photos::Entity::delete_many()
            .filter(photos::Column::GiveawayId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        let participations_deleted = participations::Entity::delete_many()
            .filter(participations::Column::GiveawayId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        let giveaways_deleted = giveaways::Entity::delete_by_id(id)
            .exec(&txn)
            .await?
            .rows_affected;

        txn.commit().await?;

        log::info!(
            "Purged giveaway {id}: {photos_deleted} photos, {participations_deleted} participations"
        );
        Ok(CascadeReport {
            giveaways: giveaways_deleted,
            photos: photos_deleted,
            participations: participations_deleted,
        })
    }

    pub async fn participant_count(&self, id: i64) -> AppResult<i64> {
        count_participants(&self.pool, id).await
    }

    /// 从权威集合重新计算两个冗余计数
    pub async fn refresh_counters(&self, id: i64) -> AppResult<giveaways::Model> {
        self.get(id).await?;
        sync_participant_count(&self.pool, id).await?;

        giveaways::Entity::update_many()
            .col_expr(
                giveaways::Column::WinnerCount,
                count_subquery(winners::Entity, winners::Column::GiveawayId, id),
            )
            .col_expr(giveaways::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(giveaways::Column::Id.eq(id))
            .exec(&self.pool)
            .await?;

        self.get(id).await
    }
}

/// `(SELECT COUNT(*) FROM <entity> WHERE <column> = id)`
pub(crate) fn count_subquery<E, C>(entity: E, column: C, id: i64) -> SimpleExpr
where
    E: EntityTrait,
    C: ColumnTrait,
{
    let query = Query::select()
        .expr(Expr::cust("COUNT(*)"))
        .from(entity)
        .and_where(column.eq(id))
        .to_owned();
    SimpleExpr::SubQuery(None, Box::new(query.into_sub_query_statement()))
}

/// 活动的真实参与人数
pub(crate) async fn count_participants<C: ConnectionTrait>(db: &C, id: i64) -> AppResult<i64> {
    Ok(participations::Entity::find()
        .filter(participations::Column::GiveawayId.eq(id))
        .count(db)
        .await? as i64)
}

/// 在同一条 UPDATE 中按参与表重算 participant_count，返回写入后的值
///
/// 并发参与时不会出现“先读后写”覆盖成较小值的情况。
pub(crate) async fn sync_participant_count<C: ConnectionTrait>(db: &C, id: i64) -> AppResult<i64> {
    giveaways::Entity::update_many()
        .col_expr(
            giveaways::Column::ParticipantCount,
            count_subquery(participations::Entity, participations::Column::GiveawayId, id),
        )
        .col_expr(giveaways::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(giveaways::Column::Id.eq(id))
        .exec(db)
        .await?;

    giveaways::Entity::find_by_id(id)
        .select_only()
        .column(giveaways::Column::ParticipantCount)
        .into_tuple::<i64>()
        .one(db)
        .await?
        .ok_or(AppError::GiveawayNotFound(id))
}
