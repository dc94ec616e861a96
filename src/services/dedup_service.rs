use crate::entities::participation_entity as participations;
use crate::error::AppResult;
use crate::models::{DedupReport, DuplicateGroupReport};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};

#[derive(Debug, FromQueryResult)]
struct DuplicateKey {
    user_id: i64,
    giveaway_id: i64,
    total: i64,
}

/// 参与记录去重
///
/// 修复唯一索引建立之前（或导入数据绕过索引）遗留的重复参与。
/// 只处理绑定了活动的记录；通用参与本就允许多条，由防刷窗口约束。
#[derive(Clone)]
pub struct DedupService {
    pool: DatabaseConnection,
}

impl DedupService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 每个 (user_id, giveaway_id) 组保留最早的一条
    ///
    /// “最早”按 participated_at 升序，时间相同按 id（插入顺序），结果确定可重复。
    /// 连续运行两次，第二次不会删除任何记录。
    pub async fn run(&self) -> AppResult<DedupReport> {
        let txn = self.pool.begin().await?;

        let keys = participations::Entity::find()
            .select_only()
            .column(participations::Column::UserId)
            .column(participations::Column::GiveawayId)
            .column_as(Expr::col(participations::Column::Id).count(), "total")
            .filter(participations::Column::GiveawayId.is_not_null())
            .group_by(participations::Column::UserId)
            .group_by(participations::Column::GiveawayId)
            .having(Expr::expr(Expr::col(participations::Column::Id).count()).gt(1))
            .order_by_asc(participations::Column::UserId)
            .order_by_asc(participations::Column::GiveawayId)
            .into_model::<DuplicateKey>()
            .all(&txn)
            .await?;

        let mut report = DedupReport::default();
        for key in keys {
            let ids: Vec<i64> = participations::Entity::find()
                .select_only()
                .column(participations::Column::Id)
                .filter(participations::Column::UserId.eq(key.user_id))
                .filter(participations::Column::GiveawayId.eq(key.giveaway_id))
                .order_by_asc(participations::Column::ParticipatedAt)
                .order_by_asc(participations::Column::Id)
                .into_tuple::<i64>()
                .all(&txn)
                .await?;

            let Some((&kept_id, duplicates)) = ids.split_first() else {
                continue;
            };
            if duplicates.is_empty() {
                continue;
            }

            let deleted = participations::Entity::delete_many()
                .filter(participations::Column::Id.is_in(duplicates.to_vec()))
                .exec(&txn)
                .await?
                .rows_affected;

            log::info!(
                "Dedup user={} giveaway={}: kept {kept_id}, deleted {deleted} of {}",
                key.user_id,
                key.giveaway_id,
                key.total
            );
            report.groups.push(DuplicateGroupReport {
                user_id: key.user_id,
                giveaway_id: key.giveaway_id,
                kept_id,
                deleted,
            });
            report.total_deleted += deleted;
        }

        report.groups_found = report.groups.len() as u64;
        report.remaining = participations::Entity::find().count(&txn).await?;
        txn.commit().await?;

        if report.groups_found == 0 {
            log::info!("Dedup finished: no duplicate participations");
        } else {
            log::warn!(
                "Dedup finished: {} groups, {} records deleted",
                report.groups_found,
                report.total_deleted
            );
        }
        Ok(report)
    }
}
