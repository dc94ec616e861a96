use serde::Serialize;
use utoipa::ToSchema;

/// 单个重复组的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DuplicateGroupReport {
    pub user_id: i64,
    pub giveaway_id: i64,
    /// 保留的（最早的）记录
    pub kept_id: i64,
    pub deleted: u64,
}

/// 去重报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DedupReport {
    pub groups: Vec<DuplicateGroupReport>,
    pub groups_found: u64,
    pub total_deleted: u64,
    /// 处理后剩余的参与记录数
    pub remaining: u64,
}

/// 一次调度 tick 的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct TickReport {
    /// 本次扫描到的过期活动
    pub discovered: usize,
    /// 抽出中奖者并完成
    pub completed: Vec<i64>,
    /// 无人参与直接删除
    pub deleted_empty: Vec<i64>,
    /// 处理失败（下次 tick 重试）
    pub failed: Vec<i64>,
    /// 清理了遗留的 completed 活动
    pub swept: Vec<i64>,
    /// 上一次 tick 仍在运行，本次跳过
    pub skipped: bool,
}
