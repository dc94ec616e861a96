use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SchedulerConfig;
use crate::entities::{GiveawayStatus, giveaway_entity as giveaways};
use crate::error::AppResult;
use crate::external::NotificationDispatcher;
use crate::models::TickReport;
use crate::services::{GiveawayService, WinnerService};

/// 单个过期活动的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finalized {
    Completed,
    DeletedEmpty,
    /// 已被其它流程完成
    AlreadyCompleted,
}

/// tick 互斥标记，离开作用域（包括 panic 展开）时自动释放
struct TickGuard<'a>(&'a AtomicBool);

impl<'a> TickGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickGuard(flag))
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner {
    giveaways: GiveawayService,
    winners: WinnerService,
    notifier: NotificationDispatcher,
    config: SchedulerConfig,
    handle: Mutex<Option<JoinHandle<()>>>,
    ticking: AtomicBool,
}

/// 过期活动调度器
///
/// 按固定间隔扫描 `end_date <= now` 且未完成的活动，逐个处理:
/// - 无人参与：直接级联删除，不产生中奖记录
/// - 有人参与：抽取一名中奖者 -> 标记 completed -> 发送完成通知
///   -> 等待 settle delay -> 级联删除（中奖记录保留）
///
/// 单个活动失败只记录日志，下一次 tick 会从头重试（未 completed 的活动重试是安全的）。
#[derive(Clone)]
pub struct LifecycleScheduler {
    inner: Arc<Inner>,
}

impl LifecycleScheduler {
    pub fn new(
        giveaways: GiveawayService,
        winners: WinnerService,
        notifier: NotificationDispatcher,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                giveaways,
                winners,
                notifier,
                config,
                handle: Mutex::new(None),
                ticking: AtomicBool::new(false),
            }),
        }
    }

    fn handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.inner.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 启动轮询；已在运行时仅告警，返回 false
    pub fn start(&self) -> bool {
        let mut handle = self.handle();
        if let Some(h) = handle.as_ref()
            && !h.is_finished()
        {
            log::warn!("Lifecycle scheduler is already running");
            return false;
        }

        log::info!(
            "Starting lifecycle scheduler (poll every {}ms, settle delay {}ms)",
            self.inner.config.poll_interval_ms,
            self.inner.config.settle_delay_ms
        );
        let scheduler = self.clone();
        *handle = Some(tokio::spawn(async move { scheduler.run_loop().await }));
        true
    }

    /// 停止轮询；未运行时无操作，返回 false
    pub fn stop(&self) -> bool {
        match self.handle().take() {
            Some(h) => {
                h.abort();
                log::info!("Lifecycle scheduler stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle().as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn run_loop(self) {
        let mut interval = tokio::time::interval(self.inner.config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            // 每个 tick 在独立任务中执行，tick 内 panic 不会结束轮询
            let scheduler = self.clone();
            match tokio::spawn(async move { scheduler.run_tick().await }).await {
                Ok(Ok(report)) => {
                    if report.discovered > 0 || !report.swept.is_empty() {
                        log::info!(
                            "Lifecycle tick: {} expired, {} completed, {} deleted empty, {} failed, {} swept",
                            report.discovered,
                            report.completed.len(),
                            report.deleted_empty.len(),
                            report.failed.len(),
                            report.swept.len()
                        );
                    }
                }
                Ok(Err(e)) => log::error!("Lifecycle tick failed: {e}"),
                Err(e) => log::error!("Lifecycle tick panicked: {e}"),
            }
        }
    }

    pub async fn run_tick(&self) -> AppResult<TickReport> {
        self.run_tick_at(Utc::now()).await
    }

    /// 执行一次扫描；上一次 tick 尚未结束时直接跳过
    pub async fn run_tick_at(&self, now: DateTime<Utc>) -> AppResult<TickReport> {
        let Some(_guard) = TickGuard::acquire(&self.inner.ticking) else {
            log::warn!("Previous lifecycle tick still running, skipping");
            return Ok(TickReport {
                skipped: true,
                ..Default::default()
            });
        };

        let mut report = TickReport::default();

        // 清理上次中断后遗留的 completed 活动
        match self.inner.giveaways.find_completed().await {
            Ok(leftovers) => {
                for g in leftovers {
                    match self.inner.giveaways.purge(g.id).await {
                        Ok(_) => report.swept.push(g.id),
                        Err(e) => {
                            log::error!("Failed to purge completed giveaway {}: {e}", g.id);
                            report.failed.push(g.id);
                        }
                    }
                }
            }
            Err(e) => log::error!("Failed to query completed giveaways: {e}"),
        }

        let expired = self.inner.giveaways.find_expired(now).await?;
        report.discovered = expired.len();

        for giveaway in expired {
            match self.finalize(&giveaway).await {
                Ok(Finalized::Completed) => report.completed.push(giveaway.id),
                Ok(Finalized::DeletedEmpty) => report.deleted_empty.push(giveaway.id),
                Ok(Finalized::AlreadyCompleted) => {}
                Err(e) => {
                    log::error!("Failed to finalize giveaway {}: {e}", giveaway.id);
                    report.failed.push(giveaway.id);
                }
            }
        }

        Ok(report)
    }

    async fn finalize(&self, giveaway: &giveaways::Model) -> AppResult<Finalized> {
        let participants = self.inner.giveaways.participant_count(giveaway.id).await?;

        if participants == 0 {
            self.inner.giveaways.purge(giveaway.id).await?;
            log::info!(
                "Giveaway {} expired without participants, deleted",
                giveaway.id
            );
            self.inner.notifier.closed(giveaway);
            return Ok(Finalized::DeletedEmpty);
        }

        let outcome = self.inner.winners.draw(giveaway.id).await?;

        // 先持久化 completed，之后的扫描不会再次进入抽奖
        if !self.inner.giveaways.mark_completed(giveaway.id).await? {
            log::warn!("Giveaway {} was completed concurrently", giveaway.id);
            return Ok(Finalized::AlreadyCompleted);
        }

        let snapshot = match self.inner.giveaways.refresh_counters(giveaway.id).await {
            Ok(updated) => updated,
            Err(e) => {
                log::warn!(
                    "Failed to refresh counters of giveaway {}: {e}",
                    giveaway.id
                );
                let mut fallback = giveaway.clone();
                fallback.status = GiveawayStatus::Completed;
                fallback.participant_count = participants;
                fallback.winner_count = outcome.winners.len() as i64;
                fallback
            }
        };
        self.inner.notifier.completed(&snapshot, &outcome.winners);

        let settle = self.inner.config.settle_delay();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        self.inner.giveaways.purge(giveaway.id).await?;
        Ok(Finalized::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = TickGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(TickGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(TickGuard::acquire(&flag).is_some());
        assert!(!flag.load(Ordering::Acquire));
    }
}
