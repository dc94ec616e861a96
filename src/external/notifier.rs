use async_trait::async_trait;
use std::sync::Arc;

use crate::entities::{giveaway_entity as giveaways, winner_entity as winners};
use crate::error::AppResult;

/// 活动生命周期事件
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Created(giveaways::Model),
    /// 结束但没有中奖者（无人参与或被管理员删除）
    Closed(giveaways::Model),
    Completed(giveaways::Model, Vec<winners::Model>),
    Milestone(giveaways::Model, i64),
}

impl LifecycleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::Created(_) => "created",
            LifecycleEvent::Closed(_) => "closed",
            LifecycleEvent::Completed(..) => "completed",
            LifecycleEvent::Milestone(..) => "milestone",
        }
    }

    pub fn giveaway(&self) -> &giveaways::Model {
        match self {
            LifecycleEvent::Created(g)
            | LifecycleEvent::Closed(g)
            | LifecycleEvent::Completed(g, _)
            | LifecycleEvent::Milestone(g, _) => g,
        }
    }

    /// 纯文本摘要，供各渠道直接转发
    pub fn summary(&self) -> String {
        match self {
            LifecycleEvent::Created(g) => format!(
                "New giveaway \"{}\" is open until {}",
                g.name,
                g.end_date.format("%Y-%m-%d %H:%M UTC")
            ),
            LifecycleEvent::Closed(g) => format!("Giveaway \"{}\" has been closed", g.name),
            LifecycleEvent::Completed(g, ws) => {
                let names: Vec<&str> = ws.iter().map(|w| w.name.as_str()).collect();
                format!(
                    "Giveaway \"{}\" is over, congratulations to {}!",
                    g.name,
                    names.join(", ")
                )
            }
            LifecycleEvent::Milestone(g, count) => {
                format!("Giveaway \"{}\" just reached {count} participants", g.name)
            }
        }
    }
}

/// 通知渠道（Discord、WhatsApp 桥接等）
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 渠道名称，用于日志
    fn name(&self) -> &'static str;

    /// 投递一个生命周期事件
    async fn deliver(&self, event: &LifecycleEvent) -> AppResult<()>;
}

/// 通知分发器
///
/// 每个事件对每个渠道各 spawn 一个任务，调用方不等待结果；
/// 失败只记录日志，不会影响触发通知的写操作。
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl NotificationDispatcher {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        Self { sinks }
    }

    /// 不发送任何通知
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn created(&self, giveaway: &giveaways::Model) {
        self.dispatch(LifecycleEvent::Created(giveaway.clone()));
    }

    pub fn closed(&self, giveaway: &giveaways::Model) {
        self.dispatch(LifecycleEvent::Closed(giveaway.clone()));
    }

    pub fn completed(&self, giveaway: &giveaways::Model, winners: &[winners::Model]) {
        self.dispatch(LifecycleEvent::Completed(
            giveaway.clone(),
            winners.to_vec(),
        ));
    }

    pub fn milestone(&self, giveaway: &giveaways::Model, count: i64) {
        self.dispatch(LifecycleEvent::Milestone(giveaway.clone(), count));
    }

    fn dispatch(&self, event: LifecycleEvent) {
        log::info!(
            "Lifecycle event {} for giveaway {}",
            event.kind(),
            event.giveaway().id
        );
        for sink in &self.sinks {
            let sink = sink.clone();
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = sink.deliver(&event).await {
                    log::error!(
                        "Notification failure: sink={} event={} giveaway={}: {e}",
                        sink.name(),
                        event.kind(),
                        event.giveaway().id
                    );
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::GiveawayStatus;
    use crate::error::AppError;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn giveaway() -> giveaways::Model {
        let at = Utc.with_ymd_and_hms(2030, 5, 1, 18, 30, 0).unwrap();
        giveaways::Model {
            id: 3,
            name: "Nitro".into(),
            description: String::new(),
            status: GiveawayStatus::Active,
            start_date: at,
            end_date: at,
            duration_days: 0,
            duration_hours: 0,
            participant_count: 0,
            winner_count: 0,
            milestone_notified: false,
            created_at: at,
            updated_at: at,
        }
    }

    fn winner(name: &str) -> winners::Model {
        winners::Model {
            id: 1,
            giveaway_id: 3,
            giveaway_name: "Nitro".into(),
            user_id: Some(1),
            discord_id: "1".into(),
            name: name.into(),
            won_at: Utc::now(),
        }
    }

    struct FailingSink(AtomicUsize);

    #[async_trait]
    impl Notifier for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn deliver(&self, _event: &LifecycleEvent) -> AppResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(AppError::NotificationFailure("unreachable".into()))
        }
    }

    #[derive(Default)]
    struct CollectingSink(std::sync::Mutex<Vec<LifecycleEvent>>);

    #[async_trait]
    impl Notifier for CollectingSink {
        fn name(&self) -> &'static str {
            "collecting"
        }

        async fn deliver(&self, event: &LifecycleEvent) -> AppResult<()> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn test_event_summary() {
        let g = giveaway();
        assert_eq!(
            LifecycleEvent::Created(g.clone()).summary(),
            "New giveaway \"Nitro\" is open until 2030-05-01 18:30 UTC"
        );
        let done = LifecycleEvent::Completed(g.clone(), vec![winner("ann"), winner("bo")]);
        assert_eq!(done.kind(), "completed");
        assert!(done.summary().ends_with("congratulations to ann, bo!"));
        assert_eq!(LifecycleEvent::Milestone(g, 7).giveaway().id, 3);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_sink_errors() {
        let sink = Arc::new(FailingSink(AtomicUsize::new(0)));
        let dispatcher = NotificationDispatcher::new(vec![sink.clone() as Arc<dyn Notifier>]);
        assert_eq!(dispatcher.sink_count(), 1);

        dispatcher.created(&giveaway());
        dispatcher.closed(&giveaway());
        for _ in 0..50 {
            if sink.0.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(sink.0.load(Ordering::SeqCst), 2);
        assert_eq!(NotificationDispatcher::disabled().sink_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_delivers_event_payload() {
        let sink = Arc::new(CollectingSink::default());
        let dispatcher = NotificationDispatcher::new(vec![sink.clone() as Arc<dyn Notifier>]);

        let mut g = giveaway();
        g.status = GiveawayStatus::Completed;
        g.participant_count = 3;
        g.winner_count = 1;
        dispatcher.completed(&g, &[winner("ann")]);
        for _ in 0..50 {
            if !sink.0.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        let events = sink.0.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        match &events[0] {
            LifecycleEvent::Completed(snapshot, winners) => {
                assert_eq!(snapshot, &g);
                assert_eq!(winners.len(), 1);
                assert_eq!(winners[0].name, "ann");
            }
            other => panic!("unexpected event {}", other.kind()),
        }
    }
}
