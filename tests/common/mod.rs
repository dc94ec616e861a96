#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use giveaway_backend::config::{DatabaseConfig, ParticipationConfig, SchedulerConfig};
use giveaway_backend::database::{DbPool, create_pool, run_migrations};
use giveaway_backend::entities::{giveaway_entity as giveaways, user_entity as users};
use giveaway_backend::error::AppResult;
use giveaway_backend::external::{LifecycleEvent, NotificationDispatcher, Notifier};
use giveaway_backend::models::CreateGiveawayRequest;
use giveaway_backend::services::{
    DedupService, GiveawayService, ParticipationService, UserService, WinnerService,
};
use giveaway_backend::tasks::LifecycleScheduler;
use giveaway_backend::utils::{AuthIdentity, SeededPicker, WinnerPicker};

/// 记录所有收到的事件
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.kind()).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    /// 通知是异步派发的，轮询等待
    pub async fn wait_for(&self, kind: &str, n: usize) -> bool {
        for _ in 0..100 {
            if self.count(kind) >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, event: &LifecycleEvent) -> AppResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub pool: DbPool,
    pub recorder: Arc<RecordingNotifier>,
    pub notifier: NotificationDispatcher,
    pub users: UserService,
    pub giveaways: GiveawayService,
    pub participations: ParticipationService,
    pub winners: WinnerService,
    pub dedup: DedupService,
    pub scheduler: LifecycleScheduler,
}

pub async fn setup() -> TestApp {
    setup_with(ParticipationConfig::default(), Arc::new(SeededPicker::new(42))).await
}

pub async fn setup_with(
    participation: ParticipationConfig,
    picker: Arc<dyn WinnerPicker>,
) -> TestApp {
    // 单连接：所有语句在同一连接上串行执行
    build(1, participation, picker).await
}

/// 多连接池，写操作会真正并发地落到数据库
///
/// `sqlite::memory:` 以共享缓存方式打开，池内连接看到的是同一个库。
pub async fn setup_pooled(max_connections: u32) -> TestApp {
    build(
        max_connections,
        ParticipationConfig::default(),
        Arc::new(SeededPicker::new(42)),
    )
    .await
}

async fn build(
    max_connections: u32,
    participation: ParticipationConfig,
    picker: Arc<dyn WinnerPicker>,
) -> TestApp {
    let pool = create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections,
    })
    .await
    .expect("connect sqlite");
    run_migrations(&pool).await.expect("migrate");

    let recorder = Arc::new(RecordingNotifier::default());
    let notifier = NotificationDispatcher::new(vec![recorder.clone() as Arc<dyn Notifier>]);

    let users = UserService::new(pool.clone());
    let giveaways = GiveawayService::new(pool.clone(), notifier.clone());
    let participations = ParticipationService::new(pool.clone(), notifier.clone(), participation);
    let winners = WinnerService::new(pool.clone(), picker);
    let dedup = DedupService::new(pool.clone());
    let scheduler = LifecycleScheduler::new(
        giveaways.clone(),
        winners.clone(),
        notifier.clone(),
        SchedulerConfig {
            enabled: false,
            poll_interval_ms: 3_600_000,
            settle_delay_ms: 0,
        },
    );

    TestApp {
        pool,
        recorder,
        notifier,
        users,
        giveaways,
        participations,
        winners,
        dedup,
        scheduler,
    }
}

pub fn identity(discord_id: &str) -> AuthIdentity {
    AuthIdentity {
        discord_id: discord_id.to_string(),
        username: format!("user-{discord_id}"),
        avatar: None,
        email: None,
        admin: false,
    }
}

impl TestApp {
    /// 用给定配置另建一个调度器，共享同一组服务
    pub fn scheduler_with(&self, config: SchedulerConfig) -> LifecycleScheduler {
        LifecycleScheduler::new(
            self.giveaways.clone(),
            self.winners.clone(),
            self.notifier.clone(),
            config,
        )
    }

    pub async fn user(&self, discord_id: &str) -> users::Model {
        self.users
            .upsert_identity(&identity(discord_id))
            .await
            .expect("upsert user")
    }

    /// 按开始时间与天数创建活动
    pub async fn giveaway(&self, name: &str, start: DateTime<Utc>, days: i32) -> giveaways::Model {
        self.giveaways
            .create(CreateGiveawayRequest {
                name: name.to_string(),
                description: String::new(),
                start_date: Some(start),
                duration_days: days,
                duration_hours: 0,
            })
            .await
            .expect("create giveaway")
    }

    pub async fn open_giveaway(&self, name: &str) -> giveaways::Model {
        self.giveaway(name, Utc::now(), 7).await
    }

    /// 已过期（两天前开始，持续一天）
    pub async fn expired_giveaway(&self, name: &str) -> giveaways::Model {
        self.giveaway(name, Utc::now() - chrono::Duration::days(2), 1)
            .await
    }

    /// 批量参与，返回参与用户
    pub async fn join(&self, giveaway_id: i64, n: usize, prefix: &str) -> Vec<users::Model> {
        let mut joined = Vec::with_capacity(n);
        for i in 0..n {
            let user = self.user(&format!("{prefix}-{i}")).await;
            self.participations
                .participate(&user.discord_id, Some(giveaway_id))
                .await
                .expect("participate");
            joined.push(user);
        }
        joined
    }
}
