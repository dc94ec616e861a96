mod common;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use common::{setup, setup_pooled, setup_with};
use giveaway_backend::config::ParticipationConfig;
use giveaway_backend::entities::{
    GiveawayStatus, giveaway_entity as giveaways, participation_entity as participations,
};
use giveaway_backend::error::AppError;
use giveaway_backend::external::LifecycleEvent;
use giveaway_backend::models::{ParticipationQuery, UpdateGiveawayRequest};
use giveaway_backend::utils::SeededPicker;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

// 多连接池 + 多线程运行时，十个插入真正并发，由唯一索引裁决
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attempts_accept_exactly_one() {
    let app = setup_pooled(4).await;
    let giveaway = app.open_giveaway("race").await;
    let user = app.user("racer").await;
    let giveaway_id = giveaway.id;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = app.participations.clone();
        let discord_id = user.discord_id.clone();
        handles.push(tokio::spawn(async move {
            service.participate(&discord_id, Some(giveaway_id)).await
        }));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(AppError::AlreadyParticipated { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(rejected, 9);

    let stored = app.giveaways.get(giveaway.id).await.unwrap();
    assert_eq!(stored.participant_count, 1);
    assert_eq!(participations::Entity::find().count(&app.pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_second_participation_is_rejected() {
    let app = setup().await;
    let giveaway = app.open_giveaway("twice").await;
    let user = app.user("alice").await;

    let first = app
        .participations
        .participate(&user.discord_id, Some(giveaway.id))
        .await
        .unwrap();
    assert_eq!(first.participant_count, Some(1));

    let err = app
        .participations
        .participate(&user.discord_id, Some(giveaway.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyParticipated { .. }));
    assert!(app.participations.has_participated(user.id, giveaway.id).await.unwrap());
}

#[tokio::test]
async fn test_expired_giveaway_rejects_participation() {
    let app = setup().await;
    let giveaway = app.expired_giveaway("late").await;
    let user = app.user("bob").await;

    let err = app
        .participations
        .participate(&user.discord_id, Some(giveaway.id))
        .await
        .unwrap_err();
    match err {
        AppError::GiveawayExpired { end_date } => assert_eq!(end_date, giveaway.end_date),
        e => panic!("unexpected error: {e}"),
    }
    assert!(!app.participations.has_participated(user.id, giveaway.id).await.unwrap());
}

#[tokio::test]
async fn test_participation_at_end_date_is_expired() {
    let app = setup().await;
    let giveaway = app.open_giveaway("boundary").await;
    let user = app.user("carol").await;

    let err = app
        .participations
        .participate_at(&user.discord_id, Some(giveaway.id), giveaway.end_date)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::GiveawayExpired { .. }));

    let ok = app
        .participations
        .participate_at(
            &user.discord_id,
            Some(giveaway.id),
            giveaway.end_date - Duration::seconds(1),
        )
        .await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn test_unknown_giveaway_and_user() {
    let app = setup().await;
    let user = app.user("dave").await;

    let err = app
        .participations
        .participate(&user.discord_id, Some(9999))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::GiveawayNotFound(9999)));

    let giveaway = app.open_giveaway("ghosts").await;
    let err = app
        .participations
        .participate("nobody", Some(giveaway.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_paused_giveaway_rejects_participation() {
    let app = setup().await;
    let giveaway = app.open_giveaway("paused").await;
    let user = app.user("erin").await;

    app.giveaways
        .update(
            giveaway.id,
            UpdateGiveawayRequest {
                status: Some(GiveawayStatus::Paused),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = app
        .participations
        .participate(&user.discord_id, Some(giveaway.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_general_participation_rate_limit() {
    let app = setup().await;
    let user = app.user("frank").await;
    let t0 = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();

    let first = app
        .participations
        .participate_at(&user.discord_id, None, t0)
        .await
        .unwrap();
    assert_eq!(first.participant_count, None);
    assert_eq!(first.participation.giveaway_id, None);

    let err = app
        .participations
        .participate_at(&user.discord_id, None, t0 + Duration::hours(1))
        .await
        .unwrap_err();
    match err {
        AppError::RateLimited { retry_at } => assert_eq!(retry_at, t0 + Duration::hours(24)),
        e => panic!("unexpected error: {e}"),
    }

    let again = app
        .participations
        .participate_at(&user.discord_id, None, t0 + Duration::hours(24))
        .await;
    assert!(again.is_ok());

    let history = app
        .participations
        .list_for_user(user.id, &ParticipationQuery::default())
        .await
        .unwrap();
    assert_eq!(history.total, 2);
}

#[tokio::test]
async fn test_general_window_does_not_block_giveaway_entries() {
    let app = setup().await;
    let user = app.user("grace").await;
    let giveaway = app.open_giveaway("scoped").await;

    app.participations
        .participate(&user.discord_id, None)
        .await
        .unwrap();
    let scoped = app
        .participations
        .participate(&user.discord_id, Some(giveaway.id))
        .await;
    assert!(scoped.is_ok());
}

#[tokio::test]
async fn test_milestone_notified_once() {
    let app = setup().await;
    let giveaway = app.open_giveaway("popular").await;

    app.join(giveaway.id, 9, "fan").await;

    assert!(app.recorder.wait_for("milestone", 1).await);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(app.recorder.count("milestone"), 1);
    let reached = app
        .recorder
        .events()
        .into_iter()
        .find_map(|e| match e {
            LifecycleEvent::Milestone(_, count) => Some(count),
            _ => None,
        });
    assert_eq!(reached, Some(7));

    let stored = app.giveaways.get(giveaway.id).await.unwrap();
    assert!(stored.milestone_notified);
    assert_eq!(stored.participant_count, 9);
}

#[tokio::test]
async fn test_milestone_disabled_with_zero_threshold() {
    let app = setup_with(
        ParticipationConfig {
            milestone_threshold: 0,
            ..Default::default()
        },
        Arc::new(SeededPicker::new(7)),
    )
    .await;
    let giveaway = app.open_giveaway("quiet").await;
    app.join(giveaway.id, 3, "q").await;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(app.recorder.count("milestone"), 0);
}

#[tokio::test]
async fn test_list_for_giveaway_in_entry_order() {
    let app = setup().await;
    let giveaway = app.open_giveaway("roster").await;
    app.join(giveaway.id, 3, "roster").await;

    let page = app
        .participations
        .list_for_giveaway(
            giveaway.id,
            &ParticipationQuery {
                page: Some(1),
                per_page: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.data.len(), 2);
    assert!(page.data[0].participated_at <= page.data[1].participated_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_users_keep_exact_count() {
    let app = setup_pooled(4).await;
    let giveaway = app.open_giveaway("crowd").await;
    let giveaway_id = giveaway.id;

    let mut users = Vec::new();
    for i in 0..8 {
        users.push(app.user(&format!("crowd-{i}")).await);
    }

    let mut handles = Vec::new();
    for user in users {
        let service = app.participations.clone();
        handles.push(tokio::spawn(async move {
            service.participate(&user.discord_id, Some(giveaway_id)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // 最后一次写入的计数不能小于真实人数
    let stored = app.giveaways.get(giveaway_id).await.unwrap();
    assert_eq!(stored.participant_count, 8);
    assert_eq!(app.giveaways.participant_count(giveaway_id).await.unwrap(), 8);
}

#[tokio::test]
async fn test_stale_counter_is_recomputed_on_next_entry() {
    let app = setup().await;
    let giveaway = app.open_giveaway("drift").await;
    app.join(giveaway.id, 2, "drift").await;

    // 人为写坏冗余计数
    giveaways::Entity::update_many()
        .col_expr(giveaways::Column::ParticipantCount, Expr::value(40))
        .filter(giveaways::Column::Id.eq(giveaway.id))
        .exec(&app.pool)
        .await
        .unwrap();

    let late = app.user("drift-late").await;
    let response = app
        .participations
        .participate(&late.discord_id, Some(giveaway.id))
        .await
        .unwrap();
    assert_eq!(response.participant_count, Some(3));
    assert_eq!(app.giveaways.get(giveaway.id).await.unwrap().participant_count, 3);
}

#[tokio::test]
async fn test_counter_failure_does_not_fail_committed_entry() {
    let app = setup().await;
    let giveaway = app.open_giveaway("frozen").await;
    let user = app.user("frozen-1").await;

    // 活动行拒绝任何更新，参与记录本身仍可写入
    app.pool
        .execute_unprepared(
            "CREATE TRIGGER freeze_giveaways BEFORE UPDATE ON giveaways \
             BEGIN SELECT RAISE(ABORT, 'giveaways are read-only'); END;",
        )
        .await
        .unwrap();

    let response = app
        .participations
        .participate(&user.discord_id, Some(giveaway.id))
        .await
        .unwrap();
    assert_eq!(response.participant_count, None);
    assert_eq!(response.participation.giveaway_id, Some(giveaway.id));
    assert!(
        app.participations
            .has_participated(user.id, giveaway.id)
            .await
            .unwrap()
    );

    // 重试得到的是已参与，而不是第二条记录
    let retry = app
        .participations
        .participate(&user.discord_id, Some(giveaway.id))
        .await;
    assert!(matches!(retry, Err(AppError::AlreadyParticipated { .. })));
    assert_eq!(participations::Entity::find().count(&app.pool).await.unwrap(), 1);
}
