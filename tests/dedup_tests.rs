mod common;

use chrono::{Duration, Utc};
use common::setup;
use giveaway_backend::entities::participation_entity as participations;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

async fn drop_unique_index(app: &common::TestApp) {
    app.pool
        .execute_unprepared("DROP INDEX idx_participations_user_giveaway_unique")
        .await
        .unwrap();
}

async fn insert_raw(
    app: &common::TestApp,
    user_id: i64,
    giveaway_id: Option<i64>,
    at: chrono::DateTime<Utc>,
) -> participations::Model {
    participations::ActiveModel {
        user_id: Set(user_id),
        giveaway_id: Set(giveaway_id),
        participated_at: Set(at),
        ..Default::default()
    }
    .insert(&app.pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_dedup_keeps_earliest_entry() {
    let app = setup().await;
    drop_unique_index(&app).await;

    let giveaway = app.open_giveaway("legacy").await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let t0 = Utc::now() - Duration::hours(5);

    // alice 三条，最早的是第二条插入的
    insert_raw(&app, alice.id, Some(giveaway.id), t0 + Duration::hours(2)).await;
    let earliest = insert_raw(&app, alice.id, Some(giveaway.id), t0).await;
    insert_raw(&app, alice.id, Some(giveaway.id), t0 + Duration::hours(3)).await;
    // bob 只有一条
    insert_raw(&app, bob.id, Some(giveaway.id), t0).await;

    let report = app.dedup.run().await.unwrap();
    assert_eq!(report.groups_found, 1);
    assert_eq!(report.total_deleted, 2);
    assert_eq!(report.remaining, 2);
    assert_eq!(report.groups[0].user_id, alice.id);
    assert_eq!(report.groups[0].kept_id, earliest.id);

    let kept = participations::Entity::find()
        .filter(participations::Column::UserId.eq(alice.id))
        .all(&app.pool)
        .await
        .unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, earliest.id);
}

#[tokio::test]
async fn test_dedup_breaks_ties_by_insertion_order() {
    let app = setup().await;
    drop_unique_index(&app).await;

    let giveaway = app.open_giveaway("ties").await;
    let user = app.user("tie").await;
    let at = Utc::now() - Duration::minutes(10);

    let first = insert_raw(&app, user.id, Some(giveaway.id), at).await;
    insert_raw(&app, user.id, Some(giveaway.id), at).await;

    let report = app.dedup.run().await.unwrap();
    assert_eq!(report.groups[0].kept_id, first.id);
    assert_eq!(report.total_deleted, 1);
}

#[tokio::test]
async fn test_dedup_is_idempotent() {
    let app = setup().await;
    drop_unique_index(&app).await;

    let giveaway = app.open_giveaway("repeat").await;
    let user = app.user("again").await;
    let now = Utc::now();
    for i in 0..4 {
        insert_raw(&app, user.id, Some(giveaway.id), now - Duration::minutes(i)).await;
    }

    let first = app.dedup.run().await.unwrap();
    assert_eq!(first.total_deleted, 3);

    let second = app.dedup.run().await.unwrap();
    assert_eq!(second.groups_found, 0);
    assert_eq!(second.total_deleted, 0);
    assert_eq!(second.remaining, 1);
}

#[tokio::test]
async fn test_dedup_ignores_general_participations() {
    let app = setup().await;
    let user = app.user("general").await;
    let now = Utc::now();
    insert_raw(&app, user.id, None, now - Duration::days(3)).await;
    insert_raw(&app, user.id, None, now - Duration::days(2)).await;

    let report = app.dedup.run().await.unwrap();
    assert_eq!(report.groups_found, 0);
    assert_eq!(report.remaining, 2);

    let rows = participations::Entity::find()
        .order_by_asc(participations::Column::Id)
        .count(&app.pool)
        .await
        .unwrap();
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn test_dedup_on_clean_data_does_nothing() {
    let app = setup().await;
    let giveaway = app.open_giveaway("clean").await;
    app.join(giveaway.id, 3, "c").await;

    let report = app.dedup.run().await.unwrap();
    assert!(report.groups.is_empty());
    assert_eq!(report.remaining, 3);
}
