mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{setup, setup_with};
use giveaway_backend::config::ParticipationConfig;
use giveaway_backend::error::AppError;
use giveaway_backend::models::WinnerQuery;
use giveaway_backend::utils::{SeededPicker, WinnerPicker};

/// 总是选同一个下标
struct FixedPicker(usize);

impl WinnerPicker for FixedPicker {
    fn pick(&self, _len: usize) -> usize {
        self.0
    }
}

#[tokio::test]
async fn test_draw_without_participants_fails() {
    let app = setup().await;
    let giveaway = app.open_giveaway("empty").await;

    let err = app.winners.draw(giveaway.id).await.unwrap_err();
    assert!(matches!(err, AppError::NoParticipants(id) if id == giveaway.id));

    let err = app.winners.draw(4242).await.unwrap_err();
    assert!(matches!(err, AppError::GiveawayNotFound(4242)));
}

#[tokio::test]
async fn test_draw_picks_from_ordered_pool() {
    let app = setup_with(ParticipationConfig::default(), Arc::new(FixedPicker(1))).await;
    let giveaway = app.open_giveaway("ordered").await;
    let joined = app.join(giveaway.id, 3, "p").await;

    let outcome = app.winners.draw(giveaway.id).await.unwrap();
    assert_eq!(outcome.winner.discord_id, joined[1].discord_id);
    assert_eq!(outcome.winner.name, joined[1].username);
    assert_eq!(outcome.winner.giveaway_name, "ordered");
    assert_eq!(outcome.winner.user_id, Some(joined[1].id));
}

#[tokio::test]
async fn test_out_of_range_pick_is_rejected() {
    let app = setup_with(ParticipationConfig::default(), Arc::new(FixedPicker(5))).await;
    let giveaway = app.open_giveaway("broken").await;
    app.join(giveaway.id, 2, "q").await;

    let err = app.winners.draw(giveaway.id).await.unwrap_err();
    assert!(matches!(err, AppError::InternalError(_)));
    assert!(app.winners.list_for_giveaway(giveaway.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_draws_accumulate_winner_count() {
    let app = setup().await;
    let giveaway = app.open_giveaway("double").await;
    app.join(giveaway.id, 4, "d").await;

    let first = app.winners.draw(giveaway.id).await.unwrap();
    assert_eq!(first.winners.len(), 1);
    let second = app.winners.draw(giveaway.id).await.unwrap();
    assert_eq!(second.winners.len(), 2);

    let stored = app.giveaways.get(giveaway.id).await.unwrap();
    assert_eq!(stored.winner_count, 2);
    // 开奖不消耗参与记录
    assert_eq!(stored.participant_count, 4);
    assert_eq!(app.giveaways.participant_count(giveaway.id).await.unwrap(), 4);
}

#[tokio::test]
async fn test_draws_are_roughly_uniform() {
    let app = setup_with(ParticipationConfig::default(), Arc::new(SeededPicker::new(2024))).await;
    let giveaway = app.open_giveaway("fair").await;
    app.join(giveaway.id, 4, "u").await;

    let draws = 800;
    let mut tally: HashMap<String, usize> = HashMap::new();
    for _ in 0..draws {
        let outcome = app.winners.draw(giveaway.id).await.unwrap();
        *tally.entry(outcome.winner.discord_id).or_default() += 1;
    }

    assert_eq!(tally.len(), 4);
    for (discord_id, hits) in &tally {
        assert!(
            (130..=270).contains(hits),
            "{discord_id} won {hits} of {draws}"
        );
    }
}

#[tokio::test]
async fn test_winner_history_listing() {
    let app = setup().await;
    let a = app.open_giveaway("a").await;
    let b = app.open_giveaway("b").await;
    app.join(a.id, 2, "ha").await;
    app.join(b.id, 2, "hb").await;

    app.winners.draw(a.id).await.unwrap();
    app.winners.draw(b.id).await.unwrap();

    let page = app.winners.list_recent(&WinnerQuery::default()).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.data[0].giveaway_id, b.id);
    assert_eq!(app.winners.list_for_giveaway(a.id).await.unwrap().len(), 1);
}
