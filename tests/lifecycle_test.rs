//! End-to-end lifecycle scenarios against the public API.

use std::sync::Arc;

use chrono::Duration;
use clubhouse::testing::{seed_catalog, ManualClock};
use clubhouse::{
    Clock, ErrorKind, ExpirySweeper, MembershipEngine, SubscriptionStatus, SweeperConfig,
    UsageMetrics,
};

async fn engine_with_clock(clock: Arc<ManualClock>) -> Arc<MembershipEngine> {
    let engine = Arc::new(MembershipEngine::builder().with_clock(clock).build());
    seed_catalog(&engine).await.unwrap();
    engine
}

#[tokio::test]
async fn full_membership_lifecycle() {
    let clock = Arc::new(ManualClock::default());
    let engine = engine_with_clock(clock.clone()).await;

    // Enroll in the monthly plan at the requested tier.
    let sub = engine.subscribe("user-1", "MONTHLY", "SILVER").await.unwrap();
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(sub.tier_id, "SILVER");
    assert!(sub.expires_at > sub.start_at);

    // Heavy usage promotes to PLATINUM.
    let metrics = UsageMetrics::new()
        .with("ordersCount", 12)
        .with("orderValue", 60_000);
    let sub = engine.evaluate_and_apply_tier(&sub.id, &metrics).await.unwrap();
    assert_eq!(sub.tier_id, "PLATINUM");

    // Explicit downgrade.
    let sub = engine.upgrade_or_downgrade(&sub.id, "GOLD").await.unwrap();
    assert_eq!(sub.tier_id, "GOLD");

    // A second enrollment is refused while this one is active.
    let err = engine.subscribe("user-1", "YEARLY", "GOLD").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Cancel, then re-enroll on the yearly plan.
    engine.cancel_subscription(&sub.id).await.unwrap();
    let yearly = engine.subscribe("user-1", "YEARLY", "GOLD").await.unwrap();

    let subs = engine.get_subscriptions_for_user("user-1").await.unwrap();
    assert_eq!(subs.len(), 2);
    assert_eq!(
        subs.iter().filter(|s| s.is_active()).count(),
        1,
        "exactly one active subscription per user"
    );

    // A year later the sweep expires it.
    clock.advance(Duration::days(400));
    assert_eq!(engine.expire_due_subscriptions().await.unwrap(), 1);
    let yearly = engine.get_subscription(&yearly.id).await.unwrap().unwrap();
    assert_eq!(yearly.status, SubscriptionStatus::Expired);
}

#[tokio::test]
async fn monthly_plan_expires_one_calendar_month_after_start() {
    let clock = Arc::new(ManualClock::default());
    let engine = engine_with_clock(clock.clone()).await;

    let sub = engine.subscribe("user-1", "MONTHLY", "SILVER").await.unwrap();
    assert_eq!(sub.start_at, clock.now());
    assert_eq!(sub.expires_at, clock.now() + Duration::days(31));
}

#[tokio::test(flavor = "multi_thread")]
async fn background_sweeper_expires_while_callers_mutate() {
    let clock = Arc::new(ManualClock::default());
    let engine = engine_with_clock(clock.clone()).await;

    let sub = engine.subscribe("user-1", "MONTHLY", "SILVER").await.unwrap();

    let sweeper = ExpirySweeper::start(
        engine.clone(),
        SweeperConfig {
            initial_delay_seconds: 0,
            interval_seconds: 1,
            shutdown_timeout_seconds: 1,
        },
    );

    // Tier churn while the sweeper is running.
    for tier in ["GOLD", "PLATINUM", "SILVER"] {
        engine.upgrade_or_downgrade(&sub.id, tier).await.unwrap();
    }

    // The first pass ran before the clock moved; wait out one interval so
    // the next pass observes the advanced clock.
    clock.advance(Duration::days(40));
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    sweeper.shutdown().await;

    let stored = engine.get_subscription(&sub.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Expired);
    assert_eq!(stored.tier_id, "SILVER");
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_tier_changes_settle_on_one_submitted_value() {
    let engine = engine_with_clock(Arc::new(ManualClock::default())).await;
    let sub = engine.subscribe("user-1", "MONTHLY", "SILVER").await.unwrap();

    let tiers = ["SILVER", "GOLD", "PLATINUM"];
    let tasks = (0..30).map(|i| {
        let engine = engine.clone();
        let id = sub.id.clone();
        let tier = tiers[i % tiers.len()].to_string();
        tokio::spawn(async move { engine.upgrade_or_downgrade(&id, &tier).await })
    });
    for task in futures::future::join_all(tasks).await {
        task.unwrap().unwrap();
    }

    let stored = engine.get_subscription(&sub.id).await.unwrap().unwrap();
    assert!(tiers.contains(&stored.tier_id.as_str()));
    assert_eq!(stored.expires_at, sub.expires_at);
    assert_eq!(stored.start_at, sub.start_at);
}
