//! Clubhouse - a membership subscription lifecycle engine
//!
//! Clubhouse manages users enrolling in membership plans at benefit tiers:
//! subscribing, changing tiers (explicitly or from usage metrics), cancelling,
//! and automatic expiry via a periodic sweep. All state is in memory; storage,
//! time, id generation and the tier-scoring policy are injected capabilities.
//!
//! # Features
//!
//! - **Lifecycle engine**: one active subscription per user, tier/plan
//!   membership validation, terminal cancel/expire transitions
//! - **Concurrency-safe mutation**: per-subscription versioned
//!   compare-and-save, per-user serialization of subscribe
//! - **Tier evaluation**: pluggable strategy mapping usage metrics to a tier
//! - **Expiry sweeper**: background task with cooperative, bounded shutdown
//! - **Testing**: seed catalog and a manual clock for deterministic tests
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clubhouse::{ExpirySweeper, MembershipEngine, SweeperConfig};
//! use clubhouse::testing::seed_catalog;
//!
//! #[tokio::main]
//! async fn main() -> clubhouse::Result<()> {
//!     // Initialize logging
//!     clubhouse::init_tracing();
//!
//!     let engine = Arc::new(MembershipEngine::builder().build());
//!     seed_catalog(&engine).await?;
//!
//!     let sub = engine.subscribe("user-1", "MONTHLY", "SILVER").await?;
//!     println!("{}", sub.brief());
//!
//!     let sweeper = ExpirySweeper::start(engine.clone(), SweeperConfig::default());
//!     // ... serve requests ...
//!     sweeper.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod clock;
mod error;
pub mod membership;
pub mod testing;

// Re-exports for public API
pub use clock::{Clock, IdSource, PlanDuration, SequenceIds, SystemClock, UuidIds};
pub use error::{ErrorKind, MembershipError, Result};
pub use membership::{
    Benefit, BenefitKind, ExpirySweeper, InMemoryPlanStore, InMemorySubscriptionStore,
    InMemoryUserStore, MembershipEngine, MembershipEngineBuilder, MembershipPlan, PlanBuilder,
    PlanStore, Subscription, SubscriptionStatus, SubscriptionStore, SweeperConfig,
    ThresholdTierEvaluator, Tier, TierBuilder, TierEvaluator, UsageMetrics, User, UserStore,
    Versioned,
};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main().
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "clubhouse=debug")
/// - `CLUBHOUSE_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("CLUBHOUSE_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
