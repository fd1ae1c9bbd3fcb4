//! Membership subscription lifecycle.
//!
//! Users enroll in a plan/tier combination, change tiers, cancel, and expire
//! automatically when the term ends. The [`MembershipEngine`] enforces the
//! lifecycle invariants under concurrent mutation; the [`ExpirySweeper`] is a
//! periodic trigger for the expiry pass.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use clubhouse::{
//!     Benefit, ExpirySweeper, MembershipEngine, MembershipPlan, PlanDuration,
//!     SweeperConfig, UsageMetrics, User,
//! };
//!
//! let engine = Arc::new(MembershipEngine::builder().build());
//!
//! engine.create_plan(
//!     MembershipPlan::builder("MONTHLY")
//!         .description("Monthly membership")
//!         .price_in_inr(199)
//!         .duration(PlanDuration::Months(1))
//!         .tier("SILVER", "Silver")
//!             .benefit(Benefit::discount_percent(5))
//!             .done()
//!         .build(),
//! ).await?;
//! engine.create_user(User::new("user-1", "Demo User")).await?;
//!
//! let sub = engine.subscribe("user-1", "MONTHLY", "SILVER").await?;
//!
//! // Periodic expiry in the background.
//! let sweeper = ExpirySweeper::start(engine.clone(), SweeperConfig::default());
//! // ... on shutdown:
//! sweeper.shutdown().await;
//! ```

pub mod engine;
pub mod evaluator;
pub mod model;
pub mod plans;
pub mod store;
pub mod sweeper;

pub use engine::{MembershipEngine, MembershipEngineBuilder};
pub use evaluator::{ThresholdTierEvaluator, TierEvaluator, UsageMetrics};
pub use model::{
    Benefit, BenefitKind, MembershipPlan, Subscription, SubscriptionStatus, Tier, User,
};
pub use plans::{PlanBuilder, TierBuilder};
pub use store::{
    InMemoryPlanStore, InMemorySubscriptionStore, InMemoryUserStore, PlanStore, SubscriptionStore,
    UserStore, Versioned,
};
pub use sweeper::{ExpirySweeper, SweeperConfig};
