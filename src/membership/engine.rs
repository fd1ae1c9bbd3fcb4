//! Subscription lifecycle engine.
//!
//! [`MembershipEngine`] is the only component that mutates subscription
//! state. It enforces the lifecycle invariants:
//!
//! - at most one active subscription per user,
//! - a subscription's tier always belongs to its plan,
//! - expiry strictly after start,
//! - every mutation of one subscription is exclusive (versioned
//!   compare-and-save, retried on contention).
//!
//! Cancelled and expired subscriptions are terminal and are kept for
//! history; they are never deleted or resurrected.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::clock::{Clock, IdSource, SequenceIds, SystemClock};
use crate::error::{MembershipError, Result};

use super::evaluator::{ThresholdTierEvaluator, TierEvaluator, UsageMetrics};
use super::model::{MembershipPlan, Subscription, SubscriptionStatus, User};
use super::store::{
    InMemoryPlanStore, InMemorySubscriptionStore, InMemoryUserStore, PlanStore, SubscriptionStore,
    UserStore, Versioned,
};

/// One async mutex per user id, handed out on demand.
///
/// Subscribe's check-then-insert runs under the user's mutex so two
/// concurrent subscribes for the same user cannot both observe "no active
/// subscription". Locks for different users are independent.
#[derive(Default)]
struct UserLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    async fn for_user(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// The subscription lifecycle engine.
///
/// Construct with [`MembershipEngine::builder`]; every collaborator defaults
/// to an in-memory/in-process implementation, so
/// `MembershipEngine::builder().build()` is a fully working engine.
pub struct MembershipEngine {
    subscriptions: Arc<dyn SubscriptionStore>,
    plans: Arc<dyn PlanStore>,
    users: Arc<dyn UserStore>,
    evaluator: Arc<dyn TierEvaluator>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    user_locks: UserLocks,
}

impl MembershipEngine {
    #[must_use]
    pub fn builder() -> MembershipEngineBuilder {
        MembershipEngineBuilder::default()
    }

    // ---- catalog ----

    /// Register a new plan.
    ///
    /// A plan must have at least one tier and a positive duration; plan ids
    /// are unique.
    pub async fn create_plan(&self, plan: MembershipPlan) -> Result<()> {
        if plan.tiers.is_empty() {
            return Err(MembershipError::invalid_state(format!(
                "plan {} has no tiers",
                plan.id
            )));
        }
        if !plan.duration.is_positive() {
            return Err(MembershipError::invalid_state(format!(
                "plan {} has a zero duration",
                plan.id
            )));
        }
        if self.plans.find_by_id(&plan.id).await?.is_some() {
            return Err(MembershipError::conflict(format!(
                "plan {} already exists",
                plan.id
            )));
        }
        self.plans.save(&plan).await?;
        tracing::info!(plan_id = %plan.id, "Plan created");
        Ok(())
    }

    /// Register a new user. User ids are unique.
    pub async fn create_user(&self, user: User) -> Result<()> {
        if self.users.find_by_id(&user.id).await?.is_some() {
            return Err(MembershipError::conflict(format!(
                "user {} already exists",
                user.id
            )));
        }
        self.users.save(&user).await?;
        tracing::info!(user_id = %user.id, "User created");
        Ok(())
    }

    pub async fn list_plans(&self) -> Result<Vec<MembershipPlan>> {
        self.plans.find_all().await
    }

    pub async fn get_plan(&self, plan_id: &str) -> Result<Option<MembershipPlan>> {
        self.plans.find_by_id(plan_id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.users.find_all().await
    }

    // ---- lifecycle ----

    /// Subscribe a user to a plan at a tier.
    ///
    /// The user and plan must exist, the tier must belong to the plan, and
    /// the user may not already hold an active subscription. The new
    /// subscription starts now and expires one plan duration later
    /// (calendar arithmetic, day-of-month clamped).
    pub async fn subscribe(
        &self,
        user_id: &str,
        plan_id: &str,
        tier_id: &str,
    ) -> Result<Subscription> {
        let user = self.users.find_by_id(user_id).await?.ok_or_else(|| {
            MembershipError::not_found(format!("user {user_id} does not exist"))
        })?;
        let plan = self.plans.find_by_id(plan_id).await?.ok_or_else(|| {
            MembershipError::not_found(format!("plan {plan_id} does not exist"))
        })?;
        if !plan.has_tier(tier_id) {
            return Err(MembershipError::invalid_tier(format!(
                "{tier_id} is not part of plan {plan_id}"
            )));
        }

        // The active-subscription check and the insert must not interleave
        // with another subscribe for the same user.
        let lock = self.user_locks.for_user(user_id).await;
        let _guard = lock.lock().await;

        let existing = self.subscriptions.find_by_user(user_id).await?;
        if existing.iter().any(Subscription::is_active) {
            return Err(MembershipError::conflict(format!(
                "user {user_id} already has an active subscription"
            )));
        }

        let start_at = self.clock.now();
        let expires_at = plan.duration.add_to(start_at)?;
        let subscription = Subscription {
            id: self.ids.next_id("sub"),
            user_id: user.id,
            plan_id: plan.id,
            tier_id: tier_id.to_string(),
            start_at,
            expires_at,
            status: SubscriptionStatus::Active,
        };
        self.subscriptions.save(&subscription).await?;

        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            plan_id = %subscription.plan_id,
            tier_id = %subscription.tier_id,
            expires_at = %subscription.expires_at,
            "Subscription created"
        );
        Ok(subscription)
    }

    /// Move an active subscription to another tier of its plan.
    ///
    /// Upgrade and downgrade are the same operation; no ordering between
    /// tiers is enforced. Only `tier_id` changes.
    pub async fn upgrade_or_downgrade(
        &self,
        subscription_id: &str,
        new_tier_id: &str,
    ) -> Result<Subscription> {
        loop {
            let Versioned { value: sub, version } = self.load(subscription_id).await?;
            if !sub.is_active() {
                return Err(MembershipError::invalid_state(format!(
                    "only active subscriptions can change tiers; {} is {}",
                    sub.id, sub.status
                )));
            }
            let plan = self.plan_for(&sub).await?;
            if !plan.has_tier(new_tier_id) {
                return Err(MembershipError::invalid_tier(format!(
                    "{new_tier_id} is not part of plan {}",
                    plan.id
                )));
            }

            let mut updated = sub;
            updated.tier_id = new_tier_id.to_string();
            if self.subscriptions.compare_and_save(&updated, version).await? {
                tracing::info!(
                    subscription_id = %updated.id,
                    tier_id = %updated.tier_id,
                    "Subscription tier changed"
                );
                return Ok(updated);
            }
            // Lost the race; reload and re-validate against the new state.
        }
    }

    /// Cancel an active subscription.
    ///
    /// Cancelled and expired subscriptions are terminal: re-cancelling one
    /// fails with `InvalidState` and leaves it unmodified.
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        loop {
            let Versioned { value: sub, version } = self.load(subscription_id).await?;
            if !sub.is_active() {
                return Err(MembershipError::invalid_state(format!(
                    "subscription {} is already {}",
                    sub.id, sub.status
                )));
            }

            let mut updated = sub;
            updated.status = SubscriptionStatus::Cancelled;
            if self.subscriptions.compare_and_save(&updated, version).await? {
                tracing::info!(subscription_id = %updated.id, "Subscription cancelled");
                return Ok(());
            }
        }
    }

    /// Re-evaluate the tier of an active subscription from usage metrics and
    /// apply the result.
    ///
    /// The evaluator is pluggable, so its answer is validated against the
    /// subscription's plan; a foreign tier fails with `InvalidState`.
    pub async fn evaluate_and_apply_tier(
        &self,
        subscription_id: &str,
        metrics: &UsageMetrics,
    ) -> Result<Subscription> {
        loop {
            let Versioned { value: sub, version } = self.load(subscription_id).await?;
            if !sub.is_active() {
                return Err(MembershipError::invalid_state(format!(
                    "cannot evaluate tier for subscription {} in status {}",
                    sub.id, sub.status
                )));
            }

            let chosen = self.evaluator.evaluate(metrics);
            let plan = self.plan_for(&sub).await?;
            if !plan.has_tier(&chosen) {
                return Err(MembershipError::invalid_state(format!(
                    "tier evaluator returned {chosen}, which is not part of plan {}",
                    plan.id
                )));
            }

            let mut updated = sub;
            updated.tier_id = chosen;
            if self.subscriptions.compare_and_save(&updated, version).await? {
                tracing::info!(
                    subscription_id = %updated.id,
                    tier_id = %updated.tier_id,
                    "Subscription tier re-evaluated"
                );
                return Ok(updated);
            }
        }
    }

    /// Replace the expiry instant of an active subscription.
    ///
    /// The new expiry must be after the subscription's start.
    pub async fn extend_expiry(
        &self,
        subscription_id: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Subscription> {
        loop {
            let Versioned { value: sub, version } = self.load(subscription_id).await?;
            if !sub.is_active() {
                return Err(MembershipError::invalid_state(format!(
                    "only active subscriptions can have their expiry moved; {} is {}",
                    sub.id, sub.status
                )));
            }
            if new_expires_at <= sub.start_at {
                return Err(MembershipError::invalid_state(format!(
                    "expiry {new_expires_at} is not after subscription start {}",
                    sub.start_at
                )));
            }

            let mut updated = sub;
            updated.expires_at = new_expires_at;
            if self.subscriptions.compare_and_save(&updated, version).await? {
                tracing::info!(
                    subscription_id = %updated.id,
                    expires_at = %updated.expires_at,
                    "Subscription expiry moved"
                );
                return Ok(updated);
            }
        }
    }

    /// Expire every active subscription whose expiry has passed.
    ///
    /// Each subscription transitions independently; a failure on one is
    /// logged and does not stop the sweep. Safe to run concurrently with
    /// itself and with any other mutation. Returns how many were expired.
    pub async fn expire_due_subscriptions(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut expired = 0usize;

        for versioned in self.subscriptions.find_all().await? {
            let id = versioned.value.id.clone();
            match self.expire_one(versioned, now).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(subscription_id = %id, error = %e, "Failed to expire subscription");
                }
            }
        }
        Ok(expired)
    }

    /// Expire a single subscription if it is still due, retrying on
    /// contention. Returns whether this call performed the transition.
    async fn expire_one(
        &self,
        mut versioned: Versioned<Subscription>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        loop {
            if !versioned.value.is_due(now) {
                return Ok(false);
            }

            let mut updated = versioned.value.clone();
            updated.status = SubscriptionStatus::Expired;
            if self.subscriptions.compare_and_save(&updated, versioned.version).await? {
                tracing::info!(
                    subscription_id = %updated.id,
                    user_id = %updated.user_id,
                    "Subscription expired"
                );
                return Ok(true);
            }

            versioned = match self.subscriptions.find_by_id(&updated.id).await? {
                Some(v) => v,
                None => return Ok(false),
            };
        }
    }

    // ---- reads ----

    pub async fn get_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        Ok(self
            .subscriptions
            .find_by_id(subscription_id)
            .await?
            .map(|v| v.value))
    }

    pub async fn get_subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>> {
        self.subscriptions.find_by_user(user_id).await
    }

    // ---- helpers ----

    async fn load(&self, subscription_id: &str) -> Result<Versioned<Subscription>> {
        self.subscriptions
            .find_by_id(subscription_id)
            .await?
            .ok_or_else(|| {
                MembershipError::not_found(format!(
                    "subscription {subscription_id} does not exist"
                ))
            })
    }

    async fn plan_for(&self, subscription: &Subscription) -> Result<MembershipPlan> {
        self.plans
            .find_by_id(&subscription.plan_id)
            .await?
            .ok_or_else(|| {
                MembershipError::invalid_state(format!(
                    "plan {} missing for subscription {}",
                    subscription.plan_id, subscription.id
                ))
            })
    }
}

/// Builder for [`MembershipEngine`].
#[derive(Default)]
pub struct MembershipEngineBuilder {
    subscriptions: Option<Arc<dyn SubscriptionStore>>,
    plans: Option<Arc<dyn PlanStore>>,
    users: Option<Arc<dyn UserStore>>,
    evaluator: Option<Arc<dyn TierEvaluator>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdSource>>,
}

impl MembershipEngineBuilder {
    #[must_use]
    pub fn with_subscription_store(mut self, store: Arc<dyn SubscriptionStore>) -> Self {
        self.subscriptions = Some(store);
        self
    }

    #[must_use]
    pub fn with_plan_store(mut self, store: Arc<dyn PlanStore>) -> Self {
        self.plans = Some(store);
        self
    }

    #[must_use]
    pub fn with_user_store(mut self, store: Arc<dyn UserStore>) -> Self {
        self.users = Some(store);
        self
    }

    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn TierEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = Some(ids);
        self
    }

    #[must_use]
    pub fn build(self) -> MembershipEngine {
        MembershipEngine {
            subscriptions: self
                .subscriptions
                .unwrap_or_else(|| Arc::new(InMemorySubscriptionStore::new())),
            plans: self.plans.unwrap_or_else(|| Arc::new(InMemoryPlanStore::new())),
            users: self.users.unwrap_or_else(|| Arc::new(InMemoryUserStore::new())),
            evaluator: self
                .evaluator
                .unwrap_or_else(|| Arc::new(ThresholdTierEvaluator)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            ids: self.ids.unwrap_or_else(|| Arc::new(SequenceIds::new())),
            user_locks: UserLocks::default(),
        }
    }
}
