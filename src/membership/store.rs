//! Storage capabilities for membership entities.
//!
//! The engine talks to storage only through these traits. In-memory
//! implementations are provided; they hold no business logic.
//!
//! Subscription writes are versioned: every successful write bumps the
//! record's version, and [`SubscriptionStore::compare_and_save`] only applies
//! when the caller's version token still matches. The engine builds all of
//! its mutations on that compare-and-swap, which is what gives each
//! subscription exclusive-access semantics without a global lock.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{MembershipError, Result};

use super::model::{MembershipPlan, Subscription, User};

/// A snapshot of a stored record plus the version token to pass back to
/// [`SubscriptionStore::compare_and_save`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Storage for users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn save(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_all(&self) -> Result<Vec<User>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Storage for membership plans.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn save(&self, plan: &MembershipPlan) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<MembershipPlan>>;
    async fn find_all(&self) -> Result<Vec<MembershipPlan>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Storage for subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert a new subscription at version 1.
    ///
    /// Fails with `Conflict` if the id is already taken.
    async fn save(&self, subscription: &Subscription) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Versioned<Subscription>>>;

    /// All subscriptions for a user, any status.
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Subscription>>;

    async fn find_all(&self) -> Result<Vec<Versioned<Subscription>>>;

    /// Write `subscription` only if the stored version still equals
    /// `expected_version`.
    ///
    /// Returns `Ok(true)` on success (version bumped), `Ok(false)` if another
    /// writer got there first. Must be atomic: implementations may not let a
    /// concurrent write interleave between the version check and the write.
    /// Fails with `NotFound` if the record no longer exists.
    async fn compare_and_save(
        &self,
        subscription: &Subscription,
        expected_version: u64,
    ) -> Result<bool>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory user storage.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn save(&self, user: &User) -> Result<()> {
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.users.write().await.remove(id);
        Ok(())
    }
}

/// In-memory plan storage.
#[derive(Debug, Default)]
pub struct InMemoryPlanStore {
    plans: RwLock<HashMap<String, MembershipPlan>>,
}

impl InMemoryPlanStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn save(&self, plan: &MembershipPlan) -> Result<()> {
        self.plans
            .write()
            .await
            .insert(plan.id.clone(), plan.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MembershipPlan>> {
        Ok(self.plans.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<MembershipPlan>> {
        Ok(self.plans.read().await.values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.plans.write().await.remove(id);
        Ok(())
    }
}

/// In-memory subscription storage with atomic versioned writes.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: RwLock<HashMap<String, Versioned<Subscription>>>,
}

impl InMemorySubscriptionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn save(&self, subscription: &Subscription) -> Result<()> {
        let mut subs = self.subscriptions.write().await;
        if subs.contains_key(&subscription.id) {
            return Err(MembershipError::conflict(format!(
                "subscription {} already exists",
                subscription.id
            )));
        }
        subs.insert(
            subscription.id.clone(),
            Versioned {
                value: subscription.clone(),
                version: 1,
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Versioned<Subscription>>> {
        Ok(self.subscriptions.read().await.get(id).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|v| v.value.user_id == user_id)
            .map(|v| v.value.clone())
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Versioned<Subscription>>> {
        Ok(self.subscriptions.read().await.values().cloned().collect())
    }

    async fn compare_and_save(
        &self,
        subscription: &Subscription,
        expected_version: u64,
    ) -> Result<bool> {
        // Check and write under one write guard, so the version cannot move
        // between them.
        let mut subs = self.subscriptions.write().await;
        match subs.get_mut(&subscription.id) {
            Some(stored) if stored.version == expected_version => {
                stored.value = subscription.clone();
                stored.version += 1;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(MembershipError::not_found(format!(
                "subscription {} does not exist",
                subscription.id
            ))),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.subscriptions.write().await.remove(id);
        Ok(())
    }
}
