//! Domain model for membership plans and subscriptions.
//!
//! Plans, tiers and benefits are immutable catalog data; a [`Subscription`]
//! is the one mutable entity, and only the lifecycle engine mutates it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::PlanDuration;

/// A registered member. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

impl User {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The kind of perk a benefit grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitKind {
    Delivery,
    Discount,
    EarlyAccess,
    Support,
}

/// A concrete perk granted by a tier. Immutable value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benefit {
    pub id: String,
    pub description: String,
    pub kind: BenefitKind,
    /// Numeric parameter; meaning depends on the kind (threshold, percent).
    /// Zero for flag-style benefits.
    pub value: i64,
}

impl Benefit {
    /// Free delivery on orders above `threshold` (0 = always free).
    #[must_use]
    pub fn free_delivery(threshold: i64) -> Self {
        Self {
            id: "FREE_DELIVERY".to_string(),
            description: format!("Free delivery over {threshold}"),
            kind: BenefitKind::Delivery,
            value: threshold,
        }
    }

    #[must_use]
    pub fn discount_percent(percent: i64) -> Self {
        Self {
            id: "DISCOUNT_PERCENT".to_string(),
            description: format!("{percent}% discount"),
            kind: BenefitKind::Discount,
            value: percent,
        }
    }

    #[must_use]
    pub fn early_access() -> Self {
        Self {
            id: "EARLY_ACCESS".to_string(),
            description: "Early access to deals".to_string(),
            kind: BenefitKind::EarlyAccess,
            value: 0,
        }
    }

    #[must_use]
    pub fn priority_support() -> Self {
        Self {
            id: "PRIORITY_SUPPORT".to_string(),
            description: "Priority customer support".to_string(),
            kind: BenefitKind::Support,
            value: 0,
        }
    }
}

impl fmt::Display for Benefit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.id, self.description)
    }
}

/// A named benefit level within one plan.
///
/// Tier ids are scoped to their owning plan: `"GOLD"` in two different plans
/// is two different tiers that happen to share an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: String,
    pub name: String,
    pub benefits: Vec<Benefit>,
}

impl Tier {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, benefits: Vec<Benefit>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            benefits,
        }
    }

    /// One-line render for listings.
    #[must_use]
    pub fn brief(&self) -> String {
        let benefits = self
            .benefits
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} [{}]: {benefits}", self.name, self.id)
    }
}

/// A purchasable membership offering. Immutable; owns its tiers by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipPlan {
    pub id: String,
    pub description: String,
    pub price_in_inr: u32,
    pub duration: PlanDuration,
    pub tiers: Vec<Tier>,
}

impl MembershipPlan {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        price_in_inr: u32,
        duration: PlanDuration,
        tiers: Vec<Tier>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            price_in_inr,
            duration,
            tiers,
        }
    }

    /// Start building a plan with the fluent builder.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> super::plans::PlanBuilder {
        super::plans::PlanBuilder::new(id)
    }

    /// Look up a tier of this plan by id.
    #[must_use]
    pub fn tier(&self, tier_id: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.id == tier_id)
    }

    #[must_use]
    pub fn has_tier(&self, tier_id: &str) -> bool {
        self.tier(tier_id).is_some()
    }

    /// One-line render for listings.
    #[must_use]
    pub fn brief(&self) -> String {
        format!(
            "{} - {} - ₹{} - {}",
            self.id, self.description, self.price_in_inr, self.duration
        )
    }
}

/// Lifecycle status of a subscription.
///
/// `Cancelled` and `Expired` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A user's enrollment in a plan at a tier.
///
/// `tier_id`, `expires_at` and `status` change while the subscription is
/// active; every other field is fixed at creation. Subscriptions are never
/// deleted by normal flow, so terminal records remain for history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub tier_id: String,
    pub start_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: SubscriptionStatus,
}

impl Subscription {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Active and past its expiry instant (inclusive).
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.expires_at <= now
    }

    /// One-line render for listings.
    #[must_use]
    pub fn brief(&self) -> String {
        format!(
            "{} [{}] plan={} tier={} expires={}",
            self.id, self.status, self.plan_id, self.tier_id, self.expires_at
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subscription(status: SubscriptionStatus) -> Subscription {
        Subscription {
            id: "sub-1".to_string(),
            user_id: "user-1".to_string(),
            plan_id: "MONTHLY".to_string(),
            tier_id: "SILVER".to_string(),
            start_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            expires_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            status,
        }
    }

    #[test]
    fn due_requires_active_and_past_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert!(subscription(SubscriptionStatus::Active).is_due(now));
        assert!(!subscription(SubscriptionStatus::Cancelled).is_due(now));
        let earlier = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();
        assert!(!subscription(SubscriptionStatus::Active).is_due(earlier));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!SubscriptionStatus::Active.is_terminal());
        assert!(SubscriptionStatus::Cancelled.is_terminal());
        assert!(SubscriptionStatus::Expired.is_terminal());
    }

    #[test]
    fn tier_lookup_is_scoped_to_the_plan() {
        let plan = MembershipPlan::new(
            "MONTHLY",
            "Monthly membership",
            199,
            PlanDuration::Months(1),
            vec![Tier::new("SILVER", "Silver", vec![Benefit::discount_percent(5)])],
        );
        assert!(plan.has_tier("SILVER"));
        assert!(!plan.has_tier("GOLD"));
        assert_eq!(plan.tier("SILVER").unwrap().name, "Silver");
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let back: SubscriptionStatus = serde_json::from_str("\"expired\"").unwrap();
        assert_eq!(back, SubscriptionStatus::Expired);
    }

    #[test]
    fn briefs_render_one_line() {
        let tier = Tier::new(
            "GOLD",
            "Gold",
            vec![Benefit::free_delivery(0), Benefit::early_access()],
        );
        assert_eq!(
            tier.brief(),
            "Gold [GOLD]: FREE_DELIVERY(Free delivery over 0), EARLY_ACCESS(Early access to deals)"
        );
    }
}
