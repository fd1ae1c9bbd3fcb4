//! Fluent builder for membership plans.
//!
//! # Example
//!
//! ```rust
//! use clubhouse::{Benefit, MembershipPlan, PlanDuration};
//!
//! let monthly = MembershipPlan::builder("MONTHLY")
//!     .description("Monthly membership")
//!     .price_in_inr(199)
//!     .duration(PlanDuration::Months(1))
//!     .tier("SILVER", "Silver")
//!         .benefit(Benefit::free_delivery(100))
//!         .benefit(Benefit::discount_percent(5))
//!         .done()
//!     .tier("GOLD", "Gold")
//!         .benefit(Benefit::discount_percent(10))
//!         .done()
//!     .build();
//!
//! assert!(monthly.has_tier("GOLD"));
//! ```

use crate::clock::PlanDuration;

use super::model::{Benefit, MembershipPlan, Tier};

/// Builder for a single plan. Created via [`MembershipPlan::builder`].
#[derive(Debug)]
pub struct PlanBuilder {
    id: String,
    description: String,
    price_in_inr: u32,
    duration: PlanDuration,
    tiers: Vec<Tier>,
}

impl PlanBuilder {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            price_in_inr: 0,
            duration: PlanDuration::Months(1),
            tiers: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn price_in_inr(mut self, price: u32) -> Self {
        self.price_in_inr = price;
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: PlanDuration) -> Self {
        self.duration = duration;
        self
    }

    /// Start defining a tier of this plan. Tier order is preserved.
    #[must_use]
    pub fn tier(self, id: impl Into<String>, name: impl Into<String>) -> TierBuilder {
        TierBuilder {
            parent: self,
            id: id.into(),
            name: name.into(),
            benefits: Vec::new(),
        }
    }

    /// Add a pre-built tier.
    #[must_use]
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Finish the plan.
    #[must_use]
    pub fn build(self) -> MembershipPlan {
        MembershipPlan::new(
            self.id,
            self.description,
            self.price_in_inr,
            self.duration,
            self.tiers,
        )
    }
}

/// Builder for a tier within a plan. Call [`TierBuilder::done`] to return to
/// the plan builder.
#[derive(Debug)]
pub struct TierBuilder {
    parent: PlanBuilder,
    id: String,
    name: String,
    benefits: Vec<Benefit>,
}

impl TierBuilder {
    #[must_use]
    pub fn benefit(mut self, benefit: Benefit) -> Self {
        self.benefits.push(benefit);
        self
    }

    /// Finish this tier and continue with the plan.
    #[must_use]
    pub fn done(self) -> PlanBuilder {
        let mut parent = self.parent;
        parent.tiers.push(Tier::new(self.id, self.name, self.benefits));
        parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assembles_plan_in_order() {
        let plan = MembershipPlan::builder("YEARLY")
            .description("Yearly membership")
            .price_in_inr(1799)
            .duration(PlanDuration::Years(1))
            .tier("SILVER", "Silver")
                .benefit(Benefit::free_delivery(100))
                .done()
            .tier("GOLD", "Gold")
                .benefit(Benefit::free_delivery(0))
                .benefit(Benefit::early_access())
                .done()
            .build();

        assert_eq!(plan.id, "YEARLY");
        assert_eq!(plan.price_in_inr, 1799);
        assert_eq!(plan.duration, PlanDuration::Years(1));
        assert_eq!(
            plan.tiers.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["SILVER", "GOLD"]
        );
        assert_eq!(plan.tier("GOLD").unwrap().benefits.len(), 2);
    }

    #[test]
    fn with_tier_accepts_prebuilt_tiers() {
        let gold = Tier::new("GOLD", "Gold", vec![Benefit::priority_support()]);
        let plan = MembershipPlan::builder("MONTHLY")
            .description("Monthly membership")
            .with_tier(gold)
            .build();
        assert!(plan.has_tier("GOLD"));
    }
}
