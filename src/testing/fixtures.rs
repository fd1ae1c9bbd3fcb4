//! Seed data for demos and tests.

use crate::clock::PlanDuration;
use crate::error::Result;
use crate::membership::engine::MembershipEngine;
use crate::membership::model::{Benefit, MembershipPlan, User};

/// The demo user seeded by [`seed_catalog`].
#[must_use]
pub fn demo_user() -> User {
    User::new("user-1", "Demo User")
}

/// Seed the demo catalog: MONTHLY and YEARLY plans, each with
/// SILVER/GOLD/PLATINUM tiers, plus one demo user.
pub async fn seed_catalog(engine: &MembershipEngine) -> Result<()> {
    engine
        .create_plan(plan("MONTHLY", "Monthly membership", 199, PlanDuration::Months(1)))
        .await?;
    engine
        .create_plan(plan("YEARLY", "Yearly membership", 1799, PlanDuration::Years(1)))
        .await?;
    engine.create_user(demo_user()).await?;
    Ok(())
}

fn plan(id: &str, description: &str, price: u32, duration: PlanDuration) -> MembershipPlan {
    MembershipPlan::builder(id)
        .description(description)
        .price_in_inr(price)
        .duration(duration)
        .tier("SILVER", "Silver")
            .benefit(Benefit::free_delivery(100))
            .benefit(Benefit::discount_percent(5))
            .done()
        .tier("GOLD", "Gold")
            .benefit(Benefit::free_delivery(0))
            .benefit(Benefit::discount_percent(10))
            .benefit(Benefit::early_access())
            .done()
        .tier("PLATINUM", "Platinum")
            .benefit(Benefit::free_delivery(0))
            .benefit(Benefit::discount_percent(15))
            .benefit(Benefit::early_access())
            .benefit(Benefit::priority_support())
            .done()
        .build()
}
