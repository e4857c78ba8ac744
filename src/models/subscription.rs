use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::UNLIMITED_BACKUPS;

/// Billing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Business,
}

/// Quota values a plan grants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanLimits {
    pub max_backups: i32,
    pub max_storage_gb: f64,
    pub max_backup_size_gb: f64,
    pub retention_days: i32,
}

impl Plan {
    pub fn limits(self) -> PlanLimits {
        match self {
            Plan::Free => PlanLimits {
                max_backups: 3,
                max_storage_gb: 1.0,
                max_backup_size_gb: 1.0,
                retention_days: 7,
            },
            Plan::Pro => PlanLimits {
                max_backups: 10,
                max_storage_gb: 5.0,
                max_backup_size_gb: 2.0,
                retention_days: 30,
            },
            Plan::Business => PlanLimits {
                max_backups: UNLIMITED_BACKUPS,
                max_storage_gb: 20.0,
                max_backup_size_gb: 5.0,
                retention_days: 180,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: Plan,
    pub max_backups: i32,
    pub max_storage_gb: f64,
    pub max_backup_size_gb: f64,
    pub retention_days: i32,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// A subscription carrying the default limits of `plan`
    pub fn for_plan(user_id: Uuid, plan: Plan, now: DateTime<Utc>) -> Self {
        let mut subscription = Self {
            id: Uuid::new_v4(),
            user_id,
            plan,
            max_backups: 0,
            max_storage_gb: 0.0,
            max_backup_size_gb: 0.0,
            retention_days: 0,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            current_period_end: None,
            created_at: now,
            updated_at: now,
        };
        subscription.apply_plan(plan);
        subscription
    }

    pub fn apply_plan(&mut self, plan: Plan) {
        let limits = plan.limits();
        self.plan = plan;
        self.max_backups = limits.max_backups;
        self.max_storage_gb = limits.max_storage_gb;
        self.max_backup_size_gb = limits.max_backup_size_gb;
        self.retention_days = limits.retention_days;
    }

    pub fn has_unlimited_backups(&self) -> bool {
        self.max_backups < 0
    }
}

/// Plan change applied to the subscription holding a Stripe subscription id
#[derive(Debug, Clone, PartialEq)]
pub struct PlanUpdate {
    pub plan: Plan,
    pub current_period_end: Option<DateTime<Utc>>,
    /// Clear `stripe_subscription_id` (cancellation)
    pub detach_stripe_subscription: bool,
}

impl PlanUpdate {
    pub fn change(plan: Plan, current_period_end: Option<DateTime<Utc>>) -> Self {
        Self {
            plan,
            current_period_end,
            detach_stripe_subscription: false,
        }
    }

    pub fn downgrade_to_free() -> Self {
        Self {
            plan: Plan::Free,
            current_period_end: None,
            detach_stripe_subscription: true,
        }
    }

    pub fn apply(&self, subscription: &mut Subscription, now: DateTime<Utc>) {
        subscription.apply_plan(self.plan);
        subscription.current_period_end = self.current_period_end;
        if self.detach_stripe_subscription {
            subscription.stripe_subscription_id = None;
        }
        subscription.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_limits() {
        let free = Plan::Free.limits();
        assert_eq!(free.max_backups, 3);
        assert_eq!(free.max_storage_gb, 1.0);

        let business = Plan::Business.limits();
        assert_eq!(business.max_backups, UNLIMITED_BACKUPS);
        assert_eq!(business.retention_days, 180);
    }

    #[test]
    fn test_downgrade_detaches_stripe() {
        let now = Utc::now();
        let mut sub = Subscription::for_plan(Uuid::new_v4(), Plan::Pro, now);
        sub.stripe_subscription_id = Some("sub_123".to_string());
        sub.current_period_end = Some(now);

        PlanUpdate::downgrade_to_free().apply(&mut sub, now);

        assert_eq!(sub.plan, Plan::Free);
        assert_eq!(sub.max_backups, 3);
        assert!(sub.stripe_subscription_id.is_none());
        assert!(sub.current_period_end.is_none());
    }
}
