use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Denormalized running totals for one coach
///
/// pending_commission_total must always equal the sum of company cuts over
/// the coach's currently approved packages. It is maintained by signed
/// deltas, never recomputed in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CoachAggregate {
    pub coach_id: i32,
    #[schema(value_type = f64)]
    pub pending_commission_total: Decimal,
    pub active_member_count: i32,
    pub total_sessions_delivered: i32,
    pub updated_at: DateTime<Utc>,
}

impl CoachAggregate {
    /// Zeroed aggregate for a coach without a row yet
    pub fn empty(coach_id: i32) -> Self {
        Self {
            coach_id,
            pending_commission_total: Decimal::ZERO,
            active_member_count: 0,
            total_sessions_delivered: 0,
            updated_at: Utc::now(),
        }
    }

    /// Apply a signed delta in memory. The persisted upsert performs the
    /// same arithmetic; this form exists so the delta discipline can be
    /// tested without a database.
    pub fn apply(&mut self, delta: &AggregateDelta) {
        self.pending_commission_total += delta.commission;
        self.active_member_count += delta.active_members;
        self.total_sessions_delivered += delta.sessions_delivered;
    }
}

/// Signed change to a coach aggregate
///
/// Every mutation path builds one of these and hands it to the reconciler;
/// nothing else touches the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateDelta {
    pub commission: Decimal,
    pub active_members: i32,
    pub sessions_delivered: i32,
}

impl AggregateDelta {
    /// Delta adjusting the commission total only
    pub fn commission(amount: Decimal) -> Self {
        Self {
            commission: amount,
            ..Self::default()
        }
    }

    /// Delta adjusting the active member count only
    pub fn members(count: i32) -> Self {
        Self {
            active_members: count,
            ..Self::default()
        }
    }

    /// Delta adjusting the delivered session count only
    pub fn sessions(count: i32) -> Self {
        Self {
            sessions_delivered: count,
            ..Self::default()
        }
    }

    /// Combine two deltas into one
    pub fn combine(self, other: Self) -> Self {
        Self {
            commission: self.commission + other.commission,
            active_members: self.active_members + other.active_members,
            sessions_delivered: self.sessions_delivered + other.sessions_delivered,
        }
    }

    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_apply_single_delta() {
        let mut agg = CoachAggregate::empty(1);
        agg.apply(&AggregateDelta::commission(dec!(400)));

        assert_eq!(agg.pending_commission_total, dec!(400));
        assert_eq!(agg.active_member_count, 0);
        assert_eq!(agg.total_sessions_delivered, 0);
    }

    #[test]
    fn test_apply_negative_delta_reverses() {
        let mut agg = CoachAggregate::empty(1);
        agg.apply(&AggregateDelta::commission(dec!(400)));
        agg.apply(&AggregateDelta::commission(dec!(-400)));

        assert_eq!(agg.pending_commission_total, Decimal::ZERO);
    }

    #[test]
    fn test_combine_merges_componentwise() {
        let delta = AggregateDelta::commission(dec!(250))
            .combine(AggregateDelta::members(1))
            .combine(AggregateDelta::sessions(-2));

        assert_eq!(delta.commission, dec!(250));
        assert_eq!(delta.active_members, 1);
        assert_eq!(delta.sessions_delivered, -2);
    }

    #[test]
    fn test_is_noop() {
        assert!(AggregateDelta::default().is_noop());
        assert!(!AggregateDelta::members(1).is_noop());
        assert!(!AggregateDelta::commission(dec!(0.01)).is_noop());
    }

    #[test]
    fn test_combined_apply_equals_sequential_apply() {
        let a = AggregateDelta::commission(dec!(100)).combine(AggregateDelta::sessions(1));
        let b = AggregateDelta::commission(dec!(-40)).combine(AggregateDelta::members(1));

        let mut sequential = CoachAggregate::empty(1);
        sequential.apply(&a);
        sequential.apply(&b);

        let mut combined = CoachAggregate::empty(1);
        combined.apply(&a.combine(b));

        assert_eq!(
            sequential.pending_commission_total,
            combined.pending_commission_total
        );
        assert_eq!(sequential.active_member_count, combined.active_member_count);
        assert_eq!(
            sequential.total_sessions_delivered,
            combined.total_sessions_delivered
        );
    }
}
