use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::packages::models::CommissionRule;

/// Division of a package price into the company's cut and the coach's cut
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CommissionSplit {
    #[schema(value_type = f64)]
    pub company_cut: Decimal,
    #[schema(value_type = f64)]
    pub coach_cut: Decimal,
}

/// Error types for commission calculation inputs
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommissionError {
    #[error("Price must not be negative, got {0}")]
    NegativePrice(Decimal),

    #[error("Session count must not be negative, got {0}")]
    NegativeSessionCount(i32),

    #[error("Flat commission amount must not be negative, got {0}")]
    NegativeFlatAmount(Decimal),

    #[error("Commission percent must be between 0 and 100, got {0}")]
    PercentOutOfRange(Decimal),
}

/// Service for computing commission splits
pub struct CommissionCalculator;

impl CommissionCalculator {
    /// Compute the commission split for a package sale
    ///
    /// # Arguments
    /// * `price` - Total sale price of the package
    /// * `rule` - Commission rule, or None when the full price goes to the coach
    /// * `session_count` - Number of sessions the package is worth
    ///
    /// # Returns
    /// The (company cut, coach cut) pair, or a validation error. Inputs are
    /// rejected here, before any ledger or aggregate mutation.
    ///
    /// # Split rules
    /// - No rule: company 0, coach takes the full price
    /// - FlatPerSession(amount): company = amount * session_count; the coach
    ///   cut floors at zero, so conservation holds only while the company
    ///   cut stays within the price
    /// - PercentOfPrice(percent): company = price * percent / 100, and
    ///   company + coach == price exactly
    pub fn split(
        price: Decimal,
        rule: Option<&CommissionRule>,
        session_count: i32,
    ) -> Result<CommissionSplit, CommissionError> {
        if price < Decimal::ZERO {
            return Err(CommissionError::NegativePrice(price));
        }
        if session_count < 0 {
            return Err(CommissionError::NegativeSessionCount(session_count));
        }

        let split = match rule {
            None => CommissionSplit {
                company_cut: Decimal::ZERO,
                coach_cut: price,
            },
            Some(CommissionRule::FlatPerSession(amount)) => {
                if *amount < Decimal::ZERO {
                    return Err(CommissionError::NegativeFlatAmount(*amount));
                }
                let company_cut = *amount * Decimal::from(session_count);
                CommissionSplit {
                    company_cut,
                    coach_cut: (price - company_cut).max(Decimal::ZERO),
                }
            }
            Some(CommissionRule::PercentOfPrice(percent)) => {
                if *percent < Decimal::ZERO || *percent > Decimal::ONE_HUNDRED {
                    return Err(CommissionError::PercentOutOfRange(*percent));
                }
                let company_cut = price * *percent / Decimal::ONE_HUNDRED;
                CommissionSplit {
                    company_cut,
                    coach_cut: price - company_cut,
                }
            }
        };

        Ok(split)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Conservation invariant for percent rules: the two cuts always sum
    /// back to the price, exactly.
    #[test]
    fn prop_percent_split_conserves_price() {
        proptest!(|(
            price_cents in 0i64..=10_000_000,
            percent in 0u32..=100,
            session_count in 0i32..=500
        )| {
            let price = Decimal::new(price_cents, 2);
            let rule = CommissionRule::PercentOfPrice(Decimal::from(percent));
            let split = CommissionCalculator::split(price, Some(&rule), session_count).unwrap();

            prop_assert_eq!(split.company_cut + split.coach_cut, price);
        });
    }

    /// Both cuts are non-negative for all accepted inputs
    #[test]
    fn prop_cuts_are_non_negative() {
        proptest!(|(
            price_cents in 0i64..=10_000_000,
            amount_cents in 0i64..=100_000,
            session_count in 0i32..=500
        )| {
            let price = Decimal::new(price_cents, 2);
            let rule = CommissionRule::FlatPerSession(Decimal::new(amount_cents, 2));
            let split = CommissionCalculator::split(price, Some(&rule), session_count).unwrap();

            prop_assert!(split.company_cut >= Decimal::ZERO);
            prop_assert!(split.coach_cut >= Decimal::ZERO);
        });
    }

    /// Flat rules conserve the price exactly while the company cut stays
    /// within it; beyond that the coach cut floors at zero.
    #[test]
    fn prop_flat_split_conserves_until_clamp() {
        proptest!(|(
            price_cents in 0i64..=1_000_000,
            amount_cents in 0i64..=50_000,
            session_count in 0i32..=100
        )| {
            let price = Decimal::new(price_cents, 2);
            let amount = Decimal::new(amount_cents, 2);
            let rule = CommissionRule::FlatPerSession(amount);
            let split = CommissionCalculator::split(price, Some(&rule), session_count).unwrap();

            prop_assert_eq!(split.company_cut, amount * Decimal::from(session_count));
            if split.company_cut <= price {
                prop_assert_eq!(split.company_cut + split.coach_cut, price);
            } else {
                prop_assert_eq!(split.coach_cut, Decimal::ZERO);
            }
        });
    }

    /// Splitting with no rule is identical to a zero-valued rule
    #[test]
    fn prop_absent_rule_equals_zero_rule() {
        proptest!(|(
            price_cents in 0i64..=10_000_000,
            session_count in 0i32..=500
        )| {
            let price = Decimal::new(price_cents, 2);
            let none = CommissionCalculator::split(price, None, session_count).unwrap();
            let zero_percent = CommissionCalculator::split(
                price,
                Some(&CommissionRule::PercentOfPrice(Decimal::ZERO)),
                session_count,
            ).unwrap();
            let zero_flat = CommissionCalculator::split(
                price,
                Some(&CommissionRule::FlatPerSession(Decimal::ZERO)),
                session_count,
            ).unwrap();

            prop_assert_eq!(none, zero_percent);
            prop_assert_eq!(none, zero_flat);
        });
    }
}
