// Credit ledger
//
// Owns every mutation of a member's remaining-session balance. Grants come
// from package approval, debits and refunds from bookings. Each mutation is
// journaled in credit_entries inside the caller's transaction; the journal's
// unique keys are what turn a replayed request into AlreadyApplied instead
// of a second balance change.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::members::error::LedgerError;
use crate::members::models::CreditEntryKind;

/// Service for member credit balance operations
pub struct CreditLedger;

impl CreditLedger {
    /// Grant credits to a member for an admitted package
    ///
    /// Journaled under (package_id, grant): a package can only ever grant
    /// once, a replay fails with `AlreadyApplied`.
    pub async fn grant(
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
        package_id: Uuid,
        amount: i32,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO credit_entries (member_id, package_id, kind, amount)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(member_id)
        .bind(package_id)
        .bind(CreditEntryKind::Grant)
        .bind(amount)
        .execute(&mut **tx)
        .await
        .map_err(LedgerError::from_sqlx)?;

        let result = sqlx::query(
            "UPDATE members SET remaining_credits = remaining_credits + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(amount)
        .bind(member_id)
        .execute(&mut **tx)
        .await
        .map_err(LedgerError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::MemberNotFound(member_id));
        }

        tracing::debug!("Granted {} credits to member {}", amount, member_id);
        Ok(())
    }

    /// Debit credits from a member for a booking
    ///
    /// The balance check and the decrement are one conditional UPDATE, so
    /// two concurrent bookings can never both consume the same last credit.
    /// Journaled under (event_id, participant_id, debit).
    pub async fn debit(
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
        event_id: Uuid,
        participant_id: Uuid,
        amount: i32,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO credit_entries (member_id, event_id, participant_id, kind, amount)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(member_id)
        .bind(event_id)
        .bind(participant_id)
        .bind(CreditEntryKind::Debit)
        .bind(amount)
        .execute(&mut **tx)
        .await
        .map_err(LedgerError::from_sqlx)?;

        let result = sqlx::query(
            r#"
            UPDATE members
            SET remaining_credits = remaining_credits - $1, updated_at = NOW()
            WHERE id = $2 AND remaining_credits >= $1
            "#,
        )
        .bind(amount)
        .bind(member_id)
        .execute(&mut **tx)
        .await
        .map_err(LedgerError::from_sqlx)?;

        if result.rows_affected() == 0 {
            let exists: Option<bool> =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE id = $1)")
                    .bind(member_id)
                    .fetch_one(&mut **tx)
                    .await
                    .map_err(LedgerError::from_sqlx)?;

            if exists.unwrap_or(false) {
                return Err(LedgerError::InsufficientCredit { member_id });
            }
            return Err(LedgerError::MemberNotFound(member_id));
        }

        tracing::debug!("Debited {} credit(s) from member {}", amount, member_id);
        Ok(())
    }

    /// Refund credits to a member for a removed or cancelled booking
    ///
    /// Only called when the operator explicitly chose to refund; a skipped
    /// refund leaves the credit burned. Journaled under
    /// (event_id, participant_id, refund).
    pub async fn refund(
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
        event_id: Uuid,
        participant_id: Uuid,
        amount: i32,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO credit_entries (member_id, event_id, participant_id, kind, amount)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(member_id)
        .bind(event_id)
        .bind(participant_id)
        .bind(CreditEntryKind::Refund)
        .bind(amount)
        .execute(&mut **tx)
        .await
        .map_err(LedgerError::from_sqlx)?;

        let result = sqlx::query(
            "UPDATE members SET remaining_credits = remaining_credits + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(amount)
        .bind(member_id)
        .execute(&mut **tx)
        .await
        .map_err(LedgerError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::MemberNotFound(member_id));
        }

        tracing::debug!("Refunded {} credit(s) to member {}", amount, member_id);
        Ok(())
    }

    /// Overwrite a member's balance when the governing package changes
    /// (edit of the current package, or fallback after a delete). Not
    /// journaled: the new balance is derived from package state, not from a
    /// booking, and carries no replay risk.
    pub async fn reset_remaining(
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
        remaining: i32,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query(
            "UPDATE members SET remaining_credits = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(remaining.max(0))
        .bind(member_id)
        .execute(&mut **tx)
        .await
        .map_err(LedgerError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::MemberNotFound(member_id));
        }

        Ok(())
    }

    /// Whether a debit was ever journaled for this booking key. Used to
    /// distinguish a replayed removal from a removal of something that never
    /// existed.
    pub async fn booking_debit_exists(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        participant_id: Uuid,
    ) -> Result<bool, LedgerError> {
        let exists: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM credit_entries
                WHERE event_id = $1 AND participant_id = $2 AND kind = $3
            )
            "#,
        )
        .bind(event_id)
        .bind(participant_id)
        .bind(CreditEntryKind::Debit)
        .fetch_one(&mut **tx)
        .await
        .map_err(LedgerError::from_sqlx)?;

        Ok(exists.unwrap_or(false))
    }

    /// Remaining credits after an approved package is edited to a new
    /// session count: sessions already consumed stay consumed.
    ///
    /// consumed = old_count - remaining, new balance = new_count - consumed,
    /// floored at zero.
    pub fn remaining_after_edit(old_count: i32, new_count: i32, remaining: i32) -> i32 {
        let consumed = (old_count - remaining).max(0);
        (new_count - consumed).max(0)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    // Two ledger properties need a live database and belong to the
    // integration suite:
    //
    // Non-negative balance: after any sequence of grant/debit/refund calls
    // that individually respected their preconditions, remaining_credits is
    // never observed negative. The conditional UPDATE in debit() and the
    // CHECK constraint on the members table enforce this; the integration
    // test hammers one member with concurrent debits of the last credit and
    // asserts exactly one succeeds.
    //
    // Refund/debit inverse: debit(m, k) followed by refund(m, k) with fresh
    // journal keys returns remaining_credits to its pre-debit value for any
    // valid k within the prior balance.

    /// The edited balance is never negative and never exceeds the new count
    #[test]
    fn prop_edited_balance_stays_in_range() {
        proptest!(|(
            old_count in 1i32..=500,
            new_count in 1i32..=500,
            consumed in 0i32..=500
        )| {
            let remaining = (old_count - consumed).max(0);
            let result = CreditLedger::remaining_after_edit(old_count, new_count, remaining);

            prop_assert!(result >= 0);
            prop_assert!(result <= new_count);
        });
    }

    /// Editing to the same session count leaves the balance unchanged
    #[test]
    fn prop_identity_edit_preserves_balance() {
        proptest!(|(
            count in 1i32..=500,
            consumed in 0i32..=500
        )| {
            let remaining = (count - consumed).max(0);
            prop_assert_eq!(
                CreditLedger::remaining_after_edit(count, count, remaining),
                remaining
            );
        });
    }

    /// Consumed sessions are preserved by the edit arithmetic
    #[test]
    fn prop_consumed_sessions_stay_consumed() {
        proptest!(|(
            old_count in 1i32..=500,
            new_count in 1i32..=500,
            consumed_input in 0i32..=500
        )| {
            let consumed = consumed_input.min(old_count);
            let remaining = old_count - consumed;
            let result = CreditLedger::remaining_after_edit(old_count, new_count, remaining);

            // Whatever the new count, the member never gets back more than
            // new_count - consumed.
            prop_assert_eq!(result, (new_count - consumed).max(0));
        });
    }
}
