use chrono::{Duration, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthenticatedActor;
use crate::auth::models::Role;
use crate::coaches::models::AggregateDelta;
use crate::coaches::reconciler::AggregateReconciler;
use crate::members::ledger::CreditLedger;
use crate::members::models::Member;
use crate::members::repository::MembersRepository;
use crate::packages::{
    ApprovalMachine, ApprovalStatus, CommissionCalculator, CreatePackageRequest,
    EditPackageRequest, NewPackage, Package, PackageError, PackageUpdate, PackagesRepository,
};

/// The package window runs from its effective start date for duration_days
/// calendar days, both ends inclusive.
fn effective_window(requested: Option<NaiveDate>, duration_days: i32) -> (NaiveDate, NaiveDate) {
    let start = requested.unwrap_or_else(|| Utc::now().date_naive());
    let end = start + Duration::days(i64::from(duration_days) - 1);
    (start, end)
}

/// Service for package sale, approval, edit and delete flows
///
/// Every operation that touches more than one entity (package + member,
/// package + coach aggregate) runs inside a single transaction, with the
/// member row locked first so concurrent writers queue in a fixed order.
#[derive(Clone)]
pub struct PackageService {
    pool: PgPool,
    members_repo: MembersRepository,
    packages_repo: PackagesRepository,
}

impl PackageService {
    /// Create a new PackageService
    pub fn new(
        pool: PgPool,
        members_repo: MembersRepository,
        packages_repo: PackagesRepository,
    ) -> Self {
        Self {
            pool,
            members_repo,
            packages_repo,
        }
    }

    /// Sell a new package to a member
    ///
    /// # Validation
    /// - Price, session count, duration and rule are validated before any
    ///   mutation
    /// - Admin actors create the package directly approved: the credit
    ///   grant, member window update and aggregate add happen in the same
    ///   transaction as the insert
    /// - Coach actors create the package pending: nothing is granted and no
    ///   aggregate change occurs until an admin approves it
    pub async fn create_package(
        &self,
        actor: &AuthenticatedActor,
        member_id: i32,
        request: CreatePackageRequest,
    ) -> Result<Package, PackageError> {
        request
            .validate()
            .map_err(|e| PackageError::ValidationError(e.to_string()))?;

        // Reject a bad commission rule before anything is written
        CommissionCalculator::split(
            request.price,
            request.commission_rule.as_ref(),
            request.session_count,
        )?;

        let mut tx = self.pool.begin().await?;

        let member = MembersRepository::tx_find_for_update(&mut tx, member_id)
            .await?
            .ok_or(PackageError::MemberNotFound(member_id))?;

        if !actor.can_manage(member.coach_id) {
            return Err(PackageError::Forbidden(
                "You do not have permission to sell packages to this member".to_string(),
            ));
        }

        let package = Self::create_in_tx(&mut tx, actor.role, &member, &request).await?;

        tx.commit().await?;

        tracing::info!(
            "Created package {} for member {} ({})",
            package.id,
            member_id,
            package.approval_status
        );
        Ok(package)
    }

    /// Insert a package for an already locked member row. Shared between
    /// package sales and member registration, which creates the member and
    /// its first package in one transaction.
    pub(crate) async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        role: Role,
        member: &Member,
        request: &CreatePackageRequest,
    ) -> Result<Package, PackageError> {
        let approved = role == Role::Admin;

        let (approval_status, start_date, end_date) = if approved {
            let (start, end) = effective_window(request.start_date, request.duration_days);
            (ApprovalStatus::Approved, Some(start), Some(end))
        } else {
            (ApprovalStatus::Pending, request.start_date, None)
        };

        let package = PackagesRepository::tx_insert(
            tx,
            NewPackage {
                member_id: member.id,
                coach_id: member.coach_id,
                price: request.price,
                session_count: request.session_count,
                duration_days: request.duration_days,
                start_date,
                end_date,
                rule: request.commission_rule,
                approval_status,
                payment_status: request.payment_status.unwrap_or_default(),
            },
        )
        .await?;

        MembersRepository::tx_adjust_package_count(tx, member.id, 1).await?;

        if approved {
            Self::admit_in_tx(tx, &package).await?;
        }

        Ok(package)
    }

    /// Admit an approved package into the ledger and aggregate: grant its
    /// credits, point the member at it, add its company cut. Runs exactly
    /// once per package; the grant journal key backstops that.
    async fn admit_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        package: &Package,
    ) -> Result<(), PackageError> {
        let rule = package.commission_rule();
        let split =
            CommissionCalculator::split(package.price, rule.as_ref(), package.session_count)?;

        CreditLedger::grant(tx, package.member_id, package.id, package.session_count).await?;

        MembersRepository::tx_set_current_package(
            tx,
            package.member_id,
            Some(package.id),
            package.start_date,
            package.end_date,
        )
        .await?;

        AggregateReconciler::reconcile(
            tx,
            package.coach_id,
            AggregateDelta::commission(split.company_cut),
        )
        .await?;

        Ok(())
    }

    /// Approve a pending package (admin only)
    ///
    /// Grants the package's credits, sets the member's window and adds the
    /// commission split to the coach aggregate, all in one transaction.
    /// A second approval attempt fails with `AlreadyApproved`.
    pub async fn approve_package(
        &self,
        actor: &AuthenticatedActor,
        member_id: i32,
        package_id: Uuid,
    ) -> Result<Package, PackageError> {
        if !actor.is_admin() {
            return Err(PackageError::Forbidden(
                "Only admins may approve packages".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let member = MembersRepository::tx_find_for_update(&mut tx, member_id)
            .await?
            .ok_or(PackageError::MemberNotFound(member_id))?;

        let package = PackagesRepository::tx_find_for_update(&mut tx, package_id)
            .await?
            .filter(|p| p.member_id == member.id)
            .ok_or(PackageError::NotFound)?;

        ApprovalMachine::transition(package.approval_status, ApprovalStatus::Approved)?;

        let (start, end) = effective_window(package.start_date, package.duration_days);
        let package = PackagesRepository::tx_set_approved(&mut tx, package.id, start, end).await?;

        Self::admit_in_tx(&mut tx, &package).await?;

        tx.commit().await?;

        tracing::info!("Approved package {} for member {}", package.id, member_id);
        Ok(package)
    }

    /// Edit a package's sale fields
    ///
    /// For an approved package the old and new commission splits are both
    /// recomputed from stored values and the signed difference goes through
    /// the reconciler; re-adding the new split would double-count. Credits
    /// already consumed under the old session count stay consumed.
    pub async fn edit_package(
        &self,
        actor: &AuthenticatedActor,
        member_id: i32,
        package_id: Uuid,
        request: EditPackageRequest,
    ) -> Result<Package, PackageError> {
        request
            .validate()
            .map_err(|e| PackageError::ValidationError(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let member = MembersRepository::tx_find_for_update(&mut tx, member_id)
            .await?
            .ok_or(PackageError::MemberNotFound(member_id))?;

        if !actor.can_manage(member.coach_id) {
            return Err(PackageError::Forbidden(
                "You do not have permission to edit this member's packages".to_string(),
            ));
        }

        let package = PackagesRepository::tx_find_for_update(&mut tx, package_id)
            .await?
            .filter(|p| p.member_id == member.id)
            .ok_or(PackageError::NotFound)?;

        let old_rule = package.commission_rule();
        let old_split =
            CommissionCalculator::split(package.price, old_rule.as_ref(), package.session_count)?;

        let new_price = request.price.unwrap_or(package.price);
        let new_count = request.session_count.unwrap_or(package.session_count);
        let new_duration = request.duration_days.unwrap_or(package.duration_days);
        let new_rule = if request.remove_commission_rule.unwrap_or(false) {
            None
        } else {
            request.commission_rule.or(old_rule)
        };

        // Validates the new fields as a side effect
        let new_split = CommissionCalculator::split(new_price, new_rule.as_ref(), new_count)?;

        let (start_date, end_date) = match package.approval_status {
            ApprovalStatus::Approved => {
                let (start, end) =
                    effective_window(request.start_date.or(package.start_date), new_duration);
                (Some(start), Some(end))
            }
            ApprovalStatus::Pending => (request.start_date.or(package.start_date), None),
        };

        let updated = PackagesRepository::tx_update_fields(
            &mut tx,
            package.id,
            PackageUpdate {
                price: new_price,
                session_count: new_count,
                duration_days: new_duration,
                start_date,
                end_date,
                rule: new_rule,
                payment_status: request.payment_status.unwrap_or(package.payment_status),
            },
        )
        .await?;

        if package.approval_status == ApprovalStatus::Approved {
            AggregateReconciler::reconcile(
                &mut tx,
                package.coach_id,
                AggregateDelta::commission(new_split.company_cut - old_split.company_cut),
            )
            .await?;

            // Balance and window only follow the governing package
            if member.current_package_id == Some(package.id) {
                let new_remaining = CreditLedger::remaining_after_edit(
                    package.session_count,
                    new_count,
                    member.remaining_credits,
                );
                CreditLedger::reset_remaining(&mut tx, member.id, new_remaining).await?;
                MembersRepository::tx_set_current_package(
                    &mut tx,
                    member.id,
                    Some(package.id),
                    updated.start_date,
                    updated.end_date,
                )
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!("Edited package {} for member {}", package_id, member_id);
        Ok(updated)
    }

    /// Delete a package
    ///
    /// A pending package just disappears. Deleting an approved package
    /// subtracts its split from the aggregate; if it was the member's only
    /// package the member goes with it, otherwise the next most recent
    /// approved package becomes the governing one and the member's window
    /// and balance are reset to match it.
    pub async fn delete_package(
        &self,
        actor: &AuthenticatedActor,
        member_id: i32,
        package_id: Uuid,
    ) -> Result<(), PackageError> {
        let mut tx = self.pool.begin().await?;

        let member = MembersRepository::tx_find_for_update(&mut tx, member_id)
            .await?
            .ok_or(PackageError::MemberNotFound(member_id))?;

        if !actor.can_manage(member.coach_id) {
            return Err(PackageError::Forbidden(
                "You do not have permission to delete this member's packages".to_string(),
            ));
        }

        let package = PackagesRepository::tx_find_for_update(&mut tx, package_id)
            .await?
            .filter(|p| p.member_id == member.id)
            .ok_or(PackageError::NotFound)?;

        match package.approval_status {
            ApprovalStatus::Pending => {
                PackagesRepository::tx_delete(&mut tx, package.id).await?;
                MembersRepository::tx_adjust_package_count(&mut tx, member.id, -1).await?;
            }
            ApprovalStatus::Approved => {
                let rule = package.commission_rule();
                let split = CommissionCalculator::split(
                    package.price,
                    rule.as_ref(),
                    package.session_count,
                )?;

                AggregateReconciler::reconcile(
                    &mut tx,
                    package.coach_id,
                    AggregateDelta::commission(-split.company_cut),
                )
                .await?;

                if member.total_packages_count <= 1 {
                    // Last package: the member goes too, reversing their
                    // contribution to the coach's member count. Packages,
                    // participants and journal rows cascade.
                    MembersRepository::tx_delete(&mut tx, member.id).await?;
                    AggregateReconciler::reconcile(
                        &mut tx,
                        member.coach_id,
                        AggregateDelta::members(-1),
                    )
                    .await?;
                } else {
                    PackagesRepository::tx_delete(&mut tx, package.id).await?;
                    MembersRepository::tx_adjust_package_count(&mut tx, member.id, -1).await?;

                    if member.current_package_id == Some(package.id) {
                        match PackagesRepository::tx_latest_approved(&mut tx, member.id).await? {
                            Some(fallback) => {
                                MembersRepository::tx_set_current_package(
                                    &mut tx,
                                    member.id,
                                    Some(fallback.id),
                                    fallback.start_date,
                                    fallback.end_date,
                                )
                                .await?;
                                CreditLedger::reset_remaining(
                                    &mut tx,
                                    member.id,
                                    fallback.session_count,
                                )
                                .await?;
                            }
                            None => {
                                MembersRepository::tx_set_current_package(
                                    &mut tx, member.id, None, None, None,
                                )
                                .await?;
                                CreditLedger::reset_remaining(&mut tx, member.id, 0).await?;
                            }
                        }
                    }
                }
            }
        }

        tx.commit().await?;

        tracing::info!("Deleted package {} for member {}", package_id, member_id);
        Ok(())
    }

    /// Fetch a single package, scoped to its member
    pub async fn get_package(
        &self,
        actor: &AuthenticatedActor,
        member_id: i32,
        package_id: Uuid,
    ) -> Result<Package, PackageError> {
        let member = self
            .members_repo
            .find_by_id(member_id)
            .await?
            .ok_or(PackageError::MemberNotFound(member_id))?;

        if !actor.can_manage(member.coach_id) {
            return Err(PackageError::Forbidden(
                "You do not have permission to view this member's packages".to_string(),
            ));
        }

        self.packages_repo
            .find_by_id(package_id)
            .await?
            .filter(|p| p.member_id == member_id)
            .ok_or(PackageError::NotFound)
    }

    /// List a member's packages, most recent sale first
    pub async fn list_packages(
        &self,
        actor: &AuthenticatedActor,
        member_id: i32,
    ) -> Result<Vec<Package>, PackageError> {
        let member = self
            .members_repo
            .find_by_id(member_id)
            .await?
            .ok_or(PackageError::MemberNotFound(member_id))?;

        if !actor.can_manage(member.coach_id) {
            return Err(PackageError::Forbidden(
                "You do not have permission to view this member's packages".to_string(),
            ));
        }

        Ok(self.packages_repo.list_for_member(member_id).await?)
    }
}
