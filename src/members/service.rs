use sqlx::PgPool;
use validator::Validate;

use crate::auth::middleware::AuthenticatedActor;
use crate::coaches::models::AggregateDelta;
use crate::coaches::reconciler::AggregateReconciler;
use crate::members::error::MemberError;
use crate::members::models::{Member, RegisterMemberRequest};
use crate::members::repository::MembersRepository;
use crate::packages::models::Package;
use crate::packages::repository::PackagesRepository;
use crate::packages::service::PackageService;

/// Service for member registration and roster reads
#[derive(Clone)]
pub struct MemberService {
    pool: PgPool,
    members_repo: MembersRepository,
    packages_repo: PackagesRepository,
}

impl MemberService {
    /// Create a new MemberService
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

    /// Register a new member together with their first package
    ///
    /// Creates the member row, counts them into the coach aggregate, and
    /// runs the package sale in the same transaction: an admin's package is
    /// admitted (credits granted, window set, commission added) before the
    /// commit, a coach's stays pending.
    pub async fn register_member(
        &self,
        actor: &AuthenticatedActor,
        request: RegisterMemberRequest,
    ) -> Result<(Member, Package), MemberError> {
        request
            .validate()
            .map_err(|e| MemberError::ValidationError(e.to_string()))?;

        let coach_id = actor.effective_coach_id(request.coach_id);

        let mut tx = self.pool.begin().await?;

        let member = MembersRepository::tx_insert(
            &mut tx,
            coach_id,
            &request.name,
            request.contact.as_deref(),
        )
        .await?;

        AggregateReconciler::reconcile(&mut tx, coach_id, AggregateDelta::members(1)).await?;

        let package =
            PackageService::create_in_tx(&mut tx, actor.role, &member, &request.initial_package)
                .await?;

        // Re-read: the sale may have granted credits and set the window
        let member = MembersRepository::tx_find(&mut tx, member.id)
            .await?
            .ok_or(MemberError::NotFound(member.id))?;

        tx.commit().await?;

        tracing::info!(
            "Registered member {} for coach {} with package {}",
            member.id,
            coach_id,
            package.id
        );
        Ok((member, package))
    }

    /// Fetch a member and their packages
    pub async fn get_member(
        &self,
        actor: &AuthenticatedActor,
        member_id: i32,
    ) -> Result<(Member, Vec<Package>), MemberError> {
        let member = self
            .members_repo
            .find_by_id(member_id)
            .await?
            .ok_or(MemberError::NotFound(member_id))?;

        if !actor.can_manage(member.coach_id) {
            return Err(MemberError::Forbidden(
                "You do not have permission to view this member".to_string(),
            ));
        }

        let packages = self.packages_repo.list_for_member(member_id).await?;

        Ok((member, packages))
    }
}

#[cfg(test)]
mod tests {
    // Registration runs member insert, aggregate reconcile and package
    // creation in one transaction against a live database; covered by the
    // integration suite.
}
