//! Workspace membership gate.
//!
//! # Responsibility
//! - Turn membership lookups into an allow/deny decision for one requester.
//! - Keep "not a member" distinct from "membership could not be checked".
//!
//! # Invariants
//! - Every answer comes straight from the membership collaborator: no
//!   caching, no retry, no local override.

use crate::model::page::{UserId, WorkspaceId};
use crate::repo::membership_repo::MembershipRepository;
use crate::repo::page_repo::RepoError;
use log::{debug, error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// The membership collaborator failed to answer.
#[derive(Debug)]
pub struct MembershipCheckError {
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub source: RepoError,
}

impl Display for MembershipCheckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "membership check failed for workspace {}: {}",
            self.workspace_id, self.source
        )
    }
}

impl Error for MembershipCheckError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Outcome of a failed authorization.
#[derive(Debug)]
pub enum AuthorizationError {
    /// Requester is not a member of the workspace.
    Denied {
        workspace_id: WorkspaceId,
        user_id: UserId,
    },
    /// Membership could not be determined.
    CheckFailed(MembershipCheckError),
}

impl Display for AuthorizationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied {
                workspace_id,
                user_id,
            } => write!(f, "user {user_id} is not a member of workspace {workspace_id}"),
            Self::CheckFailed(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthorizationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Denied { .. } => None,
            Self::CheckFailed(err) => Some(err),
        }
    }
}

/// Membership-based authorization gate.
pub struct AuthorizationGate<M: MembershipRepository> {
    membership: M,
}

impl<M: MembershipRepository> AuthorizationGate<M> {
    pub fn new(membership: M) -> Self {
        Self { membership }
    }

    /// Returns the wrapped membership collaborator.
    pub fn membership(&self) -> &M {
        &self.membership
    }

    /// Asks the membership collaborator whether `user_id` is a member.
    pub fn is_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> Result<bool, MembershipCheckError> {
        self.membership
            .is_member(workspace_id, user_id)
            .map_err(|source| MembershipCheckError {
                workspace_id,
                user_id,
                source,
            })
    }

    /// Succeeds only when `user_id` is a confirmed member of `workspace_id`.
    pub fn authorize(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> Result<(), AuthorizationError> {
        match self.is_member(workspace_id, user_id) {
            Ok(true) => {
                debug!(
                    "event=authorize module=authorization status=ok workspace_id={workspace_id}"
                );
                Ok(())
            }
            Ok(false) => {
                warn!(
                    "event=authorize module=authorization status=denied workspace_id={workspace_id} user_id={user_id}"
                );
                Err(AuthorizationError::Denied {
                    workspace_id,
                    user_id,
                })
            }
            Err(err) => {
                error!(
                    "event=authorize module=authorization status=error workspace_id={workspace_id} error_code=membership_check_failed error={}",
                    err.source
                );
                Err(AuthorizationError::CheckFailed(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthorizationError, AuthorizationGate};
    use crate::repo::memory::InMemoryMembershipRepository;
    use uuid::Uuid;

    #[test]
    fn member_is_authorized() {
        let workspace = Uuid::new_v4();
        let user = Uuid::new_v4();
        let gate =
            AuthorizationGate::new(InMemoryMembershipRepository::with_members([(workspace, user)]));

        assert!(gate.is_member(workspace, user).unwrap());
        gate.authorize(workspace, user).unwrap();
    }

    #[test]
    fn membership_is_scoped_to_workspace() {
        let workspace = Uuid::new_v4();
        let other_workspace = Uuid::new_v4();
        let user = Uuid::new_v4();
        let gate =
            AuthorizationGate::new(InMemoryMembershipRepository::with_members([(workspace, user)]));

        let err = gate.authorize(other_workspace, user).unwrap_err();
        assert!(matches!(
            err,
            AuthorizationError::Denied { workspace_id, user_id }
                if workspace_id == other_workspace && user_id == user
        ));
    }

    #[test]
    fn failed_lookup_is_not_reported_as_denial() {
        let membership = InMemoryMembershipRepository::new();
        membership.set_unavailable(true);
        let gate = AuthorizationGate::new(membership);

        let err = gate
            .authorize(Uuid::new_v4(), Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, AuthorizationError::CheckFailed(_)));
    }
}
