//! Protected-branch guard.

use crate::changes::VcsBackend;
use crate::error::Result;
use tracing::debug;

/// Printed when a commit targets a protected branch.
pub const PROTECTED_BRANCH_MESSAGE: &str = "You cannot commit directly to master or main branch!";

/// Whether work may be committed on the current branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchStatus {
    Allowed(String),
    Protected(String),
}

impl BranchStatus {
    #[must_use]
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::Protected(_))
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        match self {
            Self::Allowed(b) | Self::Protected(b) => b,
        }
    }
}

/// Compare the checked-out branch against the protected names.
///
/// # Errors
///
/// Returns an error if the branch cannot be determined.
pub async fn check_branch(vcs: &dyn VcsBackend, protected: &[String]) -> Result<BranchStatus> {
    let branch = vcs.current_branch().await?;
    debug!("current branch: {}", branch);

    if protected.iter().any(|p| *p == branch) {
        Ok(BranchStatus::Protected(branch))
    } else {
        Ok(BranchStatus::Allowed(branch))
    }
}
