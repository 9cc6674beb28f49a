//! Session authorization policy shared by every endpoint.

use crate::config::AuthorizationMode;
use crate::error::{AppError, AppResult};
use crate::models::{AuthenticatedCaller, DeploymentRecord};

/// Decide whether `caller` may act on `record`.
///
/// In strict-owner mode an owned record only admits its owner; records created
/// anonymously stay open. Shared mode admits everyone.
pub fn authorize(
    mode: AuthorizationMode,
    record: &DeploymentRecord,
    caller: Option<&AuthenticatedCaller>,
) -> AppResult<()> {
    match mode {
        AuthorizationMode::Shared => Ok(()),
        AuthorizationMode::StrictOwner => match (record.owner_id.as_deref(), caller) {
            (None, _) => Ok(()),
            (Some(owner), Some(caller)) if owner == caller.id => Ok(()),
            (Some(_), Some(_)) => Err(AppError::Forbidden(
                "You do not have access to this session".to_string(),
            )),
            (Some(_), None) => Err(AppError::Unauthorized(
                "This session belongs to a signed-in user".to_string(),
            )),
        },
    }
}

/// Deletion additionally requires an authenticated caller in every mode.
pub fn authorize_delete(
    mode: AuthorizationMode,
    record: &DeploymentRecord,
    caller: &AuthenticatedCaller,
) -> AppResult<()> {
    authorize(mode, record, Some(caller))
}
