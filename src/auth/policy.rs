use crate::error::ApiError;
use crate::middleware::AuthUser;

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_STAFF: &str = "staff";

/// Row-level access decision. Staff bypass ownership checks; everyone else
/// may only touch resources whose resolved owner is themselves.
pub fn can_access(caller: &AuthUser, resource_owner_id: i32) -> bool {
    caller.role == ROLE_STAFF || caller.user_id == resource_owner_id
}

/// Apply the access decision, mapping a denial to 403.
pub fn ensure_can_access(caller: &AuthUser, resource_owner_id: i32) -> Result<(), ApiError> {
    if can_access(caller, resource_owner_id) {
        Ok(())
    } else {
        tracing::warn!(
            "Access denied: user {} ({}) on resource owned by {}",
            caller.user_id,
            caller.role,
            resource_owner_id
        );
        Err(ApiError::forbidden("Access denied"))
    }
}

/// Decide the owner_id a new pet is stored under. Owners always create pets
/// under their own id, regardless of what the request supplied; staff must
/// name an owner explicitly.
pub fn resolve_create_owner(
    caller: &AuthUser,
    requested_owner_id: Option<i32>,
) -> Result<i32, ApiError> {
    if caller.role != ROLE_STAFF {
        return Ok(caller.user_id);
    }
    match requested_owner_id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(ApiError::validation_error("Owner ID is required")),
    }
}
