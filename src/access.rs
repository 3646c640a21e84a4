//! Access control rules.
//!
//! Pure functions over (requester, resource attributes). The route gates, the document
//! handlers and the repositories' document listings all reduce to these.

use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{Document, Role, Visibility},
};

/// Route groups reachable only by administrators.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Route groups reachable by staff (administrators and teachers).
pub const STAFF: &[Role] = &[Role::Admin, Role::Teacher];

/// Requester
///
/// The acting identity as far as access decisions are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: Uuid,
    pub role: Role,
}

impl Requester {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// can_read
///
/// - `public`: anyone.
/// - `private`: the uploader or an admin.
/// - `restricted`: the uploader, an admin, or a requester whose role is in `access_roles`.
pub fn can_read(
    requester: &Requester,
    uploader_id: Uuid,
    visibility: Visibility,
    access_roles: &[Role],
) -> bool {
    if requester.is_admin() || requester.id == uploader_id {
        return true;
    }
    match visibility {
        Visibility::Public => true,
        Visibility::Private => false,
        Visibility::Restricted => access_roles.contains(&requester.role),
    }
}

/// Updates and deletes are limited to the uploader or an admin, whatever the visibility.
pub fn can_modify(requester: &Requester, uploader_id: Uuid) -> bool {
    requester.is_admin() || requester.id == uploader_id
}

pub fn can_read_document(requester: &Requester, document: &Document) -> bool {
    can_read(
        requester,
        document.uploader_id,
        document.visibility,
        &document.access_roles,
    )
}

pub fn can_modify_document(requester: &Requester, document: &Document) -> bool {
    can_modify(requester, document.uploader_id)
}

pub fn has_role(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

/// 403 unless `role` is in `allowed`.
pub fn ensure_role(role: Role, allowed: &[Role]) -> Result<(), ApiError> {
    if has_role(role, allowed) {
        Ok(())
    } else {
        Err(ApiError::access_denied())
    }
}
