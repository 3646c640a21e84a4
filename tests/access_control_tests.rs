use axum::http::StatusCode;
use school_portal::{
    access::{
        ADMIN_ONLY, Requester, STAFF, can_modify, can_modify_document, can_read,
        can_read_document, ensure_role, has_role,
    },
    models::{Document, Role, Visibility},
};
use uuid::Uuid;

const UPLOADER: Uuid = Uuid::from_u128(7);

fn requester(role: Role, is_uploader: bool) -> Requester {
    let id = if is_uploader { UPLOADER } else { Uuid::from_u128(8) };
    Requester::new(id, role)
}

/// Reference table: whether `role` may read a document it did not upload.
fn expected_non_uploader_read(role: Role, visibility: Visibility, access_roles: &[Role]) -> bool {
    match (role, visibility) {
        (Role::Admin, _) => true,
        (_, Visibility::Public) => true,
        (_, Visibility::Private) => false,
        (role, Visibility::Restricted) => access_roles.contains(&role),
    }
}

#[test]
fn test_read_matrix() {
    let role_lists: [&[Role]; 3] = [&[], &[Role::Student], &[Role::Teacher, Role::Parent]];

    for role in Role::ALL {
        for visibility in [Visibility::Public, Visibility::Private, Visibility::Restricted] {
            for access_roles in role_lists {
                assert!(
                    can_read(&requester(role, true), UPLOADER, visibility, access_roles),
                    "uploader ({}) must always read a {} document",
                    role,
                    visibility.as_str()
                );

                let expected = expected_non_uploader_read(role, visibility, access_roles);
                assert_eq!(
                    can_read(&requester(role, false), UPLOADER, visibility, access_roles),
                    expected,
                    "{} reading a {} document shared with {:?}",
                    role,
                    visibility.as_str(),
                    access_roles
                );
            }
        }
    }
}

#[test]
fn test_modify_matrix() {
    for role in Role::ALL {
        assert!(can_modify(&requester(role, true), UPLOADER));
        assert_eq!(
            can_modify(&requester(role, false), UPLOADER),
            role == Role::Admin,
            "{} modifying someone else's document",
            role
        );
    }
}

#[test]
fn test_document_wrappers_use_document_fields() {
    let document = Document {
        uploader_id: UPLOADER,
        visibility: Visibility::Restricted,
        access_roles: vec![Role::Parent],
        ..Document::default()
    };

    assert!(can_read_document(&requester(Role::Parent, false), &document));
    assert!(!can_read_document(&requester(Role::Student, false), &document));
    assert!(can_modify_document(&requester(Role::Student, true), &document));
    assert!(!can_modify_document(&requester(Role::Parent, false), &document));
}

#[test]
fn test_role_gates() {
    for role in Role::ALL {
        assert_eq!(has_role(role, ADMIN_ONLY), role == Role::Admin);
        assert_eq!(has_role(role, STAFF), role.is_staff());
    }

    assert!(ensure_role(Role::Teacher, STAFF).is_ok());

    let denied = ensure_role(Role::Parent, STAFF).unwrap_err();
    assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(denied.public_message(), "access denied");
}
