use super::*;

fn identity_with(metadata: IdentityMetadata, email: Option<&str>) -> Identity {
    Identity {
        id: "u-1".to_owned(),
        email: email.map(ToOwned::to_owned),
        metadata,
    }
}

#[test]
fn role_round_trips_as_lowercase_string() {
    for role in Role::ALL {
        let json = serde_json::to_value(role).expect("serialize role");
        assert_eq!(json, serde_json::Value::String(role.as_str().to_owned()));
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }
    assert_eq!(Role::parse("superuser"), None);
}

#[test]
fn identity_decodes_provider_user_payload() {
    let identity: Identity = serde_json::from_value(serde_json::json!({
        "id": "11111111-2222-3333-4444-555555555555",
        "aud": "authenticated",
        "email": "priya@example.com",
        "user_metadata": { "full_name": "Priya Sharma", "role": "faculty" },
        "created_at": "2025-01-01T00:00:00Z"
    }))
    .expect("decode identity");

    assert_eq!(identity.id, "11111111-2222-3333-4444-555555555555");
    assert_eq!(identity.email.as_deref(), Some("priya@example.com"));
    assert_eq!(identity.metadata.full_name.as_deref(), Some("Priya Sharma"));
    assert_eq!(identity.requested_role(), Role::Faculty);
}

#[test]
fn identity_tolerates_missing_metadata_and_unknown_role() {
    let identity: Identity =
        serde_json::from_value(serde_json::json!({ "id": "u-2" })).expect("decode identity");
    assert_eq!(identity.email, None);
    assert_eq!(identity.requested_role(), Role::Alumni);

    let identity: Identity = serde_json::from_value(serde_json::json!({
        "id": "u-3",
        "user_metadata": { "role": "galactic-overlord" }
    }))
    .expect("decode identity");
    assert_eq!(identity.requested_role(), Role::Alumni);
}

#[test]
fn display_name_prefers_full_name_then_name_then_email_local_part() {
    let identity = identity_with(
        IdentityMetadata {
            full_name: Some("Asha Verma".to_owned()),
            name: Some("asha.v".to_owned()),
            role: None,
        },
        Some("asha@example.com"),
    );
    assert_eq!(identity.display_name(), "Asha Verma");

    let identity = identity_with(
        IdentityMetadata {
            full_name: None,
            name: Some("asha.v".to_owned()),
            role: None,
        },
        Some("asha@example.com"),
    );
    assert_eq!(identity.display_name(), "asha.v");

    let identity = identity_with(IdentityMetadata::default(), Some("asha@example.com"));
    assert_eq!(identity.display_name(), "asha");
}

#[test]
fn display_name_falls_back_to_user_literal() {
    let identity = identity_with(IdentityMetadata::default(), None);
    assert_eq!(identity.display_name(), "User");

    // A whitespace-only name and an empty local-part both count as absent.
    let identity = identity_with(
        IdentityMetadata {
            full_name: Some("   ".to_owned()),
            name: None,
            role: None,
        },
        Some("@example.com"),
    );
    assert_eq!(identity.display_name(), "User");
}

#[test]
fn profile_decodes_with_defaults() {
    let profile: Profile = serde_json::from_value(serde_json::json!({
        "id": "u-1",
        "full_name": "Priya Sharma"
    }))
    .expect("decode profile");

    assert_eq!(profile.role, Role::Alumni);
    assert!(profile.is_active);
    assert_eq!(profile.company, None);
}

#[test]
fn profile_update_serializes_only_set_fields() {
    let update = ProfileUpdate {
        company: Some("Acme".to_owned()),
        graduation_year: Some(2019),
        ..ProfileUpdate::default()
    };
    let json = serde_json::to_value(&update).expect("serialize update");
    assert_eq!(json, serde_json::json!({ "company": "Acme", "graduation_year": 2019 }));
}

#[test]
fn new_profile_serializes_role_as_wire_string() {
    let row = NewProfile {
        id: "u-1".to_owned(),
        email: Some("new@example.com".to_owned()),
        full_name: "new".to_owned(),
        role: Role::Alumni,
    };
    let json = serde_json::to_value(&row).expect("serialize row");
    assert_eq!(json["role"], "alumni");
    assert_eq!(json["full_name"], "new");
}
