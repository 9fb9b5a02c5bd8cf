use crate::{
    model::{Document, DocumentModel, FieldKind, FieldModel, KindTag},
    schema::{SchemaDescriptor, SchemaError},
    test_fixtures::{Profile, User},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

macro_rules! broken_model {
    ($name:ident, [$($field:expr),* $(,)?]) => {
        static $name: DocumentModel = DocumentModel {
            path: "schema::tests::Broken",
            name: "Broken",
            fields: &[$($field),*],
        };
    };
}

broken_model!(NAMELESS, [
    FieldModel::primary("id", FieldKind::Text),
    FieldModel::new("", FieldKind::Text),
]);

broken_model!(NO_PRIMARY, [FieldModel::new("id", FieldKind::Text)]);

broken_model!(TWO_PRIMARIES, [
    FieldModel::primary("a", FieldKind::Text),
    FieldModel::primary("b", FieldKind::Text),
]);

broken_model!(NESTED_UNSUPPORTED, [
    FieldModel::primary("id", FieldKind::Text),
    FieldModel::new("blobs", FieldKind::List(&FieldKind::Unsupported)),
]);

broken_model!(LIST_KEYED_MAP, [
    FieldModel::primary("id", FieldKind::Text),
    FieldModel::new(
        "m",
        FieldKind::Map {
            key: &FieldKind::List(&FieldKind::Text),
            value: &FieldKind::Text,
        },
    ),
]);

broken_model!(RESERVED, [
    FieldModel::primary("id", FieldKind::Text),
    FieldModel::new("a\u{0}b", FieldKind::Text),
]);

broken_model!(DUPLICATE, [
    FieldModel::primary("id", FieldKind::Text),
    FieldModel::new("x", FieldKind::Text),
    FieldModel::new("x", FieldKind::Int),
]);

broken_model!(FLOAT_PRIMARY, [FieldModel::primary("id", FieldKind::Float)]);

broken_model!(ID_AND_NAME, [
    FieldModel::primary("id", FieldKind::Text),
    FieldModel::new("name", FieldKind::Text),
]);

broken_model!(ID_NAME_AND_GONE, [
    FieldModel::primary("id", FieldKind::Text),
    FieldModel::new("name", FieldKind::Text),
    FieldModel::new("gone", FieldKind::Text),
]);

// serializes a field the model never names
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct Drifted {
    id: String,
    name: String,
    extra: String,
}

impl Document for Drifted {
    const MODEL: &'static DocumentModel = &ID_AND_NAME;
}

// the model names a field the type never serializes
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct Hollow {
    id: String,
    name: String,
}

impl Document for Hollow {
    const MODEL: &'static DocumentModel = &ID_NAME_AND_GONE;
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct Bare(String);

impl Document for Bare {
    const MODEL: &'static DocumentModel = &ID_AND_NAME;
}

#[test]
fn user_descriptor_maps_every_level() {
    let d = SchemaDescriptor::of::<User>().expect("descriptor");

    assert_eq!(d.name(), "User");
    assert_eq!(d.primary_field(), "ID");
    assert_eq!(d.primary_position(), 0);
    assert_eq!(d.field_position("Meta"), Some(3));
    assert_eq!(d.field_kind("Tags"), Some(KindTag::List));
    assert_eq!(d.map_key_kind("Meta"), Some(KindTag::Text));

    let depths: Vec<(&str, KindTag)> = d
        .depth_kinds()
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    assert_eq!(
        depths,
        vec![
            ("ID", KindTag::Text),
            ("Meta", KindTag::Map),
            ("Meta{}", KindTag::Text),
            ("Name", KindTag::Text),
            ("Tags", KindTag::List),
            ("Tags[]", KindTag::Text),
        ]
    );

    let indexed: Vec<&str> = d.indexed_fields().collect();
    assert_eq!(indexed, vec!["Name", "Tags", "Meta"]);
}

#[test]
fn nested_shapes_get_one_entry_per_depth() {
    let d = SchemaDescriptor::of::<Profile>().expect("descriptor");

    assert_eq!(d.depth_kind("grid"), Some(KindTag::List));
    assert_eq!(d.depth_kind("grid[]"), Some(KindTag::List));
    assert_eq!(d.depth_kind("grid[][]"), Some(KindTag::Uint));
    assert_eq!(d.depth_kind("notes{}"), Some(KindTag::List));
    assert_eq!(d.depth_kind("notes{}[]"), Some(KindTag::Text));
    assert_eq!(d.depth_kind("grid[][][]"), None);
}

#[test]
fn malformed_models_are_rejected() {
    assert_eq!(
        SchemaDescriptor::build(&NAMELESS).unwrap_err(),
        SchemaError::NameMissing {
            path: "schema::tests::Broken",
            position: 1
        }
    );
    assert!(matches!(
        SchemaDescriptor::build(&NO_PRIMARY).unwrap_err(),
        SchemaError::PrimaryMissing { .. }
    ));
    assert!(matches!(
        SchemaDescriptor::build(&TWO_PRIMARIES).unwrap_err(),
        SchemaError::PrimaryDuplicate {
            first: "a",
            second: "b",
            ..
        }
    ));
    assert_eq!(
        SchemaDescriptor::build(&NESTED_UNSUPPORTED).unwrap_err(),
        SchemaError::UnsupportedKind {
            shape: "blobs[]".to_string(),
            kind: KindTag::Unsupported
        }
    );
    assert!(matches!(
        SchemaDescriptor::build(&LIST_KEYED_MAP).unwrap_err(),
        SchemaError::UnsupportedKind {
            kind: KindTag::List,
            ..
        }
    ));
    assert!(matches!(
        SchemaDescriptor::build(&RESERVED).unwrap_err(),
        SchemaError::ReservedName { .. }
    ));
    assert!(matches!(
        SchemaDescriptor::build(&DUPLICATE).unwrap_err(),
        SchemaError::DuplicateField { field: "x", .. }
    ));
    assert!(matches!(
        SchemaDescriptor::build(&FLOAT_PRIMARY).unwrap_err(),
        SchemaError::UnsupportedKind {
            kind: KindTag::Float,
            ..
        }
    ));
}

#[test]
fn models_must_match_what_the_type_serializes() {
    // the model alone is well formed
    assert!(SchemaDescriptor::build(&ID_AND_NAME).is_ok());

    assert_eq!(
        SchemaDescriptor::of::<Drifted>().unwrap_err(),
        SchemaError::UntaggedField {
            path: "schema::tests::Broken",
            field: "extra".to_string(),
        }
    );
    assert_eq!(
        SchemaDescriptor::of::<Hollow>().unwrap_err(),
        SchemaError::FieldNotSerialized {
            path: "schema::tests::Broken",
            field: "gone",
        }
    );
    assert!(matches!(
        SchemaDescriptor::of::<Bare>().unwrap_err(),
        SchemaError::ZeroValue { .. }
    ));

    let err: crate::error::Error = SchemaDescriptor::of::<Drifted>().unwrap_err().into();
    assert_eq!(err.code.as_u16(), 1001);
}

#[test]
fn primary_key_is_extracted_and_validated() {
    let users = SchemaDescriptor::of::<User>().expect("descriptor");
    let profiles = SchemaDescriptor::of::<Profile>().expect("descriptor");

    assert_eq!(users.primary_key(&json!({"ID": "u1"})).expect("pk"), "u1");
    assert_eq!(profiles.primary_key(&json!({"id": 42})).expect("pk"), "42");

    for bad in [
        json!({"ID": ""}),
        json!({"ID": null}),
        json!({}),
        json!({"ID": true}),
        json!({"ID": "\u{0}i"}),
        json!({"ID": "\u{10FFFF}k"}),
        json!({"ID": "k\u{10FFFF}"}),
    ] {
        assert!(
            matches!(
                users.primary_key(&bad),
                Err(SchemaError::PrimaryKeyInvalid { field: "ID", .. })
            ),
            "{bad} must be rejected"
        );
    }
}

#[test]
fn schema_errors_carry_schema_codes() {
    let err: crate::error::Error = SchemaDescriptor::build(&NO_PRIMARY).unwrap_err().into();

    assert_eq!(err.code.as_u16(), 1002);
    assert!(!err.is_retryable());
    assert_eq!(User::MODEL.field("Tags").map(|f| f.name), Some("Tags"));
}
