use crate::{
    encode::{EncodeError, EncodeMode, Encoder},
    key::{FieldPath, INDEX_TAG, IndexKey, value_prefix},
    model::KindTag,
    schema::SchemaDescriptor,
    serialize::{self, ContentHash},
    test_fixtures::{Profile, User},
};
use proptest::prelude::*;
use serde_json::json;

fn user_descriptor() -> SchemaDescriptor {
    SchemaDescriptor::of::<User>().expect("user descriptor")
}

#[test]
fn alice_encodes_to_four_entries_and_four_counters() {
    let descriptor = user_descriptor();
    let tree = serialize::to_tree(&User::alice()).expect("tree");
    let bytes = serialize::serialize(&User::alice()).expect("bytes");
    let hash = ContentHash::of(&bytes);

    let state = Encoder::new(&descriptor)
        .encode_state(&tree, "u1", Some(&hash))
        .expect("encode");

    assert_eq!(state.len(), 4);
    assert_eq!(state.counter_total(), 4);

    let paths: Vec<String> = state.counters.keys().map(ToString::to_string).collect();
    assert_eq!(paths, ["Meta.city", "Name", "Tags[0]", "Tags[1]"]);

    let name = IndexKey {
        entity: "User".to_string(),
        path: FieldPath::new("Name"),
        value: "Alice".to_string(),
        primary: "u1".to_string(),
    };
    assert_eq!(
        state.entries.get(&name.encode()),
        Some(&hash.to_hex().into_bytes())
    );

    for key in state.entries.keys() {
        let decoded = IndexKey::decode(key).expect("decode");
        assert_eq!(decoded.primary, "u1");
        assert_ne!(decoded.path.field(), "ID", "primary field is never indexed");
    }
}

#[test]
fn separate_mode_keys_stop_at_the_path() {
    let descriptor = user_descriptor();
    let tree = serialize::to_tree(&User::alice()).expect("tree");

    let state = Encoder::new(&descriptor)
        .with_mode(EncodeMode::Separate)
        .encode_state(&tree, "u1", None)
        .expect("encode");

    let tags_1 = value_prefix(INDEX_TAG, "User", &FieldPath::new("Tags").index(1));
    assert_eq!(state.entries.get(&tags_1), Some(&b"y".to_vec()));
    assert_eq!(state.len(), 4);
}

#[test]
fn nulls_and_empty_containers_produce_nothing() {
    let descriptor = user_descriptor();
    let tree = json!({ "ID": "u2", "Name": null, "Tags": [], "Meta": {} });

    let state = Encoder::new(&descriptor)
        .encode_state(&tree, "u2", None)
        .expect("encode");

    assert!(state.is_empty());
    assert_eq!(state.counter_total(), 0);
}

#[test]
fn nested_shapes_are_walked_to_the_leaves() {
    let descriptor = SchemaDescriptor::of::<Profile>().expect("profile descriptor");
    let tree = serialize::to_tree(&Profile::sample()).expect("tree");

    let leaves = Encoder::new(&descriptor)
        .collect_leaves(&tree)
        .expect("leaves");
    let paths: Vec<String> = leaves.keys().map(ToString::to_string).collect();

    assert_eq!(
        paths,
        [
            "active",
            "age",
            "grid[0][0]",
            "grid[0][1]",
            "grid[1][0]",
            "notes.todo[0]",
            "notes.todo[1]",
            "score",
        ]
    );
}

#[test]
fn kind_mismatch_names_the_path() {
    let descriptor = user_descriptor();
    let tree = json!({ "ID": "u1", "Tags": ["x", 5] });

    let err = Encoder::new(&descriptor)
        .encode_state(&tree, "u1", None)
        .expect_err("mismatch");

    assert_eq!(
        err,
        EncodeError::KindMismatch {
            path: "Tags[1]".to_string(),
            expected: KindTag::Text,
            found: "number",
        }
    );
}

#[test]
fn container_where_scalar_expected_is_rejected() {
    let descriptor = user_descriptor();
    let tree = json!({ "ID": "u1", "Name": ["Alice"] });

    let err = Encoder::new(&descriptor)
        .collect_leaves(&tree)
        .expect_err("mismatch");

    assert!(matches!(err, EncodeError::KindMismatch { expected: KindTag::Text, .. }));
}

#[test]
fn unknown_field_is_a_depth_mismatch() {
    let descriptor = user_descriptor();
    let tree = json!({ "ID": "u1", "Extra": 1 });

    let err = Encoder::new(&descriptor)
        .collect_leaves(&tree)
        .expect_err("unknown");

    assert_eq!(
        err,
        EncodeError::DepthMismatch {
            depth: 0,
            shape: "Extra".to_string(),
        }
    );
}

#[test]
fn signed_overflow_is_reported() {
    let descriptor = SchemaDescriptor::of::<Profile>().expect("profile descriptor");
    let tree = json!({ "id": 1, "age": u64::MAX });

    let err = Encoder::new(&descriptor)
        .encode_state(&tree, "1", None)
        .expect_err("overflow");

    assert_eq!(
        err,
        EncodeError::IntegerOverflow {
            path: "age".to_string(),
            digits: 20,
        }
    );
}

#[test]
fn top_level_must_be_an_object() {
    let descriptor = user_descriptor();

    let err = Encoder::new(&descriptor)
        .collect_leaves(&json!(["u1"]))
        .expect_err("array");

    assert_eq!(err, EncodeError::NotAnObject { found: "array" });
}

proptest! {
    #[test]
    fn counters_sum_to_entry_count(
        name in "[a-z]{0,6}",
        tags in prop::collection::vec("[a-z\u{0}]{0,4}", 0..6),
        meta in prop::collection::btree_map("[a-z.]{1,4}", "[A-Z]{0,3}", 0..4),
    ) {
        let descriptor = user_descriptor();
        let user = User {
            id: "p".to_string(),
            name,
            tags,
            meta,
        };
        let tree = serialize::to_tree(&user).expect("tree");

        let state = Encoder::new(&descriptor)
            .encode_state(&tree, &user.id, None)
            .expect("encode");

        prop_assert_eq!(state.counter_total(), i64::try_from(state.len()).expect("len"));
        prop_assert_eq!(state.len(), 1 + user.tags.len() + user.meta.len());
    }
}
