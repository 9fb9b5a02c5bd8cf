use crate::key::{
    COMPACT_TAG, CompactKey, FieldPath, INDEX_TAG, IndexKey, KeyDecodeError, escape, field_prefix,
    upper_bound, value_prefix,
};
use proptest::prelude::*;

fn key(field: &str, value: &str, primary: &str) -> IndexKey {
    IndexKey {
        entity: "User".to_string(),
        path: FieldPath::new(field),
        value: value.to_string(),
        primary: primary.to_string(),
    }
}

fn in_range(key: &str, start: &str) -> bool {
    key >= start && key < upper_bound(start).as_str()
}

#[test]
fn decode_recovers_path_and_primary_key() {
    let original = IndexKey {
        entity: "User".to_string(),
        path: FieldPath::new("Grid").index(3).key("a.b\u{0}c"),
        value: "x\u{1}y".to_string(),
        primary: "u\u{2}1".to_string(),
    };

    let decoded = IndexKey::decode(&original.encode()).expect("decode");

    assert_eq!(decoded, original);
    assert_eq!(decoded.path.to_string(), "Grid[3].a.b\u{0}c");
    assert_eq!(decoded.path.shape(), "Grid[]{}");
}

#[test]
fn field_prefix_does_not_bleed_into_longer_field_names() {
    let tag = key("Tag", "x", "u1").encode();
    let tags = key("Tags", "x", "u1").encode();
    let start = field_prefix(INDEX_TAG, "User", "Tag");

    assert!(in_range(&tag, &start));
    assert!(!in_range(&tags, &start));
}

#[test]
fn value_prefix_isolates_one_path_level() {
    let start = value_prefix(INDEX_TAG, "User", &FieldPath::new("Tags").index(1));
    let at_one = IndexKey {
        path: FieldPath::new("Tags").index(1),
        ..key("Tags", "y", "u1")
    };
    let at_ten = IndexKey {
        path: FieldPath::new("Tags").index(10),
        ..key("Tags", "y", "u1")
    };

    assert!(in_range(&at_one.encode(), &start));
    assert!(!in_range(&at_ten.encode(), &start));
}

#[test]
fn value_order_is_preserved_across_primary_keys() {
    let a = key("Name", "Alice", "zz").encode();
    let b = key("Name", "Alicf", "aa").encode();
    let prefix_value = key("Name", "Ali", "zz").encode();

    assert!(a < b);
    assert!(prefix_value < a, "a value sorts before its extensions");
}

#[test]
fn compact_key_is_the_original_truncated_before_the_primary_key() {
    let original = key("Name", "Alice", "u1");
    let compact = original.compact_key();

    let encoded = compact.encode();
    assert!(encoded.starts_with(&value_prefix(COMPACT_TAG, "User", &FieldPath::new("Name"))));
    assert_eq!(CompactKey::decode(&encoded).expect("decode"), compact);
}

#[test]
fn decode_rejects_foreign_keys() {
    assert_eq!(
        IndexKey::decode("u1"),
        Err(KeyDecodeError::Namespace { tag: INDEX_TAG })
    );

    let compact = key("Name", "Alice", "u1").compact_key().encode();
    assert_eq!(
        IndexKey::decode(&compact),
        Err(KeyDecodeError::Namespace { tag: INDEX_TAG })
    );

    let truncated = "\u{0}i\u{0}User\u{0}Name\u{1}\u{0}Alice";
    assert_eq!(
        IndexKey::decode(truncated),
        Err(KeyDecodeError::Arity {
            found: 3,
            expected: 4
        })
    );

    let bad_step = "\u{0}i\u{0}User\u{0}Tags\u{1}[x\u{1}\u{0}y\u{0}u1";
    assert!(matches!(
        IndexKey::decode(bad_step),
        Err(KeyDecodeError::Step(_))
    ));
}

proptest! {
    #[test]
    fn escape_preserves_order(a in ".{0,8}", b in ".{0,8}") {
        prop_assert_eq!(a.cmp(&b), escape(&a).cmp(&escape(&b)));
    }

    #[test]
    fn decode_inverts_encode(
        field in "[A-Za-z_][A-Za-z0-9_]{0,6}",
        map_key in "[\u{0}-\u{3}a-z.]{0,6}",
        index in 0usize..64,
        value in "[\u{0}-\u{3}a-z ]{0,8}",
        primary in "[a-z0-9\u{1}]{1,8}",
    ) {
        let original = IndexKey {
            entity: "Doc".to_string(),
            path: FieldPath::new(field).key(map_key).index(index),
            value,
            primary,
        };
        prop_assert_eq!(IndexKey::decode(&original.encode()).expect("decode"), original);
    }
}
