use crate::model::{Document, DocumentModel, FieldKind, FieldModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// User
/// `{ID string (primary), Name string, Tags []string, Meta map[string]string}`
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct User {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
    #[serde(rename = "Meta")]
    pub meta: BTreeMap<String, String>,
}

const USER_FIELDS: &[FieldModel] = &[
    FieldModel::primary("ID", FieldKind::Text),
    FieldModel::new("Name", FieldKind::Text),
    FieldModel::new("Tags", FieldKind::List(&FieldKind::Text)),
    FieldModel::new(
        "Meta",
        FieldKind::Map {
            key: &FieldKind::Text,
            value: &FieldKind::Text,
        },
    ),
];

const USER_MODEL: DocumentModel = DocumentModel {
    path: "test_fixtures::User",
    name: "User",
    fields: USER_FIELDS,
};

impl Document for User {
    const MODEL: &'static DocumentModel = &USER_MODEL;
}

impl User {
    pub fn new(id: &str, name: &str, tags: &[&str], meta: &[(&str, &str)]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
            meta: meta
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    /// The scenario document: `u1 / Alice / [x, y] / {city: NY}`.
    pub fn alice() -> Self {
        Self::new("u1", "Alice", &["x", "y"], &[("city", "NY")])
    }
}

///
/// Profile
/// Numeric, optional and nested shapes.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Profile {
    pub id: u64,
    pub age: i64,
    pub score: f64,
    pub active: bool,
    pub nickname: Option<String>,
    pub grid: Vec<Vec<u64>>,
    pub notes: BTreeMap<String, Vec<String>>,
}

const PROFILE_FIELDS: &[FieldModel] = &[
    FieldModel::primary("id", FieldKind::Uint),
    FieldModel::new("age", FieldKind::Int),
    FieldModel::new("score", FieldKind::Float),
    FieldModel::new("active", FieldKind::Bool),
    FieldModel::new("nickname", FieldKind::Text),
    FieldModel::new("grid", FieldKind::List(&FieldKind::List(&FieldKind::Uint))),
    FieldModel::new(
        "notes",
        FieldKind::Map {
            key: &FieldKind::Text,
            value: &FieldKind::List(&FieldKind::Text),
        },
    ),
];

const PROFILE_MODEL: DocumentModel = DocumentModel {
    path: "test_fixtures::Profile",
    name: "Profile",
    fields: PROFILE_FIELDS,
};

impl Document for Profile {
    const MODEL: &'static DocumentModel = &PROFILE_MODEL;
}

impl Profile {
    pub fn sample() -> Self {
        Self {
            id: 7,
            age: -42,
            score: 1.5,
            active: true,
            nickname: None,
            grid: vec![vec![1, 2], vec![3]],
            notes: [("todo".to_string(), vec!["a".to_string(), "b".to_string()])]
                .into_iter()
                .collect(),
        }
    }
}
