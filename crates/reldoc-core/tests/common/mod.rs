#![allow(dead_code)]

use reldoc_core::{
    model::{Document, DocumentModel, FieldKind, FieldModel},
    store::{KvIter, KvStore, MemoryStore, StoreError},
};
use serde::{Deserialize, Serialize};
use std::{cell::Cell, collections::BTreeMap};

///
/// Ticket
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub labels: Vec<String>,
    pub estimates: BTreeMap<String, i64>,
}

const TICKET_MODEL: DocumentModel = DocumentModel {
    path: "common::Ticket",
    name: "Ticket",
    fields: &[
        FieldModel::primary("id", FieldKind::Text),
        FieldModel::new("title", FieldKind::Text),
        FieldModel::new("labels", FieldKind::List(&FieldKind::Text)),
        FieldModel::new(
            "estimates",
            FieldKind::Map {
                key: &FieldKind::Text,
                value: &FieldKind::Int,
            },
        ),
    ],
};

impl Document for Ticket {
    const MODEL: &'static DocumentModel = &TICKET_MODEL;
}

impl Ticket {
    pub fn new(id: &str, title: &str, labels: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            labels: labels.iter().map(ToString::to_string).collect(),
            estimates: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_estimate(mut self, who: &str, points: i64) -> Self {
        self.estimates.insert(who.to_string(), points);
        self
    }
}

///
/// Write
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Write {
    Put(String),
    Delete(String),
}

///
/// CountingStore
/// Memory store that counts every call it receives and logs writes in order.
///

#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub puts: usize,
    pub deletes: usize,
    pub gets: Cell<usize>,
    pub scans: Cell<usize>,
    pub writes: Vec<Write>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.puts = 0;
        self.deletes = 0;
        self.gets.set(0);
        self.scans.set(0);
        self.writes.clear();
    }
}

impl KvStore for CountingStore {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.puts += 1;
        self.writes.push(Write::Put(key.to_string()));
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.gets.set(self.gets.get() + 1);
        self.inner.get(key)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.deletes += 1;
        self.writes.push(Write::Delete(key.to_string()));
        self.inner.delete(key)
    }

    fn range_scan<'a>(&'a self, start: &str, end: &str) -> Result<KvIter<'a>, StoreError> {
        self.scans.set(self.scans.get() + 1);
        self.inner.range_scan(start, end)
    }
}

///
/// FailOn
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailOn {
    Put,
    Get,
    Delete,
    Scan,
}

///
/// FailingStore
/// Memory store that fails one kind of call once armed.
///

#[derive(Debug, Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail: Option<FailOn>,
}

impl FailingStore {
    pub fn arm(&mut self, op: FailOn) {
        self.fail = Some(op);
    }

    fn check(&self, op: FailOn) -> Result<(), StoreError> {
        if self.fail == Some(op) {
            return Err(StoreError::new(format!("injected {op:?} failure")));
        }

        Ok(())
    }
}

impl KvStore for FailingStore {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.check(FailOn::Put)?;
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check(FailOn::Get)?;
        self.inner.get(key)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.check(FailOn::Delete)?;
        self.inner.delete(key)
    }

    fn range_scan<'a>(&'a self, start: &str, end: &str) -> Result<KvIter<'a>, StoreError> {
        self.check(FailOn::Scan)?;
        self.inner.range_scan(start, end)
    }
}
