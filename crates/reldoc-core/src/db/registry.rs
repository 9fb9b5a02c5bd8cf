use crate::{
    config::Options,
    db::{Collection, DbError},
    error::Error,
    model::Document,
};
use std::{any::Any, collections::BTreeMap, sync::Arc};

///
/// Registry
///
/// Explicit owner of the collections an application works with, keyed by
/// document name. Nothing is global: build one at startup, drop it (or
/// `clear` it) at teardown.
///

#[derive(Default)]
pub struct Registry {
    collections: BTreeMap<&'static str, RegistryEntry>,
}

struct RegistryEntry {
    path: &'static str,
    collection: Arc<dyn Any + Send + Sync>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register the collection for `D`.
    pub fn register<D>(&mut self, options: Options) -> Result<Arc<Collection<D>>, Error>
    where
        D: Document + Send + Sync + 'static,
    {
        let name = D::MODEL.name;
        if self.collections.contains_key(name) {
            return Err(DbError::AlreadyRegistered {
                name: name.to_string(),
            }
            .into());
        }

        let collection = Arc::new(Collection::<D>::new(options)?);
        self.collections.insert(
            name,
            RegistryEntry {
                path: D::MODEL.path,
                collection: collection.clone(),
            },
        );

        Ok(collection)
    }

    /// Look up the collection registered under `D`'s name.
    ///
    /// A different document type registered under the same name is a
    /// type mismatch.
    pub fn get<D>(&self) -> Result<Arc<Collection<D>>, Error>
    where
        D: Document + Send + Sync + 'static,
    {
        let name = D::MODEL.name;
        let entry = self
            .collections
            .get(name)
            .ok_or_else(|| DbError::NotRegistered {
                name: name.to_string(),
            })?;

        entry
            .collection
            .clone()
            .downcast::<Collection<D>>()
            .map_err(|_| {
                DbError::TypeMismatch {
                    name: name.to_string(),
                    expected: entry.path,
                    found: D::MODEL.path,
                }
                .into()
            })
    }

    pub fn unregister<D>(&mut self) -> Result<Arc<Collection<D>>, Error>
    where
        D: Document + Send + Sync + 'static,
    {
        let collection = self.get::<D>()?;
        self.collections.remove(D::MODEL.name);

        Ok(collection)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Registered document names, in order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.collections.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn clear(&mut self) {
        self.collections.clear();
    }
}

///
/// TESTS
///
