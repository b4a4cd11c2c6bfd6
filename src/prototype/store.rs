// SPDX-License-Identifier: GPL-3.0-or-later

//! The Prototype Store: a read-mostly registry of published
//! [`Prototype`]s, keyed by internal name with a `Shimeji.<name>` fallback
//! lookup for packages that historically qualified their names that way.

use super::Prototype;
use crate::error::LoadError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

const LEGACY_PREFIX: &str = "Shimeji.";

#[derive(Default)]
struct Inner {
    by_name: HashMap<String, Arc<Prototype>>,
    by_id: HashMap<u32, Arc<Prototype>>,
    order: Vec<String>,
    next_id: u32,
}

/// Reference-counted, read-mostly. Reads take a shared lock; `add`/`remove`
/// take the write lock only long enough to swap the maps, never while
/// parsing a package (see [`super::load`]).
pub struct Store {
    inner: RwLock<Inner>,
    /// Serialises concurrent reloads of the same name so two racing reloads
    /// can't interleave their publish step.
    publish_lock: Mutex<()>,
}

impl Default for Store {
    fn default() -> Self {
        Store {
            inner: RwLock::new(Inner::default()),
            publish_lock: Mutex::new(()),
        }
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn strip_legacy_prefix(name: &str) -> &str {
        name.strip_prefix(LEGACY_PREFIX).unwrap_or(name)
    }

    /// Publish a freshly loaded prototype under its own name, allocating a
    /// fresh id. Replaces any existing prototype of the same name.
    pub fn add(&self, mut proto: Prototype) -> Result<Arc<Prototype>, LoadError> {
        let _guard = self.publish_lock.lock().unwrap();
        let mut inner = self.inner.write().unwrap();
        if inner.by_name.contains_key(&proto.name) {
            return Err(LoadError::AlreadyLoaded);
        }
        proto.id = inner.next_id;
        inner.next_id += 1;
        let id = proto.id;
        let name = proto.name.clone();
        let proto = Arc::new(proto);
        inner.by_name.insert(name.clone(), proto.clone());
        inner.by_id.insert(id, proto.clone());
        inner.order.push(name);
        Ok(proto)
    }

    /// Replace an already-published prototype in place (reload). Agents
    /// holding the old `Arc<Prototype>` keep running against it until they
    /// naturally drop their reference; new spawns see the replacement.
    pub fn replace(&self, mut proto: Prototype) -> Arc<Prototype> {
        let _guard = self.publish_lock.lock().unwrap();
        let mut inner = self.inner.write().unwrap();
        let id = inner
            .by_name
            .get(&proto.name)
            .map(|old| old.id)
            .unwrap_or(inner.next_id);
        if !inner.by_name.contains_key(&proto.name) {
            inner.next_id += 1;
            inner.order.push(proto.name.clone());
        }
        proto.id = id;
        let proto = Arc::new(proto);
        inner.by_name.insert(proto.name.clone(), proto.clone());
        inner.by_id.insert(id, proto.clone());
        proto
    }

    pub fn remove(&self, name: &str) -> bool {
        let _guard = self.publish_lock.lock().unwrap();
        let mut inner = self.inner.write().unwrap();
        let name = Self::strip_legacy_prefix(name);
        if let Some(proto) = inner.by_name.remove(name) {
            inner.by_id.remove(&proto.id);
            inner.order.retain(|n| n != name);
            true
        } else {
            false
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<Prototype>> {
        let inner = self.inner.read().unwrap();
        let name = Self::strip_legacy_prefix(name);
        inner.by_name.get(name).cloned()
    }

    pub fn get_by_id(&self, id: u32) -> Option<Arc<Prototype>> {
        self.inner.read().unwrap().by_id.get(&id).cloned()
    }

    pub fn get_by_index(&self, index: usize) -> Option<Arc<Prototype>> {
        let inner = self.inner.read().unwrap();
        let name = inner.order.get(index)?;
        inner.by_name.get(name).cloned()
    }

    pub fn count(&self) -> usize {
        self.inner.read().unwrap().by_name.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.read().unwrap().order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_prototype(name: &str) -> Prototype {
        Prototype {
            id: 0,
            name: name.to_string(),
            display_name: name.to_string(),
            path: std::path::PathBuf::new(),
            actions: Vec::new(),
            behaviours: Vec::new(),
            local_variables: Vec::new(),
            expressions: Vec::new(),
            root_behaviours: Vec::new(),
            atlas: Default::default(),
            drag_behaviour: None,
            thrown_behaviour: None,
            fall_behaviour: None,
            dismiss_action: None,
        }
    }

    #[test]
    fn legacy_prefix_falls_back_to_bare_name() {
        let store = Store::new();
        store.add(empty_prototype("Penguin")).unwrap();
        assert!(store.get_by_name("Shimeji.Penguin").is_some());
    }

    #[test]
    fn add_rejects_duplicate_name() {
        let store = Store::new();
        store.add(empty_prototype("Penguin")).unwrap();
        assert!(store.add(empty_prototype("Penguin")).is_err());
    }

    #[test]
    fn replace_keeps_the_same_id() {
        let store = Store::new();
        let first = store.add(empty_prototype("Penguin")).unwrap();
        let second = store.replace(empty_prototype("Penguin"));
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn remove_then_get_returns_none() {
        let store = Store::new();
        store.add(empty_prototype("Penguin")).unwrap();
        assert!(store.remove("Penguin"));
        assert!(store.get_by_name("Penguin").is_none());
    }
}
