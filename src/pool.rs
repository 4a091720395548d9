use crate::instance::ViewInstance;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Closed instances kept for reuse, one per view name.
///
/// Lock order: the context's active index is always taken before the pool.
#[derive(Debug, Default)]
pub struct InstancePool {
    entries: Mutex<HashMap<String, Arc<ViewInstance>>>,
}

impl InstancePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an instance. Returns the instance it displaced, if any.
    pub fn put(&self, view: Arc<ViewInstance>) -> Option<Arc<ViewInstance>> {
        debug!("Pooling {}", view.name());
        let displaced = self
            .entries
            .lock()
            .unwrap()
            .insert(view.name().to_string(), view.clone());
        displaced.filter(|old| !Arc::ptr_eq(old, &view))
    }

    pub fn take(&self, name: &str) -> Option<Arc<ViewInstance>> {
        self.entries.lock().unwrap().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().unwrap().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Empty the pool, handing every instance to the caller
    pub fn drain(&self) -> Vec<Arc<ViewInstance>> {
        self.entries.lock().unwrap().drain().map(|(_, view)| view).collect()
    }
}
