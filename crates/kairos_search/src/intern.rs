//! Generic hash-consing tables with dense, stable indices.
//!
//! The tables follow the double-checked publish protocol: the fast path
//! looks up the probe under a read lock; on a miss the writer lock is
//! taken, the lookup is repeated, and only then is a new entry allocated.
//! An entry's index is assigned once and never reused, so an index handed
//! to another thread stays valid for the table's lifetime (entries can be
//! retired, leaving a hole, but indices never shift). Readers resolve an
//! index under the read lock, so a concurrent insert can never expose a
//! torn store.

use kairos_common::{InternalError, StaResult};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

struct TableInner<T> {
    map: HashMap<Arc<T>, u32>,
    items: Vec<Option<Arc<T>>>,
}

/// A hash-consing intern table for `T`.
pub struct InternTable<T: Eq + Hash> {
    inner: RwLock<TableInner<T>>,
    index_max: u32,
    name: &'static str,
}

impl<T: Eq + Hash + Clone> InternTable<T> {
    /// Creates an empty table. `name` labels overflow errors; `index_max`
    /// is the largest permitted index, and exceeding it is fatal.
    pub fn new(name: &'static str, index_max: u32) -> Self {
        Self {
            inner: RwLock::new(TableInner {
                map: HashMap::new(),
                items: Vec::new(),
            }),
            index_max,
            name,
        }
    }

    /// Returns the interned index of `probe`, interning it on first sight.
    pub fn find_or_intern(&self, probe: &T) -> StaResult<u32> {
        {
            let inner = self.inner.read().unwrap();
            if let Some(&index) = inner.map.get(probe) {
                return Ok(index);
            }
        }
        let mut inner = self.inner.write().unwrap();
        // Another thread may have interned it between the locks.
        if let Some(&index) = inner.map.get(probe) {
            return Ok(index);
        }
        let index = inner.items.len() as u32;
        if index > self.index_max {
            return Err(InternalError::new(format!(
                "max {} index exceeded",
                self.name
            )));
        }
        let item = Arc::new(probe.clone());
        inner.items.push(Some(Arc::clone(&item)));
        inner.map.insert(item, index);
        Ok(index)
    }

    /// Looks up `probe` without interning.
    pub fn find(&self, probe: &T) -> Option<u32> {
        self.inner.read().unwrap().map.get(probe).copied()
    }

    /// Resolves an index to its interned value.
    ///
    /// # Panics
    ///
    /// Panics if the index was never allocated or its entry was retired.
    pub fn get(&self, index: u32) -> Arc<T> {
        let inner = self.inner.read().unwrap();
        inner.items[index as usize]
            .as_ref()
            .map(Arc::clone)
            .expect("interned index is live")
    }

    /// Resolves an index, returning `None` for retired entries.
    pub fn try_get(&self, index: u32) -> Option<Arc<T>> {
        let inner = self.inner.read().unwrap();
        inner.items.get(index as usize)?.as_ref().map(Arc::clone)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().map.len()
    }

    /// Returns `true` if the table has no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retires every entry matching `pred`, leaving holes so other indices
    /// stay stable. Used to drop filter-marked entries.
    pub fn retire_matching(&self, pred: impl Fn(&T) -> bool) {
        let mut inner = self.inner.write().unwrap();
        let mut retired = Vec::new();
        for slot in inner.items.iter_mut() {
            if let Some(item) = slot {
                if pred(item) {
                    retired.push(Arc::clone(item));
                    *slot = None;
                }
            }
        }
        for item in retired {
            inner.map.remove(&item);
        }
    }

    /// Drops every entry. Indices restart from zero; only valid when no
    /// outstanding index can be used again.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.map.clear();
        inner.items.clear();
    }

    /// Visits every live entry with its index.
    pub fn for_each(&self, mut visit: impl FnMut(u32, &T)) {
        let inner = self.inner.read().unwrap();
        for (index, slot) in inner.items.iter().enumerate() {
            if let Some(item) = slot {
                visit(index as u32, item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let table = InternTable::new("tag", u32::MAX);
        let a = table.find_or_intern(&"alpha".to_string()).unwrap();
        let b = table.find_or_intern(&"alpha".to_string()).unwrap();
        let c = table.find_or_intern(&"beta".to_string()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
        assert_eq!(*table.get(a), "alpha");
    }

    #[test]
    fn indices_are_dense_and_monotone() {
        let table = InternTable::new("tag", u32::MAX);
        for i in 0..10u32 {
            assert_eq!(table.find_or_intern(&i.to_string()).unwrap(), i);
        }
    }

    #[test]
    fn overflow_is_fatal() {
        let table = InternTable::new("tag group", 1);
        assert!(table.find_or_intern(&"a".to_string()).is_ok());
        assert!(table.find_or_intern(&"b".to_string()).is_ok());
        let err = table.find_or_intern(&"c".to_string()).unwrap_err();
        assert!(err.message.contains("max tag group index exceeded"));
    }

    #[test]
    fn retire_leaves_holes_and_stable_indices() {
        let table = InternTable::new("tag", u32::MAX);
        let a = table.find_or_intern(&"keep".to_string()).unwrap();
        let b = table.find_or_intern(&"drop_me".to_string()).unwrap();
        table.retire_matching(|s| s.starts_with("drop"));
        assert_eq!(table.len(), 1);
        assert_eq!(*table.get(a), "keep");
        assert!(table.try_get(b).is_none());
        // New entries do not reuse the hole.
        let c = table.find_or_intern(&"new".to_string()).unwrap();
        assert_eq!(c, 2);
    }

    #[test]
    fn concurrent_interning_agrees() {
        use std::sync::Arc as StdArc;
        use std::thread;

        let table = StdArc::new(InternTable::new("tag", u32::MAX));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = StdArc::clone(&table);
                thread::spawn(move || {
                    (0..100)
                        .map(|i| table.find_or_intern(&format!("item{i}")).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let results: Vec<Vec<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for indices in &results[1..] {
            assert_eq!(indices, &results[0]);
        }
        assert_eq!(table.len(), 100);
    }
}
