//! Shared string interner
//!
//! Field names repeat on every record and some field values (type tags,
//! base-template lists) repeat across thousands of records. Interning them
//! keeps one allocation per distinct string across all parse tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Concurrent interner handing out shared `Arc<str>` handles
#[derive(Debug, Default)]
pub struct Interner {
    strings: DashMap<Arc<str>, ()>,
    hits: AtomicUsize,
}

impl Interner {
    /// Create an empty interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared handle for `value`, inserting it on first use
    pub fn intern(&self, value: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(value) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return existing.key().clone();
        }

        match self.strings.entry(Arc::from(value)) {
            Entry::Occupied(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                entry.key().clone()
            }
            Entry::Vacant(entry) => {
                let key = entry.key().clone();
                entry.insert(());
                key
            }
        }
    }

    /// Number of distinct strings held
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the interner is empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Number of lookups answered by an existing entry
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_same_allocation() {
        let interner = Interner::new();
        let a = interner.intern("Single-Line Text");
        let b = interner.intern("Single-Line Text");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
        assert_eq!(interner.hits(), 1);
    }

    #[test]
    fn test_intern_distinct_values() {
        let interner = Interner::new();
        interner.intern("a");
        interner.intern("b");
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.hits(), 0);
    }

    #[test]
    fn test_intern_from_many_threads() {
        let interner = Arc::new(Interner::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let interner = interner.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        interner.intern(&format!("value-{}", i % 10));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(interner.len(), 10);
    }
}
