//! Cache for resolved threshold sets.
//!
//! Resolving thresholds only depends on the regulation documents, so the result is kept
//! until the documents change. A fingerprint match is confirmed against the stored
//! documents before the cached result is reused.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::thresholds::parser::resolve_thresholds;
use crate::thresholds::{RegulationDocument, ThresholdSet};

struct CacheEntry {
    fingerprint: u64,
    documents: Vec<RegulationDocument>,
    thresholds: Option<ThresholdSet>,
}

/// Memoizes [`resolve_thresholds`] for the most recent regulation set.
#[derive(Default)]
pub struct ThresholdCache {
    entry: Option<CacheEntry>,
}

impl ThresholdCache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self { entry: None }
    }

    /// Returns the thresholds for `documents`, resolving them if the documents changed.
    pub fn get_or_resolve(&mut self, documents: &[RegulationDocument]) -> Option<ThresholdSet> {
        let fp = fingerprint(documents);
        match &self.entry {
            Some(entry) if entry.fingerprint == fp && entry.documents == documents => {
                entry.thresholds
            }
            _ => {
                let thresholds = resolve_thresholds(documents);
                self.entry = Some(CacheEntry {
                    fingerprint: fp,
                    documents: documents.to_vec(),
                    thresholds,
                });
                thresholds
            }
        }
    }

    /// Forgets the cached result.
    pub fn clear(&mut self) {
        self.entry = None;
    }

    /// Whether a result is cached.
    pub fn is_warm(&self) -> bool {
        self.entry.is_some()
    }
}

fn fingerprint(documents: &[RegulationDocument]) -> u64 {
    let mut hasher = DefaultHasher::new();
    documents.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::Credit;

    fn doc(hours: u32) -> RegulationDocument {
        RegulationDocument::new("Scheme").with_credit(Credit::new(
            "Daylight",
            [format!("Minimum {hours} hours direct sunlight")],
        ))
    }

    #[test]
    fn caches_until_documents_change() {
        let mut cache = ThresholdCache::new();
        assert!(!cache.is_warm());

        let first = cache.get_or_resolve(&[doc(2)]).unwrap();
        assert_eq!(first.sun_hours.unwrap().minimum, 2.0);
        assert!(cache.is_warm());

        let again = cache.get_or_resolve(&[doc(2)]).unwrap();
        assert_eq!(first, again);

        let changed = cache.get_or_resolve(&[doc(3)]).unwrap();
        assert_eq!(changed.sun_hours.unwrap().minimum, 3.0);
    }

    #[test]
    fn fingerprint_collision_is_not_trusted() {
        let mut cache = ThresholdCache::new();
        let strict = [doc(3)];
        // Stale entry whose fingerprint matches `strict` but whose documents differ.
        cache.entry = Some(CacheEntry {
            fingerprint: fingerprint(&strict),
            documents: vec![doc(2)],
            thresholds: resolve_thresholds(&[doc(2)]),
        });

        let resolved = cache.get_or_resolve(&strict).unwrap();
        assert_eq!(resolved.sun_hours.unwrap().minimum, 3.0);
    }

    #[test]
    fn caches_absence_of_context() {
        let mut cache = ThresholdCache::new();
        assert!(cache.get_or_resolve(&[]).is_none());
        assert!(cache.is_warm());
        cache.clear();
        assert!(!cache.is_warm());
    }
}
