//! Running totals keyed by administrative region.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

/// Final totals of a run, one entry per key with a contributing pixel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AccumulatorMap(BTreeMap<String, f64>);

impl AccumulatorMap {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, f64> {
        self.0.iter()
    }

    /// Sum over all keys.
    pub fn grand_total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn into_inner(self) -> BTreeMap<String, f64> {
        self.0
    }
}

impl<'a> IntoIterator for &'a AccumulatorMap {
    type Item = (&'a String, &'a f64);
    type IntoIter = btree_map::Iter<'a, String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Totals shared by the polygons of one run.
///
/// A key appears only once a nonzero contribution is added for it.
/// Cloning shares the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct SharedAccumulator {
    inner: Arc<Mutex<BTreeMap<String, f64>>>,
}

impl SharedAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one polygon's partial total to its key.
    pub async fn add(&self, key: &str, total: f64) {
        let mut totals = self.inner.lock().await;
        match totals.get_mut(key) {
            Some(existing) => *existing += total,
            None => {
                totals.insert(key.to_string(), total);
            }
        }
    }

    /// Number of keys seen so far.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Freeze the totals.
    pub async fn finalize(self) -> AccumulatorMap {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => AccumulatorMap(mutex.into_inner()),
            Err(shared) => AccumulatorMap(shared.lock().await.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_creates_then_sums() {
        let acc = SharedAccumulator::new();
        acc.add("a", 2.5).await;
        acc.add("b", 1.0).await;
        acc.add("a", 0.5).await;

        assert_eq!(acc.len().await, 2);
        let totals = acc.finalize().await;
        assert_eq!(totals.get("a"), Some(3.0));
        assert_eq!(totals.get("b"), Some(1.0));
        assert_eq!(totals.grand_total(), 4.0);
    }

    #[tokio::test]
    async fn test_finalize_with_outstanding_clone() {
        let acc = SharedAccumulator::new();
        let other = acc.clone();
        other.add("x", 7.0).await;

        let totals = acc.finalize().await;
        assert_eq!(totals.get("x"), Some(7.0));
        assert!(!totals.contains_key("y"));
    }

    #[tokio::test]
    async fn test_concurrent_adds() {
        let acc = SharedAccumulator::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let acc = acc.clone();
            handles.push(tokio::spawn(async move { acc.add("k", 1.0).await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(acc.finalize().await.get("k"), Some(16.0));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut map = BTreeMap::new();
        map.insert("101-NORTE_ALTA".to_string(), 10.0);
        let json = serde_json::to_string(&AccumulatorMap(map)).unwrap();
        assert_eq!(json, r#"{"101-NORTE_ALTA":10.0}"#);
    }
}
