//! Decision cache: fingerprint -> DecisionResult.
//!
//! The cache key is a SHA-256 fingerprint over the canonical text of the
//! individual request: sorted (category, id, issuer, datatype, sorted
//! canonical values) tuples, the per-category Content blocks, and the
//! request flags. Sorting makes the fingerprint independent of attribute
//! order, matching the engine's own order-independence.
//!
//! Implementations must never serve results across a policy reload; the
//! engine calls [`DecisionCache::clear`] when the policy tree changes.

use crate::request::IndividualDecisionRequest;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;
use xacml_core::DecisionResult;

/// Cache key for one individual decision request.
pub type Fingerprint = [u8; 32];

/// Canonical fingerprint of an individual decision request.
pub fn fingerprint(request: &IndividualDecisionRequest) -> Fingerprint {
    let mut lines: Vec<String> = request
        .named_attributes
        .iter()
        .map(|(fqn, bag)| {
            let mut values: Vec<String> = bag.iter().map(|v| v.canonical()).collect();
            values.sort();
            format!(
                "{}\t{}\t{}\t{}\t{}",
                fqn.category(),
                fqn.id(),
                fqn.issuer().unwrap_or(""),
                bag.datatype().uri(),
                values.join("\u{1f}")
            )
        })
        .collect();
    lines.sort();

    let mut contents: Vec<String> = request
        .contents
        .iter()
        .map(|(category, xml)| format!("{category}\t{xml}"))
        .collect();
    contents.sort();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(b"--\n");
    for line in &contents {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update([u8::from(request.return_policy_id_list)]);
    hasher.finalize().into()
}

/// Stores evaluated decisions between requests.
pub trait DecisionCache: Send + Sync {
    /// One slot per input request, in order; `None` signals a miss.
    fn get_all(&self, requests: &[IndividualDecisionRequest]) -> Vec<Option<DecisionResult>>;

    /// Store freshly evaluated results.
    fn put_all(&self, entries: Vec<(Fingerprint, DecisionResult)>);

    /// Drop everything (policy reload).
    fn clear(&self);

    /// Release resources. Called from the engine's `close()` cascade.
    fn close(&self) {}
}

struct MemoryCacheInner {
    map: FxHashMap<Fingerprint, DecisionResult>,
    /// Insertion order, oldest first (eviction order)
    order: VecDeque<Fingerprint>,
}

/// Bounded in-memory decision cache with insertion-order eviction.
pub struct MemoryDecisionCache {
    inner: Mutex<MemoryCacheInner>,
    capacity: usize,
}

impl MemoryDecisionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryCacheInner {
                map: FxHashMap::default(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap().map.len()
    }
}

impl DecisionCache for MemoryDecisionCache {
    fn get_all(&self, requests: &[IndividualDecisionRequest]) -> Vec<Option<DecisionResult>> {
        let inner = self.inner.lock().unwrap();
        let out: Vec<Option<DecisionResult>> = requests
            .iter()
            .map(|r| inner.map.get(&fingerprint(r)).cloned())
            .collect();
        debug!(
            requested = requests.len(),
            hits = out.iter().filter(|o| o.is_some()).count(),
            "decision cache lookup"
        );
        out
    }

    fn put_all(&self, entries: Vec<(Fingerprint, DecisionResult)>) {
        let mut inner = self.inner.lock().unwrap();
        for (key, result) in entries {
            if inner.map.insert(key, result).is_none() {
                inner.order.push_back(key);
            }
            while inner.map.len() > self.capacity {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.map.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
    }

    fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.map.clear();
        inner.order.clear();
    }
}
