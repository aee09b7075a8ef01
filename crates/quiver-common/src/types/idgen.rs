//! Collision-resistant identifier generation.

use rand::Rng;

use super::{EdgeId, NodeId};

/// Issues globally unique identifiers for nodes and edges.
///
/// Ids are 128 uniform-random bits rendered as 32 lowercase hex characters.
/// Thread-safe and stateless: every call draws from the calling thread's
/// RNG, so generators can be shared freely behind an `Arc`.
///
/// Transaction ids are not issued here - they are commit-sequence numbers
/// assigned by the coordinator so that id order matches commit order.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdGenerator;

impl IdGenerator {
    /// Creates a new id generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generates a fresh node id.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        NodeId::new(Self::hex128())
    }

    /// Generates a fresh edge id.
    #[must_use]
    pub fn edge_id(&self) -> EdgeId {
        EdgeId::new(Self::hex128())
    }

    fn hex128() -> String {
        format!("{:032x}", rand::rng().random::<u128>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_shape() {
        let id = IdGenerator::new().node_id();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!id.as_str().chars().any(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_ids_are_unique() {
        let generator = IdGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generator.node_id()));
        }
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let generator = Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                thread::spawn(move || (0..1000).map(|_| generator.edge_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
