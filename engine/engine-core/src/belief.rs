//! Belief contract for partially observable domains.

use std::fmt::Debug;

/// A player's knowledge about hidden information.
///
/// The engine never updates a belief itself: domains advance it as actions
/// are applied, and the factory absorbs the advanced copy through
/// [`DomainFactory::observe`](crate::DomainFactory::observe). The engine only
/// needs a fingerprint so that the same state reached under different beliefs
/// maps to different tree nodes.
pub trait Belief: Clone + Debug + Send + Sync + 'static {
    fn fingerprint(&self) -> Vec<i32>;
}

/// Belief of a fully observable domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoBelief;

impl Belief for NoBelief {
    fn fingerprint(&self) -> Vec<i32> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_belief_fingerprint_is_empty() {
        assert!(NoBelief.fingerprint().is_empty());
    }
}
