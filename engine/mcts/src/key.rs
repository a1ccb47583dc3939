//! Transposition table keys.

use engine_core::Domain;
use std::fmt;
use std::sync::Arc;

/// Identity of a tree node: the state fingerprint plus, for partially
/// observable domains, the fingerprint of the belief it was reached under.
///
/// Cloning is cheap (two reference counts) since keys are copied into every
/// parent's child list.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    state: Arc<[i32]>,
    belief: Option<Arc<[i32]>>,
}

impl NodeKey {
    pub fn new(state: Vec<i32>, belief: Option<Vec<i32>>) -> Self {
        Self {
            state: state.into(),
            belief: belief.map(Into::into),
        }
    }

    /// Key of a domain state as it currently stands.
    pub fn of<D: Domain>(domain: &D) -> Self {
        Self::new(domain.state_key(), domain.belief_key())
    }

    #[inline]
    pub fn state(&self) -> &[i32] {
        &self.state
    }

    #[inline]
    pub fn belief(&self) -> Option<&[i32]> {
        self.belief.as_deref()
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.belief {
            Some(b) => write!(f, "NodeKey({:?} | {:?})", &self.state[..], &b[..]),
            None => write!(f, "NodeKey({:?})", &self.state[..]),
        }
    }
}
