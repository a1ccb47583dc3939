//! Core contracts between the search engine and the domains it searches.
//!
//! This crate provides the abstractions the MCTS engine is written against:
//! - `Domain`: a clonable decision process (players, actions, chance, outcome)
//! - `ActionList`: enumerated actions with optional probabilities
//! - `Belief`: fingerprintable knowledge of hidden information
//! - `DomainFactory`: builds states from fingerprints and tracks the belief
//! - `DeterminizationSampler`: draws fully observable states from a belief

pub mod belief;
pub mod domain;
pub mod factory;

pub use belief::{Belief, NoBelief};
pub use domain::{ActionList, Domain};
pub use factory::{
    DeterminizationSampler, DomainFactory, DomainSample, NullDeterminizationSampler,
    DEFAULT_MAX_PLAYERS,
};

/// Convenience alias for the action type of a factory's domain.
pub type ActionOf<F> = <<F as DomainFactory>::Domain as Domain>::Action;
