//! Shared helpers for exercising the engine against real storage and fake collaborators.
//!
//! Kept in the library (rather than a tests-only module) so integration suites and downstream crates
//! can drive the engine without re-implementing environment setup or collaborator doubles.
pub mod doubles;
#[cfg(feature = "sqlite")]
pub mod prepare_env;

pub mod seed;
