//! Common types and utilities shared across the daemon and journal crates.
//!
//! This crate provides the error convention both clients report through,
//! the 128-bit id type used for boot ids, and the collection aliases used
//! by the in-memory backends.

pub mod collections;

pub mod errno;

pub mod error;

pub mod id128;

// Re-export collection types for convenience
pub use collections::{HashMap, HashSet, VecDeque};

pub use errno::check;
pub use error::{Error, ErrnoExt, Result};
pub use id128::Id128;

pub use nix::errno::Errno;
