//! Collection type aliases.
//!
//! We use `rustc_hash::FxHashMap` and `FxHashSet` for the small, string-keyed
//! maps the backends build per query.

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;
pub type VecDeque<T> = std::collections::VecDeque<T>;
