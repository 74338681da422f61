//! Collection aliases used across the crate. Hashed collections use the Fx
//! hasher; window and node ids are small integers.

pub use std::collections::{BTreeMap, BTreeSet};

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;
