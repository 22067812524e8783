//! Hash collections keyed with the Fx hasher.

pub type HashSet<T> = rustc_hash::FxHashSet<T>;
