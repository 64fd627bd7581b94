//! Scope synthesizer and upsert resolver.

mod search;
mod upsert;

pub use search::{ScopeFn, ScopeOptions, SearchField};
