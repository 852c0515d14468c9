//! Translation dictionary backed by a remote Supabase table.
//!
//! Lookups go through the local cache first; only misses reach the remote
//! store, and every successful remote answer (including "no translation")
//! is written back so the next lookup is free.

pub mod client;
pub mod error;
pub mod key;
pub mod resolver;
#[cfg(test)]
pub mod testing;
pub mod types;

pub use client::{DictionaryRemote, SupabaseClient};
pub use error::{DictionaryError, RemoteError};
pub use key::TranslationKey;
pub use resolver::DictionaryResolver;
pub use types::{Lang, TranslationEntry};
