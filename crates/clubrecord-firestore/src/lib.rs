// DocumentStore backed by the hosted document database's REST API.

pub mod client;
pub mod value;

pub use client::{FirestoreStore, RetryPolicy, DEFAULT_BASE_URL};
