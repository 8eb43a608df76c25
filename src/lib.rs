//! clausebase — semantic search service for contract and policy document
//! chunks, backed by a fastembed embedding model and a LanceDB vector store.

pub mod api;
pub mod embedding;
pub mod error;
pub mod service;
pub mod store;

pub use error::{Error, Result};
