//! Core ingestion, compilation and query machinery

pub mod acl;
pub mod config;
pub mod iam;
pub mod query;
pub mod refresh;
pub mod source;
pub mod store;
