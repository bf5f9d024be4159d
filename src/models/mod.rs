//! Core data models for the folder gateway.
//!
//! Every value here is built per request and serialized as JSON via `serde`;
//! the only durable state lives in the object-storage backend.

pub mod object;
