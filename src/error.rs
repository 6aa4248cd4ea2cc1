//! Crate-wide result alias.
//!
//! Most fallible paths propagate `anyhow::Error` with context; typed errors
//! exist only at the HTTP fetch boundary (see [`crate::net::fetcher`]).

pub type Result<T> = anyhow::Result<T>;
