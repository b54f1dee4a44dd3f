//! Core types and utilities for the shopping list server.
//!
//! This crate provides the foundational types shared by the storage,
//! authentication, and gateway crates:
//!
//! - **Identifiers**: a strongly-typed [`UserId`]
//! - **Identity**: the resolved `(user_id, username)` pair attached to a request
//!
//! # Example
//!
//! ```
//! use shoplist_core::{Identity, UserId};
//!
//! let user_id: UserId = "42".parse().unwrap();
//! let identity = Identity::new(user_id, "alice");
//!
//! assert_eq!(identity.user_id.get(), 42);
//! assert_eq!(identity.username, "alice");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;

pub use ids::{IdError, Identity, UserId};
