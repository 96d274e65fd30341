//! # sync-types
//!
//! Identity and vocabulary types for viewer-sync.
//!
//! This crate provides the foundational types used across all viewer-sync crates:
//! - [`EntityName`] - Fully-qualified viewer identity
//! - [`PropertyKey`], [`PropertyValue`], [`ValueKind`] - The closed set of synchronizable properties
//! - [`Trigger`] - What a host change notification was about
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod property;
mod trigger;

pub use error::SyncError;
pub use ids::{EntityName, InputRef};
pub use property::{PropertyKey, PropertyValue, ValueKind};
pub use trigger::Trigger;
