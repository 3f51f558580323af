//! Foundation types shared by every depot crate.
//!
//! This crate has no opinion about storage or serialization. It defines the
//! vocabulary the rest of the workspace speaks:
//!
//! # Key Types
//!
//! - [`Handle`]: an object identifier that compares, hashes, and sorts
//!   case-insensitively while remembering the exact spelling it was given.
//! - [`PropertyValue`]: the closed set of constructor-argument shapes, with
//!   explicit fallible conversions and spreadsheet-style promotions.
//! - [`Timestamp`]: a millisecond wall-clock instant used for creation and
//!   update stamps.
//! - [`TypeError`]: conversion and shape failures, shared wherever values
//!   are coerced.

pub mod error;
pub mod handle;
pub mod property;
pub mod temporal;

pub use error::{TypeError, TypeResult};
pub use handle::Handle;
pub use property::{is_numeric_literal, PropertyValue};
pub use temporal::Timestamp;
