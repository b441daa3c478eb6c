//! vt-core: value model and display codec for observable variable trees.
//!
//! This crate holds the leaf-level building blocks shared by the rest of the
//! workspace:
//! - Typed raw values ([`Value`], [`ValueKind`])
//! - Display disciplines ([`DisplaySpec`]: plain, enum, range) converting
//!   between raw values and their display form
//! - The error taxonomy for tree operations ([`TreeError`])

pub mod codec;
pub mod error;
pub mod value;

pub use codec::{DisplaySpec, EnumSpec, RangeSpec};
pub use error::{TreeError, TreeResult};
pub use value::{Value, ValueKind};
