//! # nioprops
//!
//! Typed property trees for n.io block templates.
//!
//! A running n.io instance describes every block type with a template: a
//! nested mapping of property names to type descriptors. This crate turns
//! such a template into a live value tree that can be read, edited with type
//! checking, and flattened back to the wire format.
//!
//! ## Quick Start
//!
//! ```rust
//! use nioprops::{Value, load_block};
//! use serde_json::json;
//!
//! let template = json!({
//!     "properties": {
//!         "timeout": {"type": "int", "default": 30},
//!         "mode": {"type": "select", "options": {"fast": 0, "slow": 1}, "default": "fast"},
//!     }
//! });
//!
//! let mut config = load_block(&template).unwrap();
//! config.set("timeout", "45").unwrap();
//! assert_eq!(config.get("timeout").unwrap(), Value::Int(45));
//! assert_eq!(config.get("mode").unwrap(), Value::from("fast"));
//! assert!(config.set("mode", "medium").is_err());
//! ```
//!
//! ## Modules
//!
//! - [`attr`] - Attribute, locked and typed containers
//! - [`list`] - Homogeneously typed sequences
//! - [`select`] - Closed enumerations installed through accessor delegation
//! - [`template`] - Template loader
//! - [`value`] - Runtime values and the coercion table
//! - [`error`] - Error taxonomy

#[macro_use]
extern crate log;

/// Attribute, locked and typed containers.
pub mod attr;

/// Error types for property trees.
pub mod error;

/// Typed sequences.
pub mod list;

/// Typed enumerations.
pub mod select;

/// Template loading.
///
/// Converts the schema documents served by an instance into value trees.
pub mod template;

/// Runtime values, type tags and coercion.
pub mod value;

pub use attr::{Accessor, AttrDict, Entry, Flavor, Shape};
pub use error::{PropertyError, Result};
pub use list::TypedList;
pub use select::{Member, TypedEnum};
pub use template::{TypeTag, load_block, load_list, load_properties, load_template};
pub use value::{Kind, Value};
