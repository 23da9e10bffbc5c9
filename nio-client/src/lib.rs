//! # nio-client
//!
//! Client for a running n.io instance.
//!
//! Block types, blocks and services are fetched over the instance's REST
//! API. Every block carries a typed configuration tree built from its type's
//! template by [`nioprops`], so edits are checked against the declared
//! property types before they are written back.
//!
//! ## Modules
//!
//! - [`block`] - Blocks and their typed configuration
//! - [`config`] - Instance connection settings
//! - [`instance`] - The instance facade tying everything together
//! - [`service`] - Services and the blocks they execute
//! - [`transport`] - Transport seam and the REST client
//!
//! ## Example
//!
//! ```rust,no_run
//! use nio_client::{Instance, InstanceConfig};
//!
//! let config = InstanceConfig::load("nio.toml")?;
//! let mut instance = Instance::connect(&config)?;
//!
//! let mut block = instance.blocks["counter"].clone();
//! block.config.set("interval", 5)?;
//! instance.add_block(block)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

#[macro_use]
extern crate log;

#[macro_use]
extern crate anyhow;

/// Blocks and their typed configuration.
pub mod block;

/// Instance connection settings.
///
/// Read from TOML or JSON files; absent files fall back to the defaults of
/// a local development instance.
pub mod config;

/// The instance facade.
pub mod instance;

/// Services.
pub mod service;

/// Transport seam and the blocking REST client.
pub mod transport;

pub use block::Block;
pub use config::InstanceConfig;
pub use instance::Instance;
pub use service::Service;
pub use transport::{RestClient, Transport};
