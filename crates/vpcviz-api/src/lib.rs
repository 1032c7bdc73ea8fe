//! Async client for the cloud inventory API.
//!
//! Every listing endpoint is paginated and filtered server-side by at most
//! one foreign key (`network-id`, `subnet-id`, a stack name, a group name).
//! [`InventoryClient`] walks all pages and hands back flat record lists;
//! joining them into a topology is `vpcviz-core`'s job.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::InventoryClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
