//! Replica synchronization for Concord documents.
//!
//! # Architecture
//!
//! Replicas exchange [`concord_crdt::Operation`]s. Since integration is
//! idempotent and operations that arrive early are held until their
//! dependencies are present, the sync layer only has to make sure every
//! operation eventually reaches every replica.
//!
//! ## Components
//!
//! - **Protocol**: the messages exchanged between peers
//! - **Codec**: JSON encoding and length-prefixed framing
//! - **Engine**: [`SyncPeer`], a replica plus its sync state machine
//! - **Network**: [`LocalNetwork`], replicas connected in-process
//!
//! # Example
//!
//! ```
//! use concord_sync::LocalNetwork;
//!
//! let mut net = LocalNetwork::new(2);
//! net.replica_mut(0)?.root().set("greeting", "hello")?;
//! net.flush_all()?;
//!
//! let value = net.replica(1)?.read_root().get("greeting");
//! assert_eq!(value.unwrap(), serde_json::json!("hello"));
//! # Ok::<(), concord_sync::SyncError>(())
//! ```

pub mod codec;
mod engine;
mod error;
mod network;
pub mod protocol;

pub use engine::{SyncConfig, SyncPeer};
pub use error::{SyncError, SyncResult};
pub use network::LocalNetwork;
pub use protocol::{
    MAX_BATCH_SIZE, OperationBatchMessage, PROTOCOL_VERSION, SyncMessage, SyncStep1Message,
    UpdateMessage,
};
