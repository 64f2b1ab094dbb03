//! sluice-core — chunk type, source/sink contract, the relay loop, and
//! configuration. All other Sluice crates depend on this one.

pub mod chunk;
pub mod config;
pub mod error;
pub mod relay;

pub use chunk::{Chunk, ChunkSink, ChunkSource};
pub use error::RelayError;
pub use relay::{digest, relay, relay_until, Relay, RelayObserver, TransferSummary};
