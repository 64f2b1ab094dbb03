//! sluice-services — concrete chunk sources and sinks, the live transfer
//! table, and on-disk file storage.

pub mod memory;
pub mod reader;
pub mod store;
pub mod stream;
pub mod transfer;
pub mod writer;

pub use memory::{MemorySink, MemorySource};
pub use reader::ReaderSource;
pub use store::{sanitize_filename, FileStore, StoreError, StoredFile, Upload};
pub use stream::{channel, ChannelBody, ChannelSink, StreamSource};
pub use transfer::{TransferGuard, TransferKind, TransferRecord, TransferStats, TransferTable};
pub use writer::WriterSink;
