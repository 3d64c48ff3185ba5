//! I/O module
//!
//! Handles the wire format and the snapshot file.
//!
//! # Components
//!
//! - `codec` - Line framing that reports bad lines as items
//! - `protocol` - Request parsing and response rendering
//! - `snapshot` - CSV snapshot store and in-memory store

pub mod codec;
pub mod protocol;
pub mod snapshot;

pub use codec::RequestCodec;
pub use protocol::{parse_command, Response, MAX_LINE_LENGTH};
pub use snapshot::{convert_snapshot_record, CsvSnapshotStore, MemorySnapshotStore, SnapshotRecord};
