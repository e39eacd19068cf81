//! File handles: buffered sequential reads and writes, positional reads,
//! seek/tell and the open/closed state machine.

mod handle;
mod reader;
mod writer;

pub use handle::{FileHandle, OpenMode, OpenOptions};
