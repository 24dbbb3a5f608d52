// src/stream/mod.rs

//! Reading task output.
//!
//! - [`source`] abstracts where a stream lives and how to open it.
//! - [`follow`] turns a plain file into a never-ending, growing stream.
//! - [`lines`] frames bytes into bounded lines.
//! - [`transport`] ties these together into the per-stream connect + read loop.

pub mod follow;
pub mod lines;
pub mod source;
pub mod transport;

pub use lines::{LineError, LineReader, MAX_LINE_BYTES};
#[cfg(unix)]
pub use source::SocketSource;
pub use source::{BoxedStream, FileTailSource, OpenFuture, StreamSource, build_source};
pub use transport::{CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY, StreamEnd, StreamTransport};
