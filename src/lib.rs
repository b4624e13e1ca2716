//! Concatenate literal chunks and nested async sources into a single ordered
//! [`Stream`][futures_core::Stream].
//!
//! A [`Munch`] stream owns a queue of [`Chunk`]s that can be appended to at
//! any time. Literal chunks are forwarded as-is. Nested sources (anything
//! yielding `Result<T, E>`) are drained one at a time, completely, before the
//! next queued chunk is looked at. [`Chunk::End`] terminates the output.
//!
//! # Backpressure
//!
//! The output buffers up to a high-water mark of chunks. Once it is full the
//! pump pauses until the consumer reads again. Data a nested source produces
//! in the meantime is held in a per-source buffer, so nothing is lost and the
//! nested source is never throttled.
//!
//! # Errors
//!
//! When a nested source fails, an optional handler decides whether the
//! failure is escalated (the stream yields [`Error::Source`] and is destroyed)
//! or suppressed (the source counts as ended, optionally with one substitute
//! chunk). Using a stream after it was destroyed yields a protocol error.
//!
//! # Examples
//!
//! ```rust
//! use futures_lite::future::block_on;
//! use futures_lite::{stream, StreamExt};
//! use stream_munch::prelude::*;
//!
//! block_on(async {
//!     let mut munch = vec![
//!         Chunk::literal("hello "),
//!         Chunk::source(stream::iter(vec![Ok::<_, std::io::Error>("wor"), Ok("ld")])),
//!     ]
//!     .into_munch();
//!     munch.munch([Chunk::literal("!"), Chunk::End]);
//!
//!     let mut out = String::new();
//!     while let Some(chunk) = munch.next().await {
//!         out += chunk.unwrap();
//!     }
//!     assert_eq!(out, "hello world!");
//! })
//! ```
//!
//! # Limitations
//!
//! A nested source that never ends stalls the stream: there are no timeouts.
//! Streams are meant to be driven from a single task and are not `Send`.

#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod chunk;
mod completion;
mod error;
mod munch;
mod source;

#[cfg(test)]
mod utils;

pub use chunk::Chunk;
pub use completion::Completion;
pub use error::Error;
pub use munch::{Containment, Event, IntoMunch, Munch, MunchBuilder, ObserverKey};
pub use source::{Source, SourceId};

/// The munch prelude.
pub mod prelude {
    pub use super::munch::IntoMunch as _;

    pub use super::{Chunk, Containment, Munch};
}
