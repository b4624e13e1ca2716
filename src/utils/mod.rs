//! Helpers for the tests of this crate.

mod channel;
mod waker;

pub(crate) use channel::local_channel;
pub(crate) use waker::{poll_next, CountingWaker};
