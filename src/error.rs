/// The error type yielded by a [`Munch`][crate::Munch] stream.
///
/// `E` is the error type reported by nested sources.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// The stream was polled again after it had already terminated.
    #[error("munch stream polled after destroy")]
    PullAfterDestroy,

    /// Chunks were appended with [`munch`][crate::Munch::munch] after the
    /// stream was destroyed. The chunks were discarded.
    #[error("munch called after destroy")]
    MunchAfterDestroy,

    /// A nested source failed and the error handler chose to escalate it.
    #[error("nested source failed: {0}")]
    Source(#[source] E),
}

impl<E> Error<E> {
    /// Returns `true` if this error is a protocol violation by the caller
    /// rather than a failure of a nested source.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Error::PullAfterDestroy | Error::MunchAfterDestroy)
    }

    /// Returns the nested source error, if this is one.
    pub fn into_source(self) -> Option<E> {
        match self {
            Error::Source(err) => Some(err),
            _ => None,
        }
    }
}
