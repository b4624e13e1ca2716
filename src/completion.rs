/// How a stream completes on a given host.
///
/// Older hosts neither announce `Close` after teardown nor tear a stream down
/// once its end has been read, so the stream has to do it itself. The policy
/// is picked once, when the stream is built; nothing branches on host
/// versions after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Completion {
    /// The stream must announce `Close` itself after it terminates.
    pub emit_close: bool,
    /// The stream must tear its output down itself after forwarding the end
    /// of data, instead of letting the output do so once the end is read.
    pub should_destroy: bool,
}

impl Completion {
    /// A host that closes and tears down on its own.
    pub const MODERN: Self = Self {
        emit_close: false,
        should_destroy: false,
    };

    /// Pick the policy for a host by its major version.
    pub const fn for_host_version(major: u32) -> Self {
        Self {
            emit_close: major < 10,
            should_destroy: major < 14,
        }
    }

    /// Whether the output announces `Close` on teardown by itself.
    pub(crate) const fn closes_on_teardown(self) -> bool {
        !self.emit_close
    }

    /// Whether the output tears itself down once its end has been read.
    pub(crate) const fn tears_down_on_end(self) -> bool {
        !self.should_destroy
    }
}
