use core::task::Waker;

/// Single-flight wakeups.
///
/// However many times [`schedule`] is called before the task is polled again,
/// the task is woken once. The pending flag clears when the poll actually
/// happens, not when the wakeup is issued.
///
/// [`schedule`]: Schedule::schedule
#[derive(Debug, Default)]
pub(crate) struct Schedule {
    waker: Option<Waker>,
    scheduled: bool,
}

impl Schedule {
    /// Called at the start of every poll: remembers the task to wake and
    /// marks any outstanding continuation as run.
    pub(crate) fn enter(&mut self, waker: &Waker) {
        self.scheduled = false;
        match &self.waker {
            Some(current) if current.will_wake(waker) => {}
            _ => self.waker = Some(waker.clone()),
        }
    }

    /// Request one more poll. Returns `false` if one is already outstanding
    /// or no task has polled yet.
    pub(crate) fn schedule(&mut self) -> bool {
        if self.scheduled {
            return false;
        }
        let Some(waker) = &self.waker else {
            return false;
        };
        self.scheduled = true;
        waker.wake_by_ref();
        true
    }

    #[cfg(test)]
    pub(crate) fn is_scheduled(&self) -> bool {
        self.scheduled
    }
}
