use std::{
    cell::RefCell,
    collections::VecDeque,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

use futures_core::Stream;

/// A hand-driven nested source: tests decide when data, errors and the end
/// arrive.
pub(crate) struct LocalChannel<T, E> {
    queue: VecDeque<Result<T, E>>,
    waker: Option<Waker>,
    closed: bool,
}

pub(crate) struct LocalReceiver<T, E> {
    channel: Rc<RefCell<LocalChannel<T, E>>>,
}

impl<T, E> Stream for LocalReceiver<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut channel = self.channel.borrow_mut();

        match channel.queue.pop_front() {
            Some(item) => Poll::Ready(Some(item)),
            None => {
                if channel.closed {
                    Poll::Ready(None)
                } else {
                    channel.waker = Some(cx.waker().clone());
                    Poll::Pending
                }
            }
        }
    }
}

pub(crate) struct LocalSender<T, E> {
    channel: Rc<RefCell<LocalChannel<T, E>>>,
}

impl<T, E> LocalSender<T, E> {
    pub(crate) fn send(&self, item: T) {
        self.push(Ok(item));
    }

    pub(crate) fn fail(&self, err: E) {
        self.push(Err(err));
    }

    /// End the source. Anything sent before is still delivered.
    pub(crate) fn close(self) {}

    /// Whether the receiving end has polled and is waiting for more.
    pub(crate) fn is_listened(&self) -> bool {
        self.channel.borrow().waker.is_some()
    }

    fn push(&self, item: Result<T, E>) {
        let mut channel = self.channel.borrow_mut();
        channel.queue.push_back(item);
        let _ = channel.waker.take().map(Waker::wake);
    }
}

impl<T, E> Drop for LocalSender<T, E> {
    fn drop(&mut self) {
        let mut channel = self.channel.borrow_mut();
        channel.closed = true;
        let _ = channel.waker.take().map(Waker::wake);
    }
}

pub(crate) fn local_channel<T, E>() -> (LocalSender<T, E>, LocalReceiver<T, E>) {
    let channel = Rc::new(RefCell::new(LocalChannel {
        queue: VecDeque::new(),
        waker: None,
        closed: false,
    }));

    (
        LocalSender {
            channel: channel.clone(),
        },
        LocalReceiver { channel },
    )
}
