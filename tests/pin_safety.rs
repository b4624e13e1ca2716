//! Pin safety regression tests for nested sources.
//!
//! `Munch` is `Unpin` and may be moved between polls; the nested sources it
//! holds must stay put.

use std::{
    convert::Infallible,
    marker::PhantomPinned,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{Stream, StreamExt};
use stream_munch::{Chunk, Munch};

async fn drain_to_completion(stream: &mut (impl Stream + Unpin)) -> usize {
    let mut count = 0;
    while stream.next().await.is_some() {
        count += 1;
    }
    count
}

struct PinCheckStream {
    remaining: usize,
    self_ptr: Option<*const Self>,
    _pinned: PhantomPinned,
}

impl PinCheckStream {
    fn polls(items: usize) -> Self {
        Self {
            remaining: items,
            self_ptr: None,
            _pinned: PhantomPinned,
        }
    }
}

impl Stream for PinCheckStream {
    type Item = Result<usize, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = unsafe { self.get_unchecked_mut() };
        let current = this as *const Self;
        let stored = *this.self_ptr.get_or_insert(current);
        assert_eq!(stored, current, "moved after pinning");

        if this.remaining == 0 {
            return Poll::Ready(None);
        }
        this.remaining -= 1;
        // Alternate between ready and pending so the stream gets polled
        // across several turns.
        if this.remaining % 2 == 0 {
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        Poll::Ready(Some(Ok(this.remaining)))
    }
}

#[test]
fn munch_no_move_when_moved() {
    futures_lite::future::block_on(async {
        let mut munch: Munch<usize, Infallible> =
            (0..5).map(|_| Chunk::source(PinCheckStream::polls(6))).collect();

        let _ = (&mut munch).take(4).collect::<Vec<_>>().await;

        // Moving the stream must not move the source it is draining.
        let mut moved = Box::new(munch);
        moved.munch([Chunk::source(PinCheckStream::polls(4)), Chunk::End]);

        let rest = drain_to_completion(&mut *moved).await;
        assert_eq!(4 + rest, 5 * 3 + 2);
    });
}

#[test]
fn munch_no_move_on_repeated_growth() {
    futures_lite::future::block_on(async {
        let mut munch: Munch<usize, Infallible> = Munch::new([]);
        let mut expected = 0;

        for wave in 1..5 {
            for _ in 0..10 {
                munch.munch([Chunk::source(PinCheckStream::polls(2 * wave))]);
            }
            expected += 10 * wave;
            let _ = (&mut munch).take(5).collect::<Vec<_>>().await;
            expected -= 5;

            let mut relocated = vec![munch];
            munch = relocated.pop().unwrap();
        }

        munch.munch([Chunk::End]);
        assert_eq!(drain_to_completion(&mut munch).await, expected);
    });
}
