//! Caller/coroutine handoff for a store round-trip.
//!
//! The statement runs on a `may` coroutine. The caller waits on a `may` channel,
//! which yields the coroutine instead of parking a worker thread, and re-checks its
//! [`CallContext`] between slices. Exactly one side decides the fate of a result: the
//! worker by [`Handoff::claim`] before it makes the result durable, or the caller by
//! abandoning the wait. A worker that loses the race must undo its work.

use crate::context::CallContext;
use crate::error::StoreError;
use may::sync::mpsc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

/// How long the caller waits on the result channel before re-checking its context.
const POLL_SLICE: Duration = Duration::from_millis(10);

const PENDING: u8 = 0;
const CLAIMED: u8 = 1;
const ABANDONED: u8 = 2;

#[derive(Debug, Clone, Default)]
pub(crate) struct Handoff {
    state: Arc<AtomicU8>,
}

impl Handoff {
    /// Worker side: true when the caller is still waiting and will see the result.
    pub(crate) fn claim(&self) -> bool {
        self.transition(CLAIMED)
    }

    fn abandon(&self) -> bool {
        self.transition(ABANDONED)
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[derive(Debug)]
pub(crate) enum Waited<T> {
    Done(Result<T, StoreError>),
    /// The context fired first; the worker will not make its result durable.
    Abandoned(StoreError),
}

/// Run `work` on a coroutine and wait for it under `ctx`.
///
/// When the context fires after the worker has claimed its result, the caller keeps
/// waiting: a claimed result is being made durable and must be reported.
pub(crate) fn dispatch<T, W>(ctx: &CallContext, work: W) -> Waited<T>
where
    T: Send + 'static,
    W: FnOnce(&Handoff) -> Result<T, StoreError> + Send + 'static,
{
    let handoff = Handoff::default();
    let worker_side = handoff.clone();
    let (tx, rx) = mpsc::channel();

    let _worker = may::go!(move || {
        // The receiver is gone when the caller gave up; nothing to report to.
        let _ = tx.send(work(&worker_side));
    });

    loop {
        match rx.recv_timeout(POLL_SLICE) {
            Ok(result) => return Waited::Done(result),
            Err(RecvTimeoutError::Timeout) => {
                let Some(interrupted) = ctx.interruption() else {
                    continue;
                };
                if handoff.abandon() {
                    log::debug!("abandoning in-flight statement: {}", interrupted);
                    return Waited::Abandoned(interrupted);
                }
                return Waited::Done(rx.recv().unwrap_or_else(|_| Err(ended())));
            }
            Err(RecvTimeoutError::Disconnected) => return Waited::Done(Err(ended())),
        }
    }
}

fn ended() -> StoreError {
    StoreError::new("store round-trip ended without a result")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancelToken;
    use crate::error::QuarryError;
    use std::sync::atomic::AtomicBool;
    use std::time::Instant;

    fn interruption_of<T: std::fmt::Debug>(waited: Waited<T>) -> QuarryError {
        match waited {
            Waited::Abandoned(err) => QuarryError::from(err),
            other => panic!("expected an abandoned wait, got {:?}", other),
        }
    }

    #[test]
    fn test_result_is_delivered() {
        match dispatch(&CallContext::background(), |_| Ok(5)) {
            Waited::Done(Ok(n)) => assert_eq!(n, 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wait_inside_a_coroutine() {
        let joined = may::go!(|| {
            match dispatch(&CallContext::background(), |_| {
                may::coroutine::sleep(Duration::from_millis(20));
                Ok("row")
            }) {
                Waited::Done(Ok(row)) => row,
                other => panic!("unexpected {:?}", other),
            }
        })
        .join()
        .unwrap();
        assert_eq!(joined, "row");
    }

    #[test]
    fn test_timeout_abandons_and_worker_loses_claim() {
        let (seen_tx, seen_rx) = std::sync::mpsc::channel();
        let ctx = CallContext::background().with_timeout(Duration::from_millis(20));

        let started = Instant::now();
        let waited = dispatch(&ctx, move |handoff| {
            may::coroutine::sleep(Duration::from_millis(300));
            let claimed = handoff.claim();
            seen_tx.send(claimed).unwrap();
            Ok(())
        });
        assert_eq!(interruption_of(waited), QuarryError::Timeout);
        assert!(started.elapsed() < Duration::from_millis(250));

        // The worker must not make its result durable
        assert!(!seen_rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }

    #[test]
    fn test_cancel_abandons_in_flight_work() {
        let token = CancelToken::new();
        let ctx = CallContext::background().with_cancel(token.clone());
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            token.cancel();
        });

        let waited = dispatch(&ctx, |handoff| {
            may::coroutine::sleep(Duration::from_millis(150));
            Ok(handoff.claim())
        });
        assert_eq!(interruption_of(waited), QuarryError::Canceled);
        canceller.join().unwrap();
    }

    #[test]
    fn test_claimed_result_is_reported_after_deadline() {
        let finished = Arc::new(AtomicBool::new(false));
        let worker_finished = finished.clone();
        let ctx = CallContext::background().with_timeout(Duration::from_millis(20));

        let waited = dispatch(&ctx, move |handoff| {
            assert!(handoff.claim());
            // Deadline passes while the claimed result is being committed
            may::coroutine::sleep(Duration::from_millis(80));
            worker_finished.store(true, Ordering::SeqCst);
            Ok(7)
        });
        match waited {
            Waited::Done(Ok(n)) => assert_eq!(n, 7),
            other => panic!("unexpected {:?}", other),
        }
        assert!(finished.load(Ordering::SeqCst));
    }
}
