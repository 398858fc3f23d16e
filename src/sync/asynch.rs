//! Async/await support for Rx FIFO DMA transfers.
//!
//! The completion callback of an async handle stores the [`Completion`] in
//! an [`RxSignal`] and wakes the task waiting on it. The DMA interrupt still
//! drives the handle through [`SharedRxFifoDma::on_interrupt`].
//!
//! A future dropped before it resolves leaves its buffer in the signal;
//! [`AsyncRxExt::reclaim`] hands it back.
//!
//! # Example
//!
//! ```ignore
//! static SIGNAL: RxSignal = RxSignal::new();
//! static CAN1_RX: SharedRxFifoDma<Can1, Ch0, &'static RxSignal> = SharedRxFifoDma::new();
//!
//! CAN1_RX.install(RxFifoDma::new_async(can1, &SIGNAL, Some(ch0))?);
//!
//! async fn task(mut buffer: &'static mut [u32]) {
//!     loop {
//!         let done = CAN1_RX.receive_async(buffer, 4).await.unwrap();
//!         for frame in done.frames() { /* ... */ }
//!         buffer = done.into_buffer();
//!     }
//! }
//!
//! #[interrupt]
//! fn DMA0_DMA16() {
//!     CAN1_RX.on_interrupt();
//! }
//! ```

use core::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    task::{Context, Poll, Waker},
};

use critical_section::Mutex;

use super::shared::SharedRxFifoDma;
use crate::driver::error::{ConfigError, ConfigResult};
use crate::driver::handle::RxFifoDma;
use crate::driver::transfer::{Completion, StartError};
use crate::hal::dma::DmaChannel;
use crate::hal::flexcan::RxFifoPeripheral;

/// Handle whose user context is the signal its callback completes
pub type AsyncRxFifoDma<P, C> = RxFifoDma<P, C, &'static RxSignal>;

struct SignalState {
    completion: Option<Completion>,
    reclaimed: Option<&'static mut [u32]>,
    waker: Option<Waker>,
}

/// One-slot mailbox between the completion callback and a waiting task
///
/// Besides the pending completion it keeps the waker of the task awaiting it
/// and the buffer of the last receive whose future was dropped.
pub struct RxSignal {
    state: Mutex<RefCell<SignalState>>,
}

impl RxSignal {
    /// Create an empty signal (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(SignalState {
                completion: None,
                reclaimed: None,
                waker: None,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut SignalState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// Store a completion and wake the waiting task
    pub fn complete(&self, completion: Completion) {
        let waker = self.with(|s| {
            s.completion = Some(completion);
            s.waker.take()
        });
        // Woken outside the critical section
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Take the stored completion, if any
    pub fn take(&self) -> Option<Completion> {
        self.with(|s| s.completion.take())
    }

    /// `true` if a completion is waiting to be taken
    pub fn is_signaled(&self) -> bool {
        self.with(|s| s.completion.is_some())
    }

    /// Discard any stored completion, keeping its buffer for [`reclaim`](Self::reclaim)
    pub fn reset(&self) {
        self.with(|s| {
            if let Some(completion) = s.completion.take() {
                s.reclaimed = Some(completion.into_buffer());
            }
        });
    }

    /// Buffer of the last receive abandoned before it resolved.
    ///
    /// Only the most recent one is kept.
    pub fn reclaim(&self) -> Option<&'static mut [u32]> {
        self.with(|s| s.reclaimed.take())
    }

    fn park(&self, buffer: &'static mut [u32]) {
        self.with(|s| {
            s.completion = None;
            s.reclaimed = Some(buffer);
        });
    }

    fn poll_completion(&self, waker: &Waker) -> Option<Completion> {
        self.with(|s| {
            let completion = s.completion.take();
            let registered = s.waker.as_ref().is_some_and(|w| w.will_wake(waker));
            if completion.is_none() && !registered {
                s.waker = Some(waker.clone());
            }
            completion
        })
    }
}

impl Default for RxSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion callback of async handles
pub fn notify<P, C>(rx: &mut AsyncRxFifoDma<P, C>, completion: Completion)
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    rx.user_data().complete(completion);
}

impl<P, C> RxFifoDma<P, C, &'static RxSignal>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    /// Create a handle that reports completions through `signal`.
    ///
    /// # Errors
    ///
    /// As [`RxFifoDma::new`].
    pub fn new_async(
        peripheral: P,
        signal: &'static RxSignal,
        channel: Option<C>,
    ) -> ConfigResult<Self> {
        Self::new(peripheral, Some(notify::<P, C>), signal, channel)
    }
}

/// Future for one async receive.
///
/// Starts the transfer on first poll and resolves to its [`Completion`].
/// Dropping it before then aborts the transfer and parks the buffer in the
/// handle's [`RxSignal`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct RxFuture<'a, P, C>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    shared: &'a SharedRxFifoDma<P, C, &'static RxSignal>,
    buffer: Option<&'static mut [u32]>,
    frame_count: usize,
    signal: Option<&'static RxSignal>,
    finished: bool,
}

impl<'a, P, C> RxFuture<'a, P, C>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    /// Create a new receive future.
    pub fn new(
        shared: &'a SharedRxFifoDma<P, C, &'static RxSignal>,
        buffer: &'static mut [u32],
        frame_count: usize,
    ) -> Self {
        Self {
            shared,
            buffer: Some(buffer),
            frame_count,
            signal: None,
            finished: false,
        }
    }

    fn start(&mut self, buffer: &'static mut [u32]) -> Result<&'static RxSignal, StartError> {
        let frame_count = self.frame_count;
        self.shared.with_slot(|slot| match slot.as_mut() {
            Some(rx) => {
                let signal = *rx.user_data();
                rx.start_receive(buffer, frame_count)?;
                // Completion of an earlier, abandoned receive
                signal.reset();
                Ok(signal)
            }
            None => Err(StartError {
                error: ConfigError::NotInstalled.into(),
                buffer,
            }),
        })
    }
}

impl<P, C> Future for RxFuture<'_, P, C>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    type Output = Result<Completion, StartError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(buffer) = this.buffer.take() {
            match this.start(buffer) {
                Ok(signal) => this.signal = Some(signal),
                Err(e) => {
                    this.finished = true;
                    return Poll::Ready(Err(e));
                }
            }
        }

        let Some(signal) = this.signal else {
            return Poll::Pending;
        };
        if this.finished {
            return Poll::Pending;
        }

        match signal.poll_completion(cx.waker()) {
            Some(completion) => {
                this.finished = true;
                Poll::Ready(Ok(completion))
            }
            None => Poll::Pending,
        }
    }
}

impl<P, C> Drop for RxFuture<'_, P, C>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(signal) = self.signal {
            match self.shared.abort_receive().ok().flatten() {
                Some(buffer) => signal.park(buffer),
                // Completed before the abort: keep the buffer it carries
                None => signal.reset(),
            }
        }
    }
}

/// Extension trait providing async receive for shared async handles.
pub trait AsyncRxExt<P, C>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    /// Receive `frame_count` FIFO elements into `buffer`.
    fn receive_async(&self, buffer: &'static mut [u32], frame_count: usize) -> RxFuture<'_, P, C>;

    /// Take back the buffer of a receive whose future was dropped.
    fn reclaim(&self) -> Option<&'static mut [u32]>;
}

impl<P, C> AsyncRxExt<P, C> for SharedRxFifoDma<P, C, &'static RxSignal>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    fn receive_async(&self, buffer: &'static mut [u32], frame_count: usize) -> RxFuture<'_, P, C> {
        RxFuture::new(self, buffer, frame_count)
    }

    fn reclaim(&self) -> Option<&'static mut [u32]> {
        self.with(|rx| rx.user_data().reclaim()).ok().flatten()
    }
}

#[cfg(test)]
#[allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]
mod tests {
    extern crate std;

    use super::*;
    use crate::driver::config::RxState;
    use crate::driver::error::{Error, RxError};
    use crate::driver::transfer::TransferStatus;
    use crate::hal::dma::ChannelEvent;
    use crate::testing::{MockDmaChannel, MockPeripheral, leak_buffer};
    use core::pin::pin;
    use std::boxed::Box;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;

    type Shared = SharedRxFifoDma<MockPeripheral, MockDmaChannel, &'static RxSignal>;

    fn shared() -> (Shared, &'static RxSignal) {
        let signal: &'static RxSignal = Box::leak(Box::new(RxSignal::new()));
        let shared = Shared::new();
        let rx = RxFifoDma::new_async(
            MockPeripheral::standard(),
            signal,
            Some(MockDmaChannel::new(0)),
        )
        .unwrap();
        shared.install(rx);
        (shared, signal)
    }

    fn complete(shared: &Shared, event: ChannelEvent) -> Option<TransferStatus> {
        shared.with(|rx| rx.channel_mut().raise(event)).unwrap();
        shared.on_interrupt()
    }

    #[test]
    fn resolves_after_interrupt() {
        let (shared, signal) = shared();
        let mut cx = Context::from_waker(Waker::noop());
        let mut fut = pin!(shared.receive_async(leak_buffer(16), 4));

        assert!(fut.as_mut().poll(&mut cx).is_pending());
        assert_eq!(shared.state(), Ok(RxState::Busy));

        assert_eq!(complete(&shared, ChannelEvent::Done), Some(TransferStatus::Success));
        assert!(signal.is_signaled());

        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(Ok(done)) => {
                assert_eq!(done.status, TransferStatus::Success);
                assert_eq!(done.frame_count, 4);
            }
            _ => panic!("expected completion"),
        }
        assert!(!signal.is_signaled());
    }

    #[test]
    fn dropping_pending_future_aborts() {
        let (shared, signal) = shared();
        let mut cx = Context::from_waker(Waker::noop());

        {
            let mut fut = pin!(shared.receive_async(leak_buffer(16), 4));
            assert!(fut.as_mut().poll(&mut cx).is_pending());
        }

        assert_eq!(shared.state(), Ok(RxState::Idle));
        assert_eq!(shared.with(|rx| rx.stats().aborted), Ok(1));
        assert!(!signal.is_signaled());

        // The late hardware event is a stray, nobody is woken
        assert_eq!(complete(&shared, ChannelEvent::Done), None);
        assert!(!signal.is_signaled());
    }

    #[test]
    fn dropped_future_buffer_can_be_reclaimed() {
        let (shared, _signal) = shared();
        let mut cx = Context::from_waker(Waker::noop());
        let buffer = leak_buffer(16);
        let addr = buffer.as_ptr();

        {
            let mut fut = pin!(shared.receive_async(buffer, 4));
            assert!(fut.as_mut().poll(&mut cx).is_pending());
        }

        let back = shared.reclaim().unwrap();
        assert_eq!(back.as_ptr(), addr);
        assert_eq!(back.len(), 16);
        assert!(shared.reclaim().is_none());

        // The buffer is reusable for the next receive
        let mut fut = pin!(shared.receive_async(back, 4));
        assert!(fut.as_mut().poll(&mut cx).is_pending());
        assert_eq!(shared.state(), Ok(RxState::Busy));
    }

    #[test]
    fn completion_raced_with_drop_keeps_buffer() {
        let (shared, signal) = shared();
        let mut cx = Context::from_waker(Waker::noop());
        let buffer = leak_buffer(16);
        let addr = buffer.as_ptr();

        {
            let mut fut = pin!(shared.receive_async(buffer, 4));
            assert!(fut.as_mut().poll(&mut cx).is_pending());
            // Completes before the future is polled again
            assert_eq!(complete(&shared, ChannelEvent::Done), Some(TransferStatus::Success));
        }

        assert!(!signal.is_signaled());
        assert_eq!(shared.with(|rx| rx.stats().aborted), Ok(0));
        assert_eq!(shared.reclaim().map(|b| b.as_ptr()), Some(addr));
    }

    #[test]
    fn resolved_future_leaves_nothing_to_reclaim() {
        let (shared, _signal) = shared();
        let mut cx = Context::from_waker(Waker::noop());

        {
            let mut fut = pin!(shared.receive_async(leak_buffer(16), 4));
            assert!(fut.as_mut().poll(&mut cx).is_pending());
            complete(&shared, ChannelEvent::Done);
            assert!(matches!(fut.as_mut().poll(&mut cx), Poll::Ready(Ok(_))));
        }

        assert!(shared.reclaim().is_none());
    }

    struct Counter(AtomicUsize);

    impl Wake for Counter {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn completion_wakes_polling_task_once() {
        let (shared, signal) = shared();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);
        let mut fut = pin!(shared.receive_async(leak_buffer(16), 4));

        assert!(fut.as_mut().poll(&mut cx).is_pending());
        assert!(fut.as_mut().poll(&mut cx).is_pending());
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        complete(&shared, ChannelEvent::Done);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        // No waker left registered after the first wake
        let done = signal.take().unwrap();
        signal.complete(done);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unpolled_future_starts_nothing() {
        let (shared, _signal) = shared();
        drop(shared.receive_async(leak_buffer(16), 4));
        assert_eq!(shared.with(|rx| rx.stats()), Ok(Default::default()));
    }

    #[test]
    fn busy_handle_fails_without_disturbing_transfer() {
        let (shared, signal) = shared();
        shared.start_receive(leak_buffer(16), 4).unwrap();
        let mut cx = Context::from_waker(Waker::noop());

        {
            let mut fut = pin!(shared.receive_async(leak_buffer(8), 2));
            match fut.as_mut().poll(&mut cx) {
                Poll::Ready(Err(e)) => assert_eq!(e.error, Error::Rx(RxError::RxFifoBusy)),
                _ => panic!("expected busy rejection"),
            }
        }

        // Original transfer still owns the channel and completes normally
        assert_eq!(shared.state(), Ok(RxState::Busy));
        assert_eq!(complete(&shared, ChannelEvent::Done), Some(TransferStatus::Success));
        assert!(signal.is_signaled());
    }

    #[test]
    fn dma_error_resolves_future() {
        let (shared, _signal) = shared();
        let mut cx = Context::from_waker(Waker::noop());
        let mut fut = pin!(shared.receive_async(leak_buffer(16), 4));

        assert!(fut.as_mut().poll(&mut cx).is_pending());
        complete(&shared, ChannelEvent::Error(1));

        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(Ok(done)) => assert_eq!(done.status, TransferStatus::DmaError(1)),
            _ => panic!("expected completion"),
        }
    }

    #[test]
    fn empty_slot_fails_first_poll() {
        let shared = Shared::new();
        let mut cx = Context::from_waker(Waker::noop());
        let mut fut = pin!(shared.receive_async(leak_buffer(4), 1));

        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(Err(e)) => {
                assert_eq!(e.error, Error::Config(ConfigError::NotInstalled));
                assert_eq!(e.buffer.len(), 4);
            }
            _ => panic!("expected not-installed error"),
        }
    }
}
