//! Rx FIFO DMA transfer handle
//!
//! [`RxFifoDma`] binds one FlexCAN receive FIFO to one DMA channel and owns
//! the Idle/Busy state of the single transfer that may be outstanding on
//! that pair. The start/complete/abort operations live in
//! [`transfer`](super::transfer).

use crate::driver::config::{FifoFormat, RxState};
use crate::driver::error::{ConfigError, ConfigResult};
use crate::driver::transfer::Completion;
use crate::hal::dma::DmaChannel;
use crate::hal::flexcan::RxFifoPeripheral;
use crate::internal::constants::DMA_CHANNEL_COUNT;

/// Completion callback
///
/// Invoked from [`RxFifoDma::on_interrupt`] with the handle already back in
/// [`RxState::Idle`], so the callback may start the next transfer right away.
/// The user context is reachable through [`RxFifoDma::user_data_mut`].
pub type RxCallback<P, C, U> = fn(&mut RxFifoDma<P, C, U>, Completion);

/// Per-handle event counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxStats {
    /// Transfers handed to the DMA channel
    pub started: u32,
    /// Transfers finished by the DMA channel (successfully or not)
    pub completed: u32,
    /// Transfers cancelled by the caller
    pub aborted: u32,
    /// Start requests refused because a transfer was in flight
    pub rejected: u32,
    /// Channel events that arrived with no transfer in flight
    pub stray: u32,
}

/// Buffer lent to the DMA engine for the outstanding transfer
#[derive(Debug)]
pub(crate) struct InFlight {
    pub(crate) buffer: &'static mut [u32],
    pub(crate) frame_count: usize,
    pub(crate) format: FifoFormat,
}

/// Asynchronous Rx FIFO receive handle
///
/// # Type Parameters
///
/// * `P` - CAN peripheral, usually [`FlexCan`](crate::hal::flexcan::FlexCan)
///   or `&mut FlexCan`
/// * `C` - DMA channel the FIFO requests are routed to
/// * `U` - User context handed back to the completion callback
///
/// # Example
///
/// ```ignore
/// fn on_frames(rx: &mut RxFifoDma<Can, Ch, Counter>, done: Completion) {
///     rx.user_data_mut().add(done.frames().count());
///     let _ = rx.start_receive(done.buffer, 4);
/// }
///
/// let mut rx = RxFifoDma::new(can, Some(on_frames), Counter::new(), Some(ch))?;
/// rx.start_receive(buffer, 4)?;
///
/// // DMA channel interrupt
/// rx.on_interrupt();
/// ```
#[derive(Debug)]
pub struct RxFifoDma<P, C, U>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    pub(crate) peripheral: P,
    pub(crate) channel: C,
    pub(crate) callback: Option<RxCallback<P, C, U>>,
    pub(crate) user_data: U,
    pub(crate) state: RxState,
    pub(crate) in_flight: Option<InFlight>,
    pub(crate) unclaimed: Option<Completion>,
    pub(crate) stats: RxStats,
}

impl<P, C, U> RxFifoDma<P, C, U>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    /// Create a handle and claim the channel's completion notifications.
    ///
    /// Enables the channel's completion interrupt and drops any event left
    /// over from a previous owner. Completions on that channel must from now
    /// on be forwarded to [`on_interrupt`](Self::on_interrupt).
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingDmaChannel`] if `channel` is `None`
    /// - [`ConfigError::InvalidChannel`] if the channel number is out of range
    pub fn new(
        peripheral: P,
        callback: Option<RxCallback<P, C, U>>,
        user_data: U,
        channel: Option<C>,
    ) -> ConfigResult<Self> {
        let Some(mut channel) = channel else {
            return Err(ConfigError::MissingDmaChannel);
        };
        if channel.channel() >= DMA_CHANNEL_COUNT {
            return Err(ConfigError::InvalidChannel);
        }

        channel.set_interrupt_on_completion(true);
        // Stale event from a previous owner
        let _ = channel.take_event();

        #[cfg(feature = "defmt")]
        defmt::debug!("Rx FIFO DMA bound to channel {}", channel.channel());
        #[cfg(feature = "log")]
        log::debug!("Rx FIFO DMA bound to channel {}", channel.channel());

        Ok(Self {
            peripheral,
            channel,
            callback,
            user_data,
            state: RxState::Idle,
            in_flight: None,
            unclaimed: None,
            stats: RxStats::default(),
        })
    }

    /// Tear the handle down and give back its parts.
    ///
    /// An outstanding transfer is aborted first and its buffer is dropped;
    /// call [`abort_receive`](Self::abort_receive) beforehand to keep it.
    pub fn release(mut self) -> (P, C, U) {
        let _ = self.abort_receive();
        self.channel.set_interrupt_on_completion(false);
        (self.peripheral, self.channel, self.user_data)
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Current transfer state
    #[inline]
    pub fn state(&self) -> RxState {
        self.state
    }

    /// `true` while a transfer is outstanding
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.state == RxState::Busy
    }

    /// Frame count of the outstanding transfer
    pub fn in_flight_frames(&self) -> Option<usize> {
        self.in_flight.as_ref().map(|f| f.frame_count)
    }

    /// Event counters since creation
    #[inline]
    pub fn stats(&self) -> RxStats {
        self.stats
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    /// Number of the bound DMA channel
    #[inline]
    pub fn channel_index(&self) -> usize {
        self.channel.channel()
    }

    /// Bound DMA channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutable access to the bound DMA channel.
    ///
    /// Reprogramming the channel while a transfer is outstanding corrupts it.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// CAN peripheral
    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    /// Mutable access to the CAN peripheral
    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }

    /// User context given at creation
    pub fn user_data(&self) -> &U {
        &self.user_data
    }

    /// Mutable access to the user context
    pub fn user_data_mut(&mut self) -> &mut U {
        &mut self.user_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::dma::ChannelEvent;
    use crate::testing::{MockDmaChannel, MockPeripheral, leak_buffer};

    type Handle<'a> = RxFifoDma<MockPeripheral, &'a mut MockDmaChannel, u32>;

    #[test]
    fn new_starts_idle() {
        let mut channel = MockDmaChannel::new(5);
        let rx: Handle<'_> =
            RxFifoDma::new(MockPeripheral::standard(), None, 7, Some(&mut channel)).unwrap();

        assert_eq!(rx.state(), RxState::Idle);
        assert!(!rx.is_busy());
        assert_eq!(rx.channel_index(), 5);
        assert_eq!(*rx.user_data(), 7);
        assert_eq!(rx.stats(), RxStats::default());
        assert_eq!(rx.in_flight_frames(), None);
    }

    #[test]
    fn new_claims_channel_and_drops_stale_event() {
        let mut channel = MockDmaChannel::new(0);
        channel.raise(ChannelEvent::Done);

        let rx: Handle<'_> =
            RxFifoDma::new(MockPeripheral::standard(), None, 0, Some(&mut channel)).unwrap();
        drop(rx);

        assert!(channel.interrupt_enabled());
        assert!(!channel.has_pending());
    }

    #[test]
    fn missing_channel_rejected() {
        let result: ConfigResult<Handle<'_>> =
            RxFifoDma::new(MockPeripheral::standard(), None, 0, None);
        assert_eq!(result.err(), Some(ConfigError::MissingDmaChannel));
    }

    #[test]
    fn out_of_range_channel_rejected() {
        let mut channel = MockDmaChannel::new(DMA_CHANNEL_COUNT);
        let result: ConfigResult<Handle<'_>> =
            RxFifoDma::new(MockPeripheral::standard(), None, 0, Some(&mut channel));

        assert_eq!(result.err(), Some(ConfigError::InvalidChannel));
        // Nothing was touched on a rejected channel
        assert!(!channel.interrupt_enabled());
    }

    #[test]
    fn release_aborts_and_returns_parts() {
        let mut rx = RxFifoDma::new(
            MockPeripheral::standard(),
            None,
            11u32,
            Some(MockDmaChannel::new(2)),
        )
        .unwrap();
        rx.start_receive(leak_buffer(16), 4).unwrap();

        let (peripheral, channel, user) = rx.release();

        assert!(!peripheral.dma_enabled());
        assert!(!channel.is_running());
        assert!(!channel.interrupt_enabled());
        assert_eq!(user, 11);
    }

    #[test]
    fn user_data_is_mutable() {
        let mut channel = MockDmaChannel::new(1);
        let mut rx: Handle<'_> =
            RxFifoDma::new(MockPeripheral::standard(), None, 0, Some(&mut channel)).unwrap();
        *rx.user_data_mut() += 3;
        assert_eq!(*rx.user_data(), 3);
    }
}
