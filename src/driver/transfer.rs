//! Start, completion and abort of Rx FIFO DMA transfers
//!
//! At most one transfer is outstanding per handle. Every successful
//! [`start_receive`](RxFifoDma::start_receive) is matched by exactly one of:
//!
//! - [`on_interrupt`](RxFifoDma::on_interrupt) observing the channel's
//!   completion, which invokes the callback once;
//! - [`abort_receive`](RxFifoDma::abort_receive), which never invokes it.
//!
//! The destination buffer moves into the handle on start and comes back in
//! the [`Completion`], from `abort_receive`, or inside a [`StartError`].

use core::sync::atomic::{Ordering, compiler_fence};

use crate::driver::config::{FifoFormat, RxState};
use crate::driver::descriptor::{RxRequest, TransferDescriptor, build_descriptor};
use crate::driver::error::{DmaError, DmaResult, Error, RxError};
use crate::driver::frame::Frames;
use crate::driver::handle::{InFlight, RxFifoDma};
use crate::hal::dma::{ChannelEvent, DmaChannel};
use crate::hal::flexcan::RxFifoPeripheral;

/// Outcome of a finished transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferStatus {
    /// All requested frames were moved into the buffer
    Success,
    /// The channel stopped on an error (raw channel error status)
    DmaError(u32),
}

impl TransferStatus {
    /// `true` for [`TransferStatus::Success`]
    #[inline]
    pub fn is_success(self) -> bool {
        self == TransferStatus::Success
    }
}

/// A finished transfer, handed to the completion callback
#[derive(Debug)]
pub struct Completion {
    /// DMA channel that carried the transfer
    pub channel: usize,
    /// How the transfer ended
    pub status: TransferStatus,
    /// FIFO layout of the elements in `buffer`
    pub format: FifoFormat,
    /// Number of FIFO elements requested
    pub frame_count: usize,
    /// Destination buffer given to `start_receive`
    pub buffer: &'static mut [u32],
}

impl Completion {
    /// Decode the received frames.
    ///
    /// After a DMA error the buffer may be only partly written.
    pub fn frames(&self) -> Frames<'_> {
        Frames::new(self.format, self.buffer, self.frame_count)
    }

    /// Raw FIFO element words covered by the transfer
    pub fn words(&self) -> &[u32] {
        let len = self.frame_count * self.format.element_words();
        &self.buffer[..len.min(self.buffer.len())]
    }

    /// Take the buffer back for the next transfer
    pub fn into_buffer(self) -> &'static mut [u32] {
        self.buffer
    }
}

/// A rejected start request
///
/// The buffer is returned untouched; the handle state did not change.
#[derive(Debug)]
pub struct StartError {
    /// Why the transfer was not started
    pub error: Error,
    /// The buffer passed to `start_receive`
    pub buffer: &'static mut [u32],
}

impl StartError {
    fn new(error: impl Into<Error>, buffer: &'static mut [u32]) -> Self {
        Self {
            error: error.into(),
            buffer,
        }
    }

    /// Split into the error and the returned buffer
    pub fn into_parts(self) -> (Error, &'static mut [u32]) {
        (self.error, self.buffer)
    }
}

impl core::fmt::Display for StartError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.error, f)
    }
}

impl From<StartError> for Error {
    fn from(e: StartError) -> Self {
        e.error
    }
}

// =============================================================================
// Transfer Operations
// =============================================================================

impl<P, C, U> RxFifoDma<P, C, U>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    /// Build the DMA descriptor for receiving `frame_count` elements into
    /// `buffer` from this handle's FIFO, without starting anything.
    ///
    /// Pass the result to [`start_prepared`](Self::start_prepared).
    pub fn prepare_descriptor(
        &self,
        buffer: &[u32],
        frame_count: usize,
    ) -> DmaResult<TransferDescriptor> {
        let format = self.peripheral.fifo_format();
        let request = RxRequest::for_buffer(buffer, format.element_words(), frame_count);
        build_descriptor(&self.peripheral, &request)
    }

    /// Start receiving `frame_count` FIFO elements into `buffer`.
    ///
    /// Returns as soon as the channel is armed; completion is reported
    /// through [`on_interrupt`](Self::on_interrupt).
    ///
    /// # Errors
    ///
    /// All errors hand `buffer` back and leave the handle state unchanged.
    ///
    /// - [`RxError::RxFifoBusy`] if a transfer is already outstanding
    /// - [`DmaError::InvalidLength`](crate::DmaError::InvalidLength) or
    ///   [`DmaError::BufferTooSmall`](crate::DmaError::BufferTooSmall) for a
    ///   bad request
    /// - [`DmaError::ChannelBusy`](crate::DmaError::ChannelBusy) if the
    ///   channel refused the descriptor
    /// - a peripheral error if the FIFO DMA request could not be enabled
    pub fn start_receive(
        &mut self,
        buffer: &'static mut [u32],
        frame_count: usize,
    ) -> Result<(), StartError> {
        let descriptor = match self.prepare_descriptor(buffer, frame_count) {
            Ok(d) => d,
            Err(_) if self.state == RxState::Busy => return Err(self.reject_busy(buffer)),
            Err(e) => return Err(StartError::new(e, buffer)),
        };
        self.start_prepared(descriptor, buffer, frame_count)
    }

    /// Start a transfer from a descriptor returned by
    /// [`prepare_descriptor`](Self::prepare_descriptor).
    ///
    /// # Errors
    ///
    /// As [`start_receive`](Self::start_receive), plus
    /// [`DmaError::DescriptorMismatch`] if `descriptor` was not prepared for
    /// this buffer and frame count on the FIFO's current layout.
    pub fn start_prepared(
        &mut self,
        descriptor: TransferDescriptor,
        buffer: &'static mut [u32],
        frame_count: usize,
    ) -> Result<(), StartError> {
        if self.state == RxState::Busy {
            return Err(self.reject_busy(buffer));
        }

        match self.prepare_descriptor(buffer, frame_count) {
            Ok(expected) if expected == descriptor => {}
            Ok(_) => return Err(StartError::new(DmaError::DescriptorMismatch, buffer)),
            Err(e) => return Err(StartError::new(e, buffer)),
        }
        let format = self.peripheral.fifo_format();

        // Buffer writes by the CPU must land before the engine owns it
        compiler_fence(Ordering::Release);

        if let Err(e) = self.channel.submit(&descriptor) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Rx FIFO DMA ch{}: submit failed: {}", self.channel.channel(), e);
            #[cfg(feature = "log")]
            log::warn!("Rx FIFO DMA ch{}: submit failed: {}", self.channel.channel(), e);

            return Err(StartError::new(e, buffer));
        }

        if let Err(e) = self.peripheral.set_rx_fifo_dma(true) {
            self.channel.stop();
            return Err(StartError::new(e, buffer));
        }

        self.in_flight = Some(InFlight {
            buffer,
            frame_count,
            format,
        });
        self.state = RxState::Busy;
        self.stats.started = self.stats.started.wrapping_add(1);

        // SAFETY: the buffer is held in `in_flight` and not handed out again
        // until the channel has been stopped.
        unsafe { self.channel.start() };

        Ok(())
    }

    /// Take the last completion of a handle created without a callback.
    pub fn take_completion(&mut self) -> Option<Completion> {
        self.unclaimed.take()
    }

    fn reject_busy(&mut self, buffer: &'static mut [u32]) -> StartError {
        self.stats.rejected = self.stats.rejected.wrapping_add(1);

        #[cfg(feature = "defmt")]
        defmt::debug!("Rx FIFO DMA ch{}: start while busy", self.channel.channel());
        #[cfg(feature = "log")]
        log::debug!("Rx FIFO DMA ch{}: start while busy", self.channel.channel());

        StartError::new(RxError::RxFifoBusy, buffer)
    }

    /// Handle the DMA channel interrupt.
    ///
    /// Call from the channel's interrupt handler. If the channel reported the
    /// end of the outstanding transfer, the handle returns to Idle, the
    /// callback (if any) runs, and the status is returned.
    ///
    /// Returns `None` if the channel had no event, or if the event arrived
    /// with nothing in flight (for example after an abort raced the
    /// completion).
    pub fn on_interrupt(&mut self) -> Option<TransferStatus> {
        let event = self.channel.take_event()?;

        if self.state == RxState::Idle {
            self.stats.stray = self.stats.stray.wrapping_add(1);

            #[cfg(feature = "defmt")]
            defmt::debug!("Rx FIFO DMA ch{}: stray {}", self.channel.channel(), event);
            #[cfg(feature = "log")]
            log::debug!("Rx FIFO DMA ch{}: stray {:?}", self.channel.channel(), event);

            return None;
        }

        self.disarm_fifo();
        self.channel.stop();
        self.settle();
        self.stats.completed = self.stats.completed.wrapping_add(1);
        let in_flight = self.in_flight.take()?;

        let status = match event {
            ChannelEvent::Done => TransferStatus::Success,
            ChannelEvent::Error(flags) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Rx FIFO DMA ch{}: error {:#010x}", self.channel.channel(), flags);
                #[cfg(feature = "log")]
                log::warn!("Rx FIFO DMA ch{}: error {:#010x}", self.channel.channel(), flags);

                TransferStatus::DmaError(flags)
            }
        };

        let completion = Completion {
            channel: self.channel.channel(),
            status,
            format: in_flight.format,
            frame_count: in_flight.frame_count,
            buffer: in_flight.buffer,
        };
        match self.callback {
            Some(callback) => callback(self, completion),
            None => self.unclaimed = Some(completion),
        }

        Some(status)
    }

    /// Cancel the outstanding transfer.
    ///
    /// Stops the channel and returns the buffer. Frames already copied stay
    /// in it. The completion callback is not invoked, and a completion event
    /// that was already latched is discarded.
    ///
    /// Returns `None` if nothing was in flight.
    pub fn abort_receive(&mut self) -> Option<&'static mut [u32]> {
        if self.state == RxState::Idle {
            return None;
        }

        self.channel.stop();
        let _ = self.channel.take_event();
        self.disarm_fifo();
        self.settle();
        self.stats.aborted = self.stats.aborted.wrapping_add(1);

        self.in_flight.take().map(|f| f.buffer)
    }

    /// Route the FIFO back to its interrupt. The transfer outcome is already
    /// decided here, so a failure is only logged.
    fn disarm_fifo(&mut self) {
        if let Err(_e) = self.peripheral.set_rx_fifo_dma(false) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Rx FIFO DMA ch{}: disarm failed: {}", self.channel.channel(), _e);
            #[cfg(feature = "log")]
            log::warn!("Rx FIFO DMA ch{}: disarm failed: {}", self.channel.channel(), _e);
        }
    }

    fn settle(&mut self) {
        // Engine writes must be visible before the buffer is read
        compiler_fence(Ordering::Acquire);
        self.state = RxState::Idle;
    }
}
