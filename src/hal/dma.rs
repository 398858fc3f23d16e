//! DMA channel capability.
//!
//! The receive path never touches DMA engine registers itself. It programs a
//! channel through [`DmaChannel`], which a platform HAL implements over its
//! eDMA transfer control descriptors.

use crate::driver::descriptor::TransferDescriptor;
use crate::driver::error::DmaResult;

/// Event reported by a DMA channel when its major loop ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelEvent {
    /// Major loop finished, all requested elements were moved
    Done,
    /// Channel stopped on a bus or configuration error (raw error status)
    Error(u32),
}

/// A single DMA channel bound to one receive handle.
///
/// Implementations must be usable from both call and interrupt context; the
/// receive handle guarantees it only touches the channel while it holds
/// exclusive access.
pub trait DmaChannel {
    /// Channel number within the DMA controller
    fn channel(&self) -> usize;

    /// Program the channel's transfer control descriptor.
    ///
    /// Returns [`DmaError::ChannelBusy`](crate::DmaError::ChannelBusy) if the
    /// channel is still active with an earlier transfer. Must not enable the
    /// hardware request.
    fn submit(&mut self, descriptor: &TransferDescriptor) -> DmaResult<()>;

    /// Enable the channel's hardware request so the peripheral can trigger it.
    ///
    /// # Safety
    ///
    /// The destination of the submitted descriptor must stay valid and
    /// untouched by the CPU until the transfer completes or is stopped.
    unsafe fn start(&mut self);

    /// Disable the hardware request, halting any transfer in progress.
    fn stop(&mut self);

    /// Enable or disable the completion interrupt for this channel
    fn set_interrupt_on_completion(&mut self, enable: bool);

    /// Read and clear the channel's completion or error event, if any
    fn take_event(&mut self) -> Option<ChannelEvent>;
}

impl<T: DmaChannel + ?Sized> DmaChannel for &mut T {
    #[inline]
    fn channel(&self) -> usize {
        (**self).channel()
    }

    #[inline]
    fn submit(&mut self, descriptor: &TransferDescriptor) -> DmaResult<()> {
        (**self).submit(descriptor)
    }

    #[inline]
    unsafe fn start(&mut self) {
        // SAFETY: forwarded caller contract
        unsafe { (**self).start() }
    }

    #[inline]
    fn stop(&mut self) {
        (**self).stop();
    }

    #[inline]
    fn set_interrupt_on_completion(&mut self, enable: bool) {
        (**self).set_interrupt_on_completion(enable);
    }

    #[inline]
    fn take_event(&mut self) -> Option<ChannelEvent> {
        (**self).take_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDmaChannel;

    fn drive<C: DmaChannel>(mut channel: C) -> (usize, Option<ChannelEvent>) {
        channel.set_interrupt_on_completion(true);
        channel.stop();
        (channel.channel(), channel.take_event())
    }

    #[test]
    fn borrowed_channel_forwards_calls() {
        let mut owned = MockDmaChannel::new(3);
        owned.raise(ChannelEvent::Done);

        let (index, event) = drive(&mut owned);

        assert_eq!(index, 3);
        assert_eq!(event, Some(ChannelEvent::Done));
        assert!(owned.interrupt_enabled());
        assert_eq!(owned.stop_count(), 1);
    }
}
