//! Testing utilities and mock implementations
//!
//! Mock collaborators for exercising the receive path on the host without
//! FlexCAN or eDMA hardware.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use std::boxed::Box;
use std::vec;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::driver::config::FifoFormat;
use crate::driver::descriptor::TransferDescriptor;
use crate::driver::error::{ConfigError, DmaError, DmaResult, Result};
use crate::hal::dma::{ChannelEvent, DmaChannel};
use crate::hal::flexcan::RxFifoPeripheral;

// =============================================================================
// Mock DMA Channel
// =============================================================================

/// Mock DMA channel recording every call made by the receive path
///
/// Completion is simulated with [`MockDmaChannel::raise`], which latches an
/// event the way the eDMA `DONE`/`ERR` flags would.
///
/// # Example
///
/// ```ignore
/// let mut channel = MockDmaChannel::new(0);
/// // ... start a transfer ...
/// channel.raise(ChannelEvent::Done);
/// handle.on_interrupt();
/// ```
#[derive(Debug, Default)]
pub struct MockDmaChannel {
    index: usize,
    submitted: Vec<TransferDescriptor>,
    pending: Option<ChannelEvent>,
    running: bool,
    interrupt: bool,
    busy: bool,
    start_count: usize,
    stop_count: usize,
}

impl MockDmaChannel {
    /// Create an idle channel with the given number
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Latch a completion or error event
    pub fn raise(&mut self, event: ChannelEvent) {
        self.pending = Some(event);
    }

    /// Make subsequent submits fail with `ChannelBusy`
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Descriptors submitted so far, oldest first
    pub fn submitted(&self) -> &[TransferDescriptor] {
        &self.submitted
    }

    /// Whether the hardware request is currently enabled
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether an event is latched and not yet taken
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn interrupt_enabled(&self) -> bool {
        self.interrupt
    }

    pub fn start_count(&self) -> usize {
        self.start_count
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count
    }
}

impl DmaChannel for MockDmaChannel {
    fn channel(&self) -> usize {
        self.index
    }

    fn submit(&mut self, descriptor: &TransferDescriptor) -> DmaResult<()> {
        if self.busy || self.running {
            return Err(DmaError::ChannelBusy);
        }
        self.submitted.push(*descriptor);
        Ok(())
    }

    unsafe fn start(&mut self) {
        self.running = true;
        self.start_count += 1;
    }

    fn stop(&mut self) {
        self.running = false;
        self.stop_count += 1;
    }

    fn set_interrupt_on_completion(&mut self, enable: bool) {
        self.interrupt = enable;
    }

    fn take_event(&mut self) -> Option<ChannelEvent> {
        self.pending.take()
    }
}

// =============================================================================
// Mock Peripheral
// =============================================================================

/// Mock FlexCAN Rx FIFO with a configurable layout
#[derive(Debug)]
pub struct MockPeripheral {
    format: FifoFormat,
    address: u32,
    dma_enabled: bool,
    failing: bool,
    switch_log: Vec<bool>,
}

impl MockPeripheral {
    /// Create a peripheral exposing its FIFO at `address`
    pub fn new(format: FifoFormat, address: u32) -> Self {
        Self {
            format,
            address,
            dma_enabled: false,
            failing: false,
            switch_log: Vec::new(),
        }
    }

    /// Legacy FIFO at the i.MX RT1062 CAN1 message buffer 0
    pub fn standard() -> Self {
        Self::new(FifoFormat::Standard, 0x401D_0080)
    }

    /// Enhanced FIFO output window
    pub fn extended() -> Self {
        Self::new(FifoFormat::EXTENDED_FULL, 0x401D_2000)
    }

    /// Make every DMA switch attempt fail with a freeze timeout
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn dma_enabled(&self) -> bool {
        self.dma_enabled
    }

    /// Every `set_rx_fifo_dma` argument, oldest first
    pub fn switch_log(&self) -> &[bool] {
        &self.switch_log
    }
}

impl RxFifoPeripheral for MockPeripheral {
    fn fifo_address(&self) -> u32 {
        self.address
    }

    fn fifo_format(&self) -> FifoFormat {
        self.format
    }

    fn set_rx_fifo_dma(&mut self, enable: bool) -> Result<()> {
        self.switch_log.push(enable);
        if self.failing {
            return Err(ConfigError::FreezeTimeout.into());
        }
        self.dma_enabled = enable;
        Ok(())
    }
}

// =============================================================================
// Delay
// =============================================================================

/// Delay provider that returns immediately and counts calls
#[derive(Debug, Default)]
pub struct CountingDelay {
    calls: usize,
}

impl CountingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, _ns: u32) {
        self.calls += 1;
    }
}

// =============================================================================
// Buffers
// =============================================================================

/// Leak a zeroed word buffer so it can be lent to a transfer
pub fn leak_buffer(words: usize) -> &'static mut [u32] {
    Box::leak(vec![0u32; words].into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_channel_rejects_submit_while_running() {
        let mut channel = MockDmaChannel::new(0);
        let peripheral = MockPeripheral::standard();
        let request = crate::driver::descriptor::RxRequest {
            destination: 0x2000_0000,
            capacity_frames: 1,
            frame_count: 1,
        };
        let descriptor =
            crate::driver::descriptor::build_descriptor(&peripheral, &request).unwrap();

        assert_eq!(channel.submit(&descriptor), Ok(()));
        // SAFETY: mock channel never touches memory
        unsafe { channel.start() };
        assert_eq!(channel.submit(&descriptor), Err(DmaError::ChannelBusy));
        channel.stop();
        assert_eq!(channel.submit(&descriptor), Ok(()));
        assert_eq!(channel.submitted().len(), 2);
    }

    #[test]
    fn mock_peripheral_failing_keeps_state() {
        let mut peripheral = MockPeripheral::standard();
        peripheral.set_failing(true);
        assert!(peripheral.set_rx_fifo_dma(true).is_err());
        assert!(!peripheral.dma_enabled());
        assert_eq!(peripheral.switch_log(), &[true]);
    }
}
