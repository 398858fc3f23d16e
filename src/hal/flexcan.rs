//! FlexCAN Rx FIFO peripheral
//!
//! [`RxFifoPeripheral`] is the only view of the CAN controller the receive
//! path needs: where the FIFO output window lives, how large its elements
//! are, and a switch that routes "frames available" to the DMA request line.
//!
//! [`FlexCan`] implements it over the FlexCAN register block. `MCR.DMA` is
//! only writable in freeze mode, so toggling it runs the freeze handshake
//! with a bounded wait.

use embedded_hal::delay::DelayNs;

use crate::driver::config::FifoFormat;
use crate::driver::error::{ConfigError, Result};
use crate::internal::constants::{FREEZE_POLL_INTERVAL_US, FREEZE_TIMEOUT_US};
use crate::internal::register::flexcan::{ERFFEL_OFFSET, FlexCanRegs, MB0_OFFSET};

// =============================================================================
// Peripheral Capability
// =============================================================================

/// A CAN peripheral whose receive FIFO can be drained by DMA.
pub trait RxFifoPeripheral {
    /// Bus address of the FIFO output window the DMA engine reads from
    fn fifo_address(&self) -> u32;

    /// Currently configured FIFO layout
    fn fifo_format(&self) -> FifoFormat;

    /// Route the "FIFO has data" signal to the DMA request (`true`) or back
    /// to the interrupt line (`false`).
    fn set_rx_fifo_dma(&mut self, enable: bool) -> Result<()>;
}

impl<T: RxFifoPeripheral + ?Sized> RxFifoPeripheral for &mut T {
    #[inline]
    fn fifo_address(&self) -> u32 {
        (**self).fifo_address()
    }

    #[inline]
    fn fifo_format(&self) -> FifoFormat {
        (**self).fifo_format()
    }

    #[inline]
    fn set_rx_fifo_dma(&mut self, enable: bool) -> Result<()> {
        (**self).set_rx_fifo_dma(enable)
    }
}

// =============================================================================
// FlexCAN Implementation
// =============================================================================

/// FlexCAN instance used as an Rx FIFO DMA source
///
/// Bit timing, filters and FIFO enable are expected to be configured by the
/// platform HAL before the instance is handed to a receive handle.
#[derive(Debug)]
pub struct FlexCan<D: DelayNs> {
    regs: FlexCanRegs,
    delay: D,
    timeout_us: u32,
}

impl<D: DelayNs> FlexCan<D> {
    /// Wrap the FlexCAN instance at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the register base of a FlexCAN instance that nothing
    /// else writes `MCR` on while this value exists.
    pub unsafe fn new(base: usize, delay: D) -> Self {
        // SAFETY: forwarded caller contract
        unsafe { Self::with_timeout(base, delay, FREEZE_TIMEOUT_US) }
    }

    /// Wrap the FlexCAN instance at `base` with a custom freeze timeout.
    ///
    /// # Safety
    ///
    /// Same contract as [`FlexCan::new`].
    pub unsafe fn with_timeout(base: usize, delay: D, timeout_us: u32) -> Self {
        Self {
            // SAFETY: forwarded caller contract
            regs: unsafe { FlexCanRegs::new(base) },
            delay,
            timeout_us,
        }
    }

    /// Register base address of this instance
    #[inline]
    pub fn base(&self) -> usize {
        self.regs.base()
    }

    /// Whether "frames available" is currently routed to the DMA request
    #[inline]
    pub fn is_rx_fifo_dma_enabled(&self) -> bool {
        self.regs.is_dma_enabled()
    }

    /// Give back the delay provider
    pub fn release(self) -> D {
        self.delay
    }

    fn poll_iterations(&self) -> u32 {
        (self.timeout_us / FREEZE_POLL_INTERVAL_US).max(1)
    }

    fn enter_freeze(&mut self) -> Result<()> {
        self.regs.request_freeze();

        for _ in 0..self.poll_iterations() {
            if self.regs.is_frozen() {
                return Ok(());
            }
            self.delay.delay_us(FREEZE_POLL_INTERVAL_US);
        }

        // Leave the module running rather than half-frozen
        self.regs.release_freeze();

        #[cfg(feature = "defmt")]
        defmt::warn!("FlexCAN @ {:#010x}: freeze acknowledge timed out", self.base());
        #[cfg(feature = "log")]
        log::warn!("FlexCAN @ {:#010x}: freeze acknowledge timed out", self.base());

        Err(ConfigError::FreezeTimeout.into())
    }

    fn exit_freeze(&mut self) -> Result<()> {
        self.regs.release_freeze();

        for _ in 0..self.poll_iterations() {
            if !self.regs.is_frozen() {
                return Ok(());
            }
            self.delay.delay_us(FREEZE_POLL_INTERVAL_US);
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("FlexCAN @ {:#010x}: freeze exit timed out", self.base());
        #[cfg(feature = "log")]
        log::warn!("FlexCAN @ {:#010x}: freeze exit timed out", self.base());

        Err(ConfigError::FreezeTimeout.into())
    }
}

impl<D: DelayNs> RxFifoPeripheral for FlexCan<D> {
    fn fifo_address(&self) -> u32 {
        let offset = match self.fifo_format() {
            FifoFormat::Standard => MB0_OFFSET,
            FifoFormat::Extended { .. } => ERFFEL_OFFSET,
        };
        self.regs.addr(offset) as u32
    }

    fn fifo_format(&self) -> FifoFormat {
        if self.regs.is_enhanced_fifo_enabled() {
            FifoFormat::extended(self.regs.dma_last_word() + 1)
        } else {
            FifoFormat::Standard
        }
    }

    fn set_rx_fifo_dma(&mut self, enable: bool) -> Result<()> {
        if self.regs.is_dma_enabled() == enable {
            return Ok(());
        }

        self.enter_freeze()?;
        if enable {
            self.regs.set_dma();
        } else {
            self.regs.clear_dma();
        }
        self.exit_freeze()
    }
}
