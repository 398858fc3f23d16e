//! FlexCAN Rx FIFO DMA Driver
//!
//! A `no_std`, `no_alloc` asynchronous receive path for the FlexCAN receive
//! FIFO, draining frames into memory with a DMA channel instead of per-frame
//! interrupts.
//!
//! # Architecture
//!
//! The driver is organized into three layers:
//!
//! 1. **Driver Layer** ([`driver`]): The receive handle, its Idle/Busy state
//!    machine, descriptor construction and frame decoding
//! 2. **HAL Layer** ([`hal`]): Capability traits for the CAN peripheral and the
//!    DMA channel, plus the register-level [`FlexCan`] implementation
//! 3. **Sync Layer** ([`sync`]): Critical-section protected sharing between
//!    thread mode and the DMA interrupt, and an async adapter
//!
//! ## Transfer Protocol
//!
//! - At most one transfer is outstanding per handle
//! - Every start is matched by exactly one completion or abort
//! - Completion invokes the callback once; abort never does
//!
//! # Supported FIFO Layouts
//!
//! - [`FifoFormat::Standard`]: Legacy Rx FIFO, 16-byte elements read through MB0
//! - [`FifoFormat::Extended`]: Enhanced Rx FIFO, CAN FD capable elements of up
//!   to 80 bytes, as many words per DMA request as `ERFCR.DMALW` selects
//!
//! # Features
//!
//! - `critical-section` (default): Enable ISR-safe [`SharedRxFifoDma`] wrapper
//! - `async` (default): Enable async/await support with wakers
//! - `defmt`: Enable defmt formatting and logging
//! - `log`: Enable logging through the `log` facade
//!
//! # Example
//!
//! ```ignore
//! use flexcan_rxfifo_dma::{Completion, FlexCan, RxFifoDma};
//!
//! fn on_frames(rx: &mut RxFifoDma<FlexCan<Delay>, EdmaChannel, u32>, done: Completion) {
//!     *rx.user_data_mut() += done.frames().count() as u32;
//!     // Keep receiving with the same buffer
//!     let _ = rx.start_receive(done.into_buffer(), 4);
//! }
//!
//! // SAFETY: CAN1 base address, not shared with another driver
//! let can = unsafe { FlexCan::new(0x401D_0000, delay) };
//! let mut rx = RxFifoDma::new(can, Some(on_frames), 0, Some(channel))?;
//!
//! static mut BUFFER: [u32; 16] = [0; 16];
//! rx.start_receive(unsafe { &mut *core::ptr::addr_of_mut!(BUFFER) }, 4)?;
//!
//! // DMA channel interrupt
//! rx.on_interrupt();
//! ```

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; thresholds and config are in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements,
    clippy::let_underscore_future
)]

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod hal;

// Internal implementation details (pub(crate) only)
mod internal;

#[cfg(feature = "critical-section")]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::{AddressMode, FifoFormat, RxState, TransferSize};
pub use driver::descriptor::{RxRequest, TransferDescriptor, build_descriptor};
pub use driver::error::{ConfigError, ConfigResult, DmaError, DmaResult, Error, Result, RxError};
pub use driver::frame::{Frames, RxFrame};
pub use driver::handle::{RxCallback, RxFifoDma, RxStats};
pub use driver::transfer::{Completion, StartError, TransferStatus};

pub use hal::dma::{ChannelEvent, DmaChannel};
pub use hal::flexcan::{FlexCan, RxFifoPeripheral};

// CAN identifier types used by `RxFrame`
pub use embedded_can;

/// Low-level register accessors for advanced use.
///
/// These are intentionally separated from the primary facade. Most users should
/// prefer [`FlexCan`] instead of touching registers directly.
///
/// # Safety
///
/// Direct register access bypasses driver invariants. In particular, writing
/// `MCR` outside freeze mode is ignored by the hardware.
pub mod unsafe_registers {
    pub use crate::internal::register::flexcan::FlexCanRegs;
}

// Re-export sync types when critical-section is enabled
#[cfg(feature = "critical-section")]
pub use sync::SharedRxFifoDma;

// Re-export async types when async feature is enabled
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub use sync::asynch::{AsyncRxExt, AsyncRxFifoDma, RxFuture, RxSignal};

/// Shared driver constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on driver types and integration points.
pub mod constants {
    pub use crate::internal::constants::{
        // Payload sizes
        CLASSIC_MAX_DATA_LEN,
        // DMA limits
        DMA_CHANNEL_COUNT,
        // FIFO element sizes
        EXTENDED_ELEMENT_SIZE,
        EXTENDED_ELEMENT_WORDS,
        FD_MAX_DATA_LEN,
        // Timing
        FREEZE_POLL_INTERVAL_US,
        FREEZE_TIMEOUT_US,
        MAX_MAJOR_LOOP_COUNT,
        STANDARD_ELEMENT_SIZE,
    };
}

// =============================================================================
// Macro Helpers
// =============================================================================

/// Declare a static, ISR-safe receive handle slot.
///
/// Expands to an empty [`SharedRxFifoDma`] static. The user context type
/// defaults to `()` when omitted.
///
/// # Examples
///
/// ```ignore
/// flexcan_rxfifo_dma::rx_fifo_dma_static!(CAN1_RX, FlexCan<Delay>, EdmaChannel, u32);
///
/// CAN1_RX.install(RxFifoDma::new(can, Some(on_frames), 0, Some(ch))?);
///
/// #[interrupt]
/// fn DMA0_DMA16() {
///     CAN1_RX.on_interrupt();
/// }
/// ```
#[cfg(feature = "critical-section")]
#[macro_export]
macro_rules! rx_fifo_dma_static {
    ($name:ident, $periph:ty, $chan:ty) => {
        $crate::rx_fifo_dma_static!($name, $periph, $chan, ());
    };
    ($name:ident, $periph:ty, $chan:ty, $user:ty) => {
        static $name: $crate::sync::SharedRxFifoDma<$periph, $chan, $user> =
            $crate::sync::SharedRxFifoDma::new();
    };
}

/// Declare a static async receive slot together with its completion signal.
///
/// # Examples
///
/// ```ignore
/// flexcan_rxfifo_dma::rx_fifo_dma_static_async!(CAN1_RX, CAN1_SIGNAL, FlexCan<Delay>, EdmaChannel);
///
/// CAN1_RX.install(RxFifoDma::new_async(can, &CAN1_SIGNAL, Some(ch))?);
/// let done = CAN1_RX.receive_async(buffer, 4).await?;
/// ```
#[cfg(feature = "async")]
#[macro_export]
macro_rules! rx_fifo_dma_static_async {
    ($name:ident, $signal:ident, $periph:ty, $chan:ty) => {
        static $signal: $crate::sync::RxSignal = $crate::sync::RxSignal::new();
        static $name: $crate::sync::SharedRxFifoDma<
            $periph,
            $chan,
            &'static $crate::sync::RxSignal,
        > = $crate::sync::SharedRxFifoDma::new();
    };
}
