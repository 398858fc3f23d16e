//! Hardware Abstraction Layer
//!
//! This module defines the collaborator interfaces the receive path is
//! injected with, plus the register-level FlexCAN implementation.
//!
//! # Modules
//!
//! - [`dma`]: DMA channel capability ([`DmaChannel`]) and completion events
//! - [`flexcan`]: Rx FIFO peripheral capability ([`RxFifoPeripheral`]) and
//!   the FlexCAN register implementation
//!
//! The DMA engine's own register programming is left to the platform HAL;
//! anything that can program a channel from a [`TransferDescriptor`] and
//! report completion can drive an [`RxFifoDma`].
//!
//! # Delay Integration
//!
//! Types that wait on hardware handshakes use `embedded_hal::delay::DelayNs`
//! directly. Pass any delay implementation from your HAL.
//!
//! [`TransferDescriptor`]: crate::driver::descriptor::TransferDescriptor
//! [`RxFifoDma`]: crate::driver::handle::RxFifoDma

pub mod dma;
pub mod flexcan;

// Re-export commonly used types
pub use dma::{ChannelEvent, DmaChannel};
pub use flexcan::{FlexCan, RxFifoPeripheral};
