//! Synchronization and Concurrency Support
//!
//! Start and abort run in thread mode while completion runs in the DMA
//! interrupt. This module provides the pieces that let both reach the same
//! handle:
//!
//! - **Shared Wrapper** (`shared`): [`SharedRxFifoDma`], a critical-section
//!   protected slot holding one receive handle
//!
//! - **Async Support** (`asynch`): [`RxFuture`] and [`AsyncRxExt`] for
//!   awaiting a transfer, with [`RxSignal`] as the mailbox between the
//!   interrupt and the waiting task
//!
//! # Feature Flags
//!
//! - `critical-section`: Enables the `shared` module
//! - `async`: Enables `asynch` module (also requires `critical-section`)
//!
//! # Example
//!
//! ```ignore
//! use flexcan_rxfifo_dma::sync::SharedRxFifoDma;
//!
//! static CAN1_RX: SharedRxFifoDma<Can1, Ch0, ()> = SharedRxFifoDma::new();
//!
//! #[interrupt]
//! fn DMA0_DMA16() {
//!     CAN1_RX.on_interrupt();
//! }
//! ```

mod shared;

pub use shared::SharedRxFifoDma;

#[cfg(feature = "async")]
pub mod asynch;

#[cfg(feature = "async")]
pub use asynch::{AsyncRxExt, AsyncRxFifoDma, RxFuture, RxSignal, notify};
