//! Core driver components for FlexCAN Rx FIFO DMA reception.
//!
//! - [`config`] - FIFO layout, transfer widths and handle state
//! - [`error`] - Error types and result aliases
//! - [`descriptor`] - Translation of a receive request into a DMA descriptor
//! - [`handle`] - The receive handle and its lifecycle
//! - [`transfer`] - Start, completion and abort of transfers
//! - [`frame`] - Decoding of received FIFO elements
//!
//! # Example
//!
//! ```ignore
//! use flexcan_rxfifo_dma::driver::{RxFifoDma, TransferStatus};
//!
//! let mut rx = RxFifoDma::new(can, Some(on_frames), (), Some(channel))?;
//! rx.start_receive(buffer, 4)?;
//! ```

// Submodules
pub mod config;
pub mod descriptor;
pub mod error;
pub mod frame;
pub mod handle;
pub mod transfer;

// Re-exports for convenience
pub use config::{AddressMode, FifoFormat, RxState, TransferSize};
pub use descriptor::{RxRequest, TransferDescriptor, build_descriptor};
pub use error::{ConfigError, ConfigResult, DmaError, DmaResult, Error, Result, RxError};
pub use frame::{Frames, RxFrame};
pub use handle::{RxCallback, RxFifoDma, RxStats};
pub use transfer::{Completion, StartError, TransferStatus};
