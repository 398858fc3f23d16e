//! Centralized Constants
//!
//! This module provides a single source of truth for the magic numbers used
//! by the Rx FIFO DMA driver.
//!
//! # Organization
//!
//! Constants are grouped by category:
//! - **FIFO element sizes**: Wire size of one frame as the FIFO presents it
//! - **DMA limits**: Channel count and loop counter widths of the eDMA block
//! - **Timing**: Freeze-mode handshake timeouts and polling intervals
//!
//! # Note
//!
//! FlexCAN register offsets and bit definitions remain in
//! `register/flexcan.rs` since they are specific to that hardware block.

// =============================================================================
// FIFO Element Sizes
// =============================================================================

/// Size of one legacy Rx FIFO element (CS, ID, DATA0, DATA1)
pub const STANDARD_ELEMENT_SIZE: usize = 16;

/// Size of one enhanced Rx FIFO element
/// (CS, ID, 16 data words, ID hit, high resolution timestamp)
pub const EXTENDED_ELEMENT_SIZE: usize = 80;

/// Words in one enhanced Rx FIFO element, the largest `ERFCR.DMALW + 1`
pub const EXTENDED_ELEMENT_WORDS: usize = EXTENDED_ELEMENT_SIZE / 4;

/// Maximum payload carried by a classic CAN frame
pub const CLASSIC_MAX_DATA_LEN: usize = 8;

/// Maximum payload carried by a CAN FD frame
pub const FD_MAX_DATA_LEN: usize = 64;

// =============================================================================
// DMA Limits
// =============================================================================

/// Number of channels on the eDMA controller
pub const DMA_CHANNEL_COUNT: usize = 32;

/// Largest major loop count without channel linking (15-bit CITER)
pub const MAX_MAJOR_LOOP_COUNT: usize = 0x7FFF;

// =============================================================================
// Timing Constants
// =============================================================================

/// Freeze mode enter/exit acknowledge timeout in microseconds
pub const FREEZE_TIMEOUT_US: u32 = 1_000;

/// Freeze acknowledge poll interval in microseconds
pub const FREEZE_POLL_INTERVAL_US: u32 = 10;
