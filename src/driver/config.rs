//! Configuration types for the FlexCAN Rx FIFO DMA driver

use crate::internal::constants::{EXTENDED_ELEMENT_WORDS, STANDARD_ELEMENT_SIZE};

/// Layout of the receive FIFO as configured on the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoFormat {
    /// Legacy Rx FIFO read through message buffer 0 (16-byte elements)
    #[default]
    Standard,
    /// Enhanced Rx FIFO read through its dedicated output window
    Extended {
        /// Words served per DMA request (`ERFCR.DMALW + 1`), at most 20
        words: u8,
    },
}

impl FifoFormat {
    /// Enhanced FIFO delivering whole 80-byte elements
    pub const EXTENDED_FULL: Self = Self::extended(EXTENDED_ELEMENT_WORDS as u8);

    /// Enhanced FIFO serving `words` words per DMA request.
    ///
    /// Clamped to `1..=20`, the range of `ERFCR.DMALW + 1`.
    #[must_use]
    pub const fn extended(words: u8) -> Self {
        let words = if words == 0 {
            1
        } else if words as usize > EXTENDED_ELEMENT_WORDS {
            EXTENDED_ELEMENT_WORDS as u8
        } else {
            words
        };
        Self::Extended { words }
    }

    /// Bytes moved per DMA request
    #[must_use]
    pub const fn element_size(self) -> usize {
        match self {
            FifoFormat::Standard => STANDARD_ELEMENT_SIZE,
            FifoFormat::Extended { words } => words as usize * 4,
        }
    }

    /// Size of one FIFO element in 32-bit words
    #[must_use]
    pub const fn element_words(self) -> usize {
        self.element_size() / 4
    }

    /// Access width used to read the FIFO output window
    ///
    /// The legacy window is read in a single 16-byte burst; the enhanced
    /// window is read word by word.
    #[must_use]
    pub const fn source_width(self) -> TransferSize {
        match self {
            FifoFormat::Standard => TransferSize::Bytes16,
            FifoFormat::Extended { .. } => TransferSize::Bytes4,
        }
    }
}

/// DMA access width for a single read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferSize {
    /// 1 byte
    Bytes1 = 1,
    /// 2 bytes
    Bytes2 = 2,
    /// 4 bytes (default, one FlexCAN register word)
    #[default]
    Bytes4 = 4,
    /// 8 bytes
    Bytes8 = 8,
    /// 16 bytes
    Bytes16 = 16,
    /// 32 bytes
    Bytes32 = 32,
}

impl TransferSize {
    /// Width in bytes
    #[must_use]
    pub const fn bytes(self) -> u32 {
        self as u32
    }

    /// eDMA `SSIZE`/`DSIZE` field encoding
    #[must_use]
    pub const fn to_tcd_size(self) -> u16 {
        match self {
            TransferSize::Bytes1 => 0,
            TransferSize::Bytes2 => 1,
            TransferSize::Bytes4 => 2,
            TransferSize::Bytes8 => 3,
            TransferSize::Bytes16 => 4,
            TransferSize::Bytes32 => 5,
        }
    }
}

/// How an address moves between elements of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressMode {
    /// Every element is accessed at the same address (FIFO output window)
    Fixed,
    /// Each element follows the previous one in memory
    Increment,
}

/// Transfer state of a receive handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// No transfer outstanding
    #[default]
    Idle,
    /// Exactly one transfer programmed and not yet completed or aborted
    Busy,
}
