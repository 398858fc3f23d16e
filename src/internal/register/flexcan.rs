//! FlexCAN register and message buffer definitions.
//!
//! Based on the i.MX RT1060 reference manual, FlexCAN chapter. Only the
//! registers touched by the Rx FIFO DMA path are described here.

use super::{reg_bit_ops, reg_rw};

// =============================================================================
// Register Offsets
// =============================================================================

/// Module Configuration register
pub const MCR_OFFSET: usize = 0x00;
/// Message buffer 0, the legacy Rx FIFO output window
pub const MB0_OFFSET: usize = 0x80;
/// Enhanced Rx FIFO Control register
pub const ERFCR_OFFSET: usize = 0xC0C;
/// Enhanced Rx FIFO output window
pub const ERFFEL_OFFSET: usize = 0x2000;

// =============================================================================
// MCR Bits
// =============================================================================

/// Freeze Enable
pub const MCR_FRZ: u32 = 1 << 30;
/// Legacy Rx FIFO Enable
#[cfg(test)]
pub const MCR_RFEN: u32 = 1 << 29;
/// Halt FlexCAN (requests freeze mode when FRZ is set)
pub const MCR_HALT: u32 = 1 << 28;
/// Freeze Mode Acknowledge
pub const MCR_FRZACK: u32 = 1 << 24;
/// DMA Enable: Rx FIFO "frames available" raises a DMA request instead of an interrupt
pub const MCR_DMA: u32 = 1 << 15;

// =============================================================================
// ERFCR Bits
// =============================================================================

/// Enhanced Rx FIFO enable
pub const ERFCR_ERFEN: u32 = 1 << 31;
/// DMA last word field shift
pub const ERFCR_DMALW_SHIFT: u32 = 26;
/// DMA last word field mask
pub const ERFCR_DMALW_MASK: u32 = 0x1F << 26;

// =============================================================================
// FIFO Element Word 0 (Control and Status)
// =============================================================================

/// Control and Status word bit field constants
pub mod cs {
    /// Extended Data Length - element holds a CAN FD frame
    pub const EDL: u32 = 1 << 31;
    /// Bit Rate Switch
    pub const BRS: u32 = 1 << 30;
    /// Error State Indicator
    pub const ESI: u32 = 1 << 29;
    /// ID Extended - identifier is 29 bits
    pub const IDE: u32 = 1 << 21;
    /// Remote Transmission Request
    pub const RTR: u32 = 1 << 20;
    /// Data Length Code shift
    pub const DLC_SHIFT: u32 = 16;
    /// Data Length Code mask
    pub const DLC_MASK: u32 = 0xF << 16;
    /// Free running timer value captured at reception
    pub const TIMESTAMP_MASK: u32 = 0xFFFF;
}

// =============================================================================
// FIFO Element Word 1 (Identifier)
// =============================================================================

/// Identifier word bit field constants
pub mod id {
    /// Standard identifier shift
    pub const STD_SHIFT: u32 = 18;
    /// Standard identifier mask (after shifting)
    pub const STD_MASK: u32 = 0x7FF;
    /// Extended identifier mask
    pub const EXT_MASK: u32 = 0x1FFF_FFFF;
}

/// Enhanced Rx FIFO ID hit word mask
pub const IDHIT_MASK: u32 = 0x7F;

// =============================================================================
// Register Block
// =============================================================================

/// FlexCAN register block at a fixed instance base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexCanRegs {
    base: usize,
}

impl FlexCanRegs {
    /// Wrap the register block at `base`.
    ///
    /// # Safety
    /// `base` must be the address of a FlexCAN instance (or memory laid out
    /// like one), valid and word-aligned for the lifetime of this value.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Instance base address
    #[inline(always)]
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Absolute address of a register offset within this instance
    #[inline(always)]
    pub const fn addr(&self, offset: usize) -> usize {
        self.base + offset
    }

    reg_rw!(mcr, set_mcr, MCR_OFFSET, "Module Configuration register");
    reg_rw!(erfcr, set_erfcr, ERFCR_OFFSET, "Enhanced Rx FIFO Control register");

    reg_bit_ops!(
        set_dma,
        clear_dma,
        MCR_OFFSET,
        MCR_DMA,
        "Rx FIFO DMA request",
        "Enable",
        "Disable"
    );
    reg_bit_ops!(
        request_freeze,
        release_freeze,
        MCR_OFFSET,
        MCR_FRZ | MCR_HALT,
        "freeze mode",
        "Request",
        "Release"
    );

    /// Check whether the module has acknowledged freeze mode
    #[inline(always)]
    pub fn is_frozen(&self) -> bool {
        (self.mcr() & MCR_FRZACK) != 0
    }

    /// Check whether the Rx FIFO DMA request is enabled
    #[inline(always)]
    pub fn is_dma_enabled(&self) -> bool {
        (self.mcr() & MCR_DMA) != 0
    }

    /// Check whether the enhanced Rx FIFO is enabled
    #[inline(always)]
    pub fn is_enhanced_fifo_enabled(&self) -> bool {
        (self.erfcr() & ERFCR_ERFEN) != 0
    }

    /// Index of the last element word served per DMA request (`ERFCR.DMALW`)
    #[inline(always)]
    pub fn dma_last_word(&self) -> u8 {
        ((self.erfcr() & ERFCR_DMALW_MASK) >> ERFCR_DMALW_SHIFT) as u8
    }
}

#[cfg(test)]
#[allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec;

    #[test]
    fn fifo_windows_do_not_overlap_control_registers() {
        assert!(MB0_OFFSET > MCR_OFFSET);
        assert!(ERFFEL_OFFSET > ERFCR_OFFSET);
    }

    #[test]
    fn dma_last_word_field() {
        let mut block = vec![0u32; ERFCR_OFFSET / 4 + 1];
        // SAFETY: `block` outlives `regs` and covers the ERFCR offset
        let regs = unsafe { FlexCanRegs::new(block.as_mut_ptr() as usize) };

        regs.set_erfcr(ERFCR_ERFEN | (7 << ERFCR_DMALW_SHIFT) | 0x3F);
        assert!(regs.is_enhanced_fifo_enabled());
        assert_eq!(regs.dma_last_word(), 7);
        drop(block);
    }

    #[test]
    fn cs_fields_are_disjoint() {
        let fields = [cs::EDL, cs::BRS, cs::ESI, cs::IDE, cs::RTR, cs::DLC_MASK];
        for (i, a) in fields.iter().enumerate() {
            for b in &fields[i + 1..] {
                assert_eq!(a & b, 0);
            }
            assert_eq!(a & cs::TIMESTAMP_MASK, 0);
        }
    }

    #[test]
    fn bit_ops_touch_only_their_bits() {
        let mut block = vec![0u32; 0x40];
        block[0] = MCR_RFEN;
        // SAFETY: `block` outlives `regs` and covers the MCR offset
        let regs = unsafe { FlexCanRegs::new(block.as_mut_ptr() as usize) };

        regs.set_dma();
        assert!(regs.is_dma_enabled());
        assert_eq!(regs.mcr(), MCR_RFEN | MCR_DMA);

        regs.request_freeze();
        assert_eq!(regs.mcr(), MCR_RFEN | MCR_DMA | MCR_FRZ | MCR_HALT);

        regs.release_freeze();
        regs.clear_dma();
        assert_eq!(regs.mcr(), MCR_RFEN);
        drop(block);
    }
}
