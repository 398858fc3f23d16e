//! Memory-mapped register access for the FlexCAN peripheral
//!
//! All register access is volatile to ensure proper hardware interaction.
//! Unlike a fixed-address SoC block, FlexCAN exists in several instances,
//! so accessors are generated as methods over an instance base address.

pub mod flexcan;

/// Read a 32-bit register at the given address
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn read_reg(addr: usize) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

/// Write a 32-bit value to a register at the given address
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn write_reg(addr: usize, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

/// Modify a register using a read-modify-write operation
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn modify_reg<F>(addr: usize, f: F)
where
    F: FnOnce(u32) -> u32,
{
    // SAFETY: caller guarantees address validity
    let value = unsafe { read_reg(addr) };
    unsafe { write_reg(addr, f(value)) }
}

/// Set bits in a register (read-modify-write)
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn set_bits(addr: usize, bits: u32) {
    // SAFETY: caller guarantees address validity
    unsafe { modify_reg(addr, |v| v | bits) }
}

/// Clear bits in a register (read-modify-write)
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn clear_bits(addr: usize, bits: u32) {
    // SAFETY: caller guarantees address validity
    unsafe { modify_reg(addr, |v| v & !bits) }
}

// =============================================================================
// Register Access Macros
// =============================================================================

/// Generate read/write accessor methods for a register relative to `self.base`.
///
/// # Example
/// ```ignore
/// impl FlexCanRegs {
///     reg_rw!(mcr, set_mcr, MCR_OFFSET, "Module Configuration register");
/// }
/// ```
macro_rules! reg_rw {
    ($read_fn:ident, $write_fn:ident, $offset:expr, $doc:expr) => {
        #[doc = concat!("Read ", $doc)]
        #[inline(always)]
        pub fn $read_fn(&self) -> u32 {
            // SAFETY: `self.base` was validated when the block was created
            unsafe { $crate::internal::register::read_reg(self.base + $offset) }
        }

        #[doc = concat!("Write ", $doc)]
        #[inline(always)]
        pub fn $write_fn(&self, value: u32) {
            // SAFETY: `self.base` was validated when the block was created
            unsafe { $crate::internal::register::write_reg(self.base + $offset, value) }
        }
    };
}

/// Generate set/clear bit operation methods for a register relative to `self.base`.
macro_rules! reg_bit_ops {
    ($set_fn:ident, $clear_fn:ident, $offset:expr, $bit:expr, $what:expr, $set_verb:expr, $clear_verb:expr) => {
        #[doc = concat!($set_verb, " ", $what)]
        #[inline(always)]
        pub fn $set_fn(&self) {
            // SAFETY: `self.base` was validated when the block was created
            unsafe { $crate::internal::register::set_bits(self.base + $offset, $bit) }
        }

        #[doc = concat!($clear_verb, " ", $what)]
        #[inline(always)]
        pub fn $clear_fn(&self) {
            // SAFETY: `self.base` was validated when the block was created
            unsafe { $crate::internal::register::clear_bits(self.base + $offset, $bit) }
        }
    };
}

// Export macros for use in submodules
pub(crate) use reg_bit_ops;
pub(crate) use reg_rw;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modify_reg_applies_closure() {
        let mut word: u32 = 0x0000_00F0;
        let addr = &mut word as *mut u32 as usize;
        // SAFETY: `addr` points at a live, aligned u32 on the stack
        unsafe { modify_reg(addr, |v| v << 4) };
        assert_eq!(word, 0x0000_0F00);
    }

    #[test]
    fn set_and_clear_bits() {
        let mut word: u32 = 0;
        let addr = &mut word as *mut u32 as usize;
        // SAFETY: `addr` points at a live, aligned u32 on the stack
        unsafe {
            set_bits(addr, 0b1010);
            clear_bits(addr, 0b0010);
        }
        assert_eq!(word, 0b1000);
    }
}
