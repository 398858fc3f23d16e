//! Transfer descriptor construction.
//!
//! Turns "receive N frames into this buffer" into the addresses, widths and
//! loop counts a DMA channel needs. The FIFO output window is read over and
//! over at the same address while the destination walks through the buffer,
//! one FIFO element per minor loop.

use crate::driver::config::{AddressMode, TransferSize};
use crate::driver::error::{DmaError, DmaResult};
use crate::hal::flexcan::RxFifoPeripheral;
use crate::internal::constants::MAX_MAJOR_LOOP_COUNT;

/// Destination and size of one receive request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxRequest {
    /// Bus address of the first destination byte
    pub destination: u32,
    /// How many FIFO elements the destination can hold
    pub capacity_frames: usize,
    /// How many FIFO elements to move
    pub frame_count: usize,
}

impl RxRequest {
    /// Build a request for a word buffer.
    ///
    /// The capacity is derived from the buffer length for elements of
    /// `element_words` words each.
    pub fn for_buffer(buffer: &[u32], element_words: usize, frame_count: usize) -> Self {
        Self {
            destination: buffer.as_ptr() as u32,
            capacity_frames: buffer.len() / element_words.max(1),
            frame_count,
        }
    }
}

/// DMA transfer configuration for draining the Rx FIFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferDescriptor {
    /// FIFO output window address
    pub source_address: u32,
    /// Destination buffer address
    pub destination_address: u32,
    /// Width of each FIFO read
    pub source_width: TransferSize,
    /// Width of each buffer write
    pub destination_width: TransferSize,
    /// Bytes moved per DMA request (minor loop)
    pub element_bytes: u32,
    /// Number of DMA requests to serve (major loop)
    pub element_count: u16,
    /// Source address progression
    pub source_mode: AddressMode,
    /// Destination address progression
    pub destination_mode: AddressMode,
}

impl TransferDescriptor {
    /// Total bytes written to the destination when the transfer completes
    #[must_use]
    pub const fn total_bytes(&self) -> u32 {
        self.element_bytes * self.element_count as u32
    }

    /// Signed source offset applied after each read (eDMA `SOFF`)
    #[must_use]
    pub const fn source_offset(&self) -> i16 {
        match self.source_mode {
            AddressMode::Fixed => 0,
            AddressMode::Increment => self.source_width.bytes() as i16,
        }
    }

    /// Signed destination offset applied after each write (eDMA `DOFF`)
    #[must_use]
    pub const fn destination_offset(&self) -> i16 {
        match self.destination_mode {
            AddressMode::Fixed => 0,
            AddressMode::Increment => self.destination_width.bytes() as i16,
        }
    }
}

/// Build the DMA descriptor for `request` on `peripheral`'s receive FIFO.
///
/// Only reads the peripheral's FIFO address and format.
///
/// # Errors
///
/// - [`DmaError::InvalidLength`] if the frame count is zero or larger than
///   the channel's major loop counter
/// - [`DmaError::BufferTooSmall`] if the destination cannot hold the frames
pub fn build_descriptor<P>(peripheral: &P, request: &RxRequest) -> DmaResult<TransferDescriptor>
where
    P: RxFifoPeripheral + ?Sized,
{
    if request.frame_count == 0 || request.frame_count > MAX_MAJOR_LOOP_COUNT {
        return Err(DmaError::InvalidLength);
    }
    if request.capacity_frames < request.frame_count {
        return Err(DmaError::BufferTooSmall);
    }

    let format = peripheral.fifo_format();

    Ok(TransferDescriptor {
        source_address: peripheral.fifo_address(),
        destination_address: request.destination,
        source_width: format.source_width(),
        destination_width: TransferSize::Bytes4,
        element_bytes: format.element_size() as u32,
        // Bounded by MAX_MAJOR_LOOP_COUNT above
        element_count: request.frame_count as u16,
        source_mode: AddressMode::Fixed,
        destination_mode: AddressMode::Increment,
    })
}
