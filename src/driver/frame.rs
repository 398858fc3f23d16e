//! Decoding of received FIFO elements
//!
//! The DMA engine copies FIFO elements verbatim. Each element starts with the
//! control/status word and the identifier word, followed by payload words in
//! which byte 0 sits in bits 31:24.
//!
//! | Word   | Legacy FIFO (4 words)             | Enhanced FIFO (20 words)     |
//! |--------|-----------------------------------|------------------------------|
//! | 0      | IDHIT, IDE, RTR, DLC, timestamp   | EDL, BRS, ESI, IDE, RTR, ... |
//! | 1      | identifier                        | identifier                   |
//! | 2..    | 8 payload bytes                   | 64 payload bytes             |
//! | 18     |                                   | IDHIT                        |
//! | 19     |                                   | high resolution timestamp    |
//!
//! With `ERFCR.DMALW` below 19 the enhanced FIFO serves only the leading
//! words of each element; payload bytes and trailer words past that point
//! are not captured.

use core::cmp::min;

use embedded_can::{ExtendedId, Frame, Id, StandardId};

use crate::driver::config::FifoFormat;
use crate::internal::constants::{CLASSIC_MAX_DATA_LEN, FD_MAX_DATA_LEN};
use crate::internal::register::flexcan::{IDHIT_MASK, cs, id};

/// Legacy FIFO: filter hit index stored in the upper CS bits
const LEGACY_IDHIT_SHIFT: u32 = 23;
const LEGACY_IDHIT_MASK: u32 = 0x1FF;

/// Enhanced FIFO trailer word positions
const ENHANCED_IDHIT_WORD: usize = 18;
const ENHANCED_HR_TIMESTAMP_WORD: usize = 19;

/// First payload word of every element
const PAYLOAD_WORD: usize = 2;

/// A CAN frame read out of the receive FIFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxFrame {
    id: Id,
    remote: bool,
    fd: bool,
    bit_rate_switch: bool,
    error_passive: bool,
    dlc: u8,
    data: [u8; FD_MAX_DATA_LEN],
    captured: u8,
    timestamp: u16,
    id_hit: Option<u16>,
    hr_timestamp: Option<u32>,
}

impl RxFrame {
    /// Decode one FIFO element.
    ///
    /// Returns `None` if `element` is shorter than one element of `format`,
    /// or if the format delivers fewer than the two header words.
    pub fn decode(format: FifoFormat, element: &[u32]) -> Option<Self> {
        let words = element.get(..format.element_words())?;
        let (&status, rest) = words.split_first()?;
        let &ident = rest.first()?;

        let id = if status & cs::IDE != 0 {
            Id::Extended(ExtendedId::new(ident & id::EXT_MASK)?)
        } else {
            Id::Standard(StandardId::new(
                ((ident >> id::STD_SHIFT) & id::STD_MASK) as u16,
            )?)
        };

        let (fd, bit_rate_switch, error_passive, id_hit, hr_timestamp, payload) = match format {
            FifoFormat::Standard => (
                false,
                false,
                false,
                Some(((status >> LEGACY_IDHIT_SHIFT) & LEGACY_IDHIT_MASK) as u16),
                None,
                &words[PAYLOAD_WORD..],
            ),
            FifoFormat::Extended { .. } => (
                status & cs::EDL != 0,
                status & cs::BRS != 0,
                status & cs::ESI != 0,
                words
                    .get(ENHANCED_IDHIT_WORD)
                    .map(|w| (w & IDHIT_MASK) as u16),
                words.get(ENHANCED_HR_TIMESTAMP_WORD).copied(),
                &words[PAYLOAD_WORD..min(words.len(), ENHANCED_IDHIT_WORD)],
            ),
        };

        let mut data = [0u8; FD_MAX_DATA_LEN];
        for (chunk, word) in data.chunks_exact_mut(4).zip(payload) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }

        Some(Self {
            id,
            remote: status & cs::RTR != 0,
            fd,
            bit_rate_switch,
            error_passive,
            dlc: ((status & cs::DLC_MASK) >> cs::DLC_SHIFT) as u8,
            data,
            captured: (payload.len() * 4) as u8,
            timestamp: (status & cs::TIMESTAMP_MASK) as u16,
            id_hit,
            hr_timestamp,
        })
    }

    /// Payload length in bytes, decoded from the DLC
    pub fn len(&self) -> usize {
        dlc_to_len(self.dlc, self.fd)
    }

    /// `true` if the frame carries no payload
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if the DMA word count cut off part of the payload
    pub fn is_truncated(&self) -> bool {
        !self.remote && self.len() > usize::from(self.captured)
    }

    /// `true` if the frame was received in CAN FD format
    pub fn is_fd(&self) -> bool {
        self.fd
    }

    /// `true` if the data phase used the switched bit rate
    pub fn bit_rate_switching(&self) -> bool {
        self.bit_rate_switch
    }

    /// `true` if the transmitter reported itself error passive
    pub fn is_transmitter_error_passive(&self) -> bool {
        self.error_passive
    }

    /// Free running timer value captured when the frame was received
    pub fn timestamp(&self) -> u16 {
        self.timestamp
    }

    /// Index of the acceptance filter that matched this frame.
    ///
    /// `None` when the enhanced FIFO DMA word count stops before the ID hit
    /// word.
    pub fn id_hit(&self) -> Option<u16> {
        self.id_hit
    }

    /// High resolution timestamp (enhanced FIFO with all 20 words only)
    pub fn hr_timestamp(&self) -> Option<u32> {
        self.hr_timestamp
    }
}

impl Frame for RxFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > CLASSIC_MAX_DATA_LEN {
            return None;
        }
        let mut buf = [0u8; FD_MAX_DATA_LEN];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            remote: false,
            fd: false,
            bit_rate_switch: false,
            error_passive: false,
            dlc: data.len() as u8,
            data: buf,
            captured: data.len() as u8,
            timestamp: 0,
            id_hit: None,
            hr_timestamp: None,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > CLASSIC_MAX_DATA_LEN {
            return None;
        }
        Some(Self {
            id: id.into(),
            remote: true,
            fd: false,
            bit_rate_switch: false,
            error_passive: false,
            dlc: dlc as u8,
            data: [0; FD_MAX_DATA_LEN],
            captured: 0,
            timestamp: 0,
            id_hit: None,
            hr_timestamp: None,
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc.into()
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..min(self.len(), usize::from(self.captured))]
        }
    }
}

/// Iterator over the frames of a completed transfer
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    format: FifoFormat,
    words: &'a [u32],
    remaining: usize,
}

impl<'a> Frames<'a> {
    /// Iterate over `count` elements of `format` stored in `words`
    pub fn new(format: FifoFormat, words: &'a [u32], count: usize) -> Self {
        Self {
            format,
            words,
            remaining: min(count, words.len() / format.element_words().max(1)),
        }
    }
}

impl Iterator for Frames<'_> {
    type Item = RxFrame;

    fn next(&mut self) -> Option<RxFrame> {
        if self.remaining == 0 {
            return None;
        }
        let (element, rest) = self.words.split_at(self.format.element_words());
        self.words = rest;
        self.remaining -= 1;
        RxFrame::decode(self.format, element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Frames<'_> {}

/// Payload length for a data length code
fn dlc_to_len(dlc: u8, fd: bool) -> usize {
    match (dlc, fd) {
        (0..=8, _) => dlc as usize,
        (_, false) => CLASSIC_MAX_DATA_LEN,
        (9, true) => 12,
        (10, true) => 16,
        (11, true) => 20,
        (12, true) => 24,
        (13, true) => 32,
        (14, true) => 48,
        (_, true) => 64,
    }
}
