//! Error types for the FlexCAN Rx FIFO DMA driver
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Handle creation and peripheral configuration failures
//! - [`DmaError`]: Descriptor and channel programming issues
//! - [`RxError`]: Runtime receive-path rejections
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most driver methods.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and handle creation errors
///
/// These errors occur while binding a handle to its collaborators or while
/// switching the peripheral between DMA and interrupt delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No DMA channel was supplied at handle creation
    MissingDmaChannel,
    /// DMA channel number outside the controller's channel range
    InvalidChannel,
    /// Peripheral did not acknowledge freeze mode in time
    FreezeTimeout,
    /// Shared slot does not hold a handle
    NotInstalled,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::MissingDmaChannel => "missing DMA channel",
            ConfigError::InvalidChannel => "invalid DMA channel",
            ConfigError::FreezeTimeout => "freeze mode acknowledge timed out",
            ConfigError::NotInstalled => "no handle installed",
        }
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// Descriptor and channel programming errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Frame count is zero or exceeds the major loop counter
    InvalidLength,
    /// Destination buffer cannot hold the requested frame count
    BufferTooSmall,
    /// Channel still owns a previously submitted transfer
    ChannelBusy,
    /// Prepared descriptor was not built for this buffer, count and FIFO
    DescriptorMismatch,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DmaError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaError::InvalidLength => "invalid frame count",
            DmaError::BufferTooSmall => "buffer too small for frame count",
            DmaError::ChannelBusy => "DMA channel busy",
            DmaError::DescriptorMismatch => "descriptor does not match request",
        }
    }
}

// =============================================================================
// Receive Errors
// =============================================================================

/// Runtime receive errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxError {
    /// A transfer is already in flight on this handle
    RxFifoBusy,
}

impl core::fmt::Display for RxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RxError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RxError::RxFifoBusy => "Rx FIFO transfer in progress",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match result {
///     Err(Error::Config(ConfigError::MissingDmaChannel)) => { /* ... */ }
///     Err(Error::Dma(DmaError::BufferTooSmall)) => { /* ... */ }
///     Err(Error::Rx(RxError::RxFifoBusy)) => { /* retry later */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// DMA error
    Dma(DmaError),
    /// Receive error
    Rx(RxError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {}", e.as_str()),
            Error::Rx(e) => write!(f, "rx: {}", e.as_str()),
        }
    }
}

// From impls for automatic conversion
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DmaError> for Error {
    fn from(e: DmaError) -> Self {
        Error::Dma(e)
    }
}

impl From<RxError> for Error {
    fn from(e: RxError) -> Self {
        Error::Rx(e)
    }
}

/// Result type alias for driver operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for DMA operations
pub type DmaResult<T> = core::result::Result<T, DmaError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn config_error_as_str_non_empty() {
        let variants = [
            ConfigError::MissingDmaChannel,
            ConfigError::InvalidChannel,
            ConfigError::FreezeTimeout,
            ConfigError::NotInstalled,
        ];

        for variant in variants {
            let s = variant.as_str();
            assert!(!s.is_empty(), "ConfigError::{:?} has empty string", variant);
        }
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::MissingDmaChannel;
        assert_eq!(format!("{}", err), "missing DMA channel");
    }

    #[test]
    fn dma_error_as_str_non_empty() {
        let variants = [
            DmaError::InvalidLength,
            DmaError::BufferTooSmall,
            DmaError::ChannelBusy,
            DmaError::DescriptorMismatch,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "DmaError::{:?} has empty string", variant);
        }
    }

    #[test]
    fn dma_error_display() {
        let err = DmaError::BufferTooSmall;
        assert_eq!(format!("{}", err), "buffer too small for frame count");
    }

    #[test]
    fn rx_error_display() {
        let err = RxError::RxFifoBusy;
        assert_eq!(format!("{}", err), "Rx FIFO transfer in progress");
    }

    #[test]
    fn error_from_config_error() {
        let err: Error = ConfigError::InvalidChannel.into();
        assert_eq!(err, Error::Config(ConfigError::InvalidChannel));
    }

    #[test]
    fn error_from_dma_error() {
        let err: Error = DmaError::ChannelBusy.into();
        assert_eq!(err, Error::Dma(DmaError::ChannelBusy));
    }

    #[test]
    fn error_from_rx_error() {
        let err: Error = RxError::RxFifoBusy.into();
        assert_eq!(err, Error::Rx(RxError::RxFifoBusy));
    }

    #[test]
    fn error_display_prefixes_domain() {
        assert_eq!(
            format!("{}", Error::Config(ConfigError::FreezeTimeout)),
            "config: freeze mode acknowledge timed out"
        );
        assert!(format!("{}", Error::Dma(DmaError::InvalidLength)).starts_with("dma: "));
        assert!(format!("{}", Error::Rx(RxError::RxFifoBusy)).starts_with("rx: "));
    }

    #[test]
    fn question_mark_converts_domain_errors() {
        fn build() -> DmaResult<u32> {
            Err(DmaError::InvalidLength)
        }

        fn start() -> Result<u32> {
            let v = build()?;
            Ok(v)
        }

        assert_eq!(start(), Err(Error::Dma(DmaError::InvalidLength)));
    }
}
