//! ISR-safe receive handle wrapper using critical sections.
//!
//! [`SharedRxFifoDma`] lets thread code start and abort transfers while the
//! DMA interrupt handler drives completion on the same handle. Every state
//! transition happens with interrupts disabled.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::driver::config::RxState;
use crate::driver::error::{ConfigError, ConfigResult};
use crate::driver::handle::RxFifoDma;
use crate::driver::transfer::{StartError, TransferStatus};
use crate::hal::dma::DmaChannel;
use crate::hal::flexcan::RxFifoPeripheral;

/// ISR-safe slot holding one [`RxFifoDma`].
///
/// Starts empty so it can live in a `static`; put the handle in with
/// [`install`](Self::install) once its collaborators exist.
///
/// # Example
///
/// ```ignore
/// static CAN1_RX: SharedRxFifoDma<Can1, Ch0, ()> = SharedRxFifoDma::new();
///
/// CAN1_RX.install(RxFifoDma::new(can1, Some(on_frames), (), Some(ch0))?);
/// CAN1_RX.start_receive(buffer, 4)?;
///
/// #[interrupt]
/// fn DMA0_DMA16() {
///     CAN1_RX.on_interrupt();
/// }
/// ```
///
/// The completion callback runs inside the critical section and receives the
/// handle directly; it must not go through the slot again.
///
/// The slot is only `Sync` when the handle is `Send`:
///
/// ```compile_fail
/// use std::rc::Rc;
/// use flexcan_rxfifo_dma::{
///     ChannelEvent, DmaChannel, DmaResult, FifoFormat, Result, RxFifoPeripheral,
///     SharedRxFifoDma, TransferDescriptor,
/// };
///
/// struct Can;
///
/// impl RxFifoPeripheral for Can {
///     fn fifo_address(&self) -> u32 { 0x401D_0080 }
///     fn fifo_format(&self) -> FifoFormat { FifoFormat::Standard }
///     fn set_rx_fifo_dma(&mut self, _enable: bool) -> Result<()> { Ok(()) }
/// }
///
/// struct Channel;
///
/// impl DmaChannel for Channel {
///     fn channel(&self) -> usize { 0 }
///     fn submit(&mut self, _descriptor: &TransferDescriptor) -> DmaResult<()> { Ok(()) }
///     unsafe fn start(&mut self) {}
///     fn stop(&mut self) {}
///     fn set_interrupt_on_completion(&mut self, _enable: bool) {}
///     fn take_event(&mut self) -> Option<ChannelEvent> { None }
/// }
///
/// static SLOT: SharedRxFifoDma<Can, Channel, Rc<u32>> = SharedRxFifoDma::new();
/// ```
pub struct SharedRxFifoDma<P, C, U>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    inner: Mutex<RefCell<Option<RxFifoDma<P, C, U>>>>,
}

impl<P, C, U> SharedRxFifoDma<P, C, U>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    /// Create an empty slot (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Run `f` on the slot itself inside a critical section.
    ///
    /// # Panics
    ///
    /// Panics if called again from inside `f`.
    pub(super) fn with_slot<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut Option<RxFifoDma<P, C, U>>) -> R,
    {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Put a handle in the slot, returning the one it replaces.
    pub fn install(&self, handle: RxFifoDma<P, C, U>) -> Option<RxFifoDma<P, C, U>> {
        self.with_slot(|slot| slot.replace(handle))
    }

    /// Remove the handle from the slot.
    pub fn take(&self) -> Option<RxFifoDma<P, C, U>> {
        self.with_slot(Option::take)
    }

    /// `true` if a handle is installed
    pub fn is_installed(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).is_some())
    }

    /// Execute a closure with exclusive access to the handle.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> ConfigResult<R>
    where
        F: FnOnce(&mut RxFifoDma<P, C, U>) -> R,
    {
        self.with_slot(|slot| slot.as_mut().map(f)).ok_or(ConfigError::NotInstalled)
    }

    /// Try to execute a closure, returning `None` if the slot is empty or
    /// already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut RxFifoDma<P, C, U>) -> R,
    {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow(cs).try_borrow_mut().ok()?;
            slot.as_mut().map(f)
        })
    }

    /// [`RxFifoDma::start_receive`] under a critical section.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotInstalled`] if the slot is empty, otherwise as
    /// `start_receive`. The buffer is always handed back on error.
    pub fn start_receive(
        &self,
        buffer: &'static mut [u32],
        frame_count: usize,
    ) -> Result<(), StartError> {
        self.with_slot(|slot| match slot.as_mut() {
            Some(rx) => rx.start_receive(buffer, frame_count),
            None => Err(StartError {
                error: ConfigError::NotInstalled.into(),
                buffer,
            }),
        })
    }

    /// [`RxFifoDma::abort_receive`] under a critical section.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotInstalled`] if the slot is empty.
    pub fn abort_receive(&self) -> ConfigResult<Option<&'static mut [u32]>> {
        self.with(RxFifoDma::abort_receive)
    }

    /// [`RxFifoDma::on_interrupt`] under a critical section.
    ///
    /// Returns `None` when the slot is empty, so an early interrupt before
    /// installation is harmless.
    pub fn on_interrupt(&self) -> Option<TransferStatus> {
        self.with(RxFifoDma::on_interrupt).ok().flatten()
    }

    /// State of the installed handle
    pub fn state(&self) -> ConfigResult<RxState> {
        critical_section::with(|cs| self.inner.borrow_ref(cs).as_ref().map(RxFifoDma::state))
            .ok_or(ConfigError::NotInstalled)
    }
}

impl<P, C, U> Default for SharedRxFifoDma<P, C, U>
where
    P: RxFifoPeripheral,
    C: DmaChannel,
{
    fn default() -> Self {
        Self::new()
    }
}
