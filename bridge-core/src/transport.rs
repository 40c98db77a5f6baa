//! Transport traits consumed by the bridge, and their error types.
//!
//! Both collaborators are non-blocking: every method either completes at once
//! or starts a hardware operation whose completion is reported later as an
//! event ([`UsbEvent`](crate::UsbEvent), [`UartEvent`](crate::UartEvent)).

use crate::channel::ChannelId;
use crate::line_coding::UartConfig;

/// Identifies one hardware submission on a channel.
///
/// Completion events echo the ticket of the submission they finish, which
/// lets the bridge discard completions of transfers it has already aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ticket(pub u16);

impl Ticket {
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Ticket(self.0.wrapping_add(1))
    }
}

/// Error returned when a UART submission cannot be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The transport cannot take the request right now. Not a fault.
    Busy,
    /// The transport is broken.
    Fault,
}

/// Hardware condition reported while a transfer was active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartFault {
    Framing,
    Parity,
    Overrun,
    Break,
    /// DMA or driver level failure.
    Other,
}

/// Error returned when the hardware refuses a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Baud rate outside what the peripheral clock can produce.
    UnsupportedBaudRate,
    /// Frame format the peripheral cannot produce.
    UnsupportedFrame,
    /// Peripheral did not accept the configuration.
    Rejected,
}

/// USB CDC side of a bridge: per-interface receive and transmit FIFOs.
///
/// Interfaces are addressed by [`ChannelId`]; the implementation owns the
/// FIFOs and moves their contents to and from the USB endpoints.
pub trait UsbCdcTransport {
    /// Bytes received from the host and not yet read.
    fn available(&self, channel: ChannelId) -> usize;

    /// Move up to `buf.len()` received bytes into `buf`, returning the count.
    fn read(&mut self, channel: ChannelId, buf: &mut [u8]) -> usize;

    /// Queue one byte for the host. Returns `false` if the FIFO was full.
    fn write_byte(&mut self, channel: ChannelId, byte: u8) -> bool;

    /// Free space in the transmit FIFO.
    fn write_available(&self, channel: ChannelId) -> usize;

    /// Start sending whatever the transmit FIFO holds.
    fn flush(&mut self, channel: ChannelId);
}

/// UART side of a bridge.
///
/// Each channel is bound to one transport handle. Completions are reported as
/// [`UartEvent`](crate::UartEvent)s carrying the handle and the ticket.
pub trait UartTransport {
    /// Opaque reference to one UART.
    type Handle: Copy + PartialEq;

    /// Start transmitting `data`. The transport copies what it needs.
    fn begin_transmit(
        &mut self,
        handle: Self::Handle,
        ticket: Ticket,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Start receiving exactly one unit of `unit_len` bytes.
    fn begin_receive_unit(
        &mut self,
        handle: Self::Handle,
        ticket: Ticket,
        unit_len: usize,
    ) -> Result<(), TransportError>;

    /// Cancel all transfers on `handle`, synchronously.
    ///
    /// Must succeed when nothing is in flight. When it returns the hardware
    /// has stopped: no byte from an aborted transmit is still queued for the
    /// wire, no byte received before the call is still buffered, and no
    /// completion for an earlier submission may start new work. A completion
    /// already raised may still be delivered and is rejected by its ticket.
    fn abort(&mut self, handle: Self::Handle) -> Result<(), TransportError>;

    /// Apply a frame configuration. Transfers have already been aborted.
    fn apply_configuration(
        &mut self,
        handle: Self::Handle,
        config: &UartConfig,
    ) -> Result<(), ConfigError>;
}
