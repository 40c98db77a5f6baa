//! Rx flow controller: UART bytes into the USB transmit FIFO.
//!
//! The hardware receive is armed for exactly one unit at a time, and only
//! while the USB transmit FIFO has room. A full FIFO parks the channel: the
//! UART stops listening and the wire's own flow control (or the sender's
//! patience) takes over. USB-side progress re-arms it.

use crate::bridge::BridgeError;
use crate::channel::{Channel, RxState};
use crate::transport::{Ticket, TransportError, UartTransport, UsbCdcTransport};

/// Start a one-unit receive if the channel is parked and the host side has
/// space. A [`TransportError::Busy`] refusal leaves it parked.
pub(crate) fn arm<U, T>(
    ch: &mut Channel<T::Handle>,
    usb: &mut U,
    uart: &mut T,
) -> Result<(), BridgeError>
where
    U: UsbCdcTransport,
    T: UartTransport,
{
    if ch.is_rx_armed() || ch.is_quarantined() {
        return Ok(());
    }
    let id = ch.id();
    if usb.write_available(id) == 0 {
        return Ok(());
    }

    let ticket = ch.issue_ticket();
    let unit_len = ch.uart_config().rx_unit_len();
    match uart.begin_receive_unit(ch.handle(), ticket, unit_len) {
        Ok(()) => {
            ch.set_rx(RxState::Armed(ticket));
            Ok(())
        }
        Err(TransportError::Busy) => {
            debug!("ch{}: uart busy, receive stays parked", id.0);
            Ok(())
        }
        Err(error) => Err(BridgeError::Submit { channel: id, error }),
    }
}

/// "Hardware receive complete" trigger.
///
/// Forwards the unit's first byte to the host and re-arms while the FIFO has
/// room. Returns `Ok(false)` for a completion of an aborted receive.
pub(crate) fn on_receive_complete<U, T>(
    ch: &mut Channel<T::Handle>,
    ticket: Ticket,
    unit: [u8; 2],
    usb: &mut U,
    uart: &mut T,
) -> Result<bool, BridgeError>
where
    U: UsbCdcTransport,
    T: UartTransport,
{
    if ch.rx_state() != RxState::Armed(ticket) {
        debug!("ch{}: stale receive completion {}", ch.id().0, ticket.0);
        return Ok(false);
    }

    let id = ch.id();
    let unit_len = ch.uart_config().rx_unit_len();
    ch.rx_buf.store(&unit[..unit_len]);
    ch.set_rx(RxState::Parked);

    if !usb.write_byte(id, unit[0]) {
        // Arming checks for space, so this only happens if something else
        // filled the FIFO in between.
        warn!("ch{}: usb fifo full, byte dropped", id.0);
    }

    if usb.write_available(id) > 0 {
        arm(ch, usb, uart)?;
    } else {
        debug!("ch{}: usb fifo full, receive parked", id.0);
    }
    Ok(true)
}

/// "USB transmit space available" trigger: push out what is queued and
/// resume a parked receive.
pub(crate) fn on_space_available<U, T>(
    ch: &mut Channel<T::Handle>,
    usb: &mut U,
    uart: &mut T,
) -> Result<(), BridgeError>
where
    U: UsbCdcTransport,
    T: UartTransport,
{
    usb.flush(ch.id());
    arm(ch, usb, uart)
}
