//! Tx flow controller: host data from the USB receive FIFO to the UART.
//!
//! `Idle -> Transmitting -> Idle`. A chunk of up to the configured length is
//! read from USB and handed to the UART in one submission. The completion
//! flushes the USB side and immediately re-evaluates, so queued host data is
//! sent back to back. While a transmit is outstanding, further triggers are
//! no-ops; the completion will pick the data up.

use crate::bridge::BridgeError;
use crate::channel::{Channel, TxState};
use crate::transport::{Ticket, TransportError, UartTransport, UsbCdcTransport};

/// "Data available" trigger.
///
/// A chunk refused with [`TransportError::Busy`] stays staged in the
/// channel's buffer and is resubmitted before any new data is read.
pub(crate) fn on_data_available<U, T>(
    ch: &mut Channel<T::Handle>,
    usb: &mut U,
    uart: &mut T,
    chunk_len: usize,
) -> Result<(), BridgeError>
where
    U: UsbCdcTransport,
    T: UartTransport,
{
    if ch.is_tx_in_flight() || ch.is_quarantined() {
        return Ok(());
    }

    let id = ch.id();
    if ch.tx_buf.is_empty() {
        if usb.available(id) == 0 {
            return Ok(());
        }
        let read = ch.tx_buf.fill_with(chunk_len, |buf| usb.read(id, buf));
        if read == 0 {
            return Ok(());
        }
    }

    let ticket = ch.issue_ticket();
    match uart.begin_transmit(ch.handle(), ticket, ch.tx_buf.as_slice()) {
        Ok(()) => {
            trace!("ch{}: transmit {} bytes", id.0, ch.tx_buf.len());
            ch.set_tx(TxState::Transmitting(ticket));
            Ok(())
        }
        Err(TransportError::Busy) => {
            debug!("ch{}: uart busy, {} bytes staged", id.0, ch.tx_buf.len());
            Ok(())
        }
        Err(error) => Err(BridgeError::Submit { channel: id, error }),
    }
}

/// "Hardware transmit complete" trigger.
///
/// Returns `Ok(false)` for a completion that does not belong to the
/// outstanding transmit (its transfer was aborted).
pub(crate) fn on_transmit_complete<U, T>(
    ch: &mut Channel<T::Handle>,
    ticket: Ticket,
    usb: &mut U,
    uart: &mut T,
    chunk_len: usize,
) -> Result<bool, BridgeError>
where
    U: UsbCdcTransport,
    T: UartTransport,
{
    if ch.tx_state() != TxState::Transmitting(ticket) {
        debug!("ch{}: stale transmit completion {}", ch.id().0, ticket.0);
        return Ok(false);
    }

    usb.flush(ch.id());
    ch.tx_buf.clear();
    ch.set_tx(TxState::Idle);
    on_data_available(ch, usb, uart, chunk_len)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::channel::ChannelId;
    use crate::config::DEFAULT_LINE_CODING;
    use crate::transport::mock::{MockUart, MockUsb, PortId};
    use std::vec::Vec;

    const CH: ChannelId = ChannelId(0);
    const PORT: PortId = PortId(7);

    fn setup() -> (Channel<PortId>, MockUsb<1>, MockUart) {
        (
            Channel::new(CH, PORT, DEFAULT_LINE_CODING),
            MockUsb::new(64),
            MockUart::default(),
        )
    }

    #[test]
    fn test_nothing_available_stays_idle() {
        let (mut ch, mut usb, mut uart) = setup();
        on_data_available(&mut ch, &mut usb, &mut uart, 512).unwrap();
        assert_eq!(ch.tx_state(), TxState::Idle);
        assert!(uart.calls.is_empty());
    }

    #[test]
    fn test_data_starts_one_transmit() {
        let (mut ch, mut usb, mut uart) = setup();
        usb.host_send(CH, b"hello");

        on_data_available(&mut ch, &mut usb, &mut uart, 512).unwrap();

        let (ticket, data) = uart.last_transmit(PORT).unwrap();
        assert_eq!(data, b"hello");
        assert_eq!(ch.tx_state(), TxState::Transmitting(ticket));
        assert_eq!(usb.available(CH), 0);
    }

    #[test]
    fn test_trigger_while_transmitting_is_noop() {
        let (mut ch, mut usb, mut uart) = setup();
        usb.host_send(CH, b"first");
        on_data_available(&mut ch, &mut usb, &mut uart, 512).unwrap();
        usb.host_send(CH, b"second");

        on_data_available(&mut ch, &mut usb, &mut uart, 512).unwrap();

        assert_eq!(uart.transmits(PORT).len(), 1);
        assert_eq!(usb.available(CH), 6);
    }

    #[test]
    fn test_completion_flushes_and_sends_next_chunk() {
        let (mut ch, mut usb, mut uart) = setup();
        usb.host_send(CH, b"first");
        on_data_available(&mut ch, &mut usb, &mut uart, 512).unwrap();
        usb.host_send(CH, b"second");
        let (ticket, _) = uart.last_transmit(PORT).unwrap();

        let accepted = on_transmit_complete(&mut ch, ticket, &mut usb, &mut uart, 512).unwrap();

        assert!(accepted);
        assert_eq!(usb.port(CH).flushes, 1);
        let sent: Vec<Vec<u8>> = uart.transmits(PORT).into_iter().map(|(_, d)| d).collect();
        assert_eq!(sent, [b"first".to_vec(), b"second".to_vec()]);
        assert!(ch.is_tx_in_flight());
    }

    #[test]
    fn test_completion_without_more_data_goes_idle() {
        let (mut ch, mut usb, mut uart) = setup();
        usb.host_send(CH, b"x");
        on_data_available(&mut ch, &mut usb, &mut uart, 512).unwrap();
        let (ticket, _) = uart.last_transmit(PORT).unwrap();

        on_transmit_complete(&mut ch, ticket, &mut usb, &mut uart, 512).unwrap();

        assert_eq!(ch.tx_state(), TxState::Idle);
        assert_eq!(ch.staged_tx_len(), 0);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let (mut ch, mut usb, mut uart) = setup();
        usb.host_send(CH, b"abc");
        on_data_available(&mut ch, &mut usb, &mut uart, 512).unwrap();
        let (ticket, _) = uart.last_transmit(PORT).unwrap();

        let accepted =
            on_transmit_complete(&mut ch, ticket.next(), &mut usb, &mut uart, 512).unwrap();

        assert!(!accepted);
        assert_eq!(ch.tx_state(), TxState::Transmitting(ticket));
        assert_eq!(usb.port(CH).flushes, 0);
    }

    #[test]
    fn test_chunk_len_limits_read() {
        let (mut ch, mut usb, mut uart) = setup();
        usb.host_send(CH, &[0xAA; 10]);

        on_data_available(&mut ch, &mut usb, &mut uart, 4).unwrap();

        assert_eq!(uart.last_transmit(PORT).unwrap().1.len(), 4);
        assert_eq!(usb.available(CH), 6);
    }

    #[test]
    fn test_busy_keeps_chunk_staged() {
        let (mut ch, mut usb, mut uart) = setup();
        usb.host_send(CH, b"keep");
        uart.next_transmit_error = Some(TransportError::Busy);

        on_data_available(&mut ch, &mut usb, &mut uart, 512).unwrap();
        assert_eq!(ch.tx_state(), TxState::Idle);
        assert_eq!(ch.staged_tx_len(), 4);

        // More host data must not overtake the staged chunk
        usb.host_send(CH, b"next");
        on_data_available(&mut ch, &mut usb, &mut uart, 512).unwrap();
        assert_eq!(uart.last_transmit(PORT).unwrap().1, b"keep");
        assert_eq!(usb.available(CH), 4);
    }

    #[test]
    fn test_submit_fault_is_reported() {
        let (mut ch, mut usb, mut uart) = setup();
        usb.host_send(CH, b"x");
        uart.next_transmit_error = Some(TransportError::Fault);

        let result = on_data_available(&mut ch, &mut usb, &mut uart, 512);

        assert_eq!(
            result,
            Err(BridgeError::Submit {
                channel: CH,
                error: TransportError::Fault
            })
        );
        assert_eq!(ch.tx_state(), TxState::Idle);
    }
}
