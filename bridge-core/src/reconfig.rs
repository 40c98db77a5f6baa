//! Safe reconfiguration of one channel.
//!
//! Hardware transfers are always aborted before the UART is touched, and the
//! flow controllers are reset only after the abort succeeded. Completions
//! for the aborted transfers still carry their old tickets, so they are
//! recognised as stale when they arrive.

use crate::bridge::BridgeError;
use crate::channel::{Channel, ChannelHealth};
use crate::line_coding::{LineCoding, UartConfig};
use crate::rx;
use crate::transport::{UartTransport, UsbCdcTransport};

/// Abort every transfer on the channel and return it to `Idle`/`Parked`.
pub(crate) fn abort_channel<T>(ch: &mut Channel<T::Handle>, uart: &mut T) -> Result<(), BridgeError>
where
    T: UartTransport,
{
    uart.abort(ch.handle()).map_err(|error| BridgeError::Abort {
        channel: ch.id(),
        error,
    })?;
    ch.reset_flow();
    Ok(())
}

/// Apply a host line coding to the channel's UART.
///
/// On success the channel is healthy again and, if the device is active,
/// its receive is re-armed. On failure the stored configuration is left
/// unchanged and the channel is left `Idle`/`Parked`.
pub(crate) fn reconfigure<U, T>(
    ch: &mut Channel<T::Handle>,
    usb: &mut U,
    uart: &mut T,
    coding: LineCoding,
    active: bool,
) -> Result<(), BridgeError>
where
    U: UsbCdcTransport,
    T: UartTransport,
{
    abort_channel(ch, uart)?;

    let config = UartConfig::from_line_coding(&coding);
    uart.apply_configuration(ch.handle(), &config)
        .map_err(|error| BridgeError::Configuration {
            channel: ch.id(),
            error,
        })?;
    ch.set_configuration(coding, config);
    ch.set_health(ChannelHealth::Healthy);
    info!(
        "ch{}: {} baud, {} data bits, parity {:?}, stop {:?}",
        ch.id().0,
        config.baud_rate,
        config.data_bits(),
        config.parity,
        config.stop_bits
    );

    if active {
        rx::arm(ch, usb, uart)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelId, RxState, TxState};
    use crate::config::{DEFAULT_LINE_CODING, MAX_TX_CHUNK};
    use crate::line_coding::{Parity, StopBits, WordLength, PARITY_ODD, STOP_BITS_TWO};
    use crate::transport::mock::{MockUart, MockUsb, PortId, UartCall};
    use crate::transport::{ConfigError, Ticket, TransportError};

    const CH: ChannelId = ChannelId(0);
    const PORT: PortId = PortId(1);

    const ODD_7_2: LineCoding = LineCoding {
        bit_rate: 9600,
        stop_bits: STOP_BITS_TWO,
        parity: PARITY_ODD,
        data_bits: 7,
    };

    fn busy_channel() -> Channel<PortId> {
        let mut ch = Channel::new(CH, PORT, DEFAULT_LINE_CODING);
        ch.tx_buf.store(b"pending");
        ch.set_tx(TxState::Transmitting(Ticket(4)));
        ch.set_rx(RxState::Armed(Ticket(5)));
        ch
    }

    #[test]
    fn test_aborts_before_configuring() {
        let mut ch = busy_channel();
        let mut usb: MockUsb<1> = MockUsb::new(16);
        let mut uart = MockUart::default();

        reconfigure(&mut ch, &mut usb, &mut uart, ODD_7_2, false).unwrap();

        let expected = UartConfig {
            baud_rate: 9600,
            stop_bits: StopBits::Two,
            parity: Parity::Odd,
            word_length: WordLength::Eight,
        };
        assert_eq!(
            uart.calls,
            [UartCall::Abort(PORT), UartCall::Configure(PORT, expected)]
        );
        assert_eq!(ch.tx_state(), TxState::Idle);
        assert_eq!(ch.rx_state(), RxState::Parked);
        assert_eq!(ch.staged_tx_len(), 0);
        assert_eq!(ch.line_coding(), ODD_7_2);
        assert_eq!(ch.uart_config(), expected);
    }

    #[test]
    fn test_running_transfers_stopped_before_new_configuration() {
        let mut ch = Channel::new(CH, PORT, DEFAULT_LINE_CODING);
        let mut usb: MockUsb<1> = MockUsb::new(16);
        let mut uart = MockUart::default();
        usb.host_send(CH, b"old framing");
        crate::tx::on_data_available(&mut ch, &mut usb, &mut uart, MAX_TX_CHUNK).unwrap();
        rx::arm(&mut ch, &mut usb, &mut uart).unwrap();
        assert_eq!(uart.running(PORT), 2);

        reconfigure(&mut ch, &mut usb, &mut uart, ODD_7_2, true).unwrap();

        // Only the receive armed under the new configuration is running
        assert_eq!(uart.running(PORT), 1);
        assert_eq!(uart.last_config(PORT), Some(ch.uart_config()));
        assert_eq!(ch.tx_state(), TxState::Idle);
    }

    #[test]
    fn test_active_channel_rearms_receive() {
        let mut ch = busy_channel();
        let mut usb: MockUsb<1> = MockUsb::new(16);
        let mut uart = MockUart::default();

        reconfigure(&mut ch, &mut usb, &mut uart, ODD_7_2, true).unwrap();

        assert!(ch.is_rx_armed());
        assert_eq!(uart.last_receive(PORT).unwrap().1, 1);
        // The new receive never reuses the aborted ticket
        assert_ne!(ch.rx_state(), RxState::Armed(Ticket(5)));
    }

    #[test]
    fn test_rejected_configuration_keeps_old_settings() {
        let mut ch = busy_channel();
        let mut usb: MockUsb<1> = MockUsb::new(16);
        let mut uart = MockUart {
            next_config_error: Some(ConfigError::UnsupportedBaudRate),
            ..MockUart::default()
        };

        let result = reconfigure(&mut ch, &mut usb, &mut uart, ODD_7_2, true);

        assert_eq!(
            result,
            Err(BridgeError::Configuration {
                channel: CH,
                error: ConfigError::UnsupportedBaudRate
            })
        );
        assert_eq!(ch.line_coding(), DEFAULT_LINE_CODING);
        assert_eq!(ch.rx_state(), RxState::Parked);
        assert!(uart.receives(PORT).is_empty());
    }

    #[test]
    fn test_failed_abort_leaves_channel_untouched() {
        let mut ch = busy_channel();
        let mut uart = MockUart {
            next_abort_error: Some(TransportError::Fault),
            ..MockUart::default()
        };

        let result = abort_channel(&mut ch, &mut uart);

        assert_eq!(
            result,
            Err(BridgeError::Abort {
                channel: CH,
                error: TransportError::Fault
            })
        );
        assert!(ch.is_tx_in_flight());
        assert!(ch.is_rx_armed());
    }
}
