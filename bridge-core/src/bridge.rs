//! CdcUartBridge: connects N USB CDC interfaces to N UARTs.

use crate::activity::{ActivityMonitor, DeviceActivity};
use crate::channel::{
    Channel, ChannelHealth, ChannelId, ChannelRegistry, LineState, RxState, TxState,
};
use crate::config::{BridgeConfig, FaultPolicy};
use crate::events::{UartEvent, UartTransportEvents, UsbEvent, UsbTransportEvents};
use crate::line_coding::LineCoding;
use crate::reconfig;
use crate::rx;
use crate::transport::{
    ConfigError, Ticket, TransportError, UartFault, UartTransport, UsbCdcTransport,
};
use crate::tx;

/// A bridge that moves bytes between USB CDC interfaces and UARTs.
///
/// Channel `i` pairs CDC interface `i` with the UART behind `handles[i]`.
/// The bridge is driven entirely by calls: transport events through
/// [`UsbTransportEvents`] and [`UartTransportEvents`], plus a periodic
/// [`poll`](Self::poll). Every call runs to completion without blocking, so
/// the caller must deliver events and polls from one context.
///
/// # Error Handling
///
/// Hardware faults are handled according to
/// [`BridgeConfig::fault_policy`]. Under [`FaultPolicy::Halt`] every fault is
/// returned to the caller; under [`FaultPolicy::Isolate`] the affected channel
/// is reset or quarantined and the call succeeds.
pub struct CdcUartBridge<'a, U, T: UartTransport, const N: usize> {
    usb: U,
    uart: T,
    channels: ChannelRegistry<T::Handle, N>,
    activity: &'a ActivityMonitor,
    config: BridgeConfig,
}

impl<'a, U, T, const N: usize> CdcUartBridge<'a, U, T, N>
where
    U: UsbCdcTransport,
    T: UartTransport,
{
    /// Create a bridge. Channels stay inactive until the device is mounted.
    pub fn new(
        usb: U,
        uart: T,
        handles: [T::Handle; N],
        activity: &'a ActivityMonitor,
        config: BridgeConfig,
    ) -> Self {
        Self {
            usb,
            uart,
            channels: ChannelRegistry::new(handles, config.default_line_coding),
            activity,
            config,
        }
    }

    /// Service every channel: flush the USB transmit side, resume parked
    /// receives and start pending transmits.
    ///
    /// Call periodically while the device is mounted.
    pub fn poll(&mut self) -> Result<(), BridgeError> {
        if !self.channels.is_active() {
            return Ok(());
        }
        for index in 0..N {
            let id = ChannelId(index as u8);
            let result = self.service(id);
            self.contain(id, result)?;
        }
        Ok(())
    }

    /// Whether the device is mounted and channels move data.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.channels.is_active()
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel<T::Handle>> {
        self.channels.get(id)
    }

    pub fn channels(&self) -> &ChannelRegistry<T::Handle, N> {
        &self.channels
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn usb(&self) -> &U {
        &self.usb
    }

    pub fn usb_mut(&mut self) -> &mut U {
        &mut self.usb
    }

    pub fn uart(&self) -> &T {
        &self.uart
    }

    pub fn uart_mut(&mut self) -> &mut T {
        &mut self.uart
    }

    /// Decompose the bridge into its USB and UART transports.
    pub fn into_parts(self) -> (U, T) {
        (self.usb, self.uart)
    }

    fn service(&mut self, id: ChannelId) -> Result<(), BridgeError> {
        let chunk_len = self.config.effective_chunk_len();
        let Self {
            usb,
            uart,
            channels,
            ..
        } = self;
        let ch = channels.get_mut(id).ok_or(BridgeError::UnknownChannel(id))?;
        rx::on_space_available(ch, usb, uart)?;
        tx::on_data_available(ch, usb, uart, chunk_len)
    }

    fn mount(&mut self) -> Result<(), BridgeError> {
        info!("usb mounted");
        self.channels.set_active(true);
        self.activity.set(DeviceActivity::Mounted);
        let coding = self.config.default_line_coding;
        for index in 0..N {
            let id = ChannelId(index as u8);
            let result = self.reconfigure(id, coding);
            self.contain(id, result)?;
        }
        Ok(())
    }

    fn unmount(&mut self) -> Result<(), BridgeError> {
        info!("usb unmounted");
        self.channels.set_active(false);
        self.activity.set(DeviceActivity::NotMounted);
        for index in 0..N {
            let id = ChannelId(index as u8);
            let result = match self.channels.get_mut(id) {
                Some(ch) => reconfig::abort_channel(ch, &mut self.uart),
                None => Err(BridgeError::UnknownChannel(id)),
            };
            self.contain(id, result)?;
        }
        Ok(())
    }

    fn reconfigure(&mut self, id: ChannelId, coding: LineCoding) -> Result<(), BridgeError> {
        let active = self.channels.is_active();
        let Self {
            usb,
            uart,
            channels,
            ..
        } = self;
        let ch = channels.get_mut(id).ok_or(BridgeError::UnknownChannel(id))?;
        reconfig::reconfigure(ch, usb, uart, coding, active)
    }

    fn on_transmit_complete(
        &mut self,
        handle: T::Handle,
        ticket: Ticket,
    ) -> Result<(), BridgeError> {
        let chunk_len = self.config.effective_chunk_len();
        let ch = self
            .channels
            .find_by_handle(handle)
            .ok_or(BridgeError::UnknownHandle)?;
        let id = ch.id();
        let result = tx::on_transmit_complete(ch, ticket, &mut self.usb, &mut self.uart, chunk_len);
        if let Ok(true) = result {
            self.activity.record_transfer();
        }
        self.contain(id, result.map(|_| ()))
    }

    fn on_receive_complete(
        &mut self,
        handle: T::Handle,
        ticket: Ticket,
        unit: [u8; 2],
    ) -> Result<(), BridgeError> {
        let ch = self
            .channels
            .find_by_handle(handle)
            .ok_or(BridgeError::UnknownHandle)?;
        let id = ch.id();
        let result = rx::on_receive_complete(ch, ticket, unit, &mut self.usb, &mut self.uart);
        if let Ok(true) = result {
            self.activity.record_transfer();
        }
        self.contain(id, result.map(|_| ()))
    }

    fn on_transport_error(
        &mut self,
        handle: T::Handle,
        ticket: Ticket,
        fault: UartFault,
    ) -> Result<(), BridgeError> {
        let ch = self
            .channels
            .find_by_handle(handle)
            .ok_or(BridgeError::UnknownHandle)?;
        let id = ch.id();
        let outstanding = ch.tx_state() == TxState::Transmitting(ticket)
            || ch.rx_state() == RxState::Armed(ticket);
        if !outstanding {
            debug!("ch{}: stale transport error {:?}", id.0, fault);
            return Ok(());
        }
        self.contain(id, Err(BridgeError::Transport { channel: id, fault }))
    }

    /// Apply the fault policy to a channel operation's result.
    fn contain(&mut self, id: ChannelId, result: Result<(), BridgeError>) -> Result<(), BridgeError> {
        let Err(error) = result else {
            return Ok(());
        };
        match self.config.fault_policy {
            FaultPolicy::Halt => {
                error!("ch{}: {:?}", id.0, error);
                Err(error)
            }
            FaultPolicy::Isolate => {
                if error.channel().is_none() {
                    return Err(error);
                }
                self.isolate(id, error);
                Ok(())
            }
        }
    }

    fn isolate(&mut self, id: ChannelId, error: BridgeError) {
        let Some(ch) = self.channels.get_mut(id) else {
            return;
        };
        let aborted = self.uart.abort(ch.handle()).is_ok();
        ch.reset_flow();
        let quarantine = !aborted
            || matches!(
                error,
                BridgeError::Configuration { .. } | BridgeError::Abort { .. }
            );
        if quarantine {
            ch.set_health(ChannelHealth::Quarantined);
            warn!("ch{}: quarantined after {:?}", id.0, error);
        } else {
            warn!("ch{}: reset after {:?}", id.0, error);
        }
    }
}

impl<U, T, const N: usize> UsbTransportEvents for CdcUartBridge<'_, U, T, N>
where
    U: UsbCdcTransport,
    T: UartTransport,
{
    fn on_usb_event(&mut self, event: UsbEvent) -> Result<(), BridgeError> {
        match event {
            UsbEvent::Mounted => self.mount(),
            UsbEvent::Unmounted => self.unmount(),
            UsbEvent::Suspended => {
                info!("usb suspended");
                self.activity.set(DeviceActivity::Suspended);
                Ok(())
            }
            UsbEvent::Resumed => {
                info!("usb resumed");
                self.activity.set(if self.channels.is_active() {
                    DeviceActivity::Mounted
                } else {
                    DeviceActivity::NotMounted
                });
                Ok(())
            }
            UsbEvent::LineStateChanged {
                channel,
                line_state,
            } => self.set_line_state(channel, line_state),
            UsbEvent::LineCodingChanged { channel, coding } => {
                let result = self.reconfigure(channel, coding);
                self.contain(channel, result)
            }
            UsbEvent::RxAvailable(channel) => {
                if !self.channels.is_active() {
                    return Ok(());
                }
                let chunk_len = self.config.effective_chunk_len();
                let ch = self
                    .channels
                    .get_mut(channel)
                    .ok_or(BridgeError::UnknownChannel(channel))?;
                let result = tx::on_data_available(ch, &mut self.usb, &mut self.uart, chunk_len);
                self.contain(channel, result)
            }
            UsbEvent::TxComplete(channel) => {
                if !self.channels.is_active() {
                    return Ok(());
                }
                let ch = self
                    .channels
                    .get_mut(channel)
                    .ok_or(BridgeError::UnknownChannel(channel))?;
                let result = rx::on_space_available(ch, &mut self.usb, &mut self.uart);
                self.contain(channel, result)
            }
        }
    }
}

impl<U, T, const N: usize> CdcUartBridge<'_, U, T, N>
where
    U: UsbCdcTransport,
    T: UartTransport,
{
    fn set_line_state(&mut self, id: ChannelId, line_state: LineState) -> Result<(), BridgeError> {
        let ch = self
            .channels
            .get_mut(id)
            .ok_or(BridgeError::UnknownChannel(id))?;
        info!("ch{}: dtr={} rts={}", id.0, line_state.dtr, line_state.rts);
        ch.set_line_state(line_state);
        Ok(())
    }
}

impl<U, T, const N: usize> UartTransportEvents<T::Handle> for CdcUartBridge<'_, U, T, N>
where
    U: UsbCdcTransport,
    T: UartTransport,
{
    fn on_uart_event(&mut self, event: UartEvent<T::Handle>) -> Result<(), BridgeError> {
        match event {
            UartEvent::TransmitComplete { handle, ticket } => {
                self.on_transmit_complete(handle, ticket)
            }
            UartEvent::ReceiveComplete {
                handle,
                ticket,
                unit,
            } => self.on_receive_complete(handle, ticket, unit),
            UartEvent::TransportError {
                handle,
                ticket,
                fault,
            } => self.on_transport_error(handle, ticket, fault),
        }
    }
}

/// Error type for bridge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    /// The UART could not abort the channel's transfers.
    Abort {
        channel: ChannelId,
        error: TransportError,
    },
    /// The UART refused a configuration.
    Configuration {
        channel: ChannelId,
        error: ConfigError,
    },
    /// A transfer could not be started.
    Submit {
        channel: ChannelId,
        error: TransportError,
    },
    /// The hardware reported an error on an outstanding transfer.
    Transport { channel: ChannelId, fault: UartFault },
    /// An event named an interface the bridge does not have.
    UnknownChannel(ChannelId),
    /// A UART event named a handle no channel is bound to.
    UnknownHandle,
}

impl BridgeError {
    /// The channel the error belongs to, if any.
    pub fn channel(&self) -> Option<ChannelId> {
        match *self {
            BridgeError::Abort { channel, .. }
            | BridgeError::Configuration { channel, .. }
            | BridgeError::Submit { channel, .. }
            | BridgeError::Transport { channel, .. } => Some(channel),
            BridgeError::UnknownChannel(_) | BridgeError::UnknownHandle => None,
        }
    }
}
