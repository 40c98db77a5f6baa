//! Events raised by the two transports and the observer traits that take them.

use crate::bridge::BridgeError;
use crate::channel::{ChannelId, LineState};
use crate::line_coding::LineCoding;
use crate::transport::{Ticket, UartFault};

use heapless::Vec;

/// Events from the USB CDC collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbEvent {
    /// The host configured the device.
    Mounted,
    /// The device was detached or deconfigured.
    Unmounted,
    Suspended,
    Resumed,
    /// Host changed DTR/RTS on an interface.
    LineStateChanged {
        channel: ChannelId,
        line_state: LineState,
    },
    /// Host requested new serial parameters on an interface.
    LineCodingChanged {
        channel: ChannelId,
        coding: LineCoding,
    },
    /// Host data arrived in an interface's receive FIFO.
    RxAvailable(ChannelId),
    /// An IN packet was delivered; transmit FIFO space was freed.
    TxComplete(ChannelId),
}

/// Latest USB device state reported by the stack.
///
/// A transport that can only latch the newest state (instead of queueing
/// every callback) replays it into the bridge with [`events_to`], so a
/// mount or unmount is never lost.
///
/// [`events_to`]: UsbDeviceState::events_to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsbDeviceState {
    pub configured: bool,
    pub suspended: bool,
}

impl UsbDeviceState {
    /// Not configured, not suspended.
    pub const DETACHED: Self = Self {
        configured: false,
        suspended: false,
    };

    /// Events that take the bridge from `self` to `next`, in order.
    ///
    /// A mount change comes first. A suspended device is reported suspended
    /// again after it, since mounting or unmounting resets the activity.
    #[must_use]
    pub fn events_to(self, next: Self) -> Vec<UsbEvent, 2> {
        let mut events = Vec::new();
        let remounted = self.configured != next.configured;
        if remounted {
            let _ = events.push(if next.configured {
                UsbEvent::Mounted
            } else {
                UsbEvent::Unmounted
            });
        }
        if next.suspended && (remounted || !self.suspended) {
            let _ = events.push(UsbEvent::Suspended);
        } else if !next.suspended && self.suspended {
            let _ = events.push(UsbEvent::Resumed);
        }
        events
    }
}

/// Events from the UART collaborator, addressed by transport handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartEvent<H> {
    TransmitComplete {
        handle: H,
        ticket: Ticket,
    },
    /// One unit arrived. Only `unit[0]` carries data.
    ReceiveComplete {
        handle: H,
        ticket: Ticket,
        unit: [u8; 2],
    },
    TransportError {
        handle: H,
        ticket: Ticket,
        fault: UartFault,
    },
}

impl<H: Copy> UartEvent<H> {
    #[inline]
    #[must_use]
    pub fn handle(&self) -> H {
        match *self {
            UartEvent::TransmitComplete { handle, .. }
            | UartEvent::ReceiveComplete { handle, .. }
            | UartEvent::TransportError { handle, .. } => handle,
        }
    }
}

/// Observer for USB-side events.
pub trait UsbTransportEvents {
    fn on_usb_event(&mut self, event: UsbEvent) -> Result<(), BridgeError>;
}

/// Observer for UART-side events.
pub trait UartTransportEvents<H> {
    fn on_uart_event(&mut self, event: UartEvent<H>) -> Result<(), BridgeError>;
}
