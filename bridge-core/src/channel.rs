//! Per-interface channel state and the registry that owns it.
//!
//! A [`Channel`] is one USB-CDC-to-UART bridge instance. It owns its flow
//! controller states, its transfer buffers and the handle of the UART it is
//! bound to. Only the Tx flow controller changes [`TxState`] and only the Rx
//! flow controller changes [`RxState`]; reconfiguration resets both after
//! aborting the hardware.
//!
//! The [`ChannelRegistry`] holds every channel of a device in a fixed array.
//! Event handlers get exclusive `&mut` access to one channel for the duration
//! of a call, so flag updates never interleave.

use heapless::Vec;

use crate::config::{MAX_TX_CHUNK, RX_UNIT_CAPACITY};
use crate::line_coding::{LineCoding, UartConfig};
use crate::transport::Ticket;

/// Logical interface index, `0..N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelId(pub u8);

impl ChannelId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tx flow controller state (USB to UART).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    Idle,
    /// A hardware transmit is outstanding.
    Transmitting(Ticket),
}

/// Rx flow controller state (UART to USB).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// No receive outstanding; the wire is not being listened to.
    Parked,
    /// A one-unit hardware receive is outstanding.
    Armed(Ticket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelHealth {
    Healthy,
    /// Hardware refused a configuration; no transfers until the next
    /// successful reconfiguration.
    Quarantined,
}

/// Modem control lines last reported by the host. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineState {
    pub dtr: bool,
    pub rts: bool,
}

/// Fixed-capacity buffer staging one hardware transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferBuffer<const CAP: usize> {
    data: Vec<u8, CAP>,
}

impl<const CAP: usize> TransferBuffer<CAP> {
    #[must_use]
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        CAP
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Let `fill` write up to `limit` bytes, keeping as many as it reports.
    pub fn fill_with<F>(&mut self, limit: usize, fill: F) -> usize
    where
        F: FnOnce(&mut [u8]) -> usize,
    {
        self.data.clear();
        if self.data.resize_default(limit.min(CAP)).is_err() {
            return 0;
        }
        let filled = fill(self.data.as_mut_slice()).min(self.data.len());
        self.data.truncate(filled);
        filled
    }

    /// Replace the contents with `bytes`, truncated to capacity.
    pub fn store(&mut self, bytes: &[u8]) {
        self.data.clear();
        let len = bytes.len().min(CAP);
        // Cannot fail: length is bounded by capacity
        let _ = self.data.extend_from_slice(&bytes[..len]);
    }
}

/// One bridge instance.
#[derive(Debug)]
pub struct Channel<H> {
    id: ChannelId,
    handle: H,
    tx: TxState,
    rx: RxState,
    health: ChannelHealth,
    line_coding: LineCoding,
    config: UartConfig,
    line_state: LineState,
    next_ticket: Ticket,
    pub(crate) tx_buf: TransferBuffer<MAX_TX_CHUNK>,
    pub(crate) rx_buf: TransferBuffer<RX_UNIT_CAPACITY>,
}

impl<H: Copy + PartialEq> Channel<H> {
    #[must_use]
    pub fn new(id: ChannelId, handle: H, line_coding: LineCoding) -> Self {
        Self {
            id,
            handle,
            tx: TxState::Idle,
            rx: RxState::Parked,
            health: ChannelHealth::Healthy,
            line_coding,
            config: UartConfig::from_line_coding(&line_coding),
            line_state: LineState::default(),
            next_ticket: Ticket(0),
            tx_buf: TransferBuffer::new(),
            rx_buf: TransferBuffer::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> H {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn tx_state(&self) -> TxState {
        self.tx
    }

    #[inline]
    #[must_use]
    pub fn rx_state(&self) -> RxState {
        self.rx
    }

    #[inline]
    #[must_use]
    pub fn is_tx_in_flight(&self) -> bool {
        matches!(self.tx, TxState::Transmitting(_))
    }

    #[inline]
    #[must_use]
    pub fn is_rx_armed(&self) -> bool {
        matches!(self.rx, RxState::Armed(_))
    }

    #[inline]
    #[must_use]
    pub fn health(&self) -> ChannelHealth {
        self.health
    }

    #[inline]
    #[must_use]
    pub fn is_quarantined(&self) -> bool {
        self.health == ChannelHealth::Quarantined
    }

    #[inline]
    #[must_use]
    pub fn line_coding(&self) -> LineCoding {
        self.line_coding
    }

    #[inline]
    #[must_use]
    pub fn uart_config(&self) -> UartConfig {
        self.config
    }

    #[inline]
    #[must_use]
    pub fn line_state(&self) -> LineState {
        self.line_state
    }

    /// Bytes read from USB whose transmit has not been accepted yet.
    #[inline]
    #[must_use]
    pub fn staged_tx_len(&self) -> usize {
        if self.is_tx_in_flight() {
            0
        } else {
            self.tx_buf.len()
        }
    }

    /// Last unit delivered by the hardware.
    #[inline]
    #[must_use]
    pub fn last_rx_unit(&self) -> &[u8] {
        self.rx_buf.as_slice()
    }

    pub(crate) fn issue_ticket(&mut self) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket = ticket.next();
        ticket
    }

    pub(crate) fn set_tx(&mut self, state: TxState) {
        self.tx = state;
    }

    pub(crate) fn set_rx(&mut self, state: RxState) {
        self.rx = state;
    }

    pub(crate) fn set_health(&mut self, health: ChannelHealth) {
        self.health = health;
    }

    pub(crate) fn set_line_state(&mut self, line_state: LineState) {
        self.line_state = line_state;
    }

    pub(crate) fn set_configuration(&mut self, coding: LineCoding, config: UartConfig) {
        self.line_coding = coding;
        self.config = config;
    }

    /// Return both flow controllers to their initial states.
    ///
    /// Only valid after the transport has aborted the channel's transfers.
    pub(crate) fn reset_flow(&mut self) {
        self.tx = TxState::Idle;
        self.rx = RxState::Parked;
        self.tx_buf.clear();
        self.rx_buf.clear();
    }
}

/// Every channel of the device, indexed by [`ChannelId`].
#[derive(Debug)]
pub struct ChannelRegistry<H, const N: usize> {
    channels: [Channel<H>; N],
    active: bool,
}

impl<H: Copy + PartialEq, const N: usize> ChannelRegistry<H, N> {
    /// Bind channel `i` to `handles[i]`.
    #[must_use]
    pub fn new(handles: [H; N], line_coding: LineCoding) -> Self {
        Self {
            channels: core::array::from_fn(|i| {
                Channel::new(ChannelId(i as u8), handles[i], line_coding)
            }),
            active: false,
        }
    }

    /// Whether the USB device is mounted and channels move data.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    #[must_use]
    pub fn get(&self, id: ChannelId) -> Option<&Channel<H>> {
        self.channels.get(id.index())
    }

    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut Channel<H>> {
        self.channels.get_mut(id.index())
    }

    /// Channel bound to a UART handle.
    pub fn find_by_handle(&mut self, handle: H) -> Option<&mut Channel<H>> {
        self.channels.iter_mut().find(|ch| ch.handle == handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel<H>> {
        self.channels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Channel<H>> {
        self.channels.iter_mut()
    }

    /// All interface ids, in order.
    pub fn ids(&self) -> impl Iterator<Item = ChannelId> {
        (0..N).map(|i| ChannelId(i as u8))
    }
}
