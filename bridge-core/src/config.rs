//! Compile-time limits and runtime bridge configuration.

use crate::line_coding::{LineCoding, PARITY_NONE, STOP_BITS_ONE};

/// Largest chunk a single hardware transmit can carry.
///
/// This bounds the per-channel transmit [`TransferBuffer`](crate::TransferBuffer);
/// the chunk size actually used is [`BridgeConfig::tx_chunk_len`].
pub const MAX_TX_CHUNK: usize = 512;

/// Storage reserved for one receive unit (two bytes cover a 9-bit frame).
pub const RX_UNIT_CAPACITY: usize = 2;

/// Line coding applied at start-up and after every mount.
pub const DEFAULT_LINE_CODING: LineCoding = LineCoding {
    bit_rate: 115_200,
    stop_bits: STOP_BITS_ONE,
    parity: PARITY_NONE,
    data_bits: 8,
};

/// What the bridge does when hardware reports a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultPolicy {
    /// Report every fault to the caller, which is expected to halt.
    #[default]
    Halt,
    /// Contain the fault to the affected channel and keep the others running.
    ///
    /// Transport faults reset the channel, which resumes on the next poll.
    /// Configuration faults quarantine the channel until it is successfully
    /// reconfigured.
    Isolate,
}

/// Runtime configuration for a [`CdcUartBridge`](crate::CdcUartBridge).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    /// Bytes pulled from the USB receive buffer per hardware transmit.
    /// Clamped to `1..=MAX_TX_CHUNK`.
    pub tx_chunk_len: usize,
    pub fault_policy: FaultPolicy,
    /// Line coding restored on every mount.
    pub default_line_coding: LineCoding,
}

impl BridgeConfig {
    /// Configuration with the maximum chunk size and fail-fast fault handling.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tx_chunk_len: MAX_TX_CHUNK,
            fault_policy: FaultPolicy::Halt,
            default_line_coding: DEFAULT_LINE_CODING,
        }
    }

    #[must_use]
    pub const fn with_tx_chunk_len(mut self, len: usize) -> Self {
        self.tx_chunk_len = len;
        self
    }

    #[must_use]
    pub const fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_default_line_coding(mut self, coding: LineCoding) -> Self {
        self.default_line_coding = coding;
        self
    }

    /// Chunk length actually used for transmits.
    #[inline]
    #[must_use]
    pub fn effective_chunk_len(&self) -> usize {
        self.tx_chunk_len.clamp(1, MAX_TX_CHUNK)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
