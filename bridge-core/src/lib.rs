//! Platform-agnostic flow-control engine for a USB CDC to N-UART bridge.
//!
//! A composite USB device exposes N CDC-ACM interfaces; each one is paired
//! with a hardware UART. This crate contains everything between the two
//! transports: the per-channel flow controllers, line-coding translation,
//! reconfiguration and the device activity indicator. It has no
//! platform-specific dependencies and runs on host for testing.
//!
//! # Overview
//!
//! - [`transport`]: traits the bridge drives ([`UsbCdcTransport`], [`UartTransport`])
//! - [`events`]: transport events and the observer traits that take them
//! - [`channel`]: per-interface state ([`Channel`], [`ChannelRegistry`])
//! - [`line_coding`]: host line coding to UART frame translation
//! - [`baud`]: fractional baud divisors for PL011-style UARTs
//! - [`bridge`]: the orchestrator ([`CdcUartBridge`])
//! - [`activity`] / [`status`]: device state and the blink patterns it drives
//! - [`config`]: limits and runtime options ([`BridgeConfig`])
//!
//! # Data flow
//!
//! ```text
//! host -> USB rx FIFO --(Tx controller, <= 512 B chunks)--> UART tx
//! host <- USB tx FIFO <--(Rx controller, one unit at a time)-- UART rx
//! ```
//!
//! Each direction has at most one hardware transfer outstanding per channel.
//! Receives are only armed while the USB transmit FIFO has room, so a host
//! that stops reading pauses the UART instead of losing bytes.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt and derive `defmt::Format`
//! - **`log`**: Log through the `log` facade
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This must go first so the logging macros are visible to other modules.
mod fmt;

pub mod activity;
pub mod baud;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod events;
pub mod line_coding;
mod reconfig;
mod rx;
pub mod status;
pub mod transport;
mod tx;

// Re-export main types at crate root
pub use activity::{ActivityMonitor, DeviceActivity};
pub use baud::{fractional_divisor, FractionalDivisor};
pub use bridge::{BridgeError, CdcUartBridge};
pub use channel::{
    Channel, ChannelHealth, ChannelId, ChannelRegistry, LineState, RxState, TransferBuffer,
    TxState,
};
pub use config::{BridgeConfig, FaultPolicy, DEFAULT_LINE_CODING, MAX_TX_CHUNK};
pub use events::{
    UartEvent, UartTransportEvents, UsbDeviceState, UsbEvent, UsbTransportEvents,
};
pub use line_coding::{LineCoding, Parity, StopBits, UartConfig, WordLength};
pub use status::{IndicatorLevel, StatusIndicator};
pub use transport::{ConfigError, Ticket, TransportError, UartFault, UartTransport, UsbCdcTransport};
