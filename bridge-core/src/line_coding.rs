//! Translation from CDC line coding to UART frame configuration.
//!
//! The host describes a serial port with the raw CDC `SET_LINE_CODING`
//! fields. [`UartConfig::from_line_coding`] maps them onto the frame formats a
//! UART can actually produce, falling back to sane defaults for codes it does
//! not support instead of rejecting them:
//!
//! | Field     | Code      | Result                                           |
//! |-----------|-----------|--------------------------------------------------|
//! | stop bits | 0         | one stop bit                                     |
//! | stop bits | 2         | two stop bits                                    |
//! | stop bits | other     | one stop bit                                     |
//! | parity    | 0 / 1 / 2 | none / odd / even                                |
//! | parity    | other     | none                                             |
//! | data bits | 7         | 8-bit frame (7 data + parity)                    |
//! | data bits | 8         | 8-bit frame without parity, 9-bit frame with it  |
//! | data bits | other     | 8-bit frame                                      |
//!
//! Word length counts the parity bit, as on UARTs that insert parity in the
//! most significant data position.

/// CDC stop-bit code for one stop bit.
pub const STOP_BITS_ONE: u8 = 0;
/// CDC stop-bit code for one and a half stop bits.
pub const STOP_BITS_ONE_AND_HALF: u8 = 1;
/// CDC stop-bit code for two stop bits.
pub const STOP_BITS_TWO: u8 = 2;

pub const PARITY_NONE: u8 = 0;
pub const PARITY_ODD: u8 = 1;
pub const PARITY_EVEN: u8 = 2;
pub const PARITY_MARK: u8 = 3;
pub const PARITY_SPACE: u8 = 4;

/// Serial parameters requested by the host, as raw CDC codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineCoding {
    /// Bit rate in bits per second.
    pub bit_rate: u32,
    pub stop_bits: u8,
    pub parity: u8,
    pub data_bits: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Frame word length, parity bit included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WordLength {
    Eight,
    Nine,
}

/// Hardware UART configuration produced from a [`LineCoding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    pub baud_rate: u32,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub word_length: WordLength,
}

impl StopBits {
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            STOP_BITS_TWO => StopBits::Two,
            _ => StopBits::One,
        }
    }
}

impl Parity {
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            PARITY_ODD => Parity::Odd,
            PARITY_EVEN => Parity::Even,
            _ => Parity::None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Parity::None)
    }
}

impl WordLength {
    /// Pick the frame length for a data-bit code under the given parity.
    ///
    /// 7 data bits only make sense with parity enabled; the host is trusted to
    /// have requested one.
    #[must_use]
    pub const fn from_code(data_bits: u8, parity: Parity) -> Self {
        match data_bits {
            8 if parity.is_enabled() => WordLength::Nine,
            _ => WordLength::Eight,
        }
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            WordLength::Eight => 8,
            WordLength::Nine => 9,
        }
    }
}

impl UartConfig {
    /// Translate a host line coding, applying the fallback rules.
    #[must_use]
    pub const fn from_line_coding(coding: &LineCoding) -> Self {
        let parity = Parity::from_code(coding.parity);
        Self {
            baud_rate: coding.bit_rate,
            stop_bits: StopBits::from_code(coding.stop_bits),
            parity,
            word_length: WordLength::from_code(coding.data_bits, parity),
        }
    }

    /// Data bits carried per frame, i.e. word length minus the parity bit.
    #[inline]
    #[must_use]
    pub const fn data_bits(&self) -> u8 {
        if self.parity.is_enabled() {
            self.word_length.bits() - 1
        } else {
            self.word_length.bits()
        }
    }

    /// Bytes one hardware receive unit occupies.
    ///
    /// A 9-bit frame is stored in two bytes; only the first is forwarded.
    #[inline]
    #[must_use]
    pub const fn rx_unit_len(&self) -> usize {
        match self.word_length {
            WordLength::Eight => 1,
            WordLength::Nine => 2,
        }
    }
}

impl From<LineCoding> for UartConfig {
    fn from(coding: LineCoding) -> Self {
        Self::from_line_coding(&coding)
    }
}
