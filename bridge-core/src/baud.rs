//! Baud rate divisors for UARTs with a 16x oversampled fractional divider
//! (ARM PL011 and compatibles).
//!
//! The divider is `clock / (16 * baud)`, split into a 16-bit integer part
//! (IBRD) and a 6-bit fraction (FBRD). Rates outside what the divider can
//! produce are clamped to the nearest reachable rate instead of failing, so
//! a host asking for 50 baud or 20 MBd still gets a working port.

/// Largest integer divisor the IBRD register holds.
pub const MAX_INTEGER_DIVISOR: u32 = 65_535;

/// Integer and fractional divisor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FractionalDivisor {
    pub integer: u32,
    pub fraction: u32,
}

/// Divisors for `baud_rate` from a `clock_hz` reference.
///
/// `None` only for a zero baud rate.
pub fn fractional_divisor(clock_hz: u32, baud_rate: u32) -> Option<FractionalDivisor> {
    if baud_rate == 0 {
        return None;
    }
    // 64ths of the divisor, rounded to nearest
    let div = 8 * u64::from(clock_hz) / u64::from(baud_rate);
    let mut integer = div >> 7;
    let mut fraction = ((div & 0x7f) + 1) / 2;
    if fraction == 64 {
        integer += 1;
        fraction = 0;
    }

    if integer == 0 {
        debug!("baud {} too fast, clamped", baud_rate);
        integer = 1;
        fraction = 0;
    } else if integer >= u64::from(MAX_INTEGER_DIVISOR) {
        debug!("baud {} too slow, clamped", baud_rate);
        integer = u64::from(MAX_INTEGER_DIVISOR);
        fraction = 0;
    }

    Some(FractionalDivisor {
        integer: integer as u32,
        fraction: fraction as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLK_PERI: u32 = 125_000_000;

    fn divisor(baud_rate: u32) -> Option<(u32, u32)> {
        fractional_divisor(CLK_PERI, baud_rate).map(|d| (d.integer, d.fraction))
    }

    #[test]
    fn test_standard_rates() {
        assert_eq!(divisor(115_200), Some((67, 52)));
        assert_eq!(divisor(9_600), Some((813, 51)));
        assert_eq!(divisor(300), Some((26_041, 43)));
    }

    #[test]
    fn test_slow_rate_clamps_to_max_divisor() {
        assert_eq!(divisor(110), Some((MAX_INTEGER_DIVISOR, 0)));
        assert_eq!(divisor(1), Some((MAX_INTEGER_DIVISOR, 0)));
    }

    #[test]
    fn test_fast_rate_clamps_to_min_divisor() {
        assert_eq!(divisor(20_000_000), Some((1, 0)));
        assert_eq!(divisor(u32::MAX), Some((1, 0)));
    }

    #[test]
    fn test_fraction_carries_into_integer() {
        // 8 * clk / baud = 0xFF gives a fraction of 64
        assert_eq!(fractional_divisor(255, 8), Some(FractionalDivisor { integer: 2, fraction: 0 }));
    }

    #[test]
    fn test_zero_baud_rejected() {
        assert_eq!(divisor(0), None);
    }
}
