//! Exact base-unit to display-unit conversion.
//!
//! Sums are accumulated as integers and only turned into decimal strings
//! here, at the display boundary. Rounding is half-up.

use alloy::primitives::U256;

/// Divide `numerator` by `denominator`, rounding half-up.
fn div_round(numerator: U256, denominator: U256) -> U256 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder >= denominator - remainder {
        quotient.saturating_add(U256::from(1u8))
    } else {
        quotient
    }
}

fn pow10(exp: u32) -> U256 {
    U256::from(10u8).pow(U256::from(exp))
}

fn render_fixed(scaled: U256, places: u32) -> String {
    if places == 0 {
        return scaled.to_string();
    }
    let unit = pow10(places);
    format!(
        "{}.{:0>width$}",
        scaled / unit,
        (scaled % unit).to_string(),
        width = places as usize
    )
}

/// Format a base-unit amount with `decimals` token decimals as a fixed
/// decimal string with `places` fractional digits.
///
/// `format_units(U256::from(5_000_000_000_000_000_000u128), 18, 2) == "5.00"`.
pub fn format_units(value: U256, decimals: u32, places: u32) -> String {
    let scaled = if decimals >= places {
        div_round(value, pow10(decimals - places))
    } else {
        value.saturating_mul(pow10(places - decimals))
    };
    render_fixed(scaled, places)
}

/// `part / whole * 100` with two decimals; `"0.00"` when `whole == 0`.
pub fn format_percent(part: u64, whole: u64) -> String {
    if whole == 0 {
        return render_fixed(U256::ZERO, 2);
    }
    let scaled = div_round(U256::from(part) * U256::from(10_000u64), U256::from(whole));
    render_fixed(scaled, 2)
}
