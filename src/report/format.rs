use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use super::model::{Mark, SENTINEL};

/// Two-decimal fixed formatting shared by every output format.
///
/// Rounds half away from zero on the shortest decimal representation of the
/// value, so `76.555` becomes `"76.56"` even though its binary value sits just
/// below the midpoint.
pub fn format_two_decimals(value: f64) -> String {
    match Decimal::from_str(&value.to_string()) {
        Ok(d) => {
            let mut rounded = d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(2);
            if rounded.is_zero() {
                rounded.set_sign_positive(true);
            }
            rounded.to_string()
        }
        // Out of Decimal range; nothing in a mark sheet gets here.
        Err(_) => format!("{:.2}", value),
    }
}

pub fn format_average(mark: Mark) -> String {
    match mark {
        Mark::Numeric(v) => format_two_decimals(v),
        Mark::Missing => SENTINEL.to_string(),
    }
}

/// Marks and positions keep their own precision; integral values drop the fraction.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

pub fn format_mark(mark: Mark) -> String {
    match mark {
        Mark::Numeric(v) => format_number(v),
        Mark::Missing => SENTINEL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_decimals_rounds_half_away_from_zero() {
        assert_eq!(format_two_decimals(76.555), "76.56");
        assert_eq!(format_two_decimals(1.005), "1.01");
        assert_eq!(format_two_decimals(2.675), "2.68");
        assert_eq!(format_two_decimals(76.554), "76.55");
        assert_eq!(format_two_decimals(-1.005), "-1.01");
    }

    #[test]
    fn two_decimals_pads_short_values() {
        assert_eq!(format_two_decimals(80.0), "80.00");
        assert_eq!(format_two_decimals(76.5), "76.50");
        assert_eq!(format_two_decimals(0.0), "0.00");
        assert_eq!(format_two_decimals(-0.001), "0.00");
    }

    #[test]
    fn missing_values_use_sentinel() {
        assert_eq!(format_average(Mark::Missing), "-");
        assert_eq!(format_mark(Mark::Missing), "-");
    }

    #[test]
    fn marks_keep_natural_precision() {
        assert_eq!(format_mark(Mark::Numeric(80.0)), "80");
        assert_eq!(format_mark(Mark::Numeric(61.5)), "61.5");
        assert_eq!(format_number(3.0), "3");
    }
}
