//! Brazilian real (`R$ 1.234,56`) formatting and parsing.

use crate::utils::error::{PapError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Marker the rate tables use for services that have no monetary rule.
pub const NO_CALCULATION: &str = "Sem cálculo";

/// Rounds to cents, half away from zero, always with two decimal places.
pub fn round_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Formats a value as `R$ 1.234,56`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = round_cents(value);

    let digits = rounded.abs().to_string();
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    format!("R$ {}{},{}", sign, grouped, fraction)
}

/// Strict parser for `R$ 1.234,56`, `1.234,56` and plain `1500`.
pub fn parse_currency(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix("R$").unwrap_or(trimmed).trim();

    let invalid = |reason: &str| PapError::InvalidConfigValueError {
        field: "currency".to_string(),
        value: input.to_string(),
        reason: reason.to_string(),
    };

    if body.is_empty() {
        return Err(invalid("empty currency value"));
    }

    let unsigned = body.strip_prefix('-').unwrap_or(body);
    if unsigned.is_empty()
        || !unsigned
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
        || unsigned.matches(',').count() > 1
    {
        return Err(invalid("expected digits with '.' thousands and ',' decimals"));
    }

    let normalized = body.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).map_err(|e| invalid(&e.to_string()))
}

/// Lenient conversion used for table values and user input.
///
/// `Sem cálculo` and empty strings are zero; anything unparseable is zero
/// with a warning.
pub fn currency_to_decimal(input: &str) -> Decimal {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == NO_CALCULATION {
        return Decimal::ZERO;
    }

    match parse_currency(trimmed) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("⚠️ Valor inválido para conversão: {}", input);
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec!(1234.56)), "R$ 1.234,56");
        assert_eq!(format_currency(dec!(0)), "R$ 0,00");
        assert_eq!(format_currency(dec!(16000)), "R$ 16.000,00");
        assert_eq!(format_currency(dec!(1234567.8)), "R$ 1.234.567,80");
        assert_eq!(format_currency(dec!(999.999)), "R$ 1.000,00");
        assert_eq!(format_currency(dec!(-2500.5)), "R$ -2.500,50");
        assert_eq!(format_currency(dec!(-0.001)), "R$ 0,00");
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("R$ 1.500,00").unwrap(), dec!(1500));
        assert_eq!(parse_currency("R$ 10.000,50").unwrap(), dec!(10000.5));
        assert_eq!(parse_currency("R$ 0,00").unwrap(), dec!(0));
        assert_eq!(parse_currency("1500").unwrap(), dec!(1500));
        assert_eq!(parse_currency("R$ -750,25").unwrap(), dec!(-750.25));
        assert!(parse_currency("R$ abc").is_err());
        assert!(parse_currency("").is_err());
        assert!(parse_currency("1,2,3").is_err());
    }

    #[test]
    fn test_currency_to_decimal_defaults_to_zero() {
        assert_eq!(currency_to_decimal(NO_CALCULATION), Decimal::ZERO);
        assert_eq!(currency_to_decimal(""), Decimal::ZERO);
        assert_eq!(currency_to_decimal("dez reais"), Decimal::ZERO);
        assert_eq!(currency_to_decimal("R$ 5,95"), dec!(5.95));
    }

    #[test]
    fn test_round_trip_well_formed_values() {
        for input in [
            "R$ 0,00",
            "R$ 5,95",
            "R$ 612,25",
            "R$ 1.234,56",
            "R$ 18.000,00",
            "R$ 4.958,33",
            "R$ 1.000.000,01",
        ] {
            assert_eq!(format_currency(currency_to_decimal(input)), input);
        }
    }
}
