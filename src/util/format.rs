//! Number formatting utilities.

/// Format an energy amount with two decimals, `None` as zero.
#[must_use]
pub fn format_energy(amount: Option<f64>, unit: &str) -> String {
    format!("{:.2} {unit}", amount.unwrap_or(0.0))
}

/// Format a currency amount with two decimals, `None` as zero.
#[must_use]
pub fn format_currency(amount: Option<f64>, currency: &str) -> String {
    format!("{:.2} {currency}", amount.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_energy_two_decimals() {
        assert_eq!(format_energy(Some(120.456), "kWh"), "120.46 kWh");
    }

    #[test]
    fn format_energy_none_is_zero() {
        assert_eq!(format_energy(None, "kWh"), "0.00 kWh");
    }

    #[test]
    fn format_currency_uses_given_unit() {
        assert_eq!(format_currency(Some(12.5), "EUR"), "12.50 EUR");
        assert_eq!(format_currency(None, "SEK"), "0.00 SEK");
    }
}
