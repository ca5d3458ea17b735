//! Display helpers for operator-facing output.

use notary_types::Amount;

/// `0.00001111 BTC`.
pub fn format_btc(amount: Amount) -> String {
    format!("{} BTC", amount.to_btc_string())
}

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn btc_has_eight_decimals() {
        assert_eq!(format_btc(Amount::from_sat(1111)), "0.00001111 BTC");
        assert_eq!(format_btc(Amount::from_sat(250_000_000)), "2.50000000 BTC");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(3_725), "1h 2m");
        assert_eq!(format_duration(90_000), "1d 1h");
    }
}
