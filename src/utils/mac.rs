use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MAC_RE: Regex = Regex::new(r"^([0-9A-F]{2}:){5}[0-9A-F]{2}$").unwrap();
}

/// Upper-cases and trims a MAC so watchlist lookups are case-insensitive.
pub fn normalize_mac(mac: &str) -> String {
    mac.trim().to_uppercase()
}

/// Accepts colon-separated MACs in either case.
pub fn is_valid_mac(mac: &str) -> bool {
    MAC_RE.is_match(&normalize_mac(mac))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_mac(" aa:bb:cc:11:22:33 "), "AA:BB:CC:11:22:33");
    }

    #[test]
    fn validates_colon_separated_macs() {
        assert!(is_valid_mac("aa:bb:cc:11:22:33"));
        assert!(!is_valid_mac("AA-BB-CC-11-22-33"));
        assert!(!is_valid_mac("AA:BB:CC:11:22"));
        assert!(!is_valid_mac(""));
    }
}
