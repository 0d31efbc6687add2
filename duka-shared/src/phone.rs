/// Country code used when the deployment does not configure one
///
/// Phone numbers are stored in international form without a leading `+`:
/// the country code followed by the subscriber number, 12 digits in total
/// for this code.
pub const DEFAULT_COUNTRY_CODE: &str = "254";

const NORMALISED_LENGTH: usize = 12;

/// Rewrites a phone number into `<country code><subscriber>` form
///
/// Whitespace and `+` are dropped. A number that already starts with the
/// country code at full length is kept as is; otherwise leading zeros are
/// stripped and the country code is prefixed.
///
/// ```
/// use duka_shared::phone::normalise_phone;
///
/// assert_eq!(normalise_phone("0712 345 678", "254"), "254712345678");
/// assert_eq!(normalise_phone("+254712345678", "254"), "254712345678");
/// ```
pub fn normalise_phone(raw: &str, country_code: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '+')
        .collect();

    if compact.len() == NORMALISED_LENGTH && compact.starts_with(country_code) {
        return compact;
    }

    format!("{}{}", country_code, compact.trim_start_matches('0'))
}

/// True when the number is all digits, 12 long and carries the country code
pub fn is_valid_phone(phone: &str, country_code: &str) -> bool {
    phone.len() == NORMALISED_LENGTH
        && phone.chars().all(|c| c.is_ascii_digit())
        && phone.starts_with(country_code)
}

/// Normalises and validates in one step
pub fn parse_phone(raw: &str, country_code: &str) -> Option<String> {
    let phone = normalise_phone(raw, country_code);
    is_valid_phone(&phone, country_code).then_some(phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_numbers_get_country_code() {
        assert_eq!(normalise_phone("0712345678", "254"), "254712345678");
        assert_eq!(normalise_phone("712345678", "254"), "254712345678");
        assert_eq!(normalise_phone("00712345678", "254"), "254712345678");
    }

    #[test]
    fn test_international_numbers_kept() {
        assert_eq!(normalise_phone("254712345678", "254"), "254712345678");
        assert_eq!(normalise_phone("+254 712 345 678", "254"), "254712345678");
    }

    #[test]
    fn test_validation() {
        assert!(is_valid_phone("254712345678", "254"));
        assert!(!is_valid_phone("25471234567", "254"));
        assert!(!is_valid_phone("255712345678", "254"));
        assert!(!is_valid_phone("25471234567a", "254"));
    }

    #[test]
    fn test_parse_phone() {
        assert_eq!(parse_phone("0712345678", "254").as_deref(), Some("254712345678"));
        assert_eq!(parse_phone("12345", "254"), None);
        assert_eq!(parse_phone("07-1234-5678", "254"), None);
    }

    #[test]
    fn test_other_country_code() {
        assert_eq!(normalise_phone("0772123456", "256"), "256772123456");
        assert!(is_valid_phone("256772123456", "256"));
    }
}
