//! Zone code parsing and validation.
//!
//! Turns free-text user input into a deduplicated, order-preserving,
//! format-checked list of zone identifiers. A single invalid token rejects
//! the whole batch so the caller can re-prompt.

use crate::error::ExportError;

const ZNIEFF_EXPECTED: &str = "Un code ZNIEFF doit être composé de 9 chiffres.";
const N2000_EXPECTED: &str = "Un code N2000 doit être composé de 'FR' suivi de 7 chiffres.";

/// Parse ZNIEFF codes: exactly 9 ASCII digits each.
///
/// Accepts `;`, `,`, newlines and tabs as separators. Empty input is not an
/// error and yields an empty list.
pub fn parse_znieff_codes(raw: &str) -> Result<Vec<String>, ExportError> {
    let codes = split_codes(raw);
    for code in &codes {
        if !(code.len() == 9 && code.chars().all(|c| c.is_ascii_digit())) {
            return Err(ExportError::InvalidCodeFormat {
                code: code.clone(),
                expected: ZNIEFF_EXPECTED,
            });
        }
    }
    Ok(codes)
}

/// Parse Natura 2000 codes: literal `FR` followed by exactly 7 digits.
pub fn parse_n2000_codes(raw: &str) -> Result<Vec<String>, ExportError> {
    let codes = split_codes(raw);
    for code in &codes {
        let digits_ok = code
            .strip_prefix("FR")
            .is_some_and(|rest| rest.len() == 7 && rest.chars().all(|c| c.is_ascii_digit()));
        if !digits_ok {
            return Err(ExportError::InvalidCodeFormat {
                code: code.clone(),
                expected: N2000_EXPECTED,
            });
        }
    }
    Ok(codes)
}

/// Normalize separators, split, trim, drop empties, dedupe keeping
/// first-seen order.
fn split_codes(raw: &str) -> Vec<String> {
    let separators = [';', ',', '\n', '\t'];
    let mut out: Vec<String> = Vec::new();
    for token in raw.split(|c| separators.contains(&c)) {
        let token = token.trim();
        if !token.is_empty() && !out.iter().any(|seen| seen == token) {
            out.push(token.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_znieff_valid() {
        assert_eq!(
            parse_znieff_codes("123456789; 987654321").unwrap(),
            vec!["123456789", "987654321"]
        );
    }

    #[test]
    fn test_znieff_nine_digits_required() {
        // 5 digits: rejected
        assert!(parse_znieff_codes("12345").is_err());
        // 9 digits: accepted
        assert!(parse_znieff_codes("123456789").is_ok());
        // 10 digits or non-digit: rejected
        assert!(parse_znieff_codes("1234567890").is_err());
        assert!(parse_znieff_codes("12345678A").is_err());
    }

    #[test]
    fn test_n2000_shape() {
        assert!(parse_n2000_codes("FR123456").is_err()); // 6 digits
        assert_eq!(parse_n2000_codes("FR1234567").unwrap(), vec!["FR1234567"]);
        assert!(parse_n2000_codes("FR12345678").is_err()); // 8 digits
        assert!(parse_n2000_codes("XX1234567").is_err());
        assert!(parse_n2000_codes("FR12345A7").is_err());
    }

    #[test]
    fn test_batch_rejected_on_single_bad_token() {
        let err = parse_znieff_codes("123456789, 12345").unwrap_err();
        match err {
            ExportError::InvalidCodeFormat { code, .. } => assert_eq!(code, "12345"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        assert!(parse_znieff_codes("").unwrap().is_empty());
        assert!(parse_n2000_codes("  ;  ,\n").unwrap().is_empty());
    }

    #[test]
    fn test_separators_and_dedup_preserve_order() {
        let codes = parse_znieff_codes("222222222\n111111111\t222222222;111111111").unwrap();
        assert_eq!(codes, vec!["222222222", "111111111"]);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse_n2000_codes("FR1234567, FR7654321;FR1234567").unwrap();
        let again = parse_n2000_codes(&first.join(";")).unwrap();
        assert_eq!(first, again);
    }
}
