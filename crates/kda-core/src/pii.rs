//! PII detection for chat messages
//!
//! Patients are asked not to share identifying details with the chat
//! assistant. Messages are scanned for UK-specific patterns before
//! they reach the LLM or the stored history.

use regex::Regex;
use std::fmt;

/// Category of personally identifiable information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiKind {
    NhsNumber,
    PhoneNumber,
    Postcode,
    Email,
    NiNumber,
}

impl PiiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NhsNumber => "nhs_number",
            Self::PhoneNumber => "phone_number",
            Self::Postcode => "postcode",
            Self::Email => "email",
            Self::NiNumber => "ni_number",
        }
    }
}

impl fmt::Display for PiiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regex-based PII detector, compiled once at startup
pub struct PiiFilter {
    nhs_number: Regex,
    phone_number: Regex,
    postcode: Regex,
    email: Regex,
    ni_number: Regex,
}

impl PiiFilter {
    pub fn new() -> Self {
        Self {
            // 3-3-4 digit groups; candidates are confirmed against the
            // mod-11 check digit below
            nhs_number: Regex::new(r"\b(\d{3})[ -]?(\d{3})[ -]?(\d{4})\b").unwrap(),
            // +44 and 0-prefixed landline/mobile forms
            phone_number: Regex::new(
                r"(?:\+44[ -]?\d{2,4}|\(?0\d{2,4}\)?)[ -]?\d{3,4}[ -]?\d{3,4}\b",
            )
            .unwrap(),
            // Outward + inward code, e.g. "SW1A 1AA" or "m1 1ae"
            postcode: Regex::new(r"(?i)\b[A-Z]{1,2}\d[A-Z\d]?[ ]?\d[A-Z]{2}\b").unwrap(),
            email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
            // Two prefix letters, six digits, suffix A-D
            ni_number: Regex::new(
                r"(?i)\b[A-CEGHJ-PR-TW-Z]{2}[ ]?\d{2}[ ]?\d{2}[ ]?\d{2}[ ]?[A-D]\b",
            )
            .unwrap(),
        }
    }

    /// Return the first PII category found in `text`, if any
    pub fn scan(&self, text: &str) -> Option<PiiKind> {
        self.scan_all(text).into_iter().next()
    }

    /// Return every PII category found in `text`
    pub fn scan_all(&self, text: &str) -> Vec<PiiKind> {
        let mut found = Vec::new();

        if self.contains_nhs_number(text) {
            found.push(PiiKind::NhsNumber);
        }
        if self.ni_number.is_match(text) {
            found.push(PiiKind::NiNumber);
        }
        if self.phone_number.is_match(text) {
            found.push(PiiKind::PhoneNumber);
        }
        if self.email.is_match(text) {
            found.push(PiiKind::Email);
        }
        if self.postcode.is_match(text) {
            found.push(PiiKind::Postcode);
        }

        found
    }

    /// Match 10-digit candidates and confirm the NHS mod-11 check digit
    fn contains_nhs_number(&self, text: &str) -> bool {
        self.nhs_number.captures_iter(text).any(|caps| {
            let digits: String = format!("{}{}{}", &caps[1], &caps[2], &caps[3]);
            nhs_checksum_valid(&digits)
        })
    }
}

impl Default for PiiFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// NHS number check digit (modulus 11).
///
/// The first nine digits are weighted 10 down to 2; the check digit is
/// 11 minus the remainder, with 11 treated as 0 and 10 marking the
/// number invalid.
fn nhs_checksum_valid(digits: &str) -> bool {
    if digits.len() != 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let values: Vec<u32> = digits.chars().map(|c| c.to_digit(10).unwrap()).collect();
    let sum: u32 = values[..9]
        .iter()
        .enumerate()
        .map(|(i, d)| d * (10 - i as u32))
        .sum();

    let check = match 11 - (sum % 11) {
        11 => 0,
        10 => return false,
        n => n,
    };

    values[9] == check
}

#[cfg(test)]
mod tests {
    use super::*;

    // 943 476 5919 is the published NHS test number with a valid
    // check digit
    const VALID_NHS: &str = "943 476 5919";

    #[test]
    fn test_nhs_number_detected() {
        let filter = PiiFilter::new();
        assert_eq!(filter.scan(VALID_NHS), Some(PiiKind::NhsNumber));
        assert_eq!(filter.scan("9434765919"), Some(PiiKind::NhsNumber));
        assert_eq!(
            filter.scan("my nhs number is 943-476-5919 thanks"),
            Some(PiiKind::NhsNumber)
        );
    }

    #[test]
    fn test_nhs_checksum_rejects_plain_digits() {
        let filter = PiiFilter::new();
        // Same shape, wrong check digit: not an NHS number
        assert!(!filter.scan_all("9434765918").contains(&PiiKind::NhsNumber));
    }

    #[test]
    fn test_checksum() {
        assert!(nhs_checksum_valid("9434765919"));
        assert!(!nhs_checksum_valid("9434765918"));
        assert!(!nhs_checksum_valid("123"));
    }

    #[test]
    fn test_phone_numbers() {
        let filter = PiiFilter::new();
        assert_eq!(filter.scan("call me on 07700 900123"), Some(PiiKind::PhoneNumber));
        assert_eq!(filter.scan("0161 496 0123"), Some(PiiKind::PhoneNumber));
        assert_eq!(filter.scan("+44 7700 900123"), Some(PiiKind::PhoneNumber));
    }

    #[test]
    fn test_postcode() {
        let filter = PiiFilter::new();
        assert_eq!(filter.scan("I live at SW1A 1AA"), Some(PiiKind::Postcode));
        assert_eq!(filter.scan("m1 1ae"), Some(PiiKind::Postcode));
    }

    #[test]
    fn test_email() {
        let filter = PiiFilter::new();
        assert_eq!(
            filter.scan("email me at pat.jones@example.co.uk"),
            Some(PiiKind::Email)
        );
    }

    #[test]
    fn test_ni_number() {
        let filter = PiiFilter::new();
        assert_eq!(filter.scan("NI: AB 12 34 56 C"), Some(PiiKind::NiNumber));
        assert_eq!(filter.scan("ni number AB123456C"), Some(PiiKind::NiNumber));
    }

    #[test]
    fn test_clean_messages_pass() {
        let filter = PiiFilter::new();
        assert_eq!(filter.scan("What is peritoneal dialysis?"), None);
        assert_eq!(
            filter.scan("I was diagnosed in 2023 and my eGFR is 14"),
            None
        );
        assert_eq!(filter.scan("Is 4 hours of dialysis normal?"), None);
    }

    #[test]
    fn test_scan_all_reports_each_kind() {
        let filter = PiiFilter::new();
        let found = filter.scan_all("943 476 5919, pat@example.com");
        assert!(found.contains(&PiiKind::NhsNumber));
        assert!(found.contains(&PiiKind::Email));
    }
}
