//! IBAN and Belgian legacy account number recognition and conversion
//!
//! Belgian accounts circulate in two spellings: the IBAN (`BE68 5390 0754 7034`)
//! and the pre-IBAN legacy format (`539-0075470-34`). The legacy number is the
//! last twelve digits of the IBAN, so the IBAN → legacy direction is exact.

use regex::Regex;
use std::sync::OnceLock;

fn iban_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[a-z]{2}[0-9]{2}[a-z0-9]{4}[0-9]{7}([a-z0-9]?){0,16}")
            .expect("invalid iban regex")
    })
}

fn legacy_be_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{3}-[0-9]{7}-[0-9]{2}").expect("invalid legacy regex"))
}

/// Remove every whitespace character
pub fn compact(number: &str) -> String {
    number.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Generic IBAN shape: country code, check digits, BBAN body. Case-insensitive,
/// spaces ignored.
pub fn is_iban(number: &str) -> bool {
    iban_re().is_match(&compact(number))
}

/// IBAN with the Belgian country prefix
pub fn is_iban_be(number: &str) -> bool {
    is_iban(number) && number.starts_with("BE")
}

/// Belgian legacy shape `NNN-NNNNNNN-NN`
pub fn is_noniban_be(number: &str) -> bool {
    legacy_be_re().is_match(number)
}

/// Convert a Belgian IBAN to its legacy `NNN-NNNNNNN-NN` form.
///
/// Takes the last twelve characters once spaces and dashes are stripped.
/// Returns `None` if fewer than twelve remain.
pub fn unibanize_be(iban: &str) -> Option<String> {
    let stripped: Vec<char> = iban
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if stripped.len() < 12 {
        return None;
    }
    let digits = &stripped[stripped.len() - 12..];
    let part = |range: &[char]| range.iter().collect::<String>();
    Some(format!("{}-{}-{}", part(&digits[..3]), part(&digits[3..10]), part(&digits[10..])))
}

/// Legacy → IBAN-looking string: prefix + digits, regrouped in blocks of four.
///
/// Does not compute ISO 7064 check digits; the caller must supply a prefix that
/// already carries them. Nothing on the reconciliation path uses this.
pub fn ibanize(bban: &str, prefix: &str) -> String {
    let joined: Vec<char> = prefix.chars().chain(bban.chars().filter(|c| *c != '-')).collect();
    joined
        .chunks(4)
        .take(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when `iban` is a Belgian IBAN whose legacy form is `legacy`
pub fn is_be_equivalent(iban: &str, legacy: &str) -> bool {
    is_iban_be(iban) && unibanize_be(iban).as_deref() == Some(legacy)
}
