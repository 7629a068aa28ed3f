//! 3-letter app identifier derivation and generation.

use rand::rngs::OsRng;
use rand::Rng;

const IDENTIFIER_LEN: usize = 3;

/// Derive an identifier from the app name: ASCII letters only, uppercased,
/// first three, right-padded with 'X' when the name is too short.
pub fn derive_identifier(app_name: &str) -> String {
    let mut letters: String = app_name
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .take(IDENTIFIER_LEN)
        .collect();
    while letters.len() < IDENTIFIER_LEN {
        letters.push('X');
    }
    letters
}

/// Random identifier: three independent uniform letters A-Z from the OS
/// entropy source. Collisions with existing identifiers are not checked
/// here; the upstream validate step is the only place they surface.
pub fn random_identifier() -> String {
    (0..IDENTIFIER_LEN)
        .map(|_| char::from(b'A' + OsRng.gen_range(0..26u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_strips_non_letters() {
        assert_eq!(derive_identifier("Café 123"), "CAF");
        assert_eq!(derive_identifier("My App 2"), "MYA");
    }

    #[test]
    fn derive_pads_short_names() {
        assert_eq!(derive_identifier("Ab"), "ABX");
        assert_eq!(derive_identifier(""), "XXX");
        assert_eq!(derive_identifier("9-9"), "XXX");
    }

    #[test]
    fn random_is_three_uppercase_letters() {
        for _ in 0..100 {
            let id = random_identifier();
            assert_eq!(id.len(), 3);
            assert!(id.chars().all(|c| c.is_ascii_uppercase()));
        }
    }
}
