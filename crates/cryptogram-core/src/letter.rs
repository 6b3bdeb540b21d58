use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An uppercase ASCII letter `A`-`Z`.
///
/// Used both for ciphertext letters (substitution map keys) and for the
/// player's guessed plaintext letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Letter(u8);

/// Character that is not an ASCII letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not an ASCII letter: {0:?}")]
pub struct InvalidLetter(pub char);

impl Letter {
    /// Parse an ASCII letter of either case
    pub fn from_char(c: char) -> Option<Self> {
        if c.is_ascii_alphabetic() {
            Some(Self(c.to_ascii_uppercase() as u8))
        } else {
            None
        }
    }

    /// The uppercase character
    pub fn as_char(self) -> char {
        self.0 as char
    }

    /// Zero-based alphabet index (A = 0)
    pub fn index(self) -> usize {
        (self.0 - b'A') as usize
    }

    /// All 26 letters in alphabetical order
    pub fn all() -> impl Iterator<Item = Letter> {
        (b'A'..=b'Z').map(Letter)
    }
}

impl TryFrom<char> for Letter {
    type Error = InvalidLetter;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Letter::from_char(c).ok_or(InvalidLetter(c))
    }
}

impl From<Letter> for char {
    fn from(letter: Letter) -> Self {
        letter.as_char()
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Parse a guess as it appears on the wire: empty means cleared,
/// otherwise exactly one letter.
pub fn parse_guess(s: &str) -> Result<Option<Letter>, InvalidLetter> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(None),
        (Some(c), None) => Letter::try_from(c).map(Some),
        (Some(c), Some(_)) => Err(InvalidLetter(c)),
    }
}

/// Format a guess for the wire (empty string when cleared)
pub fn format_guess(guess: Option<Letter>) -> String {
    guess.map(|l| l.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_char_uppercases() {
        assert_eq!(Letter::from_char('q').map(Letter::as_char), Some('Q'));
        assert_eq!(Letter::from_char('Q').map(Letter::as_char), Some('Q'));
        assert_eq!(Letter::from_char('7'), None);
        assert_eq!(Letter::from_char('é'), None);
    }

    #[test]
    fn test_index_and_all() {
        let all: Vec<Letter> = Letter::all().collect();
        assert_eq!(all.len(), 26);
        assert_eq!(all[0].index(), 0);
        assert_eq!(all[25].as_char(), 'Z');
    }

    #[test]
    fn test_parse_guess() {
        assert_eq!(parse_guess(""), Ok(None));
        assert_eq!(parse_guess("b"), Ok(Letter::from_char('B')));
        assert_eq!(parse_guess("AB"), Err(InvalidLetter('A')));
        assert_eq!(parse_guess("?"), Err(InvalidLetter('?')));
    }

    #[test]
    fn test_serde_as_char() {
        let letter = Letter::from_char('x').unwrap();
        assert_eq!(serde_json::to_string(&letter).unwrap(), "\"X\"");
        let back: Letter = serde_json::from_str("\"k\"").unwrap();
        assert_eq!(back.as_char(), 'K');
        assert!(serde_json::from_str::<Letter>("\"1\"").is_err());
    }
}
