//! The substitution map: ciphertext letter -> guessed letter.
//!
//! This is the single source of truth for what the player has guessed.
//! It only changes through [`SubstitutionMap::commit`], which the sync
//! coordinator calls once the puzzle service has acknowledged a proposal.

use crate::layout::Layout;
use crate::letter::Letter;
use std::collections::BTreeMap;

/// A requested change to one ciphertext letter. `guess: None` clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    pub letter: Letter,
    pub guess: Option<Letter>,
}

/// Read access to the guess for a ciphertext letter
pub trait Guesses {
    fn guess(&self, letter: Letter) -> Option<Letter>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    guess: Option<Letter>,
    positions: Vec<usize>,
}

/// Guesses for the letters of one puzzle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionMap {
    entries: BTreeMap<Letter, Entry>,
}

impl SubstitutionMap {
    /// An empty map with one unset entry per distinct ciphertext letter
    pub fn new(layout: &Layout) -> Self {
        let mut entries: BTreeMap<Letter, Entry> = BTreeMap::new();
        for &position in layout.letter_positions() {
            if let Some(letter) = layout.letter_at(position) {
                entries
                    .entry(letter)
                    .or_insert_with(|| Entry {
                        guess: None,
                        positions: Vec::new(),
                    })
                    .positions
                    .push(position);
            }
        }
        Self { entries }
    }

    /// The committed guess for a ciphertext letter
    pub fn current_guess(&self, letter: Letter) -> Option<Letter> {
        self.entries.get(&letter).and_then(|e| e.guess)
    }

    /// Whether the letter appears in this puzzle
    pub fn contains(&self, letter: Letter) -> bool {
        self.entries.contains_key(&letter)
    }

    /// Build a proposal without touching the map.
    ///
    /// Returns `None` for letters that do not appear in the puzzle.
    pub fn propose(&self, letter: Letter, guess: Option<Letter>) -> Option<Proposal> {
        self.contains(letter).then_some(Proposal { letter, guess })
    }

    /// Overwrite the guess for `letter` and return every cell position that
    /// shows it. Letters outside the puzzle are ignored.
    pub fn commit(&mut self, letter: Letter, guess: Option<Letter>) -> Vec<usize> {
        match self.entries.get_mut(&letter) {
            Some(entry) => {
                entry.guess = guess;
                entry.positions.clone()
            }
            None => Vec::new(),
        }
    }

    /// Cell positions holding `letter`
    pub fn positions(&self, letter: Letter) -> &[usize] {
        self.entries
            .get(&letter)
            .map(|e| e.positions.as_slice())
            .unwrap_or_default()
    }

    /// Another ciphertext letter currently has the same guess
    pub fn is_conflicting(&self, letter: Letter) -> bool {
        let Some(guess) = self.current_guess(letter) else {
            return false;
        };
        self.entries
            .iter()
            .any(|(&other, e)| other != letter && e.guess == Some(guess))
    }

    /// Number of distinct ciphertext letters
    pub fn letter_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of ciphertext letters with a guess
    pub fn filled_count(&self) -> usize {
        self.entries.values().filter(|e| e.guess.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.values().all(|e| e.guess.is_some())
    }

    /// `(ciphertext letter, guess)` pairs in alphabetical order
    pub fn iter(&self) -> impl Iterator<Item = (Letter, Option<Letter>)> + '_ {
        self.entries.iter().map(|(&letter, e)| (letter, e.guess))
    }
}

impl Guesses for SubstitutionMap {
    fn guess(&self, letter: Letter) -> Option<Letter> {
        self.current_guess(letter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter(c: char) -> Letter {
        Letter::from_char(c).unwrap()
    }

    fn map_for(text: &str) -> SubstitutionMap {
        SubstitutionMap::new(&Layout::build(text).unwrap())
    }

    #[test]
    fn test_new_has_one_unset_entry_per_letter() {
        let map = map_for("PZP, ZAP!");
        assert_eq!(map.letter_count(), 3);
        assert_eq!(map.filled_count(), 0);
        assert!(!map.contains(letter('Q')));
        for (_, guess) in map.iter() {
            assert_eq!(guess, None);
        }
    }

    #[test]
    fn test_commit_updates_every_occurrence() {
        let mut map = map_for("PZP ZAP");
        let affected = map.commit(letter('P'), Some(letter('A')));
        assert_eq!(affected, vec![0, 2, 6]);
        assert_eq!(map.current_guess(letter('P')), Some(letter('A')));
        assert_eq!(map.current_guess(letter('Z')), None);
        assert_eq!(map.current_guess(letter('A')), None);
    }

    #[test]
    fn test_commit_is_last_writer_wins() {
        let mut map = map_for("PZB");
        map.commit(letter('P'), Some(letter('T')));
        map.commit(letter('P'), Some(letter('S')));
        assert_eq!(map.current_guess(letter('P')), Some(letter('S')));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut map = map_for("PZB");
        map.commit(letter('Z'), Some(letter('H')));

        let first = map.commit(letter('Z'), None);
        let after_once = map.clone();
        let second = map.commit(letter('Z'), None);

        assert_eq!(first, second);
        assert_eq!(map, after_once);
        assert_eq!(map.current_guess(letter('Z')), None);
    }

    #[test]
    fn test_commit_unknown_letter_is_ignored() {
        let mut map = map_for("PZB");
        let before = map.clone();
        assert!(map.commit(letter('Q'), Some(letter('E'))).is_empty());
        assert_eq!(map, before);
        assert!(!map.contains(letter('Q')));
    }

    #[test]
    fn test_propose_does_not_mutate() {
        let map = map_for("PZB");
        let proposal = map.propose(letter('P'), Some(letter('T'))).unwrap();
        assert_eq!(proposal.letter, letter('P'));
        assert_eq!(proposal.guess, Some(letter('T')));
        assert_eq!(map.current_guess(letter('P')), None);
        assert_eq!(map.propose(letter('Q'), None), None);
    }

    #[test]
    fn test_conflicts_are_reported_not_rejected() {
        let mut map = map_for("PZB");
        map.commit(letter('P'), Some(letter('E')));
        map.commit(letter('Z'), Some(letter('E')));
        assert!(map.is_conflicting(letter('P')));
        assert!(map.is_conflicting(letter('Z')));
        assert!(!map.is_conflicting(letter('B')));
        assert_eq!(map.filled_count(), 2);
        assert!(!map.is_complete());
    }
}
