//! Ciphertext layout: the ordered cell sequence of one puzzle.
//!
//! The text is split into word groups (maximal non-whitespace runs) and
//! separators (maximal whitespace runs). Every cell, whatever its kind,
//! gets a position in one shared address space so navigation can treat
//! positions uniformly.

use crate::error::EngineError;
use crate::letter::Letter;
use std::collections::BTreeSet;
use std::ops::Range;

/// What a cell holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellKind {
    /// Editable cell keyed by its uppercase ciphertext letter
    Letter(Letter),
    /// Digit or punctuation, shown verbatim and never editable
    Symbol(char),
    /// A whole whitespace run, kept byte-for-byte
    Separator(String),
}

/// One position in the puzzle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub position: usize,
    pub kind: CellKind,
}

impl Cell {
    /// The ciphertext letter, for editable cells
    pub fn letter(&self) -> Option<Letter> {
        match self.kind {
            CellKind::Letter(letter) => Some(letter),
            _ => None,
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self.kind, CellKind::Letter(_))
    }

    /// The source text this cell stands for (uppercased for letters)
    pub fn source_text(&self) -> String {
        match &self.kind {
            CellKind::Letter(letter) => letter.to_string(),
            CellKind::Symbol(c) => c.to_string(),
            CellKind::Separator(run) => run.clone(),
        }
    }
}

/// Kind of a cell group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Word,
    Space,
}

/// A word or whitespace group, as a range of cell positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub kind: GroupKind,
    pub cells: Range<usize>,
}

/// The immutable cell sequence built from one ciphertext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    cells: Vec<Cell>,
    groups: Vec<Group>,
    /// Positions of editable cells, ascending
    letters: Vec<usize>,
}

impl Layout {
    /// Build the layout for a ciphertext.
    ///
    /// Fails with `MalformedPuzzle` when the text is empty or has no
    /// letters to edit.
    pub fn build(ciphertext: &str) -> Result<Self, EngineError> {
        if ciphertext.is_empty() {
            return Err(EngineError::MalformedPuzzle("ciphertext is empty".into()));
        }

        let mut layout = Layout {
            cells: Vec::new(),
            groups: Vec::new(),
            letters: Vec::new(),
        };

        let mut run_start = 0;
        let mut run_is_space: Option<bool> = None;
        for (offset, c) in ciphertext.char_indices() {
            let is_space = c.is_whitespace();
            if run_is_space.is_some_and(|prev| prev != is_space) {
                layout.push_run(&ciphertext[run_start..offset], run_is_space == Some(true));
                run_start = offset;
            }
            run_is_space = Some(is_space);
        }
        layout.push_run(&ciphertext[run_start..], run_is_space == Some(true));

        if layout.letters.is_empty() {
            return Err(EngineError::MalformedPuzzle(
                "ciphertext has no letters to solve".into(),
            ));
        }

        Ok(layout)
    }

    fn push_run(&mut self, run: &str, is_space: bool) {
        let start = self.cells.len();
        if is_space {
            self.cells.push(Cell {
                position: start,
                kind: CellKind::Separator(run.to_string()),
            });
        } else {
            for c in run.chars() {
                let position = self.cells.len();
                let kind = match Letter::from_char(c) {
                    Some(letter) => {
                        self.letters.push(position);
                        CellKind::Letter(letter)
                    }
                    None => CellKind::Symbol(c),
                };
                self.cells.push(Cell { position, kind });
            }
        }
        let kind = if is_space {
            GroupKind::Space
        } else {
            GroupKind::Word
        };
        self.groups.push(Group {
            kind,
            cells: start..self.cells.len(),
        });
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, position: usize) -> Option<&Cell> {
        self.cells.get(position)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Positions of all editable cells, ascending
    pub fn letter_positions(&self) -> &[usize] {
        &self.letters
    }

    /// Ciphertext letter at a position, if that cell is editable
    pub fn letter_at(&self, position: usize) -> Option<Letter> {
        self.cell(position).and_then(Cell::letter)
    }

    pub fn first_letter(&self) -> Option<usize> {
        self.letters.first().copied()
    }

    /// First editable position strictly after `position`
    pub fn next_letter(&self, position: usize) -> Option<usize> {
        let idx = self.letters.partition_point(|&p| p <= position);
        self.letters.get(idx).copied()
    }

    /// Last editable position strictly before `position`
    pub fn prev_letter(&self, position: usize) -> Option<usize> {
        let idx = self.letters.partition_point(|&p| p < position);
        idx.checked_sub(1).map(|i| self.letters[i])
    }

    /// Editable positions strictly after `position`, ascending
    pub fn letters_after(&self, position: usize) -> &[usize] {
        let idx = self.letters.partition_point(|&p| p <= position);
        &self.letters[idx..]
    }

    /// Every position holding the given ciphertext letter
    pub fn occurrences(&self, letter: Letter) -> Vec<usize> {
        self.letters
            .iter()
            .copied()
            .filter(|&p| self.letter_at(p) == Some(letter))
            .collect()
    }

    /// The distinct ciphertext letters of the puzzle
    pub fn distinct_letters(&self) -> BTreeSet<Letter> {
        self.cells.iter().filter_map(Cell::letter).collect()
    }
}
