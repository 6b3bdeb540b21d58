//! Cursor navigation as a pure state machine.
//!
//! [`transition`] maps `(cursor, input event)` to the next cursor and an
//! optional request for the puzzle service. Edits never move the cursor
//! here: the move after a letter or clear waits for the service to
//! acknowledge the substitution (see [`advance_target`]).

use crate::layout::Layout;
use crate::letter::Letter;
use crate::substitution::{Guesses, Proposal};

/// Player input, independent of any keyboard library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Type a guess into the focused cell
    Letter(Letter),
    /// Backspace/delete
    Clear,
    /// Tab: jump to the next unfilled cell
    Advance,
    Left,
    Right,
    /// Ask the service whether the puzzle is solved
    Submit,
    /// Give up and show the solution
    Reveal,
    /// Focus a cell directly (mouse click, first render)
    Focus(usize),
}

/// Focused cell, or none before the first interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor(Option<usize>);

impl Cursor {
    pub fn unset() -> Self {
        Self(None)
    }

    pub fn at(position: usize) -> Self {
        Self(Some(position))
    }

    pub fn position(self) -> Option<usize> {
        self.0
    }

    pub fn is_set(self) -> bool {
        self.0.is_some()
    }
}

/// Work for the puzzle service produced by an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Apply a substitution; `origin` is the cell the edit was typed in
    Substitute { proposal: Proposal, origin: usize },
    CheckSolution,
    RevealSolution,
}

/// Outcome of one input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub cursor: Cursor,
    pub request: Option<Request>,
}

impl Transition {
    fn stay(cursor: Cursor) -> Self {
        Self {
            cursor,
            request: None,
        }
    }

    fn move_to(position: usize) -> Self {
        Self::stay(Cursor::at(position))
    }
}

/// First editable cell after `from` whose guess is unset
pub fn next_unset(layout: &Layout, guesses: &impl Guesses, from: usize) -> Option<usize> {
    layout.letters_after(from).iter().copied().find(|&p| {
        layout
            .letter_at(p)
            .is_some_and(|letter| guesses.guess(letter).is_none())
    })
}

/// Where the cursor goes after an accepted edit or a tab from `from`:
/// the next unset cell, else the very next editable cell, else nowhere.
pub fn advance_target(layout: &Layout, guesses: &impl Guesses, from: usize) -> Option<usize> {
    next_unset(layout, guesses, from).or_else(|| layout.next_letter(from))
}

/// Compute the next cursor and outgoing request for an input event.
pub fn transition(
    layout: &Layout,
    guesses: &impl Guesses,
    cursor: Cursor,
    event: InputEvent,
) -> Transition {
    match event {
        InputEvent::Submit => {
            return Transition {
                cursor,
                request: Some(Request::CheckSolution),
            }
        }
        InputEvent::Reveal => {
            return Transition {
                cursor,
                request: Some(Request::RevealSolution),
            }
        }
        InputEvent::Focus(position) => {
            return if layout.letter_at(position).is_some() {
                Transition::move_to(position)
            } else {
                Transition::stay(cursor)
            };
        }
        _ => {}
    }

    // Anything else needs a focused cell; the first event only focuses
    let Some(current) = cursor.position() else {
        return match layout.first_letter() {
            Some(first) => Transition::move_to(first),
            None => Transition::stay(cursor),
        };
    };
    let Some(letter) = layout.letter_at(current) else {
        return Transition::stay(cursor);
    };

    match event {
        InputEvent::Letter(guess) => Transition {
            cursor,
            request: Some(Request::Substitute {
                proposal: Proposal {
                    letter,
                    guess: Some(guess),
                },
                origin: current,
            }),
        },
        InputEvent::Clear => {
            if guesses.guess(letter).is_some() {
                Transition {
                    cursor,
                    request: Some(Request::Substitute {
                        proposal: Proposal {
                            letter,
                            guess: None,
                        },
                        origin: current,
                    }),
                }
            } else {
                advance_target(layout, guesses, current)
                    .map(Transition::move_to)
                    .unwrap_or(Transition::stay(cursor))
            }
        }
        InputEvent::Advance => advance_target(layout, guesses, current)
            .map(Transition::move_to)
            .unwrap_or(Transition::stay(cursor)),
        InputEvent::Left => layout
            .prev_letter(current)
            .map(Transition::move_to)
            .unwrap_or(Transition::stay(cursor)),
        InputEvent::Right => layout
            .next_letter(current)
            .map(Transition::move_to)
            .unwrap_or(Transition::stay(cursor)),
        InputEvent::Submit | InputEvent::Reveal | InputEvent::Focus(_) => Transition::stay(cursor),
    }
}
