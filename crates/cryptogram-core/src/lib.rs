//! Cryptogram engine
//!
//! Keeps every occurrence of a ciphertext letter consistent with one
//! guessed plaintext letter, and drives keyboard navigation over the
//! puzzle's cells. Cipher generation and answer checking belong to a
//! [`PuzzleService`]; the engine only talks to it through [`Request`]s.

pub mod engine;
pub mod error;
pub mod layout;
pub mod letter;
pub mod navigation;
pub mod service;
pub mod session;
pub mod substitution;
pub mod sync;

pub use engine::{CellView, Engine, Feedback, Notification, Outgoing, Puzzle, Snapshot, Tone};
pub use error::{EngineError, ServiceError, ServiceResult};
pub use layout::{Cell, CellKind, Group, GroupKind, Layout};
pub use letter::{format_guess, parse_guess, InvalidLetter, Letter};
pub use navigation::{Cursor, InputEvent, Request, Transition};
pub use service::{dispatch, MockPuzzleService, PuzzlePayload, PuzzleService, Response};
pub use session::Session;
pub use substitution::{Guesses, Proposal, SubstitutionMap};
pub use sync::{SyncCoordinator, Ticket};
