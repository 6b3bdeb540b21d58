//! Puzzle service abstraction
//!
//! The engine never generates ciphers or checks answers itself; a puzzle
//! service does. Backends:
//! - Remote: HTTP client in the terminal front end
//! - Mock: scriptable in-memory service for tests and demos

use crate::error::{ServiceError, ServiceResult};
use crate::letter::Letter;
use crate::navigation::Request;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Puzzle data as fetched; both fields are required to play
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzlePayload {
    #[serde(rename = "cryptogram", default)]
    pub ciphertext: Option<String>,
    #[serde(rename = "author", default)]
    pub author_label: Option<String>,
}

impl PuzzlePayload {
    pub fn new(ciphertext: impl Into<String>, author_label: impl Into<String>) -> Self {
        Self {
            ciphertext: Some(ciphertext.into()),
            author_label: Some(author_label.into()),
        }
    }
}

/// Answer to a [`Request`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Guess the service acknowledged for the substituted letter
    Substitution(Option<Letter>),
    Checked { correct: bool },
    Revealed { solution: String },
}

/// Trait for puzzle service backends
pub trait PuzzleService: Send + Sync {
    /// Fetch a fresh puzzle
    fn fetch_puzzle(&self) -> ServiceResult<PuzzlePayload>;

    /// Record a guess (`None` clears) and return the acknowledged guess
    fn apply_substitution(&self, letter: Letter, guess: Option<Letter>)
        -> ServiceResult<Option<Letter>>;

    /// Whether the current guesses solve the puzzle
    fn check_solution(&self) -> ServiceResult<bool>;

    /// The plaintext solution
    fn reveal_solution(&self) -> ServiceResult<String>;

    /// Backend name for display
    fn backend_name(&self) -> &'static str;
}

/// Run a request against a service
pub fn dispatch(service: &dyn PuzzleService, request: &Request) -> ServiceResult<Response> {
    match request {
        Request::Substitute { proposal, .. } => service
            .apply_substitution(proposal.letter, proposal.guess)
            .map(Response::Substitution),
        Request::CheckSolution => service
            .check_solution()
            .map(|correct| Response::Checked { correct }),
        Request::RevealSolution => service
            .reveal_solution()
            .map(|solution| Response::Revealed { solution }),
    }
}

// ==================== Mock Backend ====================

#[derive(Debug, Default)]
struct MockState {
    payload: PuzzlePayload,
    solution: String,
    correct: bool,
    available: bool,
    rejected: HashSet<Letter>,
    normalized: HashMap<Letter, Option<Letter>>,
    guesses: HashMap<Letter, Option<Letter>>,
    substitution_calls: Vec<(Letter, Option<Letter>)>,
    check_calls: usize,
    reveal_calls: usize,
}

/// In-memory puzzle service with scripted answers
#[derive(Debug)]
pub struct MockPuzzleService {
    state: Mutex<MockState>,
}

impl MockPuzzleService {
    pub fn new(payload: PuzzlePayload) -> Self {
        Self {
            state: Mutex::new(MockState {
                payload,
                available: true,
                ..Default::default()
            }),
        }
    }

    /// Service for a ciphertext with a known solution
    pub fn with_puzzle(ciphertext: &str, author: &str, solution: &str) -> Self {
        let service = Self::new(PuzzlePayload::new(ciphertext, author));
        service.state().solution = solution.to_string();
        service
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set whether every call fails with `Unavailable`
    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    /// Reject substitutions for a ciphertext letter
    pub fn reject_letter(&self, letter: Letter) {
        self.state().rejected.insert(letter);
    }

    pub fn accept_letter(&self, letter: Letter) {
        self.state().rejected.remove(&letter);
    }

    /// Acknowledge any substitution for `letter` with `guess` instead
    pub fn normalize(&self, letter: Letter, guess: Option<Letter>) {
        self.state().normalized.insert(letter, guess);
    }

    /// Answer for the next solution checks
    pub fn set_correct(&self, correct: bool) {
        self.state().correct = correct;
    }

    /// Replace the puzzle returned by the next fetch
    pub fn set_payload(&self, payload: PuzzlePayload) {
        let mut state = self.state();
        state.payload = payload;
        state.guesses.clear();
    }

    /// Service-side guess for a letter
    pub fn server_guess(&self, letter: Letter) -> Option<Letter> {
        self.state().guesses.get(&letter).copied().flatten()
    }

    /// Every substitution received, in order
    pub fn substitution_calls(&self) -> Vec<(Letter, Option<Letter>)> {
        self.state().substitution_calls.clone()
    }

    pub fn check_calls(&self) -> usize {
        self.state().check_calls
    }

    pub fn reveal_calls(&self) -> usize {
        self.state().reveal_calls
    }
}

impl PuzzleService for MockPuzzleService {
    fn fetch_puzzle(&self) -> ServiceResult<PuzzlePayload> {
        let state = self.state();
        if !state.available {
            return Err(ServiceError::Unavailable);
        }
        Ok(state.payload.clone())
    }

    fn apply_substitution(
        &self,
        letter: Letter,
        guess: Option<Letter>,
    ) -> ServiceResult<Option<Letter>> {
        let mut state = self.state();
        state.substitution_calls.push((letter, guess));
        if !state.available {
            return Err(ServiceError::Unavailable);
        }
        if state.rejected.contains(&letter) {
            return Err(ServiceError::Server(format!(
                "substitution for {letter} declined"
            )));
        }
        let acknowledged = state.normalized.get(&letter).copied().unwrap_or(guess);
        state.guesses.insert(letter, acknowledged);
        Ok(acknowledged)
    }

    fn check_solution(&self) -> ServiceResult<bool> {
        let mut state = self.state();
        state.check_calls += 1;
        if !state.available {
            return Err(ServiceError::Unavailable);
        }
        Ok(state.correct)
    }

    fn reveal_solution(&self) -> ServiceResult<String> {
        let mut state = self.state();
        state.reveal_calls += 1;
        if !state.available {
            return Err(ServiceError::Unavailable);
        }
        Ok(state.solution.clone())
    }

    fn backend_name(&self) -> &'static str {
        "Mock"
    }
}
