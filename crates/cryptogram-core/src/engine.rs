use crate::error::{EngineError, ServiceError, ServiceResult};
use crate::layout::{Cell, Layout};
use crate::letter::Letter;
use crate::navigation::{self, Cursor, InputEvent, Request};
use crate::service::{PuzzlePayload, Response};
use crate::substitution::{Guesses, SubstitutionMap};
use crate::sync::{Committed, SyncCoordinator, Ticket};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// A validated puzzle ready to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    pub ciphertext: String,
    pub author: String,
}

impl Puzzle {
    /// Validate fetched data. Missing fields make the puzzle unusable.
    pub fn from_payload(payload: PuzzlePayload) -> Result<Self, EngineError> {
        match (payload.ciphertext, payload.author_label) {
            (Some(ciphertext), Some(author)) => Ok(Self { ciphertext, author }),
            (None, _) => Err(EngineError::MalformedPuzzle("missing ciphertext".into())),
            (_, None) => Err(EngineError::MalformedPuzzle("missing author".into())),
        }
    }
}

/// Cells plus guesses for one loaded puzzle
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub layout: Layout,
    pub map: SubstitutionMap,
    pub author: String,
}

/// Colour of a feedback message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Info,
}

/// Advisory text for the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub text: String,
    pub tone: Tone,
}

/// Change notifications for the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// These cell positions show a different guess now
    CellsChanged(Vec<usize>),
    Feedback(Feedback),
    SolutionChecked { correct: bool },
    SolutionRevealed(String),
}

/// A request the caller must send to the puzzle service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outgoing {
    pub ticket: Ticket,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RevealState {
    Available,
    InFlight,
    Revealed(String),
    Failed,
}

/// Read-only projection of one cell for rendering
#[derive(Debug, Clone, Copy)]
pub struct CellView<'a> {
    pub cell: &'a Cell,
    /// Guess as displayed (speculative while a proposal is pending)
    pub guess: Option<Letter>,
    pub pending: bool,
    pub focused: bool,
    /// Another ciphertext letter shows the same guess
    pub conflicting: bool,
}

/// The substitution-consistency and navigation engine for one puzzle session
#[derive(Debug)]
pub struct Engine {
    snapshot: Snapshot,
    cursor: Cursor,
    sync: SyncCoordinator,
    reveal: RevealState,
    notifications: VecDeque<Notification>,
}

impl Engine {
    /// Start a session for a puzzle
    pub fn new(puzzle: Puzzle) -> Result<Self, EngineError> {
        let layout = Layout::build(&puzzle.ciphertext)?;
        let map = SubstitutionMap::new(&layout);
        info!(
            author = %puzzle.author,
            cells = layout.len(),
            letters = map.letter_count(),
            "puzzle loaded"
        );
        Ok(Self {
            snapshot: Snapshot {
                layout,
                map,
                author: puzzle.author,
            },
            cursor: Cursor::unset(),
            sync: SyncCoordinator::new(),
            reveal: RevealState::Available,
            notifications: VecDeque::new(),
        })
    }

    /// Start a session from fetched data
    pub fn from_payload(payload: PuzzlePayload) -> Result<Self, EngineError> {
        Self::new(Puzzle::from_payload(payload)?)
    }

    pub fn layout(&self) -> &Layout {
        &self.snapshot.layout
    }

    pub fn map(&self) -> &SubstitutionMap {
        &self.snapshot.map
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn author(&self) -> &str {
        &self.snapshot.author
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The solution, once revealed
    pub fn revealed_solution(&self) -> Option<&str> {
        match &self.reveal {
            RevealState::Revealed(solution) => Some(solution),
            _ => None,
        }
    }

    /// The solution was revealed; edits are ignored from now on
    pub fn is_finished(&self) -> bool {
        matches!(self.reveal, RevealState::Revealed(_))
    }

    /// Requests still waiting for the service
    pub fn outstanding(&self) -> usize {
        self.sync.outstanding()
    }

    /// Focus the first editable cell if nothing is focused yet
    pub fn focus_first(&mut self) {
        if !self.cursor.is_set() {
            self.cursor = Cursor::at(self.snapshot.layout.first_letter().unwrap_or(0));
        }
    }

    /// Displayed guess for a ciphertext letter
    pub fn displayed_guess(&self, letter: Letter) -> Option<Letter> {
        self.sync.displayed(&self.snapshot.map).guess(letter)
    }

    /// Handle one input event. Returns the request to send, if any.
    ///
    /// While the cursor is unset, any navigation or edit event only focuses
    /// the first letter cell; a typed guess is not applied. Call
    /// [`focus_first`](Self::focus_first) after loading to avoid losing the
    /// first keystroke.
    pub fn handle(&mut self, event: InputEvent) -> Option<Outgoing> {
        if self.is_finished() && matches!(event, InputEvent::Letter(_) | InputEvent::Clear) {
            debug!(?event, "edit ignored after reveal");
            return None;
        }

        let displayed = self.sync.displayed(&self.snapshot.map);
        let transition =
            navigation::transition(&self.snapshot.layout, &displayed, self.cursor, event);
        if transition.cursor != self.cursor {
            debug!(?event, from = ?self.cursor.position(), to = ?transition.cursor.position(), "cursor moved");
        }
        self.cursor = transition.cursor;

        match transition.request? {
            Request::RevealSolution => self.request_reveal().ok(),
            request => Some(self.issue(request)),
        }
    }

    /// Ask for the solution. Only the first call in a session issues a request.
    pub fn request_reveal(&mut self) -> Result<Outgoing, EngineError> {
        if self.reveal != RevealState::Available {
            debug!("solution reveal already triggered");
            return Err(EngineError::RevealAlreadyTriggered);
        }
        self.reveal = RevealState::InFlight;
        Ok(self.issue(Request::RevealSolution))
    }

    fn issue(&mut self, request: Request) -> Outgoing {
        let ticket = self.sync.issue(request);
        if let Request::Substitute { proposal, .. } = request {
            let positions = self.snapshot.map.positions(proposal.letter).to_vec();
            self.notify(Notification::CellsChanged(positions));
        }
        Outgoing { ticket, request }
    }

    /// Feed the service's answer for a ticket back into the engine.
    ///
    /// Failures are recovered here (reverted, reported as feedback) and
    /// also returned so callers can log them.
    pub fn resolve(
        &mut self,
        ticket: Ticket,
        outcome: ServiceResult<Response>,
    ) -> Result<(), EngineError> {
        let request = self.sync.take(ticket).inspect_err(|_| {
            warn!(%ticket, "completion for unknown ticket dropped");
        })?;

        match request {
            Request::Substitute { proposal, origin } => {
                let outcome = outcome.and_then(|response| match response {
                    Response::Substitution(acknowledged) => Ok(acknowledged),
                    other => Err(mismatched(&other)),
                });
                let result = self.sync.settle(
                    ticket,
                    proposal,
                    origin,
                    outcome,
                    &mut self.snapshot.map,
                );
                match result {
                    Ok(committed) => {
                        self.on_committed(committed);
                        Ok(())
                    }
                    Err(err) => {
                        let positions = self.snapshot.map.positions(proposal.letter).to_vec();
                        self.notify(Notification::CellsChanged(positions));
                        self.feedback(
                            format!("Could not apply substitution for {}", proposal.letter),
                            Tone::Error,
                        );
                        Err(err)
                    }
                }
            }
            Request::CheckSolution => {
                match outcome {
                    Ok(Response::Checked { correct }) => {
                        info!(correct, "solution checked");
                        self.notify(Notification::SolutionChecked { correct });
                        if correct {
                            self.feedback("Solved! Well done.", Tone::Success);
                        } else {
                            self.feedback("Not solved yet. Keep trying!", Tone::Error);
                        }
                    }
                    Ok(other) => self.check_failed(mismatched(&other)),
                    Err(err) => self.check_failed(err),
                }
                Ok(())
            }
            Request::RevealSolution => {
                match outcome {
                    Ok(Response::Revealed { solution }) => {
                        info!("solution revealed");
                        self.reveal = RevealState::Revealed(solution.clone());
                        self.feedback(format!("Game over. Solution: {solution}"), Tone::Info);
                        self.notify(Notification::SolutionRevealed(solution));
                    }
                    Ok(other) => self.reveal_failed(mismatched(&other)),
                    Err(err) => self.reveal_failed(err),
                }
                Ok(())
            }
        }
    }

    fn on_committed(&mut self, committed: Committed) {
        // The cursor only follows an edit it is still sitting on
        if self.cursor.position() == Some(committed.origin) {
            let displayed = self.sync.displayed(&self.snapshot.map);
            if let Some(next) =
                navigation::advance_target(&self.snapshot.layout, &displayed, committed.origin)
            {
                self.cursor = Cursor::at(next);
            }
        }

        let text = match committed.guess {
            Some(guess) => format!("Substitution applied: {} → {}", committed.letter, guess),
            None => format!("Cleared {}", committed.letter),
        };
        self.notify(Notification::CellsChanged(committed.positions));
        self.feedback(text, Tone::Success);
    }

    fn check_failed(&mut self, err: ServiceError) {
        warn!(error = %err, "solution check failed");
        self.feedback("Could not check the solution", Tone::Error);
    }

    fn reveal_failed(&mut self, err: ServiceError) {
        warn!(error = %err, "solution reveal failed");
        self.reveal = RevealState::Failed;
        self.feedback(format!("Could not reveal the solution: {err}"), Tone::Error);
    }

    fn feedback(&mut self, text: impl Into<String>, tone: Tone) {
        self.notify(Notification::Feedback(Feedback {
            text: text.into(),
            tone,
        }));
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
    }

    /// Take all notifications produced since the last call
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    /// Project every cell with its displayed state
    pub fn cells(&self) -> impl Iterator<Item = CellView<'_>> + '_ {
        let displayed = self.sync.displayed(&self.snapshot.map);
        self.snapshot.layout.cells().iter().map(move |cell| {
            let letter = cell.letter();
            CellView {
                cell,
                guess: letter.and_then(|l| displayed.guess(l)),
                pending: letter.is_some_and(|l| self.sync.is_pending(l)),
                focused: self.cursor.position() == Some(cell.position),
                conflicting: letter.is_some_and(|l| self.snapshot.map.is_conflicting(l)),
            }
        })
    }

    /// The puzzle with guesses filled in and `_` for unset letters
    pub fn guessed_text(&self) -> String {
        self.snapshot
            .layout
            .cells()
            .iter()
            .map(|cell| match cell.letter() {
                Some(letter) => self
                    .snapshot
                    .map
                    .current_guess(letter)
                    .map(|g| g.to_string())
                    .unwrap_or_else(|| "_".to_string()),
                None => cell.source_text(),
            })
            .collect()
    }
}

fn mismatched(response: &Response) -> ServiceError {
    ServiceError::InvalidResponse(format!("unexpected response {response:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter(c: char) -> Letter {
        Letter::from_char(c).unwrap()
    }

    fn engine(text: &str) -> Engine {
        let mut engine = Engine::new(Puzzle {
            ciphertext: text.into(),
            author: "Anon".into(),
        })
        .unwrap();
        engine.focus_first();
        engine
    }

    fn type_and_ack(engine: &mut Engine, c: char) {
        let outgoing = engine.handle(InputEvent::Letter(letter(c))).unwrap();
        let Request::Substitute { proposal, .. } = outgoing.request else {
            panic!("expected substitution");
        };
        engine
            .resolve(outgoing.ticket, Ok(Response::Substitution(proposal.guess)))
            .unwrap();
    }

    #[test]
    fn test_from_payload_requires_both_fields() {
        let missing_author = PuzzlePayload {
            ciphertext: Some("PZB".into()),
            author_label: None,
        };
        assert!(matches!(
            Engine::from_payload(missing_author),
            Err(EngineError::MalformedPuzzle(_))
        ));
        let missing_text = PuzzlePayload {
            ciphertext: None,
            author_label: Some("Anon".into()),
        };
        assert!(matches!(
            Engine::from_payload(missing_text),
            Err(EngineError::MalformedPuzzle(_))
        ));
        assert!(Engine::from_payload(PuzzlePayload::new("PZB", "Anon")).is_ok());
    }

    #[test]
    fn test_cursor_starts_unset() {
        let engine = Engine::from_payload(PuzzlePayload::new("..AB", "Anon")).unwrap();
        assert_eq!(engine.cursor(), Cursor::unset());
    }

    #[test]
    fn test_letter_while_unset_only_focuses() {
        let mut engine = Engine::from_payload(PuzzlePayload::new("..AB", "Anon")).unwrap();
        assert!(engine.handle(InputEvent::Letter(letter('X'))).is_none());
        assert_eq!(engine.cursor(), Cursor::at(2));
        assert_eq!(engine.displayed_guess(letter('A')), None);
        assert_eq!(engine.outstanding(), 0);

        assert!(engine.handle(InputEvent::Letter(letter('X'))).is_some());
    }

    #[test]
    fn test_pzb_commit_moves_to_next_cell() {
        let mut engine = engine("PZB");
        type_and_ack(&mut engine, 'T');

        let guesses: Vec<Option<Letter>> = engine.cells().map(|v| v.guess).collect();
        assert_eq!(guesses, vec![Some(letter('T')), None, None]);
        assert_eq!(engine.cursor(), Cursor::at(1));
    }

    #[test]
    fn test_pzp_autofill_and_next_unfilled() {
        let mut engine = engine("PZP");
        type_and_ack(&mut engine, 'A');

        let guesses: Vec<Option<Letter>> = engine.cells().map(|v| v.guess).collect();
        assert_eq!(guesses, vec![Some(letter('A')), None, Some(letter('A'))]);
        assert_eq!(engine.cursor(), Cursor::at(1));
    }

    #[test]
    fn test_pending_edit_is_speculative() {
        let mut engine = engine("PZB");
        let outgoing = engine.handle(InputEvent::Letter(letter('T'))).unwrap();

        let first = engine.cells().next().unwrap();
        assert_eq!(first.guess, Some(letter('T')));
        assert!(first.pending);
        assert_eq!(engine.map().current_guess(letter('P')), None);
        assert_eq!(engine.cursor(), Cursor::at(0));
        assert_eq!(engine.outstanding(), 1);

        engine
            .resolve(outgoing.ticket, Ok(Response::Substitution(Some(letter('T')))))
            .unwrap();
        assert!(!engine.cells().next().unwrap().pending);
    }

    #[test]
    fn test_failed_substitution_reverts_and_stays() {
        let mut engine = engine("PZB");
        type_and_ack(&mut engine, 'T');
        engine.handle(InputEvent::Left);
        assert_eq!(engine.cursor(), Cursor::at(0));
        let before = engine.map().clone();
        engine.drain_notifications();

        let outgoing = engine.handle(InputEvent::Letter(letter('S'))).unwrap();
        let err = engine
            .resolve(outgoing.ticket, Err(ServiceError::Network("offline".into())))
            .unwrap_err();

        assert!(matches!(err, EngineError::SubstitutionRejected { .. }));
        assert_eq!(engine.map(), &before);
        assert_eq!(engine.displayed_guess(letter('P')), Some(letter('T')));
        assert_eq!(engine.cursor(), Cursor::at(0));

        let notes = engine.drain_notifications();
        assert!(notes.iter().any(|n| matches!(
            n,
            Notification::Feedback(Feedback { tone: Tone::Error, .. })
        )));
    }

    #[test]
    fn test_failed_newer_edit_shows_older_pending_edit() {
        let mut engine = engine("PZB");
        type_and_ack(&mut engine, 'T');
        engine.handle(InputEvent::Left);

        let first = engine.handle(InputEvent::Letter(letter('S'))).unwrap();
        let second = engine.handle(InputEvent::Letter(letter('R'))).unwrap();
        assert_eq!(engine.displayed_guess(letter('P')), Some(letter('R')));

        engine
            .resolve(second.ticket, Err(ServiceError::Network("offline".into())))
            .unwrap_err();
        assert_eq!(engine.displayed_guess(letter('P')), Some(letter('S')));
        assert!(engine.cells().next().unwrap().pending);
        assert_eq!(engine.outstanding(), 1);

        engine
            .resolve(first.ticket, Ok(Response::Substitution(Some(letter('S')))))
            .unwrap();
        assert_eq!(engine.map().current_guess(letter('P')), Some(letter('S')));
        assert!(!engine.cells().next().unwrap().pending);
    }

    #[test]
    fn test_server_normalized_value_is_committed() {
        let mut engine = engine("PZB");
        let outgoing = engine.handle(InputEvent::Letter(letter('T'))).unwrap();
        engine
            .resolve(outgoing.ticket, Ok(Response::Substitution(Some(letter('Q')))))
            .unwrap();
        assert_eq!(engine.map().current_guess(letter('P')), Some(letter('Q')));
    }

    #[test]
    fn test_clear_moves_forward_after_commit() {
        let mut engine = engine("PZB");
        type_and_ack(&mut engine, 'T');
        type_and_ack(&mut engine, 'H');
        type_and_ack(&mut engine, 'E');
        // B is the last cell, all set: cursor stays on B
        assert_eq!(engine.cursor(), Cursor::at(2));

        engine.handle(InputEvent::Focus(0));
        let outgoing = engine.handle(InputEvent::Clear).unwrap();
        assert_eq!(engine.cursor(), Cursor::at(0));
        engine
            .resolve(outgoing.ticket, Ok(Response::Substitution(None)))
            .unwrap();

        assert_eq!(engine.map().current_guess(letter('P')), None);
        // Everything after P is filled, so fall back to the next cell
        assert_eq!(engine.cursor(), Cursor::at(1));
    }

    #[test]
    fn test_commit_does_not_yank_a_moved_cursor() {
        let mut engine = engine("PZBQ");
        let outgoing = engine.handle(InputEvent::Letter(letter('T'))).unwrap();
        engine.handle(InputEvent::Focus(3));
        engine
            .resolve(outgoing.ticket, Ok(Response::Substitution(Some(letter('T')))))
            .unwrap();
        assert_eq!(engine.cursor(), Cursor::at(3));
    }

    #[test]
    fn test_reveal_is_guarded() {
        let mut engine = engine("PZB");
        let outgoing = engine.handle(InputEvent::Reveal).unwrap();
        assert_eq!(outgoing.request, Request::RevealSolution);
        assert!(engine.handle(InputEvent::Reveal).is_none());
        assert_eq!(
            engine.request_reveal(),
            Err(EngineError::RevealAlreadyTriggered)
        );

        engine
            .resolve(
                outgoing.ticket,
                Ok(Response::Revealed {
                    solution: "THE".into(),
                }),
            )
            .unwrap();
        assert_eq!(engine.revealed_solution(), Some("THE"));
        assert!(engine.is_finished());
        assert!(engine.handle(InputEvent::Letter(letter('X'))).is_none());
        assert!(engine.handle(InputEvent::Reveal).is_none());
    }

    #[test]
    fn test_failed_reveal_is_not_retried() {
        let mut engine = engine("PZB");
        let outgoing = engine.handle(InputEvent::Reveal).unwrap();
        engine
            .resolve(outgoing.ticket, Err(ServiceError::Server("boom".into())))
            .unwrap();
        assert!(!engine.is_finished());
        assert!(engine.handle(InputEvent::Reveal).is_none());
    }

    #[test]
    fn test_check_solution_feedback() {
        let mut engine = engine("PZB");
        let outgoing = engine.handle(InputEvent::Submit).unwrap();
        assert_eq!(engine.cursor(), Cursor::at(0));
        engine
            .resolve(outgoing.ticket, Ok(Response::Checked { correct: false }))
            .unwrap();
        let notes = engine.drain_notifications();
        assert!(notes.contains(&Notification::SolutionChecked { correct: false }));
    }

    #[test]
    fn test_mismatched_response_is_a_failure() {
        let mut engine = engine("PZB");
        let outgoing = engine.handle(InputEvent::Letter(letter('T'))).unwrap();
        let result = engine.resolve(outgoing.ticket, Ok(Response::Checked { correct: true }));
        assert!(matches!(
            result,
            Err(EngineError::SubstitutionRejected { .. })
        ));
        assert_eq!(engine.map().current_guess(letter('P')), None);
    }

    #[test]
    fn test_unknown_ticket_is_reported() {
        let mut engine = engine("PZB");
        let outgoing = engine.handle(InputEvent::Submit).unwrap();
        engine
            .resolve(outgoing.ticket, Ok(Response::Checked { correct: true }))
            .unwrap();
        assert_eq!(
            engine.resolve(outgoing.ticket, Ok(Response::Checked { correct: true })),
            Err(EngineError::UnknownTicket(outgoing.ticket))
        );
    }

    #[test]
    fn test_guessed_text() {
        let mut engine = engine("PZP, Z!");
        type_and_ack(&mut engine, 'A');
        assert_eq!(engine.guessed_text(), "A_A, _!");
    }

    #[test]
    fn test_cells_changed_covers_all_occurrences() {
        let mut engine = engine("PZP");
        engine.drain_notifications();
        type_and_ack(&mut engine, 'A');
        let notes = engine.drain_notifications();
        assert!(notes.contains(&Notification::CellsChanged(vec![0, 2])));
    }
}
