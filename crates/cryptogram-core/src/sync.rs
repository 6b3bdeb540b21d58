//! Sync coordinator: two-phase commit of substitutions.
//!
//! A proposal is first *issued* (it gets a ticket and, for display only,
//! shows speculatively). When the service answers, the ticket is
//! *resolved*: success commits the acknowledged guess to the map,
//! failure drops the speculative value so cells show the next-newest
//! outstanding proposal, or the committed guess. Acknowledgments commit in
//! arrival order. A late acknowledgment overwrites a newer commit for the
//! same letter; guesses are plain last-writer-wins values so this race is
//! accepted.

use crate::error::{EngineError, ServiceResult};
use crate::letter::Letter;
use crate::navigation::Request;
use crate::substitution::{Guesses, Proposal, SubstitutionMap};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Identifies one outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A substitution the service acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub letter: Letter,
    /// The acknowledged guess (may differ from what was proposed)
    pub guess: Option<Letter>,
    /// Every cell showing `letter`
    pub positions: Vec<usize>,
    /// Cell the edit was typed in
    pub origin: usize,
}

/// Tracks outstanding requests and the speculative display of proposals
#[derive(Debug, Default)]
pub struct SyncCoordinator {
    next_ticket: u64,
    in_flight: HashMap<Ticket, Request>,
    /// Outstanding proposals per letter, oldest first; the last one is displayed
    proposals: HashMap<Letter, Vec<(Ticket, Option<Letter>)>>,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an outgoing request and hand out its ticket
    pub fn issue(&mut self, request: Request) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        if let Request::Substitute { proposal, .. } = request {
            debug!(%ticket, letter = %proposal.letter, guess = ?proposal.guess, "substitution proposed");
            self.proposals
                .entry(proposal.letter)
                .or_default()
                .push((ticket, proposal.guess));
        }
        self.in_flight.insert(ticket, request);
        ticket
    }

    /// Remove and return the request behind a ticket
    pub fn take(&mut self, ticket: Ticket) -> Result<Request, EngineError> {
        self.in_flight
            .remove(&ticket)
            .ok_or(EngineError::UnknownTicket(ticket))
    }

    /// Resolve a substitution ticket already taken with [`take`](Self::take).
    ///
    /// On success the acknowledged guess is committed. On failure the map
    /// is untouched and `SubstitutionRejected` is returned. Either way the
    /// display falls back to the newest proposal still outstanding for the
    /// letter, or to the map when there is none.
    pub fn settle(
        &mut self,
        ticket: Ticket,
        proposal: Proposal,
        origin: usize,
        outcome: ServiceResult<Option<Letter>>,
        map: &mut SubstitutionMap,
    ) -> Result<Committed, EngineError> {
        if let Some(outstanding) = self.proposals.get_mut(&proposal.letter) {
            outstanding.retain(|(pending, _)| *pending != ticket);
            if outstanding.is_empty() {
                self.proposals.remove(&proposal.letter);
            }
        }

        match outcome {
            Ok(acknowledged) => {
                if acknowledged != proposal.guess {
                    info!(
                        letter = %proposal.letter,
                        proposed = ?proposal.guess,
                        acknowledged = ?acknowledged,
                        "service normalized substitution"
                    );
                }
                let positions = map.commit(proposal.letter, acknowledged);
                info!(%ticket, letter = %proposal.letter, guess = ?acknowledged, cells = positions.len(), "substitution committed");
                Ok(Committed {
                    letter: proposal.letter,
                    guess: acknowledged,
                    positions,
                    origin,
                })
            }
            Err(err) => {
                warn!(%ticket, letter = %proposal.letter, error = %err, "substitution rejected");
                Err(EngineError::SubstitutionRejected {
                    letter: proposal.letter,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Guess shown while a proposal for `letter` is outstanding
    pub fn speculative(&self, letter: Letter) -> Option<Option<Letter>> {
        self.proposals
            .get(&letter)
            .and_then(|outstanding| outstanding.last())
            .map(|&(_, guess)| guess)
    }

    pub fn is_pending(&self, letter: Letter) -> bool {
        self.proposals.contains_key(&letter)
    }

    /// Number of requests awaiting an answer
    pub fn outstanding(&self) -> usize {
        self.in_flight.len()
    }

    /// Map overlaid with speculative guesses, for display and navigation
    pub fn displayed<'a>(&'a self, map: &'a SubstitutionMap) -> Displayed<'a> {
        Displayed { sync: self, map }
    }
}

/// What the player currently sees for each letter
#[derive(Debug, Clone, Copy)]
pub struct Displayed<'a> {
    sync: &'a SyncCoordinator,
    map: &'a SubstitutionMap,
}

impl Guesses for Displayed<'_> {
    fn guess(&self, letter: Letter) -> Option<Letter> {
        self.sync
            .speculative(letter)
            .unwrap_or_else(|| self.map.current_guess(letter))
    }
}
