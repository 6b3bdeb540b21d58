use crate::engine::Engine;
use crate::error::EngineError;
use crate::navigation::InputEvent;
use crate::service::{dispatch, PuzzleService};
use crate::substitution::Proposal;

/// Blocking driver: every request goes to the service before the next
/// event is handled.
///
/// The terminal front end runs requests on a worker instead so input stays
/// responsive; this is the simple path for scripts and tests.
pub struct Session<'s> {
    engine: Engine,
    service: &'s dyn PuzzleService,
}

impl<'s> Session<'s> {
    /// Fetch a puzzle and start playing it
    pub fn start(service: &'s dyn PuzzleService) -> Result<Self, EngineError> {
        let payload = service.fetch_puzzle().map_err(EngineError::FetchFailed)?;
        let mut engine = Engine::from_payload(payload)?;
        engine.focus_first();
        Ok(Self { engine, service })
    }

    /// Handle one event and wait for any request it produces
    pub fn press(&mut self, event: InputEvent) -> Result<(), EngineError> {
        match self.engine.handle(event) {
            Some(outgoing) => {
                let outcome = dispatch(self.service, &outgoing.request);
                self.engine.resolve(outgoing.ticket, outcome)
            }
            None => Ok(()),
        }
    }

    /// Send a proposal to the service and wait for the answer.
    ///
    /// The edit is made at the cursor when it sits on the proposal's letter,
    /// otherwise at the letter's first occurrence.
    pub fn apply(&mut self, proposal: Proposal) -> Result<(), EngineError> {
        let engine = &self.engine;
        let origin = engine
            .cursor()
            .position()
            .filter(|&p| engine.layout().letter_at(p) == Some(proposal.letter))
            .or_else(|| engine.map().positions(proposal.letter).first().copied());
        let Some(origin) = origin else {
            return Err(EngineError::SubstitutionRejected {
                letter: proposal.letter,
                reason: "letter does not appear in the puzzle".into(),
            });
        };

        self.press(InputEvent::Focus(origin))?;
        let event = match proposal.guess {
            Some(guess) => InputEvent::Letter(guess),
            None => InputEvent::Clear,
        };
        self.press(event)
    }

    /// Request the solution; fails with `RevealAlreadyTriggered` on a second call
    pub fn reveal(&mut self) -> Result<(), EngineError> {
        let outgoing = self.engine.request_reveal()?;
        let outcome = dispatch(self.service, &outgoing.request);
        self.engine.resolve(outgoing.ticket, outcome)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }
}
