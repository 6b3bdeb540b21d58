//! HTTP puzzle service
//!
//! Endpoints:
//! - `GET  /get_cryptogram`     -> `{"cryptogram": ..., "author": ...}`
//! - `POST /apply_substitution` `{"substitution": "A=B"}` -> `{"updatedGuess": ...}`
//! - `POST /check_solution`     -> `{"correct": bool}`
//! - `POST /decrypt`            -> `{"solution": ...}`
//!
//! Any body with an `"error"` field is a server error, whatever the status.

use crate::config::RemoteConfig;
use cryptogram_core::{
    format_guess, parse_guess, Letter, PuzzlePayload, PuzzleService, ServiceError, ServiceResult,
};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct SubstitutionRequest {
    substitution: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubstitutionResponse {
    #[serde(default)]
    acknowledged_guess: Option<String>,
    /// Whole puzzle with guesses filled in, `_` for unset letters
    #[serde(default)]
    updated_guess: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    correct: bool,
}

#[derive(Debug, Deserialize)]
struct DecryptResponse {
    solution: String,
}

/// Puzzle service reached over HTTP
pub struct RemotePuzzleService {
    base_url: String,
    client: Client,
    /// Ciphertext of the last fetched puzzle, used to read acknowledgments
    ciphertext: Mutex<Option<String>>,
}

impl RemotePuzzleService {
    pub fn new(config: &RemoteConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            ciphertext: Mutex::new(None),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ServiceResult<T> {
        let response = request.send().map_err(|e| {
            warn!(error = %e, "puzzle service unreachable");
            ServiceError::Network(e.to_string())
        })?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            ServiceError::InvalidResponse(format!("HTTP {status}: not JSON ({e})"))
        })?;
        if let Some(error) = value.get("error") {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ServiceError::Server(message));
        }
        if !status.is_success() {
            return Err(ServiceError::Server(format!("HTTP {status}")));
        }
        serde_json::from_value(value).map_err(|e| ServiceError::InvalidResponse(e.to_string()))
    }

    /// The guess the server recorded for `letter`
    fn acknowledged(
        &self,
        letter: Letter,
        response: SubstitutionResponse,
    ) -> ServiceResult<Option<Letter>> {
        if let Some(ack) = response.acknowledged_guess {
            return parse_guess(&ack).map_err(|e| ServiceError::InvalidResponse(e.to_string()));
        }

        let updated = response.updated_guess.ok_or_else(|| {
            ServiceError::InvalidResponse("missing updatedGuess".into())
        })?;
        let ciphertext = self
            .ciphertext
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ServiceError::InvalidResponse("no puzzle fetched".into()))?;

        let index = ciphertext
            .chars()
            .position(|c| c.to_ascii_uppercase() == letter.as_char())
            .ok_or_else(|| {
                ServiceError::InvalidResponse(format!("{letter} is not in the puzzle"))
            })?;
        match updated.chars().nth(index) {
            Some('_') => Ok(None),
            Some(c) => Letter::from_char(c).map(Some).ok_or_else(|| {
                ServiceError::InvalidResponse(format!("unexpected guess {c:?} for {letter}"))
            }),
            None => Err(ServiceError::InvalidResponse(
                "updatedGuess shorter than the puzzle".into(),
            )),
        }
    }
}

impl PuzzleService for RemotePuzzleService {
    fn fetch_puzzle(&self) -> ServiceResult<PuzzlePayload> {
        let payload: PuzzlePayload = self.send(self.client.get(self.url("get_cryptogram")))?;
        debug!(author = ?payload.author_label, "fetched puzzle");
        *self
            .ciphertext
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = payload.ciphertext.clone();
        Ok(payload)
    }

    fn apply_substitution(
        &self,
        letter: Letter,
        guess: Option<Letter>,
    ) -> ServiceResult<Option<Letter>> {
        let body = SubstitutionRequest {
            substitution: format!("{}={}", letter, format_guess(guess)),
        };
        let response: SubstitutionResponse =
            self.send(self.client.post(self.url("apply_substitution")).json(&body))?;
        self.acknowledged(letter, response)
    }

    fn check_solution(&self) -> ServiceResult<bool> {
        let response: CheckResponse = self.send(self.client.post(self.url("check_solution")))?;
        Ok(response.correct)
    }

    fn reveal_solution(&self) -> ServiceResult<String> {
        let response: DecryptResponse = self.send(self.client.post(self.url("decrypt")))?;
        Ok(response.solution)
    }

    fn backend_name(&self) -> &'static str {
        "Remote"
    }
}
