//! Generation orchestrator.
//!
//! The [`Orchestrator`] drives every flow that talks to the generation
//! service: diagram generation with one bounded retry, SQL export, audit and
//! fix-apply. State lives in a single [`Session`] behind a mutex that is only
//! held between suspension points, never across a service or oracle call.

use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use crate::{
    client::{Credential, TextGenerator},
    config::AppConfig,
    error::ErgenError,
    model::ModelId,
    prompt::PromptBuilder,
    sanitize::{sanitize, strip_code_fences},
    session::{
        ArtifactKind, ArtifactStart, FixResolution, FixStart, GenerationTicket, Resolution,
        Session, SessionSnapshot, View,
    },
    validate::Validator,
};

/// Result of a diagram generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The diagram was committed after `attempts` service calls.
    Committed { attempts: u8 },
    /// A newer request took over the diagram slot.
    Superseded,
}

/// Result of a derived-artifact request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Freshly derived and stored.
    Generated(String),
    /// Already derived for the current document; no call was made.
    Cached(String),
    /// A request for the current document is already in flight.
    Pending,
    /// There is no committed diagram yet.
    NoDocument,
    /// The service returned nothing usable; nothing was stored.
    NoContent,
    /// The document changed while the request was in flight.
    Superseded,
}

impl ArtifactOutcome {
    /// The artifact text, when one is available.
    pub fn text(&self) -> Option<&str> {
        match self {
            ArtifactOutcome::Generated(text) | ArtifactOutcome::Cached(text) => Some(text),
            _ => None,
        }
    }
}

/// Result of a fix-apply request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    Applied,
    /// A fix for the current document is already in flight.
    Pending,
    /// There is no document or no audit to apply.
    NotReady,
    Superseded,
}

/// Coordinates the generation service, the sanitizer and the validator
/// around one session.
pub struct Orchestrator {
    generator: Arc<dyn TextGenerator>,
    validator: Validator,
    prompts: PromptBuilder,
    session: Mutex<Session>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        validator: Validator,
        prompts: PromptBuilder,
        session: Session,
    ) -> Self {
        Self {
            generator,
            validator,
            prompts,
            session: Mutex::new(session),
        }
    }

    /// Build an orchestrator validating with the in-process grammar.
    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &AppConfig) -> Self {
        let generation = config.generation();
        Self::new(
            generator,
            Validator::default(),
            PromptBuilder::new(config.prompts()),
            Session::new(generation.model(), generation.credential()),
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(&*self.session.lock())
    }

    pub fn select_model(&self, model: ModelId) {
        self.session.lock().select_model(model);
    }

    pub fn set_credential(&self, credential: Option<Credential>) {
        self.session.lock().set_credential(credential);
    }

    /// Switch the active view. Returns `false` if it needs a missing document.
    pub fn select_view(&self, view: View) -> bool {
        self.session.lock().select_view(view)
    }

    /// Generate a diagram for `description` and commit it.
    ///
    /// Clears the current document and its artifacts, then calls the service.
    /// A candidate the oracle rejects is retried once without user action.
    ///
    /// # Errors
    ///
    /// - [`ErgenError::EmptyDescription`] for a blank description; nothing changes.
    /// - [`ErgenError::MissingCredential`] without calling the service.
    /// - [`ErgenError::GenerationService`] when a service call fails.
    /// - [`ErgenError::RetryExhausted`] when both candidates were rejected.
    pub async fn generate_diagram(
        &self,
        description: &str,
    ) -> Result<GenerationOutcome, ErgenError> {
        let description = description.trim();
        if description.is_empty() {
            let error = ErgenError::EmptyDescription;
            self.session.lock().record_error(&error);
            return Err(error);
        }

        let prompt = self.prompts.diagram(description);
        let ticket = self.session.lock().begin_generation()?;
        let mut attempt = 0;

        loop {
            debug!(epoch = ticket.epoch().get(), attempt = attempt; "Requesting diagram markup");
            let response = self
                .generator
                .generate(&prompt, ticket.model(), Some(ticket.credential()))
                .await;

            let raw = match response {
                Ok(raw) => raw,
                Err(err) => {
                    if !self.session.lock().record_service_failure(&ticket, &err) {
                        return Ok(self.superseded(&ticket));
                    }
                    return Err(err.into());
                }
            };

            if !self.session.lock().begin_validation(&ticket, attempt) {
                return Ok(self.superseded(&ticket));
            }
            let validation = self.validator.validate(sanitize(&raw)).await;

            let resolution = self.session.lock().resolve_validation(&ticket, validation);
            match resolution {
                Resolution::Committed => {
                    return Ok(GenerationOutcome::Committed {
                        attempts: attempt + 1,
                    });
                }
                Resolution::Retry { attempt: next } => {
                    if !self.session.lock().begin_retry(&ticket, next) {
                        return Ok(self.superseded(&ticket));
                    }
                    attempt = next;
                }
                Resolution::Exhausted { reason } => {
                    return Err(ErgenError::RetryExhausted { reason });
                }
                Resolution::Stale => return Ok(self.superseded(&ticket)),
            }
        }
    }

    /// Derive the SQL schema of the committed diagram.
    pub async fn export_sql(&self) -> Result<ArtifactOutcome, ErgenError> {
        self.derive(ArtifactKind::Sql).await
    }

    /// Audit the committed diagram.
    pub async fn audit(&self) -> Result<ArtifactOutcome, ErgenError> {
        self.derive(ArtifactKind::Audit).await
    }

    async fn derive(&self, kind: ArtifactKind) -> Result<ArtifactOutcome, ErgenError> {
        let start = self.session.lock().begin_artifact(kind)?;
        let ticket = match start {
            ArtifactStart::Ready(ticket) => ticket,
            ArtifactStart::Cached(text) => return Ok(ArtifactOutcome::Cached(text)),
            ArtifactStart::Pending => return Ok(ArtifactOutcome::Pending),
            ArtifactStart::NoDocument => return Ok(ArtifactOutcome::NoDocument),
        };

        let prompt = match kind {
            ArtifactKind::Sql => self.prompts.sql(ticket.markup()),
            ArtifactKind::Audit => self.prompts.audit(ticket.markup()),
        };
        let result = self
            .generator
            .generate(&prompt, ticket.model(), Some(ticket.credential()))
            .await
            .map(|raw| clean_artifact(kind, &raw));

        let stored = self.session.lock().finish_artifact(&ticket, result)?;
        Ok(match stored {
            None => ArtifactOutcome::Superseded,
            Some(text) if text.is_empty() => ArtifactOutcome::NoContent,
            Some(text) => ArtifactOutcome::Generated(text),
        })
    }

    /// Rewrite the committed diagram to apply the current audit.
    ///
    /// The result is sanitized and validated like a generated diagram but is
    /// never retried: a rejected rewrite fails with
    /// [`ErgenError::FixRejected`] and the document stays as it was.
    pub async fn apply_fixes(&self) -> Result<FixOutcome, ErgenError> {
        let start = self.session.lock().begin_fix()?;
        let ticket = match start {
            FixStart::Ready(ticket) => ticket,
            FixStart::Pending => return Ok(FixOutcome::Pending),
            FixStart::NotReady => return Ok(FixOutcome::NotReady),
        };

        let prompt = self.prompts.fix(ticket.markup(), ticket.audit());
        let result = match self
            .generator
            .generate(&prompt, ticket.model(), Some(ticket.credential()))
            .await
        {
            Ok(raw) => Ok(self.validator.validate(sanitize(&raw)).await),
            Err(err) => Err(err),
        };

        let resolution = self.session.lock().finish_fix(&ticket, result)?;
        Ok(match resolution {
            FixResolution::Applied => FixOutcome::Applied,
            FixResolution::Stale => FixOutcome::Superseded,
        })
    }

    fn superseded(&self, ticket: &GenerationTicket) -> GenerationOutcome {
        info!(epoch = ticket.epoch().get(); "Discarding superseded generation");
        GenerationOutcome::Superseded
    }
}

/// Post-process a derived artifact. SQL loses its code fences; both are trimmed.
fn clean_artifact(kind: ArtifactKind, raw: &str) -> String {
    match kind {
        ArtifactKind::Sql => strip_code_fences(raw).trim().to_string(),
        ArtifactKind::Audit => raw.trim().to_string(),
    }
}
