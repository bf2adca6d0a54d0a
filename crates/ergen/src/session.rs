//! Session state.
//!
//! A [`Session`] owns everything one interactive session knows: the selected
//! model, the credential, the committed [`DiagramDocument`], the artifacts
//! derived from it, and the bookkeeping that keeps them consistent.
//!
//! Every method here is synchronous and does no I/O. The
//! [`Orchestrator`](crate::orchestrator::Orchestrator) calls them between its
//! suspension points and hands back the tickets they issue.
//!
//! # Generation phases
//!
//! ```text
//! Idle -> Generating -> Validating -> Committed
//!                         |    \
//!                         |     -> RetryPending -> Generating (once)
//!                         -> Failed
//! ```
//!
//! # Epochs
//!
//! The diagram slot carries an [`Epoch`]. It advances when a generation
//! request starts and when a fix replaces the document. Every ticket records
//! the epoch it was issued under, and a result whose epoch is no longer
//! current is discarded.

use std::fmt;

use log::{debug, info, warn};

use crate::{
    client::{Credential, GenerationError},
    error::ErgenError,
    model::ModelId,
    validate::{ValidatedMarkup, Validation},
};

/// Automatic retries allowed per user-initiated generation request.
pub const MAX_RETRIES: u8 = 1;

/// Identifies the latest claim on the diagram slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counts automatic retries; capped at [`MAX_RETRIES`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryBudget {
    used: u8,
}

impl RetryBudget {
    /// Spend one retry, returning `false` when none is left.
    pub fn try_consume(&mut self) -> bool {
        if self.used < MAX_RETRIES {
            self.used += 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn used(&self) -> u8 {
        self.used
    }
}

/// Where the diagram-generation flow stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    /// Waiting on the generation service; `attempt` is 0 or 1.
    Generating { attempt: u8 },
    /// Waiting on the oracle.
    Validating { attempt: u8 },
    RetryPending,
    Committed,
    Failed,
}

/// The view a caller should present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Diagram,
    Markup,
    Sql,
    Audit,
}

/// A text artifact derived from the committed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Sql,
    Audit,
}

impl ArtifactKind {
    pub fn view(self) -> View {
        match self {
            ArtifactKind::Sql => View::Sql,
            ArtifactKind::Audit => View::Audit,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::Sql => "sql",
            ArtifactKind::Audit => "audit",
        }
    }
}

/// The committed, validated diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramDocument {
    markup: ValidatedMarkup,
}

impl DiagramDocument {
    pub fn markup(&self) -> &str {
        self.markup.as_str()
    }
}

/// Permission to run one generation request for the slot.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    epoch: Epoch,
    model: ModelId,
    credential: Credential,
}

impl GenerationTicket {
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// Permission to derive one artifact from the current document.
#[derive(Debug, Clone)]
pub struct ArtifactTicket {
    kind: ArtifactKind,
    epoch: Epoch,
    model: ModelId,
    credential: Credential,
    markup: String,
}

impl ArtifactTicket {
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }
}

/// Permission to apply the current audit to the current document.
#[derive(Debug, Clone)]
pub struct FixTicket {
    epoch: Epoch,
    model: ModelId,
    credential: Credential,
    markup: String,
    audit: String,
}

impl FixTicket {
    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn audit(&self) -> &str {
        &self.audit
    }
}

/// What to do after a candidate was validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The candidate is now the document.
    Committed,
    /// The candidate was rejected; run `attempt` next.
    Retry { attempt: u8 },
    /// The candidate was rejected and no retry is left.
    Exhausted { reason: String },
    /// A newer request owns the slot; the result was dropped.
    Stale,
}

/// How an artifact request can proceed.
#[derive(Debug, Clone)]
pub enum ArtifactStart {
    Ready(ArtifactTicket),
    /// Already derived for the current document.
    Cached(String),
    /// A request for the current document is in flight.
    Pending,
    NoDocument,
}

/// How a fix request can proceed.
#[derive(Debug, Clone)]
pub enum FixStart {
    Ready(FixTicket),
    Pending,
    /// There is no document or no audit to apply.
    NotReady,
}

/// Outcome of applying a fix response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixResolution {
    Applied,
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlight {
    pub sql: bool,
    pub audit: bool,
    pub fix: bool,
}

impl InFlight {
    fn artifact_mut(&mut self, kind: ArtifactKind) -> &mut bool {
        match kind {
            ArtifactKind::Sql => &mut self.sql,
            ArtifactKind::Audit => &mut self.audit,
        }
    }
}

/// State of one interactive session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    model: ModelId,
    credential: Option<Credential>,
    phase: Phase,
    epoch: Epoch,
    retries: RetryBudget,
    document: Option<DiagramDocument>,
    sql: Option<String>,
    audit: Option<String>,
    error: Option<String>,
    view: View,
    in_flight: InFlight,
}

impl Session {
    pub fn new(model: ModelId, credential: Option<Credential>) -> Self {
        Self {
            model,
            credential,
            ..Self::default()
        }
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn retries(&self) -> RetryBudget {
        self.retries
    }

    pub fn document(&self) -> Option<&DiagramDocument> {
        self.document.as_ref()
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Sql => self.sql.as_deref(),
            ArtifactKind::Audit => self.audit.as_deref(),
        }
    }

    /// The user-visible error, if the last operation failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight
    }

    pub fn select_model(&mut self, model: ModelId) {
        self.model = model;
    }

    pub fn set_credential(&mut self, credential: Option<Credential>) {
        self.credential = credential;
    }

    /// Switch the active view. `Sql` and `Audit` need a document.
    pub fn select_view(&mut self, view: View) -> bool {
        if matches!(view, View::Sql | View::Audit) && self.document.is_none() {
            return false;
        }
        self.view = view;
        true
    }

    /// Record a rejected request that never reached the service.
    pub fn record_error(&mut self, error: &ErgenError) {
        self.error = Some(error.to_string());
    }

    /// Claim the diagram slot for a new user-initiated generation request.
    ///
    /// Supersedes any request in flight, resets the retry budget and clears
    /// the document with everything derived from it.
    ///
    /// # Errors
    ///
    /// [`ErgenError::MissingCredential`] when no credential is set; the phase
    /// becomes [`Phase::Failed`].
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, ErgenError> {
        self.epoch = self.epoch.next();
        self.retries.reset();
        self.document = None;
        self.sql = None;
        self.audit = None;
        self.error = None;
        self.view = View::Diagram;
        self.in_flight = InFlight::default();

        let Some(credential) = self.credential.clone() else {
            warn!(epoch = self.epoch.0; "Generation requested without a credential");
            self.phase = Phase::Failed;
            let error = ErgenError::MissingCredential;
            self.record_error(&error);
            return Err(error);
        };

        info!(epoch = self.epoch.0, model = self.model.id(); "Generation started");
        self.phase = Phase::Generating { attempt: 0 };
        Ok(GenerationTicket {
            epoch: self.epoch,
            model: self.model,
            credential,
        })
    }

    /// The service answered for `attempt`; move on to validation.
    ///
    /// Returns `false` when the ticket is stale.
    pub fn begin_validation(&mut self, ticket: &GenerationTicket, attempt: u8) -> bool {
        if !self.is_current(ticket.epoch) {
            return false;
        }
        self.phase = Phase::Validating { attempt };
        true
    }

    /// Apply a validation result to the slot.
    pub fn resolve_validation(
        &mut self,
        ticket: &GenerationTicket,
        validation: Validation,
    ) -> Resolution {
        if !self.is_current(ticket.epoch) {
            return Resolution::Stale;
        }

        match validation {
            Validation::Valid(markup) => {
                self.commit(markup);
                info!(epoch = self.epoch.0; "Diagram committed");
                Resolution::Committed
            }
            Validation::Invalid { reason } => {
                if self.retries.try_consume() {
                    debug!(epoch = self.epoch.0, reason = reason.as_str(); "Invalid markup, retrying");
                    self.phase = Phase::RetryPending;
                    Resolution::Retry {
                        attempt: self.retries.used(),
                    }
                } else {
                    warn!(epoch = self.epoch.0, reason = reason.as_str(); "Invalid markup twice");
                    self.phase = Phase::Failed;
                    self.error = Some(
                        ErgenError::RetryExhausted {
                            reason: reason.clone(),
                        }
                        .to_string(),
                    );
                    Resolution::Exhausted { reason }
                }
            }
        }
    }

    /// Re-enter [`Phase::Generating`] after [`Resolution::Retry`].
    pub fn begin_retry(&mut self, ticket: &GenerationTicket, attempt: u8) -> bool {
        if !self.is_current(ticket.epoch) || self.phase != Phase::RetryPending {
            return false;
        }
        self.phase = Phase::Generating { attempt };
        true
    }

    /// The service call failed; surface its message verbatim.
    ///
    /// Returns `false` when the ticket is stale and nothing changed.
    pub fn record_service_failure(
        &mut self,
        ticket: &GenerationTicket,
        error: &GenerationError,
    ) -> bool {
        if !self.is_current(ticket.epoch) {
            return false;
        }
        warn!(epoch = self.epoch.0, error = error.to_string().as_str(); "Generation failed");
        self.phase = Phase::Failed;
        self.error = Some(error.to_string());
        true
    }

    /// Start deriving `kind` from the current document.
    ///
    /// # Errors
    ///
    /// [`ErgenError::MissingCredential`] when no credential is set.
    pub fn begin_artifact(&mut self, kind: ArtifactKind) -> Result<ArtifactStart, ErgenError> {
        let Some(document) = &self.document else {
            return Ok(ArtifactStart::NoDocument);
        };
        if let Some(existing) = self.artifact(kind) {
            let existing = existing.to_string();
            self.view = kind.view();
            return Ok(ArtifactStart::Cached(existing));
        }
        if *self.in_flight.artifact_mut(kind) {
            return Ok(ArtifactStart::Pending);
        }
        let markup = document.markup().to_string();

        let Some(credential) = self.credential.clone() else {
            let error = ErgenError::MissingCredential;
            self.record_error(&error);
            return Err(error);
        };

        debug!(epoch = self.epoch.0, artifact = kind.name(); "Artifact requested");
        *self.in_flight.artifact_mut(kind) = true;
        self.view = kind.view();
        Ok(ArtifactStart::Ready(ArtifactTicket {
            kind,
            epoch: self.epoch,
            model: self.model,
            credential,
            markup,
        }))
    }

    /// Store or drop the result of an artifact request.
    ///
    /// Returns `Ok(None)` when the ticket is stale, `Ok(Some(text))` with the
    /// stored text, or `Ok(Some(""))` when the service had nothing to say; an
    /// empty result is never stored.
    ///
    /// # Errors
    ///
    /// The service failure, after recording it as the session error.
    pub fn finish_artifact(
        &mut self,
        ticket: &ArtifactTicket,
        result: Result<String, GenerationError>,
    ) -> Result<Option<String>, ErgenError> {
        if !self.is_current(ticket.epoch) {
            debug!(epoch = ticket.epoch.0, artifact = ticket.kind.name(); "Discarding stale artifact");
            return Ok(None);
        }
        *self.in_flight.artifact_mut(ticket.kind) = false;

        let text = match result {
            Ok(text) => text,
            Err(err) => {
                warn!(artifact = ticket.kind.name(), error = err.to_string().as_str(); "Artifact request failed");
                self.error = Some(err.to_string());
                return Err(err.into());
            }
        };

        self.error = None;
        if text.is_empty() {
            return Ok(Some(text));
        }
        info!(epoch = self.epoch.0, artifact = ticket.kind.name(), bytes = text.len(); "Artifact stored");
        match ticket.kind {
            ArtifactKind::Sql => self.sql = Some(text.clone()),
            ArtifactKind::Audit => self.audit = Some(text.clone()),
        }
        Ok(Some(text))
    }

    /// Start applying the current audit to the current document.
    ///
    /// # Errors
    ///
    /// [`ErgenError::MissingCredential`] when no credential is set.
    pub fn begin_fix(&mut self) -> Result<FixStart, ErgenError> {
        let (Some(document), Some(audit)) = (&self.document, &self.audit) else {
            return Ok(FixStart::NotReady);
        };
        if self.in_flight.fix {
            return Ok(FixStart::Pending);
        }
        let markup = document.markup().to_string();
        let audit = audit.clone();

        let Some(credential) = self.credential.clone() else {
            let error = ErgenError::MissingCredential;
            self.record_error(&error);
            return Err(error);
        };

        debug!(epoch = self.epoch.0; "Fix requested");
        self.in_flight.fix = true;
        Ok(FixStart::Ready(FixTicket {
            epoch: self.epoch,
            model: self.model,
            credential,
            markup,
            audit,
        }))
    }

    /// Apply the validated result of a fix request.
    ///
    /// A valid result replaces the document, clears both artifacts, advances
    /// the epoch and returns the view to the diagram. Fixes never consume the
    /// retry budget.
    ///
    /// # Errors
    ///
    /// The service failure, or [`ErgenError::FixRejected`] when the oracle
    /// rejected the result. The document is left untouched in both cases.
    pub fn finish_fix(
        &mut self,
        ticket: &FixTicket,
        result: Result<Validation, GenerationError>,
    ) -> Result<FixResolution, ErgenError> {
        if !self.is_current(ticket.epoch) {
            debug!(epoch = ticket.epoch.0; "Discarding stale fix");
            return Ok(FixResolution::Stale);
        }
        self.in_flight.fix = false;

        let reason = match result {
            Ok(Validation::Valid(markup)) => {
                self.epoch = self.epoch.next();
                self.commit(markup);
                info!(epoch = self.epoch.0; "Fix applied");
                return Ok(FixResolution::Applied);
            }
            Ok(Validation::Invalid { reason }) => reason,
            Err(err) => err.to_string(),
        };

        warn!(reason = reason.as_str(); "Fix failed");
        let error = ErgenError::FixRejected { reason };
        self.record_error(&error);
        Err(error)
    }

    fn commit(&mut self, markup: ValidatedMarkup) {
        self.document = Some(DiagramDocument { markup });
        self.sql = None;
        self.audit = None;
        self.in_flight = InFlight::default();
        self.retries.reset();
        self.error = None;
        self.phase = Phase::Committed;
        self.view = View::Diagram;
    }

    fn is_current(&self, epoch: Epoch) -> bool {
        self.epoch == epoch
    }
}

/// A point-in-time copy of a [`Session`] for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub model: ModelId,
    pub phase: Phase,
    pub epoch: Epoch,
    pub retries_used: u8,
    pub markup: Option<String>,
    pub sql: Option<String>,
    pub audit: Option<String>,
    pub error: Option<String>,
    pub view: View,
    pub in_flight: InFlight,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        Self {
            model: session.model,
            phase: session.phase,
            epoch: session.epoch,
            retries_used: session.retries.used(),
            markup: session.document.as_ref().map(|doc| doc.markup().to_string()),
            sql: session.sql.clone(),
            audit: session.audit.clone(),
            error: session.error.clone(),
            view: session.view,
            in_flight: session.in_flight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::Validator;

    fn credential() -> Option<Credential> {
        Credential::new("key")
    }

    async fn valid(markup: &str) -> Validation {
        let validation = Validator::default().validate(markup.to_string()).await;
        assert!(validation.is_valid(), "{markup}");
        validation
    }

    fn invalid() -> Validation {
        Validation::Invalid {
            reason: "bad".to_string(),
        }
    }

    async fn committed_session() -> Session {
        let mut session = Session::new(ModelId::default(), credential());
        let ticket = session.begin_generation().unwrap();
        let validation = valid("erDiagram\n    A ||--o{ B : has").await;
        assert_eq!(
            session.resolve_validation(&ticket, validation),
            Resolution::Committed
        );
        session
    }

    #[test]
    fn test_retry_budget_caps_at_one() {
        let mut budget = RetryBudget::default();
        assert!(budget.try_consume());
        assert!(!budget.try_consume());
        assert_eq!(budget.used(), MAX_RETRIES);

        budget.reset();
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_missing_credential_fails_generation() {
        let mut session = Session::new(ModelId::default(), None);

        assert!(matches!(
            session.begin_generation(),
            Err(ErgenError::MissingCredential)
        ));
        assert_eq!(session.phase(), Phase::Failed);
        assert!(session.error().is_some());
    }

    #[test]
    fn test_invalid_twice_fails() {
        let mut session = Session::new(ModelId::default(), credential());
        let ticket = session.begin_generation().unwrap();

        assert!(session.begin_validation(&ticket, 0));
        assert_eq!(
            session.resolve_validation(&ticket, invalid()),
            Resolution::Retry { attempt: 1 }
        );
        assert_eq!(session.phase(), Phase::RetryPending);
        assert!(session.error().is_none());

        assert!(session.begin_retry(&ticket, 1));
        assert_eq!(session.phase(), Phase::Generating { attempt: 1 });
        assert!(session.begin_validation(&ticket, 1));
        assert_eq!(
            session.resolve_validation(&ticket, invalid()),
            Resolution::Exhausted {
                reason: "bad".to_string()
            }
        );
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(
            session.error(),
            Some("the model produced invalid markup twice; simplify the description or change model.")
        );
    }

    #[tokio::test]
    async fn test_commit_resets_budget_and_error() {
        let mut session = Session::new(ModelId::default(), credential());
        let ticket = session.begin_generation().unwrap();
        session.resolve_validation(&ticket, invalid());
        session.begin_retry(&ticket, 1);

        let validation = valid("erDiagram\n    A").await;
        assert_eq!(
            session.resolve_validation(&ticket, validation),
            Resolution::Committed
        );
        assert_eq!(session.retries().used(), 0);
        assert_eq!(session.phase(), Phase::Committed);
        assert_eq!(session.document().unwrap().markup(), "erDiagram\n    A");
    }

    #[tokio::test]
    async fn test_new_generation_supersedes_old_ticket() {
        let mut session = Session::new(ModelId::default(), credential());
        let first = session.begin_generation().unwrap();
        let second = session.begin_generation().unwrap();

        assert!(second.epoch() > first.epoch());
        assert!(!session.begin_validation(&first, 0));
        let validation = valid("erDiagram\n    OLD").await;
        assert_eq!(session.resolve_validation(&first, validation), Resolution::Stale);
        assert!(session.document().is_none());
        assert!(!session.record_service_failure(&first, &GenerationError::service("late")));
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_artifact_lifecycle() {
        let mut session = committed_session().await;

        let ArtifactStart::Ready(ticket) = session.begin_artifact(ArtifactKind::Sql).unwrap() else {
            panic!("expected a ticket");
        };
        assert_eq!(session.view(), View::Sql);
        assert!(matches!(
            session.begin_artifact(ArtifactKind::Sql).unwrap(),
            ArtifactStart::Pending
        ));

        let stored = session
            .finish_artifact(&ticket, Ok("CREATE TABLE a ();".to_string()))
            .unwrap();
        assert_eq!(stored.as_deref(), Some("CREATE TABLE a ();"));
        assert!(matches!(
            session.begin_artifact(ArtifactKind::Sql).unwrap(),
            ArtifactStart::Cached(text) if text == "CREATE TABLE a ();"
        ));
    }

    #[tokio::test]
    async fn test_artifact_failure_leaves_it_absent() {
        let mut session = committed_session().await;
        let ArtifactStart::Ready(ticket) = session.begin_artifact(ArtifactKind::Audit).unwrap()
        else {
            panic!("expected a ticket");
        };

        let result = session.finish_artifact(&ticket, Err(GenerationError::service("quota")));

        assert!(matches!(
            result,
            Err(ErgenError::GenerationService { message }) if message == "quota"
        ));
        assert!(session.artifact(ArtifactKind::Audit).is_none());
        assert!(!session.in_flight().audit);
        assert_eq!(session.error(), Some("quota"));
    }

    #[tokio::test]
    async fn test_empty_artifact_not_stored() {
        let mut session = committed_session().await;
        let ArtifactStart::Ready(ticket) = session.begin_artifact(ArtifactKind::Sql).unwrap() else {
            panic!("expected a ticket");
        };

        assert_eq!(
            session.finish_artifact(&ticket, Ok(String::new())).unwrap(),
            Some(String::new())
        );
        assert!(session.artifact(ArtifactKind::Sql).is_none());
    }

    #[test]
    fn test_artifact_without_document() {
        let mut session = Session::new(ModelId::default(), None);

        assert!(matches!(
            session.begin_artifact(ArtifactKind::Sql),
            Ok(ArtifactStart::NoDocument)
        ));
        assert!(matches!(session.begin_fix(), Ok(FixStart::NotReady)));
        assert!(!session.select_view(View::Audit));
        assert!(session.select_view(View::Markup));
    }

    #[tokio::test]
    async fn test_fix_requires_audit() {
        let mut session = committed_session().await;
        assert!(matches!(session.begin_fix(), Ok(FixStart::NotReady)));
    }

    #[tokio::test]
    async fn test_fix_replaces_document_and_clears_artifacts() {
        let mut session = committed_session().await;
        for kind in [ArtifactKind::Sql, ArtifactKind::Audit] {
            let ArtifactStart::Ready(ticket) = session.begin_artifact(kind).unwrap() else {
                panic!("expected a ticket");
            };
            session.finish_artifact(&ticket, Ok("text".to_string())).unwrap();
        }
        let before = session.epoch();

        let FixStart::Ready(ticket) = session.begin_fix().unwrap() else {
            panic!("expected a ticket");
        };
        assert_eq!(ticket.audit(), "text");
        let validation = valid("erDiagram\n    A ||--|{ B : has").await;

        assert_eq!(
            session.finish_fix(&ticket, Ok(validation)).unwrap(),
            FixResolution::Applied
        );
        assert!(session.epoch() > before);
        assert_eq!(session.document().unwrap().markup(), "erDiagram\n    A ||--|{ B : has");
        assert!(session.artifact(ArtifactKind::Sql).is_none());
        assert!(session.artifact(ArtifactKind::Audit).is_none());
        assert_eq!(session.view(), View::Diagram);
    }

    #[tokio::test]
    async fn test_rejected_fix_keeps_document() {
        let mut session = committed_session().await;
        let ArtifactStart::Ready(ticket) = session.begin_artifact(ArtifactKind::Audit).unwrap()
        else {
            panic!("expected a ticket");
        };
        session.finish_artifact(&ticket, Ok("audit".to_string())).unwrap();

        let FixStart::Ready(ticket) = session.begin_fix().unwrap() else {
            panic!("expected a ticket");
        };
        let result = session.finish_fix(&ticket, Ok(invalid()));

        assert!(matches!(result, Err(ErgenError::FixRejected { .. })));
        assert_eq!(session.document().unwrap().markup(), "erDiagram\n    A ||--o{ B : has");
        assert_eq!(session.artifact(ArtifactKind::Audit), Some("audit"));
        assert_eq!(session.retries().used(), 0);
        assert_eq!(session.error(), Some("could not apply the fixes: bad"));
    }

    #[tokio::test]
    async fn test_snapshot() {
        let session = committed_session().await;
        let snapshot = SessionSnapshot::from(&session);

        assert_eq!(snapshot.phase, Phase::Committed);
        assert_eq!(snapshot.markup.as_deref(), Some("erDiagram\n    A ||--o{ B : has"));
        assert_eq!(snapshot.view, View::Diagram);
        assert!(snapshot.error.is_none());
    }
}
