//! Upload state machine
//!
//! ```text
//! Building -> AttemptPrimary -> AttemptFallback -> Enriching
//!                  |                                  ^
//!                  +----------------------------------+
//! ```
//!
//! A primary failure either matches [`should_fall_back`] and is retried
//! exactly once in the alternate shape, or ends the upload. Fallback
//! failures are always terminal. Enrichment and status polling never fail
//! an upload.

use fieldnote_client::{ApiClient, ClientError, ResponseBody, SessionStatus, extract_session_id};
use fieldnote_config::{Config, PrimaryEncoding, UploadStrategy};
use fieldnote_telemetry::Logger;
use jiff::Timestamp;
use serde_json::{Value, json};

use crate::draft::SessionDraft;
use crate::error::{EnrichmentError, Result, UploadError};
use crate::payload::{Encoding, FORBIDDEN_NOTES, UploadFields, UploadPayload};
use crate::poll::poll_status;
use crate::resolver::{EntityRequest, EntityResolver, ResolvedEntities};

/// Upload endpoints the state machine can target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /sessions/upload`, fields and media in one body
    SessionsUpload,
    /// `POST /mobile/sessions/create`, fields only
    MobileCreate,
    /// `POST /mobile/sessions/{id}/upload-batch`, media only
    MobileUploadBatch,
    /// `POST /sessions/{id}/add-files`, media only
    AddFiles,
}

impl Endpoint {
    pub const fn path(self) -> &'static str {
        match self {
            Self::SessionsUpload => "/sessions/upload",
            Self::MobileCreate => "/mobile/sessions/create",
            Self::MobileUploadBatch => "/mobile/sessions/{id}/upload-batch",
            Self::AddFiles => "/sessions/{id}/add-files",
        }
    }

    pub const fn is_mobile(self) -> bool {
        matches!(self, Self::MobileCreate | Self::MobileUploadBatch)
    }

    /// Endpoint a failed request is retried against
    const fn fallback(self) -> Self {
        match self {
            Self::SessionsUpload | Self::MobileCreate => Self::SessionsUpload,
            Self::MobileUploadBatch | Self::AddFiles => Self::AddFiles,
        }
    }

    /// Encoding actually put on the wire for `payload`
    const fn wire_encoding(self, payload: &UploadPayload) -> Encoding {
        match self {
            Self::SessionsUpload => payload.encoding(),
            Self::MobileCreate => Encoding::Json,
            Self::MobileUploadBatch | Self::AddFiles => Encoding::Multipart,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Whether a failed request at `endpoint` earns the single fallback attempt
///
/// True for HTTP 415, for HTTP 500 whose body mentions "Unsupported Media
/// Type", and for any response-level or network failure of a mobile
/// endpoint. Configuration and request-building errors never fall back.
pub fn should_fall_back(error: &ClientError, endpoint: Endpoint) -> bool {
    if endpoint.is_mobile() {
        return !matches!(error, ClientError::Config(_) | ClientError::InvalidRequest(_));
    }

    match error {
        ClientError::Http { status: 415, .. } => true,
        ClientError::Http { status: 500, body } => body.to_ascii_lowercase().contains("unsupported media type"),
        _ => false,
    }
}

/// One request made on behalf of a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub endpoint: Endpoint,
    pub encoding: Encoding,
    /// Set on the single retry after a primary failure
    pub fallback: bool,
    /// Failure description; `None` when the request succeeded
    pub error: Option<String>,
}

impl Attempt {
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of the post-upload enrichment trigger
#[derive(Debug)]
pub enum Enrichment {
    Triggered,
    /// Disabled in configuration
    Skipped,
    Failed(EnrichmentError),
}

/// Everything a caller needs to report a finished upload
#[derive(Debug)]
pub struct UploadOutcome {
    pub session_id: String,
    pub entities: ResolvedEntities,
    pub attempts: Vec<Attempt>,
    pub enrichment: Enrichment,
    /// Last polled status; `None` when polling is disabled
    pub status: Option<SessionStatus>,
}

impl UploadOutcome {
    /// Whether the single fallback attempt was needed
    pub fn used_fallback(&self) -> bool {
        self.attempts.iter().any(|a| a.fallback)
    }
}

enum Step {
    Building(Box<SessionDraft>),
    AttemptPrimary {
        endpoint: Endpoint,
        session_id: Option<String>,
        payload: UploadPayload,
    },
    AttemptFallback {
        endpoint: Endpoint,
        session_id: Option<String>,
        payload: UploadPayload,
    },
    Enriching(String),
}

impl Step {
    const fn name(&self) -> &'static str {
        match self {
            Self::Building(_) => "building",
            Self::AttemptPrimary { .. } => "attempt_primary",
            Self::AttemptFallback { .. } => "attempt_fallback",
            Self::Enriching(_) => "enriching",
        }
    }
}

/// Drives a [`SessionDraft`] to a remote session
#[derive(Debug, Clone)]
pub struct Uploader {
    api: ApiClient,
    resolver: EntityResolver,
}

impl Uploader {
    pub fn new(api: ApiClient) -> Self {
        let resolver = EntityResolver::new(api.clone());
        Self { api, resolver }
    }

    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    fn logger(&self) -> &Logger {
        self.api.http().logger()
    }

    /// Upload a draft, falling back once on a recognized failure
    ///
    /// # Errors
    ///
    /// - [`UploadError::Client`] for configuration problems, entity
    ///   resolution failures, a primary failure that does not qualify for
    ///   fallback (returned unchanged) or any fallback failure
    /// - [`UploadError::MissingSessionId`] when the accepted response names
    ///   no session
    /// - [`UploadError::Payload`] when the body cannot be re-encoded
    #[allow(clippy::too_many_lines)]
    pub async fn upload(&self, draft: SessionDraft) -> Result<UploadOutcome> {
        let config = self.api.http().config().get().map_err(ClientError::from)?;
        config.validate().map_err(ClientError::from)?;
        let poll_interval = config.poll_interval().map_err(ClientError::from)?;

        let mut entities = None;
        let mut attempts = Vec::new();
        let mut step = Step::Building(Box::new(draft));

        loop {
            tracing::debug!(step = step.name(), "upload step");

            step = match step {
                Step::Building(draft) => {
                    let (resolved, payload) = self.build(*draft, &config).await?;
                    entities = Some(resolved);

                    let endpoint = match config.upload.strategy {
                        UploadStrategy::Combined => Endpoint::SessionsUpload,
                        UploadStrategy::Mobile => Endpoint::MobileCreate,
                    };

                    Step::AttemptPrimary {
                        endpoint,
                        session_id: None,
                        payload,
                    }
                }

                Step::AttemptPrimary {
                    endpoint,
                    session_id,
                    payload,
                } => {
                    let encoding = endpoint.wire_encoding(&payload);

                    match self.send(endpoint, session_id.as_deref(), &payload).await {
                        Ok(response) => {
                            attempts.push(attempt(endpoint, encoding, false, None));
                            let session_id = match session_id {
                                Some(id) => id,
                                None => session_id_from(&response)?,
                            };

                            if endpoint == Endpoint::MobileCreate && payload.has_files() {
                                Step::AttemptPrimary {
                                    endpoint: Endpoint::MobileUploadBatch,
                                    session_id: Some(session_id),
                                    payload,
                                }
                            } else {
                                Step::Enriching(session_id)
                            }
                        }
                        Err(UploadError::Client(e)) if should_fall_back(&e, endpoint) => {
                            attempts.push(attempt(endpoint, encoding, false, Some(&e)));
                            let (next, payload) = self.prepare_fallback(endpoint, payload, &e)?;

                            Step::AttemptFallback {
                                endpoint: next,
                                session_id,
                                payload,
                            }
                        }
                        Err(e) => return Err(e),
                    }
                }

                Step::AttemptFallback {
                    endpoint,
                    session_id,
                    payload,
                } => {
                    let encoding = endpoint.wire_encoding(&payload);

                    let response = match self.send(endpoint, session_id.as_deref(), &payload).await {
                        Ok(response) => response,
                        Err(e) => {
                            self.logger().error(
                                format!("fallback {encoding} upload to {endpoint} failed: {e}"),
                                Some(json!({ "endpoint": endpoint.path(), "encoding": encoding.to_string() })),
                            );
                            return Err(e);
                        }
                    };

                    attempts.push(attempt(endpoint, encoding, true, None));
                    match session_id {
                        Some(id) => Step::Enriching(id),
                        None => Step::Enriching(session_id_from(&response)?),
                    }
                }

                Step::Enriching(session_id) => {
                    let entities = entities
                        .take()
                        .ok_or_else(|| UploadError::Payload("no entities resolved".to_owned()))?;

                    let enrichment = if config.upload.enrich {
                        self.enrich(&session_id, &config).await
                    } else {
                        Enrichment::Skipped
                    };

                    let status = if config.upload.poll_attempts > 0 {
                        Some(poll_status(&self.api, &session_id, config.upload.poll_attempts, poll_interval).await)
                    } else {
                        None
                    };

                    self.logger().info(
                        format!("uploaded session {session_id}"),
                        Some(json!({
                            "session_id": session_id,
                            "conference_id": entities.conference_id,
                            "vendor_id": entities.vendor_id,
                            "attempts": attempts.len(),
                            "status": status.as_ref().map(SessionStatus::as_str),
                        })),
                    );

                    return Ok(UploadOutcome {
                        session_id,
                        entities,
                        attempts,
                        enrichment,
                        status,
                    });
                }
            };
        }
    }

    /// Resolve ids and build the primary body
    async fn build(&self, draft: SessionDraft, config: &Config) -> Result<(ResolvedEntities, UploadPayload)> {
        let entities = self
            .resolver
            .ensure_conference_and_vendor(&EntityRequest {
                conference_id: draft.conference_id.clone(),
                vendor_id: draft.vendor_id.clone(),
                preferred_vendor_name: draft.vendor_name.clone(),
            })
            .await?;

        let end_time = draft.end_time();
        let audio = draft.audio.map(|clip| clip.normalized());

        let fields = UploadFields {
            conference_id: entities.conference_id.clone(),
            vendor_id: entities.vendor_id.clone(),
            start_time: iso(draft.started_at),
            end_time: iso(end_time),
            user_notes: draft.notes,
        };

        let payload = UploadPayload::build(&fields, audio.as_ref(), &draft.images);
        let payload = match (config.upload.strategy, config.upload.primary_encoding) {
            (UploadStrategy::Combined, PrimaryEncoding::Json) => payload.into_encoding(Encoding::Json)?,
            _ => payload,
        };

        Ok((entities, payload))
    }

    /// Re-shape a failed primary for its one retry
    fn prepare_fallback(
        &self,
        endpoint: Endpoint,
        payload: UploadPayload,
        cause: &ClientError,
    ) -> Result<(Endpoint, UploadPayload)> {
        let next = endpoint.fallback();
        let mut payload = match endpoint {
            Endpoint::SessionsUpload => {
                let alternate = payload.encoding().alternate();
                payload.into_encoding(alternate)?
            }
            Endpoint::MobileCreate => payload.into_encoding(Encoding::Json)?,
            Endpoint::MobileUploadBatch | Endpoint::AddFiles => payload,
        };

        if payload.scrub_forbidden() {
            self.logger().warn(
                format!("removed forbidden field '{FORBIDDEN_NOTES}' from fallback payload"),
                None,
            );
        }

        let encoding = next.wire_encoding(&payload);
        self.logger().warn(
            format!("{endpoint} failed ({cause}); retrying once as {encoding} to {next}"),
            Some(json!({
                "failed_endpoint": endpoint.path(),
                "fallback_endpoint": next.path(),
                "encoding": encoding.to_string(),
                "status": cause.status(),
            })),
        );

        Ok((next, payload))
    }

    async fn send(&self, endpoint: Endpoint, session_id: Option<&str>, payload: &UploadPayload) -> Result<ResponseBody> {
        let response = match endpoint {
            Endpoint::SessionsUpload => self.api.upload_session(payload.clone().into_body()).await?,
            Endpoint::MobileCreate => self.api.create_mobile_session(Value::Object(payload.text_fields())).await?,
            Endpoint::MobileUploadBatch => {
                self.api
                    .upload_mobile_batch(require_id(session_id, endpoint)?, payload.files()?)
                    .await?
            }
            Endpoint::AddFiles => {
                self.api
                    .add_files(require_id(session_id, endpoint)?, payload.files()?)
                    .await?
            }
        };
        Ok(response)
    }

    /// Best-effort enrichment trigger; failures become a warning
    async fn enrich(&self, session_id: &str, config: &Config) -> Enrichment {
        match self
            .api
            .trigger_enrichment(session_id, config.upload.enrichment_route)
            .await
        {
            Ok(_) => Enrichment::Triggered,
            Err(source) => {
                let error = EnrichmentError {
                    session_id: session_id.to_owned(),
                    source,
                };
                self.logger().warn(
                    error.to_string(),
                    Some(json!({ "session_id": session_id, "status": error.source.status() })),
                );
                Enrichment::Failed(error)
            }
        }
    }
}

fn attempt(endpoint: Endpoint, encoding: Encoding, fallback: bool, error: Option<&ClientError>) -> Attempt {
    Attempt {
        endpoint,
        encoding,
        fallback,
        error: error.map(ToString::to_string),
    }
}

/// Only a JSON body can name the session; text and binary bodies never do
fn session_id_from(response: &ResponseBody) -> Result<String> {
    match response {
        ResponseBody::Json(value) => extract_session_id(value),
        ResponseBody::Text(_) | ResponseBody::Blob { .. } => None,
    }
    .ok_or_else(|| UploadError::MissingSessionId {
        body: response.sample(),
    })
}

fn require_id(session_id: Option<&str>, endpoint: Endpoint) -> Result<&str> {
    session_id.ok_or_else(|| {
        UploadError::Client(ClientError::InvalidRequest(format!("{endpoint} requires a session id")))
    })
}

/// ISO-8601 in UTC with second precision or finer
fn iso(timestamp: Timestamp) -> String {
    timestamp.to_string()
}
