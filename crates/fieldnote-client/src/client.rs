use fieldnote_config::EnrichmentRoute;
use serde_json::Value;

use crate::body::{MultipartPayload, RequestBody, ResponseBody};
use crate::error::{ClientError, Result};
use crate::http::{ApiRequest, HttpClient};
use crate::types::{Conference, Envelope, NewConference, NewVendor, Session, Vendor, decode_list, decode_one};

/// Typed operations over the conference session API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
}

impl ApiClient {
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Underlying transport
    pub const fn http(&self) -> &HttpClient {
        &self.http
    }

    // -- Health --

    /// Liveness check
    ///
    /// GET `/health`
    pub async fn health(&self) -> Result<Value> {
        self.http.send(ApiRequest::get("/health")).await?.into_json()
    }

    // -- Conferences --

    /// GET `/conferences`
    pub async fn list_conferences(&self) -> Result<Vec<Conference>> {
        let body = self.http.send(ApiRequest::get("/conferences")).await?;
        decode_list(body.into_json()?, "conference")
    }

    /// POST `/conferences`
    pub async fn create_conference(&self, conference: &NewConference) -> Result<Conference> {
        let body = self
            .http
            .send(ApiRequest::post("/conferences").json(to_json(conference)?))
            .await?;
        decode_one(body.into_json()?, "conference")
    }

    // -- Vendors --

    /// GET `/conferences/{id}/vendors`
    pub async fn list_vendors_for_conference(&self, conference_id: &str) -> Result<Vec<Vendor>> {
        let body = self
            .http
            .send(ApiRequest::get(format!("/conferences/{}/vendors", segment(conference_id)?)))
            .await?;
        decode_list(body.into_json()?, "vendor")
    }

    /// GET `/vendors`
    pub async fn list_vendors(&self) -> Result<Vec<Vendor>> {
        let body = self.http.send(ApiRequest::get("/vendors")).await?;
        decode_list(body.into_json()?, "vendor")
    }

    /// POST `/vendors`
    pub async fn create_vendor(&self, vendor: &NewVendor) -> Result<Vendor> {
        let body = self
            .http
            .send(ApiRequest::post("/vendors").json(to_json(vendor)?))
            .await?;
        decode_one(body.into_json()?, "vendor")
    }

    /// GET `/vendors/{id}`
    pub async fn get_vendor(&self, vendor_id: &str) -> Result<Vendor> {
        let body = self
            .http
            .send(ApiRequest::get(format!("/vendors/{}", segment(vendor_id)?)))
            .await?;
        decode_one(body.into_json()?, "vendor")
    }

    // -- Sessions --

    /// Combined session + media upload
    ///
    /// POST `/sessions/upload` with either encoding. The body comes back as
    /// received; only a JSON body can name the session.
    pub async fn upload_session(&self, body: RequestBody) -> Result<ResponseBody> {
        self.http.send(ApiRequest::post("/sessions/upload").body(body)).await
    }

    /// Mobile-variant session create
    ///
    /// POST `/mobile/sessions/create`
    pub async fn create_mobile_session(&self, fields: Value) -> Result<ResponseBody> {
        self.http.send(ApiRequest::post("/mobile/sessions/create").json(fields)).await
    }

    /// Mobile-variant media attach
    ///
    /// POST `/mobile/sessions/{id}/upload-batch`
    pub async fn upload_mobile_batch(&self, session_id: &str, files: MultipartPayload) -> Result<ResponseBody> {
        let path = format!("/mobile/sessions/{}/upload-batch", segment(session_id)?);
        self.http
            .send(ApiRequest::post(path).body(RequestBody::Multipart(files)))
            .await
    }

    /// Attach files to an existing session
    ///
    /// POST `/sessions/{id}/add-files`
    pub async fn add_files(&self, session_id: &str, files: MultipartPayload) -> Result<ResponseBody> {
        let path = format!("/sessions/{}/add-files", segment(session_id)?);
        self.http
            .send(ApiRequest::post(path).body(RequestBody::Multipart(files)))
            .await
    }

    /// GET `/sessions/{id}`
    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        let body = self
            .http
            .send(ApiRequest::get(format!("/sessions/{}", segment(session_id)?)))
            .await?;
        decode_one(body.into_json()?, "session")
    }

    /// Ask the server to enrich a session
    ///
    /// POST `/sessions/{id}/enrich` or `/sessions/{id}/trigger-enrichment`
    pub async fn trigger_enrichment(&self, session_id: &str, route: EnrichmentRoute) -> Result<Value> {
        self.http
            .send(ApiRequest::post(route.path(segment(session_id)?)))
            .await?
            .into_json()
    }

    /// Generated report for a session
    ///
    /// GET `/sessions/{id}/report`, retried once at `/reports/session/{id}`
    /// when the first path is not found. JSON reports are unwrapped from a
    /// `data` key; other content types are returned as received.
    pub async fn get_session_report(&self, session_id: &str) -> Result<ResponseBody> {
        let id = segment(session_id)?;

        let body = match self.http.send(ApiRequest::get(format!("/sessions/{id}/report"))).await {
            Err(ClientError::Http { status: 404, .. }) => {
                self.http
                    .send(ApiRequest::get(format!("/reports/session/{id}")))
                    .await?
            }
            other => other?,
        };

        Ok(match body {
            ResponseBody::Json(value) => ResponseBody::Json(Envelope::classify(value).into_inner()),
            other => other,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ClientError::InvalidRequest(format!("failed to encode body: {e}")))
}

/// Validate an id used as a single path segment
fn segment(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ClientError::InvalidRequest(format!("invalid id '{id}'")));
    }
    Ok(id)
}
