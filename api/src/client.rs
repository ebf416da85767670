//! Ticket Verifier backend client
//!
//! [`TicketApi`] is the seam every reducer depends on. [`ApiClient`] is the
//! HTTP implementation: one `reqwest::Client` with a cookie store, a fixed
//! overall timeout, and no retries. Every response passes through a single
//! interceptor that turns `401` into a session-wide logout.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::session::{SessionEvent, SessionEvents};
use crate::storage::{LocalStore, keys};
use crate::types::{
    Ack, Analytics, ApiResponse, CsvImport, CsvUpload, LoginRequest, LoginResponse, NewOrder, Order,
    OrderUpdate, PaginatedResponse, PasswordChange, SearchFilters, SessionStatus, Transaction,
    TransactionKind, UploadFile, VerifiedEmails, Wave, WaveForm, WaveUpdate, ZelleTransaction,
};

/// Operations offered by the backend
///
/// Mutations that answer with a `{success, ...}` envelope resolve to
/// `Err(ApiError::Rejected)` when the backend says `success: false`, so
/// callers only need to handle one error path.
#[async_trait]
pub trait TicketApi: Send + Sync {
    /// `POST /auth/login`
    ///
    /// Bad credentials are not an error: they come back as a
    /// `LoginResponse` with `success: false`.
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError>;

    /// `POST /auth/logout`
    async fn logout(&self) -> Result<(), ApiError>;

    /// `GET /auth/validate`
    async fn validate_session(&self) -> Result<SessionStatus, ApiError>;

    /// `POST /auth/change-password`
    async fn change_password(&self, change: PasswordChange) -> Result<Ack, ApiError>;

    /// `GET /orders`
    async fn orders(&self, filters: SearchFilters) -> Result<PaginatedResponse<Order>, ApiError>;

    /// `GET /orders/:id`
    async fn order(&self, id: i64) -> Result<Order, ApiError>;

    /// `POST /orders` (multipart, with the receipt file)
    async fn create_order(&self, order: NewOrder) -> Result<ApiResponse<Order>, ApiError>;

    /// `PUT /orders/:id`
    async fn update_order(&self, id: i64, update: OrderUpdate)
    -> Result<ApiResponse<Order>, ApiError>;

    /// `DELETE /orders/:id`
    async fn delete_order(&self, id: i64) -> Result<Ack, ApiError>;

    /// `POST /orders/:id/approve`
    async fn approve_order(&self, id: i64) -> Result<Ack, ApiError>;

    /// `POST /orders/:id/reject`
    async fn reject_order(&self, id: i64) -> Result<Ack, ApiError>;

    /// `GET /orders/verified-emails`
    async fn verified_emails(&self) -> Result<VerifiedEmails, ApiError>;

    /// `GET /orders/export`, returned as CSV text
    async fn export_orders(&self) -> Result<String, ApiError>;

    /// `POST /orders/rerun-matching`
    async fn rerun_matching(&self) -> Result<Ack, ApiError>;

    /// `GET /waves`
    async fn waves(&self) -> Result<Vec<Wave>, ApiError>;

    /// `GET /waves/current`; `None` means no wave is on sale
    async fn current_wave(&self) -> Result<Option<Wave>, ApiError>;

    /// `POST /waves`
    async fn create_wave(&self, form: WaveForm) -> Result<ApiResponse<Wave>, ApiError>;

    /// `PUT /waves/:id`
    async fn update_wave(&self, id: i64, update: WaveUpdate) -> Result<ApiResponse<Wave>, ApiError>;

    /// `DELETE /waves/:id`
    async fn delete_wave(&self, id: i64) -> Result<Ack, ApiError>;

    /// `GET /transactions/venmo`
    async fn venmo_transactions(&self) -> Result<Vec<Transaction>, ApiError>;

    /// `GET /transactions/zelle`
    async fn zelle_transactions(&self) -> Result<Vec<ZelleTransaction>, ApiError>;

    /// `GET /transactions/{venmo|zelle}/export`, returned as CSV text
    async fn export_transactions(&self, kind: TransactionKind) -> Result<String, ApiError>;

    /// `POST /csv/upload` (multipart field `csv_file`)
    async fn upload_csv(&self, file: UploadFile) -> Result<ApiResponse<CsvImport>, ApiError>;

    /// `GET /csv/uploads`
    async fn csv_uploads(&self) -> Result<Vec<CsvUpload>, ApiError>;

    /// `GET /analytics`
    async fn analytics(&self) -> Result<Analytics, ApiError>;

    /// URL a browser or downloader can fetch the stored receipt from
    fn receipt_url(&self, receipt_path: &str) -> String;
}

/// HTTP implementation of [`TicketApi`]
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
    storage: Arc<dyn LocalStore>,
    session: SessionEvents,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client
    ///
    /// `storage` is where the legacy auth token is cleared on `401`;
    /// `session` receives [`SessionEvent::Unauthorized`].
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RequestFailed` if the HTTP client cannot be built
    /// (for example when the TLS backend fails to initialise).
    pub fn new(
        config: ApiConfig,
        storage: Arc<dyn LocalStore>,
        session: SessionEvents,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        tracing::debug!(base_url = %config.base_url, timeout = ?config.timeout, "API client created");

        Ok(Self {
            http,
            config,
            storage,
            session,
        })
    }

    /// Connection settings in use
    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The bus `401`s are published on
    #[must_use]
    pub const fn session(&self) -> &SessionEvents {
        &self.session
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.config.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.config.url(path))
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.http.put(self.config.url(path))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(self.config.url(path))
    }

    /// Send without any status handling
    async fn dispatch(request: RequestBuilder) -> Result<Response, ApiError> {
        request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request failed");
            ApiError::from_transport(&e)
        })
    }

    /// Send and run the response interceptor
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = Self::dispatch(request).await?;
        self.intercept(response).await
    }

    async fn intercept(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
            return Err(ApiError::Unauthorized);
        }
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        tracing::warn!(status = status.as_u16(), %message, "Backend returned an error");
        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn handle_unauthorized(&self) {
        tracing::warn!("Session rejected by backend, clearing credentials");
        if let Err(e) = self.storage.remove(keys::AUTH_TOKEN) {
            tracing::error!(error = %e, "Failed to clear stored auth token");
        }
        self.session.publish(SessionEvent::Unauthorized);
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        decode(response).await
    }

    async fn mutate<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        let envelope: ApiResponse<T> = self.fetch(request).await?;
        envelope.into_result(fallback)
    }

    async fn text(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = self.send(request).await?;
        response.text().await.map_err(|e| ApiError::from_transport(&e))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::from_transport(&e))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::ResponseParseFailed(e.to_string()))
}

/// Shape of error bodies; the backend uses either key
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Pull a readable message out of an error body
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error.or(parsed.message))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

fn file_part(file: UploadFile) -> Result<Part, ApiError> {
    Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(&file.content_type)
        .map_err(|e| ApiError::InvalidUpload(e.to_string()))
}

#[async_trait]
impl TicketApi for ApiClient {
    #[tracing::instrument(skip_all, fields(username = %request.username))]
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError> {
        // A 401 here means bad credentials, not an expired session
        let response = Self::dispatch(self.post("/auth/login").json(&request)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return decode(response).await;
        }
        let response = self.intercept(response).await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self))]
    async fn logout(&self) -> Result<(), ApiError> {
        self.send(self.post("/auth/logout")).await.map(|_| ())
    }

    #[tracing::instrument(skip(self))]
    async fn validate_session(&self) -> Result<SessionStatus, ApiError> {
        self.fetch(self.get("/auth/validate")).await
    }

    #[tracing::instrument(skip_all)]
    async fn change_password(&self, change: PasswordChange) -> Result<Ack, ApiError> {
        self.mutate(
            self.post("/auth/change-password").json(&change),
            "Failed to change password",
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn orders(&self, filters: SearchFilters) -> Result<PaginatedResponse<Order>, ApiError> {
        self.fetch(self.get("/orders").query(&filters)).await
    }

    #[tracing::instrument(skip(self))]
    async fn order(&self, id: i64) -> Result<Order, ApiError> {
        self.fetch(self.get(&format!("/orders/{id}"))).await
    }

    #[tracing::instrument(skip_all, fields(email = %order.email, receipt = %order.receipt.file_name))]
    async fn create_order(&self, order: NewOrder) -> Result<ApiResponse<Order>, ApiError> {
        let form = Form::new()
            .text("name", order.name)
            .text("email", order.email)
            .text("boys_tickets", order.boys_tickets.to_string())
            .text("girls_tickets", order.girls_tickets.to_string())
            .part("receipt", file_part(order.receipt)?);

        self.mutate(self.post("/orders").multipart(form), "Order submission failed")
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_order(
        &self,
        id: i64,
        update: OrderUpdate,
    ) -> Result<ApiResponse<Order>, ApiError> {
        self.mutate(
            self.put(&format!("/orders/{id}")).json(&update),
            "Failed to update order",
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_order(&self, id: i64) -> Result<Ack, ApiError> {
        self.mutate(self.delete(&format!("/orders/{id}")), "Failed to delete order")
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn approve_order(&self, id: i64) -> Result<Ack, ApiError> {
        self.mutate(
            self.post(&format!("/orders/{id}/approve")),
            "Failed to approve order",
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn reject_order(&self, id: i64) -> Result<Ack, ApiError> {
        self.mutate(
            self.post(&format!("/orders/{id}/reject")),
            "Failed to reject order",
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn verified_emails(&self) -> Result<VerifiedEmails, ApiError> {
        self.fetch(self.get("/orders/verified-emails")).await
    }

    #[tracing::instrument(skip(self))]
    async fn export_orders(&self) -> Result<String, ApiError> {
        self.text(self.get("/orders/export")).await
    }

    #[tracing::instrument(skip(self))]
    async fn rerun_matching(&self) -> Result<Ack, ApiError> {
        self.mutate(
            self.post("/orders/rerun-matching"),
            "Failed to rerun matching",
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn waves(&self) -> Result<Vec<Wave>, ApiError> {
        self.fetch(self.get("/waves")).await
    }

    #[tracing::instrument(skip(self))]
    async fn current_wave(&self) -> Result<Option<Wave>, ApiError> {
        self.fetch(self.get("/waves/current")).await
    }

    #[tracing::instrument(skip(self))]
    async fn create_wave(&self, form: WaveForm) -> Result<ApiResponse<Wave>, ApiError> {
        self.mutate(self.post("/waves").json(&form), "Failed to create wave")
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_wave(&self, id: i64, update: WaveUpdate) -> Result<ApiResponse<Wave>, ApiError> {
        self.mutate(
            self.put(&format!("/waves/{id}")).json(&update),
            "Failed to update wave",
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_wave(&self, id: i64) -> Result<Ack, ApiError> {
        self.mutate(self.delete(&format!("/waves/{id}")), "Failed to delete wave")
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn venmo_transactions(&self) -> Result<Vec<Transaction>, ApiError> {
        self.fetch(self.get("/transactions/venmo")).await
    }

    #[tracing::instrument(skip(self))]
    async fn zelle_transactions(&self) -> Result<Vec<ZelleTransaction>, ApiError> {
        self.fetch(self.get("/transactions/zelle")).await
    }

    #[tracing::instrument(skip(self))]
    async fn export_transactions(&self, kind: TransactionKind) -> Result<String, ApiError> {
        self.text(self.get(&format!("/transactions/{}/export", kind.segment())))
            .await
    }

    #[tracing::instrument(skip_all, fields(file = %file.file_name))]
    async fn upload_csv(&self, file: UploadFile) -> Result<ApiResponse<CsvImport>, ApiError> {
        let form = Form::new().part("csv_file", file_part(file)?);
        self.mutate(self.post("/csv/upload").multipart(form), "Upload failed")
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn csv_uploads(&self) -> Result<Vec<CsvUpload>, ApiError> {
        self.fetch(self.get("/csv/uploads")).await
    }

    #[tracing::instrument(skip(self))]
    async fn analytics(&self) -> Result<Analytics, ApiError> {
        self.fetch(self.get("/analytics")).await
    }

    fn receipt_url(&self, receipt_path: &str) -> String {
        self.config.url(&format!("/receipts/{receipt_path}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn client() -> ApiClient {
        ApiClient::new(
            ApiConfig::new("http://localhost:5000/api"),
            Arc::new(MemoryStore::new()),
            SessionEvents::new(),
        )
        .unwrap()
    }

    #[test]
    fn receipt_url_is_built_from_base() {
        assert_eq!(
            client().receipt_url("receipt_42.png"),
            "http://localhost:5000/api/receipts/receipt_42.png"
        );
    }

    #[test]
    fn error_message_prefers_envelope_reason() {
        let message = error_message(
            StatusCode::BAD_REQUEST,
            r#"{"success": false, "error": "No active wave"}"#,
        );
        assert_eq!(message, "No active wave");
    }

    #[test]
    fn error_message_falls_back_to_status_reason() {
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
    }

    #[test]
    fn invalid_mime_type_is_an_upload_error() {
        let file = UploadFile::new("receipt.png", "not a mime", vec![1, 2, 3]);
        assert!(matches!(file_part(file), Err(ApiError::InvalidUpload(_))));
    }
}
