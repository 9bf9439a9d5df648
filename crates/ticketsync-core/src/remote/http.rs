//! HTTP client for the ticket REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{RemoteError, RemoteResult, RemoteTicketService};
use crate::config::ClientConfig;
use crate::models::{NewTicket, ServerTicket, ServerTicketPayload, TicketPatch};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// `reqwest` implementation of [`RemoteTicketService`].
///
/// Tickets live under `{base}/api/tickets`, the health probe under
/// `{base}/health`. Every response is wrapped in `{ "success", "data" }`.
#[derive(Clone)]
pub struct HttpTicketApi {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpTicketApi {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpTicketApi")
            .field("base_url", &self.base_url)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl HttpTicketApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            auth_token: None,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> RemoteResult<Self> {
        let base_url = config.api_base_url.clone().ok_or_else(|| {
            RemoteError::InvalidConfiguration("api_base_url is not set".to_string())
        })?;
        Ok(Self::new(base_url, config.request_timeout())?
            .with_auth_token(config.api_token.clone()))
    }

    /// Send `Authorization: Bearer <token>` with every request
    #[must_use]
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = normalize_text_option(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the server answers its health endpoint.
    pub async fn probe(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(url).header(ACCEPT, "application/json").send().await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::debug!(%error, "Ticket API health probe failed");
                false
            }
        }
    }

    fn tickets_url(&self) -> String {
        format!("{}/api/tickets", self.base_url)
    }

    fn ticket_url(&self, id: &str) -> String {
        format!("{}/api/tickets/{}", self.base_url, urlencoding::encode(id))
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        match self.auth_token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        ticket_id: Option<&str>,
    ) -> RemoteResult<Envelope<T>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = ticket_id {
                return Err(RemoteError::NotFound(id.to_string()));
            }
        }
        if !status.is_success() {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }

        let envelope = serde_json::from_str::<Envelope<T>>(&body)
            .map_err(|error| RemoteError::InvalidPayload(error.to_string()))?;
        if !envelope.success {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }
        Ok(envelope)
    }

    async fn send_ticket(
        &self,
        builder: RequestBuilder,
        ticket_id: Option<&str>,
    ) -> RemoteResult<ServerTicket> {
        let payload = self
            .send::<ServerTicketPayload>(builder, ticket_id)
            .await?
            .into_data()?;
        ServerTicket::try_from(payload)
            .map_err(|error| RemoteError::InvalidPayload(error.to_string()))
    }
}

#[async_trait]
impl RemoteTicketService for HttpTicketApi {
    async fn list_all(&self) -> RemoteResult<Vec<ServerTicketPayload>> {
        let builder = self.request(Method::GET, self.tickets_url());
        self.send(builder, None).await?.into_data()
    }

    async fn get(&self, id: &str) -> RemoteResult<ServerTicket> {
        let builder = self.request(Method::GET, self.ticket_url(id));
        self.send_ticket(builder, Some(id)).await
    }

    async fn create(&self, ticket: &NewTicket) -> RemoteResult<ServerTicket> {
        let builder = self.request(Method::POST, self.tickets_url()).json(ticket);
        self.send_ticket(builder, None).await
    }

    async fn update(&self, id: &str, patch: &TicketPatch) -> RemoteResult<ServerTicket> {
        let builder = self.request(Method::PUT, self.ticket_url(id)).json(patch);
        self.send_ticket(builder, Some(id)).await
    }

    async fn delete(&self, id: &str) -> RemoteResult<()> {
        let builder = self.request(Method::DELETE, self.ticket_url(id));
        self.send::<serde::de::IgnoredAny>(builder, Some(id)).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "default_success")]
    success: bool,
    data: Option<T>,
}

const fn default_success() -> bool {
    true
}

impl<T> Envelope<T> {
    fn into_data(self) -> RemoteResult<T> {
        self.data.ok_or_else(|| {
            RemoteError::InvalidPayload("response did not include data".to_string())
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<serde_json::Value>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        let nested = payload.error.as_ref().and_then(|error| {
            error
                .as_str()
                .or_else(|| error.get("message").and_then(serde_json::Value::as_str))
                .map(str::to_string)
        });
        if let Some(message) = nested.or(payload.message) {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("api base URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "api base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketStatus;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    fn ticket_json(id: &str, title: &Value, status: &Value) -> Value {
        json!({
            "id": id,
            "title": title,
            "description": "described",
            "status": status,
            "user_id": null,
            "created_at": "2025-03-01T10:00:00.000Z",
            "updated_at": "2025-03-01T11:00:00.000Z"
        })
    }

    async fn list_tickets() -> Json<Value> {
        Json(json!({
            "success": true,
            "data": [
                ticket_json("srv-1", &json!("One"), &json!("todo")),
                ticket_json("srv-2", &json!("Two"), &json!("blocked")),
            ]
        }))
    }

    async fn create_ticket(
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        let authorized = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some("Bearer secret");
        if !authorized {
            return (
                AxumStatus::UNAUTHORIZED,
                Json(json!({"success": false, "error": {"message": "Access token required"}})),
            );
        }
        if body["title"] == "reject" {
            return (
                AxumStatus::BAD_REQUEST,
                Json(json!({"success": false, "error": "Title must not be empty"})),
            );
        }
        (
            AxumStatus::CREATED,
            Json(json!({
                "success": true,
                "data": ticket_json("srv-new", &body["title"], &body["status"])
            })),
        )
    }

    async fn update_ticket(
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        if id != "srv-1" {
            return (
                AxumStatus::NOT_FOUND,
                Json(json!({"success": false, "error": {"message": "Ticket not found"}})),
            );
        }
        (
            AxumStatus::OK,
            Json(json!({
                "success": true,
                "data": ticket_json("srv-1", &body["title"], &body["status"])
            })),
        )
    }

    async fn delete_ticket(Path(_id): Path<String>) -> Json<Value> {
        Json(json!({"success": true, "message": "Ticket deleted successfully"}))
    }

    async fn health() -> Json<Value> {
        Json(json!({"success": true, "status": "OK"}))
    }

    async fn spawn_stub() -> String {
        let router = Router::new()
            .route("/health", get(health))
            .route("/api/tickets", get(list_tickets).post(create_ticket))
            .route(
                "/api/tickets/{id}",
                axum::routing::put(update_ticket).delete(delete_ticket),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn client(base_url: &str) -> HttpTicketApi {
        HttpTicketApi::new(base_url, Duration::from_secs(5))
            .unwrap()
            .with_auth_token(Some("secret".to_string()))
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.example.com/ ".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let api = client("https://api.example.com");
        let debug = format!("{api:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn parse_api_error_handles_both_error_shapes() {
        assert_eq!(
            parse_api_error(
                StatusCode::BAD_REQUEST,
                r#"{"success":false,"error":{"message":"Invalid reference"}}"#
            ),
            "Invalid reference"
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, r#"{"error":"Validation Error"}"#),
            "Validation Error"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, "  "), "HTTP 502");
    }

    #[tokio::test]
    async fn list_all_returns_raw_payloads() {
        let base = spawn_stub().await;
        let payloads = client(&base).list_all().await.unwrap();

        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[1].status, "blocked");
        assert!(ServerTicket::try_from(payloads[0].clone()).is_ok());
    }

    #[tokio::test]
    async fn create_sends_bearer_token_and_parses_ticket() {
        let base = spawn_stub().await;
        let created = client(&base)
            .create(&NewTicket::new("A", "desc", TicketStatus::InProgress))
            .await
            .unwrap();

        assert_eq!(created.id, "srv-new");
        assert_eq!(created.title, "A");
        assert_eq!(created.status, TicketStatus::InProgress);

        let anonymous = HttpTicketApi::new(&base, Duration::from_secs(5)).unwrap();
        let error = anonymous
            .create(&NewTicket::new("A", "desc", TicketStatus::Todo))
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(401));
        assert!(error.to_string().contains("Access token required"));
    }

    #[tokio::test]
    async fn create_surfaces_validation_rejection() {
        let base = spawn_stub().await;
        let error = client(&base)
            .create(&NewTicket::new("reject", "desc", TicketStatus::Todo))
            .await
            .unwrap_err();

        assert!(matches!(error, RemoteError::Api { status: 400, .. }));
        assert!(!error.is_transient());
    }

    #[tokio::test]
    async fn update_maps_missing_ticket_to_not_found() {
        let base = spawn_stub().await;
        let api = client(&base);

        let patch = TicketPatch::default()
            .title("Renamed")
            .status(TicketStatus::Done);
        let updated = api.update("srv-1", &patch).await.unwrap();
        assert_eq!(updated.title, "Renamed");

        let error = api.update("srv-404", &patch).await.unwrap_err();
        assert!(matches!(error, RemoteError::NotFound(id) if id == "srv-404"));
    }

    #[tokio::test]
    async fn delete_accepts_envelope_without_data() {
        let base = spawn_stub().await;
        client(&base).delete("srv-1").await.unwrap();
    }

    #[tokio::test]
    async fn probe_reports_reachability() {
        let base = spawn_stub().await;
        assert!(client(&base).probe().await);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        assert!(!client(&closed).probe().await);
    }

    #[tokio::test]
    async fn unreachable_server_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let error = client(&closed).list_all().await.unwrap_err();
        assert!(matches!(error, RemoteError::Transport(_)));
        assert!(error.is_transient());
    }
}
