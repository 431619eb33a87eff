//! HTTP access to the mission API
//!
//! [`Gateway`] is the seam the store and form talk through; [`HttpGateway`]
//! is the real implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, StatusCode, multipart};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{GatewayError, parse_field_errors};
use crate::models::{AssignableUsers, Listing, Mission, OrgChart, Profile, User};

pub type GatewayResult<T> = Result<T, GatewayError>;

const MISSIONS: &str = "/api/missions/";
const ASSIGNABLE_USERS: &str = "/api/users/assignable_users/";
const ORG_CHART: &str = "/api/users/organization_chart/";
const PROFILE: &str = "/api/user/profile/";

/// Body of a mission create or partial update
#[derive(Debug, Clone, PartialEq)]
pub struct MissionPayload {
    pub description: String,
    pub assigned_date: NaiveDate,
    pub end_date: NaiveDate,
    pub from_to: Option<String>,
    pub due_to: Vec<u64>,
    /// Local files uploaded as `new_attachments`
    pub attachments: Vec<PathBuf>,
}

/// Remote operations the client needs from the mission API
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_missions(&self) -> GatewayResult<Vec<Mission>>;

    async fn get_mission(&self, id: u64) -> GatewayResult<Mission>;

    async fn create_mission(&self, payload: &MissionPayload) -> GatewayResult<Mission>;

    /// Partial update; only the payload's fields are touched
    async fn update_mission(&self, id: u64, payload: &MissionPayload) -> GatewayResult<Mission>;

    /// Flips completion. Returns the server's copy when it sends one back.
    async fn toggle_complete(&self, id: u64) -> GatewayResult<Option<Mission>>;

    async fn assignable_users(&self) -> GatewayResult<Vec<User>>;

    async fn organization_chart(&self) -> GatewayResult<OrgChart>;

    async fn profile(&self) -> GatewayResult<Profile>;
}

/// [`Gateway`] over reqwest with bearer authentication
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &Config) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.server.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.server.base_url.trim_end_matches('/').to_string(),
            token: config.token().map(str::to_string),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(%method, path, "mission API request");
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends and returns the raw body of a successful response
    async fn send_raw(&self, request: RequestBuilder) -> GatewayResult<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        tracing::warn!(status = status.as_u16(), "mission API request failed");

        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthorized);
        }

        Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> GatewayResult<T> {
        let body = self.send_raw(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Sends a mission create or update; 4xx field errors become [`GatewayError::Rejected`]
    async fn submit(&self, request: RequestBuilder) -> GatewayResult<Mission> {
        match self.send(request).await {
            Err(GatewayError::Status { status, body }) if (400..500).contains(&status) => {
                let fields = parse_field_errors(&body);
                if fields.is_empty() {
                    Err(GatewayError::Status { status, body })
                } else {
                    Err(GatewayError::Rejected { status, fields })
                }
            }
            other => other,
        }
    }

    async fn multipart(payload: &MissionPayload) -> GatewayResult<multipart::Form> {
        let mut form = multipart::Form::new()
            .text("description", payload.description.clone())
            .text("assigned_date", payload.assigned_date.to_string())
            .text("end_date", payload.end_date.to_string());

        if let Some(route) = payload.from_to.as_deref()
            && !route.trim().is_empty()
        {
            form = form.text("from_to", route.to_string());
        }

        for user_id in &payload.due_to {
            form = form.text("due_to", user_id.to_string());
        }

        for path in &payload.attachments {
            let bytes = tokio::fs::read(path).await.map_err(|source| GatewayError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());
            form = form.part("new_attachments", multipart::Part::bytes(bytes).file_name(file_name));
        }

        Ok(form)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_missions(&self) -> GatewayResult<Vec<Mission>> {
        let listing: Listing<Mission> = self.send(self.request(Method::GET, MISSIONS)).await?;
        Ok(listing.into_items())
    }

    async fn get_mission(&self, id: u64) -> GatewayResult<Mission> {
        self.send(self.request(Method::GET, &format!("{MISSIONS}{id}/")))
            .await
    }

    async fn create_mission(&self, payload: &MissionPayload) -> GatewayResult<Mission> {
        let form = Self::multipart(payload).await?;
        self.submit(self.request(Method::POST, MISSIONS).multipart(form))
            .await
    }

    async fn update_mission(&self, id: u64, payload: &MissionPayload) -> GatewayResult<Mission> {
        let form = Self::multipart(payload).await?;
        self.submit(
            self.request(Method::PATCH, &format!("{MISSIONS}{id}/"))
                .multipart(form),
        )
        .await
    }

    async fn toggle_complete(&self, id: u64) -> GatewayResult<Option<Mission>> {
        let body = self
            .send_raw(self.request(Method::PATCH, &format!("{MISSIONS}{id}/toggle_complete/")))
            .await?;
        Ok(serde_json::from_str(&body).ok())
    }

    async fn assignable_users(&self) -> GatewayResult<Vec<User>> {
        let users: AssignableUsers = self.send(self.request(Method::GET, ASSIGNABLE_USERS)).await?;
        Ok(users.flatten())
    }

    async fn organization_chart(&self) -> GatewayResult<OrgChart> {
        self.send(self.request(Method::GET, ORG_CHART)).await
    }

    async fn profile(&self) -> GatewayResult<Profile> {
        self.send(self.request(Method::GET, PROFILE)).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::date;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer, token: &str) -> HttpGateway {
        let mut config = Config::default();
        config.server.base_url = format!("{}/", server.uri());
        config.auth.access_token = token.to_string();
        HttpGateway::new(&config).unwrap()
    }

    fn payload() -> MissionPayload {
        MissionPayload {
            description: "Depo sayımı".into(),
            assigned_date: date("2024-05-01"),
            end_date: date("2024-05-03"),
            from_to: Some("  ".into()),
            due_to: vec![4, 7],
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn list_missions_unwraps_results_and_sends_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/missions/"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 2,
                "results": [
                    {"id": 1, "description": "a", "assigned_date": "2024-01-01", "end_date": "2024-01-02"},
                    {"id": 2, "description": "b", "assigned_date": "2024-01-01", "end_date": "oops"}
                ]
            })))
            .mount(&server)
            .await;

        let missions = gateway_for(&server, "tok-123").list_missions().await.unwrap();
        assert_eq!(missions.len(), 2);
        assert_eq!(missions[1].end_date, None);
    }

    #[tokio::test]
    async fn list_missions_accepts_bare_array() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/missions/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 9}])))
            .mount(&server)
            .await;

        let missions = gateway_for(&server, "").list_missions().await.unwrap();
        assert_eq!(missions[0].id, 9);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_dedicated_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/user/profile/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "detail": "Given token not valid"
            })))
            .mount(&server)
            .await;

        let err = gateway_for(&server, "stale").profile().await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized));
    }

    #[tokio::test]
    async fn toggle_complete_tolerates_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/api/missions/5/toggle_complete/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let confirmed = gateway_for(&server, "t").toggle_complete(5).await.unwrap();
        assert!(confirmed.is_none());
    }

    #[tokio::test]
    async fn toggle_complete_returns_server_copy() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/api/missions/5/toggle_complete/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 5, "completed": true})),
            )
            .mount(&server)
            .await;

        let confirmed = gateway_for(&server, "t").toggle_complete(5).await.unwrap();
        assert_eq!(confirmed.map(|m| m.completed), Some(true));
    }

    #[tokio::test]
    async fn create_sends_multipart_fields() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/missions/"))
            .and(body_string_contains("name=\"description\""))
            .and(body_string_contains("Depo sayımı"))
            .and(body_string_contains("name=\"due_to\"\r\n\r\n7"))
            .and(body_string_contains("name=\"new_attachments\"; filename=\"notes.txt\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 77, "description": "Depo sayımı"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "sayım listesi").unwrap();

        let mut body = payload();
        body.attachments.push(file);

        let created = gateway_for(&server, "t").create_mission(&body).await.unwrap();
        assert_eq!(created.id, 77);
    }

    #[tokio::test]
    async fn blank_route_is_not_sent() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/api/missions/3/"))
            .and(body_string_contains("from_to"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/missions/3/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 3})))
            .mount(&server)
            .await;

        let updated = gateway_for(&server, "t").update_mission(3, &payload()).await.unwrap();
        assert_eq!(updated.id, 3);
    }

    #[tokio::test]
    async fn field_errors_become_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/missions/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "end_date": ["Bitiş tarihi geçersiz."]
            })))
            .mount(&server)
            .await;

        let err = gateway_for(&server, "t").create_mission(&payload()).await.unwrap_err();
        match err {
            GatewayError::Rejected { status, fields } => {
                assert_eq!(status, 400);
                assert_eq!(fields[0].field, "end_date");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_detail_is_plain_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/missions/77/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "detail": "Not found."
            })))
            .mount(&server)
            .await;

        let err = gateway_for(&server, "t").get_mission(77).await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 404, .. }), "{err:?}");

        let notice = crate::error::DeskError::from(err).notice();
        assert!(!notice.contains("rejected the mission"), "{notice}");
        assert!(notice.contains("Not found."));
    }

    #[tokio::test]
    async fn missing_attachment_is_io_error() {
        let server = MockServer::start().await;
        let mut body = payload();
        body.attachments.push(PathBuf::from("/definitely/not/here.pdf"));

        let err = gateway_for(&server, "t").create_mission(&body).await.unwrap_err();
        assert!(matches!(err, GatewayError::Io { .. }));
    }

    #[tokio::test]
    async fn assignable_users_flattens_role_groups() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/users/assignable_users/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "MANAGER": [{"id": 2, "username": "mgr", "role": "MANAGER"}],
                "EMPLOYEE": [{"id": 3, "username": "emp", "role": "EMPLOYEE"}]
            })))
            .mount(&server)
            .await;

        let users = gateway_for(&server, "t").assignable_users().await.unwrap();
        let ids: Vec<u64> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn organization_chart_by_tier() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/users/organization_chart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "CEO": [{"id": 1, "username": "boss", "role": "CEO"}],
                "MANAGER": [],
                "EMPLOYEE": [{"id": 3, "username": "emp"}]
            })))
            .mount(&server)
            .await;

        let chart = gateway_for(&server, "t").organization_chart().await.unwrap();
        assert_eq!(chart.ceo.len(), 1);
        assert!(chart.managers.is_empty());
        assert_eq!(chart.employees[0].username, "emp");
    }
}
