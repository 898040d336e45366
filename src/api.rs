// API client module: a small blocking HTTP client that talks to the
// loyalty API. Three calls: login, create (single assignment) and schedule
// (assignment allowing duplicates). Each call is exactly one request, there
// is no retry and timeouts are reqwest's defaults.

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ApiConfig, AuthType};
use crate::error::ApiError;
use crate::types::{AssignmentResult, AssignmentStatus, AuthToken, Credentials};

/// Header carrying the session token on assignment calls.
pub const AUTH_TOKEN_HEADER: &str = "X-Redcat-Authtoken";

/// The three remote operations the dispatcher and session rely on.
/// `ApiClient` is the real implementation; `mock::MockCouponApi` records calls
/// for tests.
pub trait CouponApi: Send + Sync {
    /// Log in and return the session token.
    fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, ApiError>;

    /// Assign through the `create` endpoint. Used when duplicates are not allowed.
    fn assign_single(
        &self,
        token: &AuthToken,
        coupon_id: u64,
        member_ids: &[u64],
    ) -> Result<AssignmentResult, ApiError>;

    /// Assign through the `schedule` endpoint. `allow_duplicates` is sent as
    /// `Multiple` only when it is `Some`.
    fn assign_with_duplicates(
        &self,
        token: &AuthToken,
        coupon_id: u64,
        member_ids: &[u64],
        allow_duplicates: Option<bool>,
    ) -> Result<AssignmentResult, ApiError>;
}

/// Login request payload. The backend calls the password field `psw`.
#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub psw: &'a str,
    pub auth_type: &'a AuthType,
}

/// Only the token matters; anything else in the login response is ignored.
#[derive(Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
}

/// Body of `POST /coupons/{id}/create`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRequest<'a> {
    pub members: &'a [u64],
    pub handle_errors: bool,
    pub return_alias: bool,
}

/// Body of `POST /coupons/{id}/schedule`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleRequest<'a> {
    pub members: &'a [u64],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
}

/// Blocking reqwest client plus the API settings it was built from.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth_type: AuthType,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(ApiClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_type: config.auth_type.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body to one of the coupon endpoints with the token header,
    /// and hand back the JSON response.
    fn post_coupon<B: Serialize>(
        &self,
        token: &AuthToken,
        coupon_id: u64,
        action: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let url = self.url(&format!("/coupons/{}/{}", coupon_id, action));
        tracing::debug!(url = %url, coupon_id, action, "Sending assignment request");
        let res = self
            .client
            .post(&url)
            .header(AUTH_TOKEN_HEADER, token.as_str())
            .json(body)
            .send()
            .map_err(|e| ApiError::Assignment(format!("request to {} failed: {}", url, e)))?;
        let res = ensure_success(res).map_err(ApiError::Assignment)?;
        res.json::<Value>()
            .map_err(|e| ApiError::Assignment(format!("invalid JSON response: {}", e)))
    }
}

impl CouponApi for ApiClient {
    fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, ApiError> {
        let url = self.url("/login");
        let req = LoginRequest {
            username: &credentials.username,
            psw: &credentials.password,
            auth_type: &self.auth_type,
        };
        tracing::debug!(url = %url, username = %credentials.username, "Sending login request");
        let res = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .map_err(|e| ApiError::Authentication(format!("Login request failed: {}", e)))?;
        let res = ensure_success(res).map_err(ApiError::Authentication)?;
        let body: Value = res
            .json()
            .map_err(|e| ApiError::Authentication(format!("invalid JSON response: {}", e)))?;
        let token = token_from_login(body)?;
        tracing::info!(username = %credentials.username, "Authenticated");
        Ok(token)
    }

    fn assign_single(
        &self,
        token: &AuthToken,
        coupon_id: u64,
        member_ids: &[u64],
    ) -> Result<AssignmentResult, ApiError> {
        let body = CreateRequest {
            members: member_ids,
            handle_errors: true,
            return_alias: true,
        };
        let payload = self.post_coupon(token, coupon_id, "create", &body)?;
        Ok(AssignmentResult::from_payload(payload, AssignmentStatus::Created))
    }

    fn assign_with_duplicates(
        &self,
        token: &AuthToken,
        coupon_id: u64,
        member_ids: &[u64],
        allow_duplicates: Option<bool>,
    ) -> Result<AssignmentResult, ApiError> {
        let body = ScheduleRequest {
            members: member_ids,
            multiple: allow_duplicates,
        };
        let payload = self.post_coupon(token, coupon_id, "schedule", &body)?;
        Ok(AssignmentResult::from_payload(payload, AssignmentStatus::Scheduled))
    }
}

/// Turn a non-2xx response into "<status> - <body>".
fn ensure_success(res: Response) -> Result<Response, String> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let txt = res.text().unwrap_or_else(|_| "".into());
    tracing::warn!(%status, "API returned an error status");
    Err(format!("{} - {}", status, txt))
}

fn token_from_login(body: Value) -> Result<AuthToken, ApiError> {
    match serde_json::from_value::<LoginResponse>(body.clone()) {
        Ok(resp) => Ok(AuthToken::new(resp.token)),
        Err(_) => Err(ApiError::Authentication(format!(
            "Login response missing token. Response: {}",
            body
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SCHEDULED_MESSAGE;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// What the client put on the wire.
    struct Received {
        request_line: String,
        headers: Vec<(String, String)>,
        body: Value,
    }

    impl Received {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == &name.to_ascii_lowercase())
                .map(|(_, v)| v.as_str())
        }
    }

    /// Answer exactly one request with `status` and a JSON `body`. Returns the
    /// base URL (with a trailing slash) and a handle yielding the request.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Received>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((k, v)) = line.split_once(':') {
                    headers.push((k.trim().to_ascii_lowercase(), v.trim().to_string()));
                }
            }
            let len = headers
                .iter()
                .find(|(k, _)| k == "content-length")
                .map(|(_, v)| v.parse::<usize>().unwrap())
                .unwrap_or(0);
            let mut raw = vec![0u8; len];
            reader.read_exact(&mut raw).unwrap();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            reader.get_mut().write_all(response.as_bytes()).unwrap();

            Received {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: serde_json::from_slice(&raw).unwrap_or(Value::Null),
            }
        });
        (format!("http://{}/api/v1/", addr), handle)
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: base_url.to_string(),
            auth_type: AuthType::U,
        })
        .unwrap()
    }

    fn creds() -> Credentials {
        Credentials {
            username: "ops".into(),
            password: "secret".into(),
        }
    }

    #[test]
    fn login_posts_credentials_and_returns_token() {
        let (base, server) = serve_once("200 OK", r#"{"token":"tok"}"#);

        let token = client(&base).authenticate(&creds()).unwrap();
        let req = server.join().unwrap();

        assert_eq!(token.as_str(), "tok");
        assert_eq!(req.request_line, "POST /api/v1/login HTTP/1.1");
        assert_eq!(
            req.body,
            json!({ "username": "ops", "psw": "secret", "auth_type": "U" })
        );
        assert_eq!(req.header(AUTH_TOKEN_HEADER), None);
    }

    #[test]
    fn login_rejected_status_is_authentication_error() {
        let (base, server) = serve_once("401 Unauthorized", r#"{"error":"bad"}"#);

        let err = client(&base).authenticate(&creds()).unwrap_err();
        server.join().unwrap();

        assert_eq!(
            err,
            ApiError::Authentication(r#"401 Unauthorized - {"error":"bad"}"#.into())
        );
    }

    #[test]
    fn login_ok_without_token_is_authentication_error() {
        let (base, server) = serve_once("200 OK", r#"{"message":"welcome"}"#);

        let err = client(&base).authenticate(&creds()).unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, ApiError::Authentication(ref m) if m.contains("missing token")));
    }

    #[test]
    fn login_transport_failure_is_authentication_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}", addr))
            .authenticate(&creds())
            .unwrap_err();

        assert!(matches!(err, ApiError::Authentication(ref m) if m.starts_with("Login request failed")));
    }

    #[test]
    fn create_server_error_is_assignment_error() {
        let (base, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#);

        let err = client(&base)
            .assign_single(&AuthToken::new("tok"), 42, &[1, 2, 2])
            .unwrap_err();
        let req = server.join().unwrap();

        assert_eq!(
            err,
            ApiError::Assignment(r#"500 Internal Server Error - {"error":"boom"}"#.into())
        );
        assert_eq!(req.request_line, "POST /api/v1/coupons/42/create HTTP/1.1");
        assert_eq!(req.header(AUTH_TOKEN_HEADER), Some("tok"));
        assert_eq!(
            req.body,
            json!({ "Members": [1, 2, 2], "HandleErrors": true, "ReturnAlias": true })
        );
    }

    #[test]
    fn schedule_sends_token_header_path_and_flag() {
        let (base, server) = serve_once("200 OK", r#"{"data":"Coupons have been scheduled for creation"}"#);

        let result = client(&base)
            .assign_with_duplicates(&AuthToken::new("tok"), 42, &[5, 5], Some(true))
            .unwrap();
        let req = server.join().unwrap();

        assert_eq!(req.request_line, "POST /api/v1/coupons/42/schedule HTTP/1.1");
        assert_eq!(req.header(AUTH_TOKEN_HEADER), Some("tok"));
        assert_eq!(req.body, json!({ "Members": [5, 5], "Multiple": true }));
        assert_eq!(result.status, AssignmentStatus::Scheduled);
        assert_eq!(result.raw_payload, json!({ "data": SCHEDULED_MESSAGE }));
    }

    #[test]
    fn login_body_uses_backend_field_names() {
        let req = LoginRequest {
            username: "ops",
            psw: "secret",
            auth_type: &AuthType::U,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "username": "ops", "psw": "secret", "auth_type": "U" })
        );
    }

    #[test]
    fn create_body_always_handles_errors() {
        let body = CreateRequest {
            members: &[1, 2, 2],
            handle_errors: true,
            return_alias: true,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "Members": [1, 2, 2], "HandleErrors": true, "ReturnAlias": true })
        );
    }

    #[test]
    fn schedule_body_omits_unset_multiple() {
        let unset = ScheduleRequest {
            members: &[7],
            multiple: None,
        };
        assert_eq!(serde_json::to_value(&unset).unwrap(), json!({ "Members": [7] }));

        let set = ScheduleRequest {
            members: &[7],
            multiple: Some(true),
        };
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({ "Members": [7], "Multiple": true })
        );
    }

    #[test]
    fn login_token_is_required() {
        let token = token_from_login(json!({ "token": "abc", "user": "ops" })).unwrap();
        assert_eq!(token.as_str(), "abc");

        let err = token_from_login(json!({ "message": "ok" })).unwrap_err();
        assert!(matches!(err, ApiError::Authentication(ref m) if m.contains("missing token")));

        assert!(token_from_login(json!({ "token": 12 })).is_err());
    }

    #[test]
    fn trailing_slash_on_base_url_is_dropped() {
        let client = ApiClient::new(&ApiConfig {
            base_url: "https://loyalty.example.com/api/v1/".into(),
            auth_type: AuthType::U,
        })
        .unwrap();
        assert_eq!(client.base_url(), "https://loyalty.example.com/api/v1");
        assert_eq!(
            client.url("/coupons/42/create"),
            "https://loyalty.example.com/api/v1/coupons/42/create"
        );
    }
}
