//! HTTP implementation of [`SmartHomeApi`] for the Yandex Smart Home API.

use std::error::Error as _;
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use url::Url;

use homedeck_core::prelude::*;
use homedeck_core::DeviceState;

use crate::api::{AccountInfo, Device, SmartHomeApi, ON_OFF_CAPABILITY};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.iot.yandex.net/v1.0";

/// Whether `status` counts as success (`200..=299`).
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Best-effort decoding of a success body: empty or non-JSON gives `None`.
fn decode_body(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(body) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Ignoring non-JSON success body: {}", e);
            None
        }
    }
}

/// Render a reqwest error with its full source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Stateless client for the smart-home cloud.
#[derive(Debug, Clone)]
pub struct YandexClient {
    http: reqwest::Client,
    base_url: Url,
}

impl YandexClient {
    /// Create a client rooted at `base_url`.
    ///
    /// `timeout` of `None` keeps the transport default (no overall timeout).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `base_url` is not an absolute http(s) URL
    /// or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid API base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "API base URL cannot have paths appended: {base_url}"
            )));
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("homedeck/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", describe(&e))))?;

        Ok(Self { http, base_url })
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("API base URL cannot have paths appended"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Perform one request and apply the shared status-code contract.
    async fn request(
        &self,
        token: &str,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<Option<Value>> {
        debug!("{} {}", method, url.path());

        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        } else {
            request = request.header(reqwest::header::CONTENT_TYPE, "application/json");
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::network(describe(&e)))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Error::network(describe(&e)))?;

        if !is_success_status(status) {
            return Err(Error::http_status(status, text));
        }
        Ok(decode_body(&text))
    }
}

impl SmartHomeApi for YandexClient {
    async fn fetch_account_info(&self, token: &str) -> Result<Option<AccountInfo>> {
        let url = self.endpoint(&["user", "info"])?;
        match self.request(token, Method::GET, url, None).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    async fn run_scenario(&self, token: &str, scenario_id: &str) -> Result<()> {
        let url = self.endpoint(&["scenarios", scenario_id, "actions"])?;
        self.request(token, Method::POST, url, None).await?;
        Ok(())
    }

    async fn read_device_state(
        &self,
        token: &str,
        device_id: &str,
    ) -> Result<Option<DeviceState>> {
        let url = self.endpoint(&["devices", device_id])?;
        let Some(body) = self.request(token, Method::GET, url, None).await? else {
            return Ok(None);
        };

        // The single-device endpoint has no `id` requirement of its own.
        let mut body = body;
        if let Some(obj) = body.as_object_mut() {
            obj.entry("id").or_insert_with(|| json!(device_id));
        }
        match serde_json::from_value::<Device>(body) {
            Ok(device) => Ok(device.on_off_state()),
            Err(e) => {
                debug!("Unexpected device body for {}: {}", device_id, e);
                Ok(None)
            }
        }
    }

    async fn set_device_on_off(&self, token: &str, device_id: &str, on: bool) -> Result<()> {
        let url = self.endpoint(&["devices", "actions"])?;
        let body = json!({
            "devices": [{
                "id": device_id,
                "actions": [{
                    "type": ON_OFF_CAPABILITY,
                    "state": { "instance": "on", "value": on }
                }]
            }]
        });
        self.request(token, Method::POST, url, Some(body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// A request as seen by the fake server.
    #[derive(Debug)]
    struct Captured {
        head: String,
        body: String,
    }

    impl Captured {
        fn request_line(&self) -> &str {
            self.head.lines().next().unwrap_or_default()
        }

        fn header(&self, name: &str) -> Option<String> {
            self.head.lines().skip(1).find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case(name)
                    .then(|| value.trim().to_string())
            })
        }
    }

    /// Serve exactly one HTTP response and hand back the captured request.
    async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/v1.0", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                assert!(n > 0, "client closed before sending headers");
            };
            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let captured_len = Captured {
                head: head.clone(),
                body: String::new(),
            }
            .header("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
            while buf.len() < header_end + captured_len {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "client closed mid-body");
                buf.extend_from_slice(&chunk[..n]);
            }
            let request_body =
                String::from_utf8_lossy(&buf[header_end..header_end + captured_len]).to_string();

            let response = format!(
                "HTTP/1.1 {status} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            Captured {
                head,
                body: request_body,
            }
        });

        (base, handle)
    }

    fn client(base: &str) -> YandexClient {
        YandexClient::new(base, Some(Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn test_status_code_boundaries() {
        assert!(!is_success_status(199));
        assert!(is_success_status(200));
        assert!(is_success_status(299));
        assert!(!is_success_status(300));
        assert!(!is_success_status(404));
    }

    #[test]
    fn test_decode_body_is_best_effort() {
        assert_eq!(decode_body(""), None);
        assert_eq!(decode_body("  \n"), None);
        assert_eq!(decode_body("<html>"), None);
        assert_eq!(decode_body(r#"{"a":1}"#), Some(json!({"a": 1})));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let c = client("https://api.iot.yandex.net/v1.0/");
        let url = c.endpoint(&["scenarios", "a b/c", "actions"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.iot.yandex.net/v1.0/scenarios/a%20b%2Fc/actions"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = YandexClient::new("not a url", None).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        let err = YandexClient::new("mailto:me@example.com", None).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_fetch_account_info_sends_bearer_token() {
        let (base, server) = serve_once(
            200,
            r#"{"status":"ok","scenarios":[{"id":"s1","name":"Night"}],"devices":[]}"#,
        )
        .await;

        let info = client(&base).fetch_account_info("T").await.unwrap().unwrap();
        assert_eq!(info.scenarios[0].name, "Night");

        let req = server.await.unwrap();
        assert_eq!(req.request_line(), "GET /v1.0/user/info HTTP/1.1");
        assert_eq!(req.header("authorization").as_deref(), Some("Bearer T"));
    }

    #[tokio::test]
    async fn test_status_299_is_success() {
        let (base, server) = serve_once(299, "").await;
        let info = client(&base).fetch_account_info("T").await.unwrap();
        assert_eq!(info, None);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_status_300_is_failure_with_body() {
        let (base, server) = serve_once(300, r#"{"message":"moved"}"#).await;
        let err = client(&base).run_scenario("T", "s1").await.unwrap_err();
        match err {
            Error::HttpStatus { status, body } => {
                assert_eq!(status, 300);
                assert_eq!(body, r#"{"message":"moved"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_scenario_posts_to_actions() {
        let (base, server) = serve_once(200, r#"{"status":"ok"}"#).await;
        client(&base).run_scenario("T", "scn-1").await.unwrap();
        let req = server.await.unwrap();
        assert_eq!(
            req.request_line(),
            "POST /v1.0/scenarios/scn-1/actions HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_read_device_state_on() {
        let (base, server) = serve_once(
            200,
            r#"{"id":"D","type":"devices.types.socket","capabilities":[{"type":"devices.capabilities.on_off","state":{"instance":"on","value":true}}]}"#,
        )
        .await;
        let state = client(&base).read_device_state("T", "D").await.unwrap();
        assert_eq!(
            state,
            Some(DeviceState {
                is_on: true,
                device_type: "devices.types.socket".to_string()
            })
        );
        let req = server.await.unwrap();
        assert_eq!(req.request_line(), "GET /v1.0/devices/D HTTP/1.1");
    }

    #[tokio::test]
    async fn test_read_device_state_without_on_off_is_none() {
        let (base, server) = serve_once(
            200,
            r#"{"type":"devices.types.sensor","capabilities":[{"type":"devices.capabilities.range"}]}"#,
        )
        .await;
        let state = client(&base).read_device_state("T", "D").await.unwrap();
        assert_eq!(state, None);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_set_device_on_off_body() {
        let (base, server) = serve_once(200, r#"{"status":"ok"}"#).await;
        client(&base).set_device_on_off("T", "D", true).await.unwrap();

        let req = server.await.unwrap();
        assert_eq!(req.request_line(), "POST /v1.0/devices/actions HTTP/1.1");
        let body: Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(
            body,
            json!({"devices": [{"id": "D", "actions": [{
                "type": "devices.capabilities.on_off",
                "state": {"instance": "on", "value": true}
            }]}]})
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/v1.0", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&base).read_device_state("T", "D").await.unwrap_err();
        assert!(matches!(err, Error::Network { .. }), "{err:?}");
    }
}
