//! LocalBitcoins API Client
//!
//! Resolves a logical method to a concrete route, signs private calls,
//! sends them through a [`Transport`] and classifies the response:
//! - transport failure -> [`LbcError::Transport`]
//! - body that is not JSON -> [`LbcError::Parse`] carrying the raw text
//! - JSON with a non-empty `error` field -> [`LbcError::Api`] with that payload
//! - anything else -> the parsed JSON, unchanged
//!
//! # Example
//!
//! ```no_run
//! use localbitcoins_client::{HttpVerb, LbcClient, Params};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = LbcClient::new("api_key", "api_secret", None)?;
//!
//!     let me = client.api("myself", Params::new(), HttpVerb::Get).await?;
//!     println!("{}", me["data"]["username"]);
//!
//!     let params = Params::new().with("contact_id", 12345).with("msg", "Payment sent");
//!     client
//!         .api("contact_message_post/12345", params, HttpVerb::Post)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::{Credentials, NonceGenerator};
use crate::error::{LbcError, LbcResult};
use crate::params::Params;
use crate::routes::{self, Access};
use crate::transport::{
    HttpRequest, HttpResponse, HttpVerb, ReqwestTransport, Transport, FORM_CONTENT_TYPE,
};

/// Base URL for the LocalBitcoins API
pub const API_BASE_URL: &str = "https://localbitcoins.com/api";

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const AUTH_KEY_HEADER: &str = "Apiauth-Key";
pub const AUTH_NONCE_HEADER: &str = "Apiauth-Nonce";
pub const AUTH_SIGNATURE_HEADER: &str = "Apiauth-Signature";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Request timeout duration
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE_URL.to_string(),
            timeout: Duration::from_millis(5000),
        }
    }
}

impl ClientConfig {
    /// Defaults, with `LOCALBITCOINS_API_BASE_URL` applied when set
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var("LOCALBITCOINS_API_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => {
                info!("Using LOCALBITCOINS_API_BASE_URL override: {}", url.trim());
                config.with_base_url(url)
            }
            Ok(_) => {
                warn!("Ignoring empty LOCALBITCOINS_API_BASE_URL override");
                config
            }
            Err(_) => config,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// LocalBitcoins API Client
#[derive(Clone)]
pub struct LbcClient {
    credentials: Credentials,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    nonces: Arc<NonceGenerator>,
}

impl LbcClient {
    /// Create a new client with API key, secret and optional one-time password
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        otp: Option<String>,
    ) -> LbcResult<Self> {
        let mut credentials = Credentials::new(api_key, api_secret);
        if let Some(otp) = otp {
            credentials = credentials.with_otp(otp);
        }
        Self::with_config(credentials, ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(credentials: Credentials, config: ClientConfig) -> LbcResult<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(credentials, config, Arc::new(transport)))
    }

    /// Create a client that sends through `transport`
    pub fn with_transport(
        credentials: Credentials,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            credentials,
            config,
            transport,
            nonces: Arc::new(NonceGenerator::new()),
        }
    }

    /// Create a client from environment variables
    ///
    /// Expects `LOCALBITCOINS_API_KEY` and `LOCALBITCOINS_API_SECRET`
    pub fn from_env() -> LbcResult<Self> {
        let credentials = Credentials::from_env().map_err(|e| {
            LbcError::Config(format!(
                "Failed to load LocalBitcoins credentials from environment: {}",
                e
            ))
        })?;
        Self::with_config(credentials, ClientConfig::from_env())
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call a logical API method
    ///
    /// Fails with [`LbcError::MethodNotFound`] before anything is sent when
    /// `method` does not resolve for these params.
    pub async fn api(
        &self,
        method: &str,
        params: Params,
        verb: impl Into<HttpVerb>,
    ) -> LbcResult<Value> {
        let route = routes::resolve(method, &params)?;
        let verb = verb.into();

        match route.access {
            Access::Public => self.public_call(&route.path, route.params, verb).await,
            Access::Private => self.private_call(&route.path, route.params, verb).await,
        }
    }

    /// Unauthenticated call to a concrete path
    pub async fn public_call(
        &self,
        path: &str,
        params: Params,
        verb: HttpVerb,
    ) -> LbcResult<Value> {
        let request = self.public_request(path, &params, verb);
        self.dispatch(request, false).await
    }

    /// Signed call to a concrete path
    pub async fn private_call(
        &self,
        path: &str,
        params: Params,
        verb: HttpVerb,
    ) -> LbcResult<Value> {
        let nonce = self.nonces.next_nonce();
        let request = self.private_request(path, &params, verb, nonce);
        self.dispatch(request, true).await
    }

    /// Build the unsigned request for `path`
    pub fn public_request(&self, path: &str, params: &Params, verb: HttpVerb) -> HttpRequest {
        build_request(&self.config.base_url, path, params, verb, Vec::new())
    }

    /// Build the signed request for `path` using `nonce`
    pub fn private_request(
        &self,
        path: &str,
        params: &Params,
        verb: HttpVerb,
        nonce: u64,
    ) -> HttpRequest {
        let signature = self.credentials.sign(path, params, nonce);
        let headers = vec![
            (CONTENT_TYPE_HEADER.to_string(), FORM_CONTENT_TYPE.to_string()),
            (
                AUTH_KEY_HEADER.to_string(),
                self.credentials.api_key().to_string(),
            ),
            (AUTH_NONCE_HEADER.to_string(), nonce.to_string()),
            (AUTH_SIGNATURE_HEADER.to_string(), signature),
        ];
        build_request(&self.config.base_url, path, params, verb, headers)
    }

    async fn dispatch(&self, request: HttpRequest, private: bool) -> LbcResult<Value> {
        debug!(
            verb = %request.verb,
            url = %request.url,
            private,
            nonce = request.header(AUTH_NONCE_HEADER),
            "Sending API request"
        );

        let response = self.transport.send(request).await.map_err(|e| {
            warn!("Request failed: {}", e);
            e
        })?;

        interpret_response(response)
    }
}

fn build_request(
    base_url: &str,
    path: &str,
    params: &Params,
    verb: HttpVerb,
    headers: Vec<(String, String)>,
) -> HttpRequest {
    let mut url = format!("{}/{}/", base_url, path.trim_matches('/'));
    let encoded = params.to_form_urlencoded();

    let body = match verb {
        HttpVerb::Get => {
            if !encoded.is_empty() {
                url.push('?');
                url.push_str(&encoded);
            }
            None
        }
        HttpVerb::Post => Some(encoded),
    };

    HttpRequest {
        verb,
        url,
        headers,
        body,
    }
}

/// Classify a raw response into data or error
pub fn interpret_response(response: HttpResponse) -> LbcResult<Value> {
    let HttpResponse { status, body } = response;

    let data: Value = match serde_json::from_str(&body) {
        Ok(data) => data,
        Err(source) => {
            warn!(status, "Could not parse response body as JSON");
            return Err(LbcError::Parse { body, source });
        }
    };

    if let Some(error) = data.get("error").filter(|e| is_non_empty(e)) {
        warn!(status, "API returned error: {}", error);
        return Err(LbcError::Api(error.clone()));
    }

    if !(200..300).contains(&status) {
        warn!(status, "Non-success HTTP status without error payload");
    }

    Ok(data)
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    fn test_client() -> LbcClient {
        LbcClient::with_config(
            Credentials::new("test_key", "test_secret"),
            ClientConfig::default().with_base_url("https://lbc.test/api/"),
        )
        .unwrap()
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, API_BASE_URL);
        assert_eq!(config.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::default()
            .with_base_url(" http://localhost:8080/api/ ")
            .with_timeout(Duration::from_secs(1));
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_client_new_with_otp() {
        let client = LbcClient::new("k", "s", Some("123".to_string())).unwrap();
        assert_eq!(client.credentials().api_key(), "k");
        assert_eq!(client.credentials().otp(), Some("123"));
    }

    #[test]
    fn test_private_request_headers_and_trailing_slash() {
        let client = test_client();
        let params = Params::new().with("msg", "hi there");
        let request = client.private_request("contact_message_post/7", &params, HttpVerb::Post, 99);

        assert_eq!(request.url, "https://lbc.test/api/contact_message_post/7/");
        assert_eq!(request.body.as_deref(), Some("msg=hi+there"));
        assert_eq!(request.header("Content-Type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(request.header("Apiauth-Key"), Some("test_key"));
        assert_eq!(request.header("Apiauth-Nonce"), Some("99"));
        assert_eq!(
            request.header("Apiauth-Signature").map(str::to_string),
            Some(client.credentials().sign("contact_message_post/7", &params, 99))
        );
    }

    #[test]
    fn test_get_request_uses_query_string() {
        let client = test_client();
        let params = Params::new().with("ad_id", 3);
        let request = client.private_request("ad-get/3", &params, HttpVerb::Get, 1);

        assert_eq!(request.url, "https://lbc.test/api/ad-get/3/?ad_id=3");
        assert!(request.body.is_none());
    }

    #[test]
    fn test_public_request_has_no_auth_headers() {
        let client = test_client();
        let request = client.public_request("currencies", &Params::new(), HttpVerb::Get);

        assert_eq!(request.url, "https://lbc.test/api/currencies/");
        assert!(request.headers.is_empty());
        assert!(request.header(AUTH_SIGNATURE_HEADER).is_none());
    }

    #[test]
    fn test_interpret_success() {
        let data = interpret_response(response(r#"{"data":{"username":"alice"}}"#)).unwrap();
        assert_eq!(data, json!({"data": {"username": "alice"}}));
    }

    #[test]
    fn test_interpret_api_error_forwarded_raw() {
        let err = interpret_response(response(r#"{"error":"bad nonce"}"#)).unwrap_err();
        assert!(matches!(err, LbcError::Api(ref e) if *e == json!("bad nonce")));

        let err = interpret_response(response(
            r#"{"error":{"message":"HMAC authentication key and signature was given, but they are invalid.","error_code":41}}"#,
        ))
        .unwrap_err();
        assert_eq!(err.api_payload().unwrap()["error_code"], json!(41));
    }

    #[test]
    fn test_interpret_empty_error_is_success() {
        for body in [
            r#"{"error":"","data":1}"#,
            r#"{"error":null,"data":1}"#,
            r#"{"error":[],"data":1}"#,
            r#"{"error":{},"data":1}"#,
        ] {
            assert!(interpret_response(response(body)).is_ok(), "{}", body);
        }
    }

    #[test]
    fn test_interpret_parse_error_keeps_body() {
        let err = interpret_response(response("not json")).unwrap_err();
        match err {
            LbcError::Parse { body, .. } => assert_eq!(body, "not json"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_interpret_ignores_status_without_error() {
        let data = interpret_response(HttpResponse {
            status: 500,
            body: r#"{"data":null}"#.to_string(),
        })
        .unwrap();
        assert_eq!(data, json!({"data": null}));
    }

    #[test]
    fn test_non_empty_error_values() {
        assert!(is_non_empty(&json!("x")));
        assert!(is_non_empty(&json!(["x"])));
        assert!(is_non_empty(&json!({"message": "x"})));
        assert!(is_non_empty(&json!(true)));
        assert!(is_non_empty(&json!(3)));
        assert!(!is_non_empty(&json!(0)));
        assert!(!is_non_empty(&json!(false)));
    }
}
