use log::{debug, warn};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use crate::{
    ApiError, ApiResult, Config, RequestAuth, RoomCredentials, ROOM_PASSWORD_HEADER,
};

/// Performs requests against the configured backend origin
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

/// A single call to the backend, built up before it is sent
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    /// User supplied path segments, escaped when the url is built
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
    expected_fields: Vec<String>,
    auth: RequestAuth,
    room_password: Option<String>,
    /// Set when the request could not be built, reported as a transport error on send
    build_error: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            segments: Vec::new(),
            query: Vec::new(),
            body: None,
            expected_fields: Vec::new(),
            auth: RequestAuth::None,
            room_password: None,
            build_error: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends one path segment, percent-encoding anything that would change the target
    pub fn segment(mut self, segment: impl ToString) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.body = Some(value),
            Err(e) => self.build_error = Some(format!("Could not serialize body: {}", e)),
        }
        self
    }

    /// Declares top-level fields a successful body must contain
    pub fn expect_fields(mut self, fields: &[&str]) -> Self {
        self.expected_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn auth(mut self, auth: RequestAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.auth(RequestAuth::Bearer(token.to_string()))
    }

    pub fn basic(self, id: &str, secret: &str) -> Self {
        self.auth(RequestAuth::Basic {
            id: id.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Authorizes the request with room credentials, picking bearer or basic
    pub fn room(mut self, credentials: &RoomCredentials) -> Self {
        self.room_password = credentials.attached_password().map(str::to_string);
        self.auth(credentials.auth())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

impl ApiClient {
    pub fn new(config: &Config) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.backend_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the absolute url of a backend path
    pub fn url_for(&self, path: &str) -> ApiResult<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        Url::parse(&joined).map_err(|e| ApiError::Transport(format!("Invalid url {}: {}", joined, e)))
    }

    /// Returns the absolute url of a request, with its segments escaped
    pub fn url_of(&self, request: &ApiRequest) -> ApiResult<Url> {
        let mut url = self.url_for(&request.path)?;

        if !request.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| ApiError::Transport("Backend url can't have a path".into()))?
                .pop_if_empty()
                .extend(&request.segments);
        }

        Ok(url)
    }

    /// Sends a request and returns the raw body. A 204 yields [Value::Null].
    pub async fn execute(&self, request: ApiRequest) -> ApiResult<Value> {
        if let Some(error) = request.build_error {
            return Err(ApiError::Transport(error));
        }

        let url = self.url_of(&request)?;
        debug!("{} {}", request.method, url.path());

        let mut builder = self.http.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.auth {
            RequestAuth::None => builder,
            RequestAuth::Bearer(token) => builder.bearer_auth(token),
            RequestAuth::Basic { id, secret } => builder.basic_auth(id, Some(secret)),
        };

        if let Some(password) = &request.room_password {
            builder = builder.header(ROOM_PASSWORD_HEADER, password);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("{} {} never reached the server: {}", request.method, request.path, e);
            ApiError::from(e)
        })?;

        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let text = response.text().await?;

        if !status.is_success() {
            let error = error_from_body(status, &text);
            warn!("{} {} failed ({}): {}", request.method, request.path, status.as_u16(), error);
            return Err(error);
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        check_expected_fields(&body, &request.expected_fields)?;

        Ok(body)
    }

    /// Sends a request and decodes the body into `T`
    pub async fn send<T>(&self, request: ApiRequest) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let body = self.execute(request).await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Turns a non-2xx response into an error, preferring the server's own message
fn error_from_body(status: StatusCode, text: &str) -> ApiError {
    let code = status.as_u16();

    let message = match serde_json::from_str::<Value>(text) {
        Ok(json) => ["message", "error", "detail"]
            .iter()
            .find_map(|key| json.get(key).and_then(Value::as_str))
            .map(str::to_string),
        Err(_) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Err(_) => None,
    };

    ApiError::Http {
        status: code,
        message: message.unwrap_or_else(|| format!("HTTP status {}", code)),
    }
}

fn check_expected_fields(body: &Value, expected: &[String]) -> ApiResult<()> {
    let missing: Vec<_> = expected
        .iter()
        .filter(|field| body.get(field.as_str()).is_none())
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::MissingFields(missing))
    }
}
