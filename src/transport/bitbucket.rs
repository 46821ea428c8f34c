use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{Method, RequestOptions, Transport, TransportError};

pub const DEFAULT_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// Bitbucket Cloud REST 2.0 transport using HTTP Basic Auth.
pub struct BitbucketTransport {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
}

impl BitbucketTransport {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self, TransportError> {
        // Url::join drops the last segment unless the base ends in a slash.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalized).map_err(|_| TransportError::InvalidUrl(base_url.to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Absolute URL of `path` within the repository, including query
    /// parameters. A continuation cursor is used verbatim.
    fn url_for(&self, path: &str, options: &RequestOptions) -> Result<Url, TransportError> {
        if let Some(cursor) = options.cursor.as_deref().filter(|c| !c.is_empty()) {
            return Url::parse(cursor).map_err(|_| TransportError::InvalidUrl(cursor.to_string()));
        }

        let relative = format!("repositories/{}/{}/{}", options.owner, options.slug, path);
        let mut url = self
            .base_url
            .join(&relative)
            .map_err(|_| TransportError::InvalidUrl(relative.clone()))?;

        {
            let mut query = url.query_pairs_mut();
            if let Some(q) = &options.query {
                query.append_pair("q", q);
            }
            for state in &options.states {
                query.append_pair("state", state);
            }
            if let Some(exclude) = &options.exclude {
                query.append_pair("exclude", exclude);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}

/// JSON body for a POST request: pull request creation when a source branch
/// is given, otherwise the (possibly empty) merge parameters.
fn request_body(options: &RequestOptions) -> Value {
    let Some(source) = &options.source_branch else {
        let mut body = json!({});
        if let Some(close) = options.close_source_branch {
            body["close_source_branch"] = json!(close);
        }
        return body;
    };

    let mut body = json!({
        "title": options.title.clone().unwrap_or_default(),
        "description": options.description.clone().unwrap_or_default(),
        "source": { "branch": { "name": source } },
    });
    if let Some(destination) = &options.destination_branch {
        body["destination"] = json!({ "branch": { "name": destination } });
    }
    if !options.reviewers.is_empty() {
        let reviewers: Vec<Value> = options
            .reviewers
            .iter()
            .map(|r| json!({ "username": r }))
            .collect();
        body["reviewers"] = Value::Array(reviewers);
    }
    if let Some(close) = options.close_source_branch {
        body["close_source_branch"] = json!(close);
    }
    body
}

/// Pull the human-readable message out of a Bitbucket error body, which
/// looks like `{"type": "error", "error": {"message": "..."}}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Decode a successful response body. An empty body is an empty object.
fn parse_body(body: &str) -> Result<Value, TransportError> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(body).map_err(|e| TransportError::InvalidBody(e.to_string()))
}

#[async_trait]
impl Transport for BitbucketTransport {
    #[instrument(skip(self, options), fields(owner = %options.owner, slug = %options.slug))]
    async fn request(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Value, TransportError> {
        let url = self.url_for(path, options)?;
        debug!(url = %url, ?method, "sending request");

        let builder = match method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()).json(&request_body(options)),
        };

        let response = builder
            .header("User-Agent", "bb-pr")
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        debug!(status = status.as_u16(), body_bytes = body.len(), "received response");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound {
                resource: url.path().to_string(),
            });
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        parse_body(&body)
    }
}
