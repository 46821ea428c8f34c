pub mod bitbucket;

pub use bitbucket::BitbucketTransport;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to Bitbucket failed: {0}")]
    Network(String),

    #[error("Bitbucket returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Bitbucket sent a response that is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

/// HTTP verb of a request handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Structured option bag describing one request.
///
/// Only the fields relevant to a given operation are set; everything else
/// stays at its default. The transport owns the translation into URLs,
/// query strings and JSON bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Workspace or user owning the repository
    pub owner: String,
    /// Repository slug
    pub slug: String,
    /// Query-language filter (`q` parameter)
    pub query: Option<String>,
    /// Pull request states to include (`state` parameter, repeated)
    pub states: Vec<String>,
    /// Revision to exclude when listing commits
    pub exclude: Option<String>,
    /// Continuation URL of a paginated listing; fetched verbatim when set
    pub cursor: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub source_branch: Option<String>,
    pub destination_branch: Option<String>,
    pub reviewers: Vec<String>,
    pub close_source_branch: Option<bool>,
}

impl RequestOptions {
    /// Options addressing a single repository.
    pub fn for_repo(owner: &str, slug: &str) -> Self {
        Self {
            owner: owner.to_string(),
            slug: slug.to_string(),
            ..Self::default()
        }
    }

    /// Same request, pointed at the page a continuation cursor refers to.
    pub fn with_cursor(&self, cursor: &str) -> Self {
        Self {
            cursor: Some(cursor.to_string()),
            ..self.clone()
        }
    }
}

/// The remote request function the pull request layer is built on.
///
/// Implementations return the raw decoded JSON body of a successful
/// response. Retries, authentication and TLS all live behind this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `method` against `path`, relative to the repository named in
    /// `options`.
    async fn request(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Value, TransportError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_repo_sets_identity_only() {
        let opts = RequestOptions::for_repo("team", "widgets");
        assert_eq!(opts.owner, "team");
        assert_eq!(opts.slug, "widgets");
        assert!(opts.query.is_none());
        assert!(opts.states.is_empty());
    }

    #[test]
    fn test_with_cursor_keeps_other_fields() {
        let mut opts = RequestOptions::for_repo("team", "widgets");
        opts.states = vec!["OPEN".to_string()];
        let next = opts.with_cursor("https://example.org/page2");
        assert_eq!(next.cursor.as_deref(), Some("https://example.org/page2"));
        assert_eq!(next.states, opts.states);
        assert!(opts.cursor.is_none());
    }
}
