pub mod normalize;
pub mod pagination;
pub mod service;
pub mod synthesize;
pub mod types;

pub use normalize::DecodeError;
pub use service::{NewPullRequest, PullRequestService, Resolution};

use thiserror::Error;

use crate::git::VcsError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum PrError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error("No pull request found: {0}")]
    NotFound(String),
}
