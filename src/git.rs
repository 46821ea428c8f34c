use std::fmt;
use std::process::Command;

use reqwest::Url;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("git failed: {0}")]
    Git(String),

    #[error("HEAD is detached; check out a branch or pass a pull request ID")]
    DetachedHead,

    #[error("Remote '{0}' is not configured")]
    NoRemote(String),

    #[error("Cannot determine repository from remote URL: {0}")]
    UnrecognisedRemote(String),
}

/// Identity of the hosted repository the working copy belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub host: String,
    /// Workspace or user owning the repository
    pub owner: String,
    pub slug: String,
}

impl RepoRef {
    pub fn is_bitbucket_org(&self) -> bool {
        self.host == "bitbucket.org"
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

/// Local version-control lookups the pull request commands rely on.
pub trait Vcs: Send + Sync {
    fn current_branch(&self) -> Result<String, VcsError>;

    fn repository(&self) -> Result<RepoRef, VcsError>;
}

/// [`Vcs`] backed by the `git` executable in the current directory.
pub struct GitCli {
    remote: String,
}

impl GitCli {
    pub fn new(remote: &str) -> Self {
        Self {
            remote: remote.to_string(),
        }
    }

    fn git(&self, args: &[&str]) -> Result<String, VcsError> {
        let output = Command::new("git").args(args).output()?;
        if !output.status.success() {
            return Err(VcsError::Git(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("origin")
    }
}

impl Vcs for GitCli {
    fn current_branch(&self) -> Result<String, VcsError> {
        let branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if branch == "HEAD" {
            return Err(VcsError::DetachedHead);
        }
        debug!(branch = %branch, "current branch");
        Ok(branch)
    }

    fn repository(&self) -> Result<RepoRef, VcsError> {
        let url = self
            .git(&["remote", "get-url", &self.remote])
            .map_err(|_| VcsError::NoRemote(self.remote.clone()))?;
        debug!(remote = %self.remote, url = %url, "remote URL");
        parse_remote_url(&url)
    }
}

/// Parse a clone URL into a [`RepoRef`].
///
/// Accepts scp-style (`git@host:owner/slug.git`) as well as `ssh://` and
/// `https://` URLs, with or without user info and the `.git` suffix.
pub fn parse_remote_url(url: &str) -> Result<RepoRef, VcsError> {
    let unrecognised = || VcsError::UnrecognisedRemote(url.to_string());

    let (host, path) = if url.contains("://") {
        let parsed = Url::parse(url).map_err(|_| unrecognised())?;
        let host = parsed.host_str().ok_or_else(unrecognised)?.to_string();
        (host, parsed.path().to_string())
    } else {
        let (user_host, path) = url.split_once(':').ok_or_else(unrecognised)?;
        let host = user_host
            .rsplit_once('@')
            .map_or(user_host, |(_, h)| h)
            .to_string();
        (host, path.to_string())
    };

    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() != 2 || host.is_empty() {
        return Err(unrecognised());
    }

    let slug = segments[1].strip_suffix(".git").unwrap_or(segments[1]);
    if slug.is_empty() {
        return Err(unrecognised());
    }

    Ok(RepoRef {
        host,
        owner: segments[0].to_string(),
        slug: slug.to_string(),
    })
}
