use tracing::{debug, info, instrument};

use super::normalize::{normalize, Normalize};
use super::pagination::PageWalker;
use super::synthesize::default_title_and_body;
use super::types::{Commits, ListPullRequests, PullRequest, Statuses};
use super::PrError;
use crate::git::{RepoRef, Vcs};
use crate::transport::{Method, RequestOptions, Transport, TransportError};

/// Parameters for opening a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPullRequest {
    pub source_branch: String,
    pub destination_branch: String,
    pub title: String,
    pub description: String,
    /// Reviewer usernames
    pub reviewers: Vec<String>,
    pub close_source_branch: bool,
}

/// Outcome of resolving a branch or ID to a single pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub pull_request: PullRequest,
    /// How many pull requests matched; more than one means the first in
    /// server order was picked
    pub matches: u64,
}

impl Resolution {
    pub fn is_ambiguous(&self) -> bool {
        self.matches > 1
    }
}

/// Pull request operations against one hosting service.
///
/// Every call builds a fresh [`RequestOptions`], hands it to the transport
/// and normalizes the reply. Transport errors come back unchanged; nothing
/// is retried.
pub struct PullRequestService<R, V> {
    transport: R,
    vcs: V,
}

/// Filter expression selecting pull requests by source branch.
///
/// The branch name is embedded as-is; a name containing `"` produces a
/// malformed filter.
pub fn source_branch_query(branch: &str) -> String {
    format!("source.branch.name = \"{}\"", branch)
}

impl<R: Transport, V: Vcs> PullRequestService<R, V> {
    pub fn new(transport: R, vcs: V) -> Self {
        Self { transport, vcs }
    }

    /// Repository the working copy points at.
    pub fn repository(&self) -> Result<RepoRef, PrError> {
        Ok(self.vcs.repository()?)
    }

    pub fn current_branch(&self) -> Result<String, PrError> {
        Ok(self.vcs.current_branch()?)
    }

    async fn fetch<T: Normalize>(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
    ) -> Result<T, PrError> {
        let raw = self.transport.request(method, path, options).await?;
        Ok(normalize(&raw)?)
    }

    fn list_options(repo: &RepoRef, states: &[String]) -> RequestOptions {
        RequestOptions {
            states: states.to_vec(),
            ..RequestOptions::for_repo(&repo.owner, &repo.slug)
        }
    }

    /// First page of pull requests in any of `states` (server default when
    /// empty).
    #[instrument(skip(self, repo), fields(repo = %repo))]
    pub async fn list(
        &self,
        repo: &RepoRef,
        states: &[String],
    ) -> Result<ListPullRequests, PrError> {
        let page: ListPullRequests = self
            .fetch(Method::Get, "pullrequests", &Self::list_options(repo, states))
            .await?;
        debug!(returned = page.values.len(), size = page.size, "listed pull requests");
        Ok(page)
    }

    /// Lazy walk over every page of the listing.
    pub async fn walk_list(
        &self,
        repo: &RepoRef,
        states: &[String],
    ) -> Result<PageWalker<'_, R, PullRequest>, PrError> {
        let options = Self::list_options(repo, states);
        let first = self.fetch(Method::Get, "pullrequests", &options).await?;
        Ok(PageWalker::new(&self.transport, "pullrequests", options, first))
    }

    /// Every pull request in any of `states`, across all pages.
    #[instrument(skip(self, repo), fields(repo = %repo))]
    pub async fn list_all(
        &self,
        repo: &RepoRef,
        states: &[String],
    ) -> Result<Vec<PullRequest>, PrError> {
        self.walk_list(repo, states).await?.collect_values().await
    }

    /// Fetch one pull request by ID.
    #[instrument(skip(self, repo), fields(repo = %repo))]
    pub async fn view(&self, repo: &RepoRef, id: u64) -> Result<PullRequest, PrError> {
        let options = RequestOptions::for_repo(&repo.owner, &repo.slug);
        match self
            .fetch(Method::Get, &format!("pullrequests/{}", id), &options)
            .await
        {
            Err(PrError::Transport(TransportError::NotFound { .. })) => Err(PrError::NotFound(
                format!("pull request #{} does not exist in {}", id, repo),
            )),
            other => other,
        }
    }

    /// Pull request whose source branch is exactly `branch`.
    ///
    /// With several matches the first in server order wins; the match count
    /// is reported so callers can warn about it.
    #[instrument(skip(self, repo), fields(repo = %repo))]
    pub async fn resolve_by_source_branch(
        &self,
        repo: &RepoRef,
        branch: &str,
    ) -> Result<Resolution, PrError> {
        let options = RequestOptions {
            query: Some(source_branch_query(branch)),
            ..RequestOptions::for_repo(&repo.owner, &repo.slug)
        };
        let page: ListPullRequests = self.fetch(Method::Get, "pullrequests", &options).await?;

        let matches = page.size.max(page.values.len() as u64);
        let pull_request = page
            .values
            .into_iter()
            .next()
            .ok_or_else(|| PrError::NotFound(format!("no pull request on branch '{}'", branch)))?;
        if matches > 1 {
            info!(matches, chosen = pull_request.id, "several pull requests share this branch");
        }
        Ok(Resolution {
            pull_request,
            matches,
        })
    }

    /// Decide which pull request to act on: an explicit ID wins, then the
    /// given branch, then the currently checked-out branch.
    ///
    /// A branch match is fetched again by ID, since listing entries lack
    /// the participants, reviewers and counters of the full record.
    pub async fn resolve(
        &self,
        repo: &RepoRef,
        id: Option<u64>,
        branch: Option<&str>,
    ) -> Result<Resolution, PrError> {
        if let Some(id) = id {
            return Ok(Resolution {
                pull_request: self.view(repo, id).await?,
                matches: 1,
            });
        }
        let branch = match branch {
            Some(b) => b.to_string(),
            None => self.current_branch()?,
        };
        let found = self.resolve_by_source_branch(repo, &branch).await?;
        Ok(Resolution {
            pull_request: self.view(repo, found.pull_request.id).await?,
            matches: found.matches,
        })
    }

    #[instrument(
        skip(self, repo, draft),
        fields(repo = %repo, source = %draft.source_branch)
    )]
    pub async fn create(
        &self,
        repo: &RepoRef,
        draft: &NewPullRequest,
    ) -> Result<PullRequest, PrError> {
        let options = RequestOptions {
            title: Some(draft.title.clone()),
            description: Some(draft.description.clone()),
            source_branch: Some(draft.source_branch.clone()),
            destination_branch: Some(draft.destination_branch.clone())
                .filter(|d| !d.is_empty()),
            reviewers: draft.reviewers.clone(),
            close_source_branch: Some(draft.close_source_branch),
            ..RequestOptions::for_repo(&repo.owner, &repo.slug)
        };
        let created: PullRequest = self.fetch(Method::Post, "pullrequests", &options).await?;
        info!(id = created.id, "created pull request");
        Ok(created)
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    pub async fn merge(
        &self,
        repo: &RepoRef,
        id: u64,
        close_source_branch: Option<bool>,
    ) -> Result<PullRequest, PrError> {
        let options = RequestOptions {
            close_source_branch,
            ..RequestOptions::for_repo(&repo.owner, &repo.slug)
        };
        self.fetch(Method::Post, &format!("pullrequests/{}/merge", id), &options)
            .await
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    pub async fn statuses(&self, repo: &RepoRef, id: u64) -> Result<Statuses, PrError> {
        let options = RequestOptions::for_repo(&repo.owner, &repo.slug);
        self.fetch(Method::Get, &format!("pullrequests/{}/statuses", id), &options)
            .await
    }

    #[instrument(skip(self, repo), fields(repo = %repo))]
    pub async fn commits(&self, repo: &RepoRef, id: u64) -> Result<Commits, PrError> {
        let options = RequestOptions::for_repo(&repo.owner, &repo.slug);
        self.fetch(Method::Get, &format!("pullrequests/{}/commits", id), &options)
            .await
    }

    /// First page of commits on `source` that are not on `destination`.
    #[instrument(skip(self, repo), fields(repo = %repo))]
    pub async fn commits_between(
        &self,
        repo: &RepoRef,
        source: &str,
        destination: &str,
    ) -> Result<Commits, PrError> {
        let options = RequestOptions {
            exclude: Some(destination.to_string()),
            ..RequestOptions::for_repo(&repo.owner, &repo.slug)
        };
        self.fetch(Method::Get, &format!("commits/{}", source), &options)
            .await
    }

    /// Title and body to propose for a pull request from `source` into
    /// `destination`, derived from the commits it would bring in.
    pub async fn default_title_and_body(
        &self,
        repo: &RepoRef,
        source: &str,
        destination: &str,
    ) -> Result<(String, String), PrError> {
        let commits = self.commits_between(repo, source, destination).await?;
        Ok(default_title_and_body(&commits.values, source))
    }
}
