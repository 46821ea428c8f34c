use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of a pull request.
///
/// States the service may add later are carried through untouched as
/// `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Declined,
    Merged,
    Superseded,
    Other(String),
}

impl PullRequestState {
    pub fn as_str(&self) -> &str {
        match self {
            PullRequestState::Open => "OPEN",
            PullRequestState::Declined => "DECLINED",
            PullRequestState::Merged => "MERGED",
            PullRequestState::Superseded => "SUPERSEDED",
            PullRequestState::Other(raw) => raw,
        }
    }
}

impl From<&str> for PullRequestState {
    fn from(raw: &str) -> Self {
        match raw {
            "OPEN" => PullRequestState::Open,
            "DECLINED" => PullRequestState::Declined,
            "MERGED" => PullRequestState::Merged,
            "SUPERSEDED" => PullRequestState::Superseded,
            other => PullRequestState::Other(other.to_string()),
        }
    }
}

impl Default for PullRequestState {
    fn default() -> Self {
        PullRequestState::Other(String::new())
    }
}

impl fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequest {
    /// Repository-unique identifier; never zero for a real pull request
    pub id: u64,
    pub title: String,
    pub state: PullRequestState,
    pub source: Resource,
    pub destination: Resource,
    /// Object type tag, e.g. "pullrequest"
    #[allow(dead_code)]
    pub kind: String,
    pub description: String,
    pub author: Account,
    pub created_on: String,
    pub close_source_branch: bool,
    pub comment_count: u64,
    pub task_count: u64,
    /// Zero-valued until the pull request is merged
    pub merge_commit: Commit,
    pub reviewers: Vec<Account>,
    /// Keyed by link name, e.g. "html"
    pub links: BTreeMap<String, Link>,
}

impl PullRequest {
    /// Web URL of the pull request, if the service sent one.
    pub fn html_url(&self) -> Option<&str> {
        self.links
            .get("html")
            .map(|l| l.href.as_str())
            .filter(|href| !href.is_empty())
    }
}

/// One side (source or destination) of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub branch: Branch,
    pub commit: Commit,
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    /// Full message; may span several lines
    pub message: String,
    #[allow(dead_code)]
    pub date: String,
    pub author: CommitAuthor,
}

impl Commit {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.split('\n').next().unwrap_or_default()
    }

    /// Who wrote the commit: the linked account, else the name part of the
    /// raw author string.
    pub fn author_name(&self) -> &str {
        let handle = self.author.user.handle();
        if !handle.is_empty() {
            return handle;
        }
        let raw = self.author.raw.as_str();
        raw.split(" <").next().unwrap_or(raw).trim()
    }
}

/// Author of a commit: the raw "Name <email>" string plus the linked
/// account, when the service could match one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitAuthor {
    pub raw: String,
    pub user: Account,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repository {
    /// "owner/slug"
    pub full_name: String,
    #[allow(dead_code)]
    pub name: String,
    #[allow(dead_code)]
    pub uuid: String,
}

/// Display identity of a user. Carries no authentication meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub display_name: String,
    pub nickname: String,
    #[allow(dead_code)]
    pub uuid: String,
}

impl Account {
    /// Best available name for display: nickname, then display name.
    pub fn handle(&self) -> &str {
        if self.nickname.is_empty() {
            &self.display_name
        } else {
            &self.nickname
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    /// Optional label, used by e.g. clone links ("https", "ssh")
    #[allow(dead_code)]
    pub name: String,
}

/// A build or check status attached to a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    #[allow(dead_code)]
    pub kind: String,
    #[allow(dead_code)]
    pub uuid: String,
    /// Reporter-chosen identifier, shown when the status has no name
    pub key: String,
    #[allow(dead_code)]
    pub refname: String,
    pub url: String,
    /// SUCCESSFUL, FAILED, INPROGRESS or STOPPED, passed through as-is
    pub state: String,
    pub name: String,
    pub description: String,
    #[allow(dead_code)]
    pub created_on: String,
    #[allow(dead_code)]
    pub updated_on: String,
    #[allow(dead_code)]
    pub links: BTreeMap<String, Link>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Total number of entries across all pages, zero when not reported
    pub size: u64,
    #[allow(dead_code)]
    pub page: u64,
    #[allow(dead_code)]
    pub pagelen: u64,
    /// Continuation URL; empty on the last page
    pub next: String,
    #[allow(dead_code)]
    pub previous: String,
    pub values: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            size: 0,
            page: 0,
            pagelen: 0,
            next: String::new(),
            previous: String::new(),
            values: Vec::new(),
        }
    }
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        !self.next.is_empty()
    }
}

pub type ListPullRequests = Page<PullRequest>;
pub type Commits = Page<Commit>;
pub type Statuses = Page<Status>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_known_and_unknown() {
        assert_eq!(PullRequestState::from("OPEN"), PullRequestState::Open);
        assert_eq!(PullRequestState::from("MERGED"), PullRequestState::Merged);
        let odd = PullRequestState::from("QUEUED");
        assert_eq!(odd, PullRequestState::Other("QUEUED".to_string()));
        assert_eq!(odd.to_string(), "QUEUED");
        assert_eq!(PullRequestState::Declined.to_string(), "DECLINED");
    }

    #[test]
    fn test_commit_summary() {
        let commit = Commit {
            message: "Fix bug\n\nDetails".to_string(),
            ..Commit::default()
        };
        assert_eq!(commit.summary(), "Fix bug");
        assert_eq!(Commit::default().summary(), "");
    }

    #[test]
    fn test_commit_author_name() {
        let mut commit = Commit::default();
        commit.author.raw = "Alice Liddell <alice@example.org>".to_string();
        assert_eq!(commit.author_name(), "Alice Liddell");
        commit.author.user.nickname = "alice".to_string();
        assert_eq!(commit.author_name(), "alice");
    }

    #[test]
    fn test_account_handle_prefers_nickname() {
        let mut account = Account {
            display_name: "Alice Liddell".to_string(),
            ..Account::default()
        };
        assert_eq!(account.handle(), "Alice Liddell");
        account.nickname = "alice".to_string();
        assert_eq!(account.handle(), "alice");
    }

    #[test]
    fn test_html_url() {
        let mut pr = PullRequest::default();
        assert!(pr.html_url().is_none());
        pr.links.insert(
            "html".to_string(),
            Link {
                href: "https://bitbucket.org/team/widgets/pull-requests/1".to_string(),
                name: String::new(),
            },
        );
        assert_eq!(
            pr.html_url(),
            Some("https://bitbucket.org/team/widgets/pull-requests/1")
        );
    }

    #[test]
    fn test_page_has_next() {
        let mut page: Commits = Page::default();
        assert!(!page.has_next());
        page.next = "https://example.org/?page=2".to_string();
        assert!(page.has_next());
    }
}
