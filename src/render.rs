use colored::Colorize;

use crate::pr::types::{Commits, PullRequest, PullRequestState, Resource, Status, Statuses};

/// Colored label for a pull request state.
fn colorize_state(state: &PullRequestState) -> colored::ColoredString {
    match state {
        PullRequestState::Open => "Open".green().bold(),
        PullRequestState::Declined => "Declined".red().bold(),
        PullRequestState::Merged => "Merged".magenta().bold(),
        PullRequestState::Superseded => "Superseded".yellow().bold(),
        PullRequestState::Other(raw) => raw.normal(),
    }
}

fn colorize_status(state: &str) -> colored::ColoredString {
    match state {
        "SUCCESSFUL" => "✓".green().bold(),
        "FAILED" | "STOPPED" => "✗".red().bold(),
        "INPROGRESS" => "…".yellow().bold(),
        other => other.normal(),
    }
}

/// `#12  Add OAuth2 login flow  feature/oauth → main`
fn list_line(pr: &PullRequest) -> String {
    format!(
        "{}  {}  {}",
        format!("#{}", pr.id).green(),
        pr.title,
        format!("{} → {}", pr.source.branch.name, pr.destination.branch.name).cyan()
    )
}

/// Commit hashes are shown abbreviated to twelve characters.
fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

/// `owner/slug:branch` when the pull request comes from another
/// repository, otherwise just the branch.
fn source_label(pr: &PullRequest) -> String {
    let Resource { branch, repository, .. } = &pr.source;
    let forked = !repository.full_name.is_empty()
        && repository.full_name != pr.destination.repository.full_name;
    if forked {
        format!("{}:{}", repository.full_name, branch.name)
    } else {
        branch.name.clone()
    }
}

pub fn print_list(pull_requests: &[PullRequest]) {
    if pull_requests.is_empty() {
        println!("No pull requests found.");
        return;
    }
    for pr in pull_requests {
        println!("{}", list_line(pr));
    }
}

/// Header, description and link for `pr view`.
///
/// A commit listing that continues past the first page is shown as `N+`.
fn summary(pr: &PullRequest, commits: &Commits) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", pr.title.bold()));

    let count = if commits.has_next() {
        format!("{}+", commits.values.len())
    } else {
        commits.values.len().to_string()
    };
    let info = format!(
        "{} wants to merge {} commits into {} from {}",
        pr.author.handle(),
        count,
        pr.destination.branch.name,
        source_label(pr)
    );
    out.push_str(&format!("{} • {}\n", colorize_state(&pr.state), info.dimmed()));

    let mut details = vec![
        format!("{} comments", pr.comment_count),
        format!("{} tasks", pr.task_count),
    ];
    if !pr.created_on.is_empty() {
        details.push(format!("opened {}", pr.created_on));
    }
    if !pr.source.commit.hash.is_empty() {
        details.push(format!("head {}", short_hash(&pr.source.commit.hash)));
    }
    if !pr.reviewers.is_empty() {
        let names: Vec<&str> = pr.reviewers.iter().map(|r| r.handle()).collect();
        details.push(format!("reviewers: {}", names.join(", ")));
    }
    if pr.close_source_branch {
        details.push("closes source branch".to_string());
    }
    out.push_str(&format!("{}\n", details.join(" • ").dimmed()));

    if !pr.description.is_empty() {
        out.push('\n');
        out.push_str(pr.description.trim_end());
        out.push_str("\n\n");
    }

    if let Some(url) = pr.html_url() {
        out.push_str(&format!(
            "{}\n",
            format!("View this pull request on Bitbucket.org: {}", url).dimmed()
        ));
    }
    out
}

pub fn print_summary(pr: &PullRequest, commits: &Commits) {
    print!("{}", summary(pr, commits));
}

fn status_line(status: &Status) -> String {
    let name = if status.name.is_empty() {
        &status.key
    } else {
        &status.name
    };
    let mut line = format!("{} {}", colorize_status(&status.state), name);
    if !status.description.is_empty() {
        line.push_str(&format!(" - {}", status.description));
    }
    if !status.url.is_empty() {
        line.push_str(&format!("  {}", status.url.dimmed()));
    }
    line
}

pub fn print_statuses(statuses: &Statuses) {
    if statuses.values.is_empty() {
        println!("No statuses reported.");
        return;
    }
    for status in &statuses.values {
        println!("{}", status_line(status));
    }
}

pub fn print_commits(commits: &Commits) {
    for commit in &commits.values {
        let author = commit.author_name();
        if author.is_empty() {
            println!("{} {}", short_hash(&commit.hash).yellow(), commit.summary());
        } else {
            println!(
                "{} {} {}",
                short_hash(&commit.hash).yellow(),
                commit.summary(),
                format!("({})", author).dimmed()
            );
        }
    }
    if commits.has_next() {
        println!("{}", "(more commits not shown)".dimmed());
    }
}

/// Confirmation after a create or merge.
pub fn print_outcome(verb: &str, pr: &PullRequest) {
    println!("{} pull request #{}: {}", verb, pr.id, pr.title.bold());
    if !pr.merge_commit.hash.is_empty() {
        println!("Merge commit {}", short_hash(&pr.merge_commit.hash).yellow());
    }
    if let Some(url) = pr.html_url() {
        println!("{}", url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::types::{Account, Branch, Commit, Link, Repository};

    fn sample_pr() -> PullRequest {
        let mut pr = PullRequest {
            id: 42,
            title: "Add OAuth2 login flow".to_string(),
            state: PullRequestState::Open,
            description: "Adds the login flow.".to_string(),
            author: Account {
                nickname: "alice".to_string(),
                ..Account::default()
            },
            source: Resource {
                branch: Branch {
                    name: "feature/oauth".to_string(),
                },
                ..Resource::default()
            },
            destination: Resource {
                branch: Branch {
                    name: "main".to_string(),
                },
                ..Resource::default()
            },
            ..PullRequest::default()
        };
        pr.links.insert(
            "html".to_string(),
            Link {
                href: "https://bitbucket.org/team/widgets/pull-requests/42".to_string(),
                name: String::new(),
            },
        );
        pr
    }

    fn commits(n: usize, more: bool) -> Commits {
        Commits {
            values: (0..n)
                .map(|i| Commit {
                    hash: format!("{:040}", i),
                    message: format!("Commit {}", i),
                    ..Commit::default()
                })
                .collect(),
            next: if more {
                "https://example.org/?page=2".to_string()
            } else {
                String::new()
            },
            ..Commits::default()
        }
    }

    #[test]
    fn test_summary_contents() {
        let text = summary(&sample_pr(), &commits(2, false));
        assert!(text.contains("Add OAuth2 login flow"));
        assert!(text.contains("alice wants to merge 2 commits into main from feature/oauth"));
        assert!(text.contains("Adds the login flow."));
        assert!(text.contains("0 comments • 0 tasks"));
        assert!(text.contains("https://bitbucket.org/team/widgets/pull-requests/42"));
    }

    #[test]
    fn test_summary_lists_reviewers() {
        let mut pr = sample_pr();
        pr.reviewers = vec![
            Account {
                nickname: "bob".to_string(),
                ..Account::default()
            },
            Account {
                display_name: "Carol C".to_string(),
                ..Account::default()
            },
        ];
        let text = summary(&pr, &commits(1, false));
        assert!(text.contains("reviewers: bob, Carol C"));
    }

    #[test]
    fn test_summary_marks_truncated_commit_count() {
        let text = summary(&sample_pr(), &commits(10, true));
        assert!(text.contains("merge 10+ commits"));
    }

    #[test]
    fn test_summary_without_description_or_link() {
        let mut pr = sample_pr();
        pr.description.clear();
        pr.links.clear();
        let text = summary(&pr, &commits(0, false));
        assert!(!text.contains("View this pull request"));
    }

    #[test]
    fn test_summary_shows_fork_head_and_date() {
        let mut pr = sample_pr();
        pr.created_on = "2024-03-01T10:00:00+00:00".to_string();
        pr.source.commit.hash = "0123456789abcdef0123".to_string();
        pr.source.repository = Repository {
            full_name: "alice/widgets".to_string(),
            ..Repository::default()
        };
        pr.destination.repository = Repository {
            full_name: "team/widgets".to_string(),
            ..Repository::default()
        };
        let text = summary(&pr, &commits(1, false));
        assert!(text.contains("into main from alice/widgets:feature/oauth"));
        assert!(text.contains("opened 2024-03-01T10:00:00+00:00"));
        assert!(text.contains("head 0123456789ab"));
    }

    #[test]
    fn test_source_label_same_repository() {
        let mut pr = sample_pr();
        pr.source.repository.full_name = "team/widgets".to_string();
        pr.destination.repository.full_name = "team/widgets".to_string();
        assert_eq!(source_label(&pr), "feature/oauth");
    }

    #[test]
    fn test_status_line_falls_back_to_key() {
        let status = Status {
            state: "SUCCESSFUL".to_string(),
            key: "lint".to_string(),
            ..Status::default()
        };
        assert!(status_line(&status).contains("lint"));
    }

    #[test]
    fn test_list_line() {
        let line = list_line(&sample_pr());
        assert!(line.contains("#42"));
        assert!(line.contains("feature/oauth → main"));
    }

    #[test]
    fn test_status_line() {
        let status = Status {
            state: "FAILED".to_string(),
            name: "Pipeline #7".to_string(),
            description: "2 tests failed".to_string(),
            ..Status::default()
        };
        let line = status_line(&status);
        assert!(line.contains("Pipeline #7 - 2 tests failed"));
    }

    #[test]
    fn test_print_functions_do_not_panic() {
        print_list(&[sample_pr()]);
        print_list(&[]);
        print_summary(&sample_pr(), &commits(1, false));
        print_statuses(&Statuses::default());
        print_commits(&commits(3, true));
        print_outcome("Created", &sample_pr());
    }
}
