use super::types::Commit;

/// Derive a default title and body for a new pull request from the commits
/// it would introduce.
///
/// - No commits: the branch name, empty body.
/// - One commit: its summary line, and the rest of the message trimmed.
/// - Several commits: the branch name, and one `- <summary>` line per commit
///   in the order given.
pub fn default_title_and_body(commits: &[Commit], source_branch: &str) -> (String, String) {
    match commits {
        [] => (source_branch.to_string(), String::new()),
        [commit] => match commit.message.split_once('\n') {
            Some((headline, rest)) => (headline.to_string(), rest.trim().to_string()),
            None => (commit.message.clone(), String::new()),
        },
        _ => {
            let body = commits
                .iter()
                .map(|c| format!("- {}\n", c.summary()))
                .collect::<String>();
            (source_branch.to_string(), body)
        }
    }
}
