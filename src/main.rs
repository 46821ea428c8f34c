mod config;
mod git;
mod pr;
mod render;
mod transport;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use git::{GitCli, RepoRef, Vcs};
use pr::{NewPullRequest, PullRequestService, Resolution};
use transport::{BitbucketTransport, Transport};

/// bb: work with Bitbucket.org pull requests from the command line,
/// starting from the repository and branch you have checked out.
#[derive(Parser, Debug)]
#[command(name = "bb", version, about)]
struct Cli {
    /// Config file (default: <config dir>/bb/configuration.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bitbucket username (overrides config and BB_USERNAME)
    #[arg(long, global = true)]
    username: Option<String>,

    /// Bitbucket app password (overrides config and BB_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage pull requests
    #[command(subcommand)]
    Pr(PrCommand),
}

#[derive(Subcommand, Debug)]
enum PrCommand {
    /// List pull requests in this repository
    List {
        /// Only include pull requests in this state (repeatable; default OPEN)
        #[arg(long = "state", value_name = "STATE")]
        states: Vec<String>,

        /// Follow pagination and list every match
        #[arg(long)]
        all: bool,
    },

    /// Display the title, body, and other information about a pull request
    View {
        /// Pull request ID; defaults to the one for the current branch
        id: Option<u64>,

        /// Open the pull request in a web browser instead
        #[arg(long)]
        web: bool,
    },

    /// Create a pull request from the current branch
    Create {
        /// Title; derived from the branch's commits when omitted
        #[arg(short, long)]
        title: Option<String>,

        /// Body; derived from the branch's commits when omitted
        #[arg(short, long)]
        body: Option<String>,

        /// Destination branch (default from config, else "master")
        #[arg(long)]
        base: Option<String>,

        /// Request a review from this username (repeatable)
        #[arg(short, long = "reviewer", value_name = "USERNAME")]
        reviewers: Vec<String>,

        /// Delete the source branch once merged
        #[arg(long)]
        close_source_branch: bool,
    },

    /// Merge a pull request
    Merge {
        id: Option<u64>,

        /// Delete the source branch after merging
        #[arg(long)]
        close_source_branch: bool,
    },

    /// Show build statuses of a pull request
    Statuses { id: Option<u64> },

    /// List the commits of a pull request
    Commits { id: Option<u64> },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{}{}{}", ":: ".red(), "An error occurred: ".bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;

    let username = cli
        .username
        .or_else(|| config.auth.username.clone())
        .ok_or("Bitbucket username is required: set --username, BB_USERNAME or auth.username")?;
    let password = cli
        .password
        .or_else(|| config.auth.password.clone())
        .ok_or("Bitbucket app password is required: set --password, BB_PASSWORD or auth.password")?;

    let transport = BitbucketTransport::new(config.base_url(), &username, &password)?;
    let service = PullRequestService::new(transport, GitCli::default());

    let repo = service.repository()?;
    let _span = info_span!("bb", repo = %repo).entered();
    debug!(host = %repo.host, "resolved repository");
    if !repo.is_bitbucket_org() {
        warn!(host = %repo.host, "remote does not point at bitbucket.org");
        eprintln!(
            "{}{}Are you sure this is a Bitbucket repository?",
            ":: ".yellow(),
            "Warning: ".bold()
        );
    }

    let Command::Pr(command) = cli.command;
    match command {
        PrCommand::List { states, all } => {
            let states: Vec<String> = states.iter().map(|s| s.to_uppercase()).collect();
            let pull_requests = if all {
                service.list_all(&repo, &states).await?
            } else {
                service.list(&repo, &states).await?.values
            };
            render::print_list(&pull_requests);
        }
        PrCommand::View { id, web } => {
            let resolution = resolve(&service, &repo, id).await?;
            let pr = resolution.pull_request;
            if web {
                let url = pr
                    .html_url()
                    .ok_or_else(|| format!("Pull request #{} has no web link", pr.id))?;
                println!("Opening {} in your browser.", url.cyan());
                open::that(url)?;
                return Ok(());
            }
            let commits = service.commits(&repo, pr.id).await?;
            render::print_summary(&pr, &commits);
        }
        PrCommand::Create {
            title,
            body,
            base,
            reviewers,
            close_source_branch,
        } => {
            let source = service.current_branch()?;
            let destination = base.unwrap_or_else(|| config.default_destination().to_string());
            println!(
                "Creating pull request for {} into {} in {}\n",
                source.cyan(),
                destination.cyan(),
                repo
            );

            let (title, description) = match (title, body) {
                (Some(title), Some(body)) => (title, body),
                (title, body) => {
                    let (default_title, default_body) = service
                        .default_title_and_body(&repo, &source, &destination)
                        .await?;
                    (
                        title.unwrap_or(default_title),
                        body.unwrap_or(default_body),
                    )
                }
            };

            let draft = NewPullRequest {
                source_branch: source,
                destination_branch: destination,
                title,
                description,
                reviewers,
                close_source_branch,
            };
            let created = service.create(&repo, &draft).await?;
            render::print_outcome("Created", &created);
        }
        PrCommand::Merge {
            id,
            close_source_branch,
        } => {
            let id = resolve_id(&service, &repo, id).await?;
            let merged = service
                .merge(&repo, id, close_source_branch.then_some(true))
                .await?;
            render::print_outcome("Merged", &merged);
        }
        PrCommand::Statuses { id } => {
            let id = resolve_id(&service, &repo, id).await?;
            render::print_statuses(&service.statuses(&repo, id).await?);
        }
        PrCommand::Commits { id } => {
            let id = resolve_id(&service, &repo, id).await?;
            render::print_commits(&service.commits(&repo, id).await?);
        }
    }

    Ok(())
}

/// Resolve an optional ID against the current branch, telling the user when
/// the branch has more than one pull request.
async fn resolve<R: Transport, V: Vcs>(
    service: &PullRequestService<R, V>,
    repo: &RepoRef,
    id: Option<u64>,
) -> Result<Resolution, pr::PrError> {
    let resolution = service.resolve(repo, id, None).await?;
    if resolution.is_ambiguous() {
        eprintln!(
            "{}{}{} pull requests use this branch; showing #{}. Pass an ID to pick another.",
            ":: ".yellow(),
            "Warning: ".bold(),
            resolution.matches,
            resolution.pull_request.id
        );
    }
    Ok(resolution)
}

/// The ID to act on: the explicit one when given, otherwise the pull request
/// of the current branch.
async fn resolve_id<R: Transport, V: Vcs>(
    service: &PullRequestService<R, V>,
    repo: &RepoRef,
    id: Option<u64>,
) -> Result<u64, pr::PrError> {
    match id {
        Some(id) => Ok(id),
        None => Ok(resolve(service, repo, None).await?.pull_request.id),
    }
}
