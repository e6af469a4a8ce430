//! Grove command-line interface

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grove_core::Repository;
use grove_core::worktree::REPO_DIR;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "grove")]
#[command(author = "Grove Contributors")]
#[command(version)]
#[command(about = "A small content-addressed version control tool")]
struct Cli {
    /// Run as if grove was started in DIR
    #[arg(short = 'C', global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty repository
    Init,

    /// List, create, switch, rename or delete branches
    Branch {
        #[command(subcommand)]
        action: Option<BranchAction>,
    },

    /// Stage file contents
    Add {
        /// Files or directories to stage
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Show staged, unstaged and untracked changes
    Status,

    /// Record the staged changes on the head branch
    Commit {
        /// Commit message
        message: String,
    },

    /// Show the history of the head branch
    Log,

    /// Show the movements of a branch
    Reflog {
        /// Branch name (default: the head branch)
        branch: Option<String>,
    },

    /// Switch to another branch
    Checkout {
        /// Branch name
        branch: String,
    },
}

#[derive(Subcommand, Debug)]
enum BranchAction {
    /// Create a branch at the head commit
    Create { name: String },
    /// Make a branch the head without touching the worktree
    Update { name: String },
    /// Rename the head branch
    Rename { name: String },
    /// Delete a branch other than the head
    Delete { name: String },
}

fn init_tracing(debug: bool) {
    let env_filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

/// Nearest directory at or above `start` holding a repository
fn discover_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(REPO_DIR).is_dir())
        .map(Path::to_path_buf)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let cwd = std::env::current_dir().context("cannot read current directory")?;
    let base = match &cli.dir {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };
    let root = match cli.command {
        Commands::Init => base.clone(),
        _ => discover_root(&base).unwrap_or_else(|| base.clone()),
    };
    tracing::debug!(root = %root.display(), "resolved repository root");

    let mut repo = Repository::open(&root)
        .with_context(|| format!("cannot open repository at {}", root.display()))?;

    match cli.command {
        Commands::Init => {
            if repo.init()? {
                println!(
                    "Initialized empty Grove repository in {}",
                    root.join(REPO_DIR).display()
                );
            } else {
                println!(
                    "Grove repository already exists in {}",
                    root.join(REPO_DIR).display()
                );
            }
        }

        Commands::Branch { action } => match action {
            None => print!("{}", output::format_branches(&repo.list_branches()?)),
            Some(BranchAction::Create { name }) => {
                let created = repo.create_branch(&name)?;
                if created.renamed {
                    println!("Renamed empty branch to '{}'", created.branch.branch_name());
                } else {
                    println!("Created branch '{}'", created.branch.branch_name());
                }
            }
            Some(BranchAction::Update { name }) => {
                let head = repo.update_head_branch(&name)?;
                println!("Head is now '{}'", head.branch_name());
            }
            Some(BranchAction::Rename { name }) => {
                let head = repo.rename_head_branch(&name)?;
                println!("Renamed head branch to '{}'", head.branch_name());
            }
            Some(BranchAction::Delete { name }) => {
                repo.delete_branch(&name)?;
                println!("Deleted branch '{}'", name);
            }
        },

        Commands::Add { paths } => {
            let pathspecs: Vec<String> = paths
                .iter()
                .map(|p| base.join(p).to_string_lossy().into_owned())
                .collect();
            let summary = repo.add_index(&pathspecs)?;
            if let Some(line) = output::format_add_summary(&summary) {
                println!("{}", line);
            }
        }

        Commands::Status => print!("{}", output::format_status(&repo.status()?)),

        Commands::Commit { message } => match repo.commit(&message)? {
            Some(commit) => {
                let head = repo.head_branch()?;
                println!("{}", output::format_commit_created(head.branch_name(), &commit));
            }
            None => println!("nothing to commit"),
        },

        Commands::Log => print!("{}", output::format_log(&repo.log()?)),

        Commands::Reflog { branch } => {
            let entries = repo.reflog(branch.as_deref())?;
            let name = match branch {
                Some(name) => name,
                None => repo.head_branch()?.branch_name().to_string(),
            };
            print!("{}", output::format_reflog(&name, &entries));
        }

        Commands::Checkout { branch } => {
            let summary = repo.checkout(&branch)?;
            if summary.from == summary.to {
                println!("Already on '{}'", summary.to);
            } else {
                println!("Switched to branch '{}'", summary.to);
            }
        }
    }

    Ok(())
}
