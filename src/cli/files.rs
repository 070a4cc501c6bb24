//! File CLI command handlers

use std::fs;
use std::io::{self, Write};

use crate::cli::commands::{CommitsArgs, DeleteArgs, DownloadArgs, GlobalArgs, RepoArgs, UploadArgs};
use crate::cli::context::token_manager;
use crate::core::config::Config;
use crate::core::repository::{project_id, RepositoryContext};
use crate::core::token_manager::TokenManager;
use crate::error::Result;
use crate::gitea::auth::AccountToken;
use crate::gitea::files::{FileOperations, RepoRef};

/// Repository and branch a file command works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub project_id: String,
    pub branch: String,
}

impl Target {
    /// Resolve from arguments, falling back to the local clone
    ///
    /// The local branch is only used when the repository itself was detected
    /// from the clone.
    pub fn resolve(args: &RepoArgs, config: &Config) -> Result<Self> {
        let (project_id, detected_branch) = match (&args.project_id, &args.repo) {
            (Some(id), _) => (id.clone(), None),
            (None, Some(repo)) => (project_id(repo, None), None),
            (None, None) => {
                let ctx = RepositoryContext::detect()?;
                (ctx.project_id(), ctx.current_branch)
            }
        };

        let branch = args
            .branch
            .clone()
            .or(detected_branch)
            .unwrap_or_else(|| config.default_branch.clone());

        Ok(Self { project_id, branch })
    }

    pub fn repo_ref(&self) -> RepoRef<'_> {
        RepoRef {
            project_id: &self.project_id,
            branch: &self.branch,
        }
    }
}

/// Everything a file command needs
struct Session {
    config: Config,
    manager: TokenManager,
    token: AccountToken,
}

impl Session {
    fn open(global: &GlobalArgs) -> Result<Self> {
        let config = Config::load()?;
        let manager = token_manager(&config, global)?;
        let token = manager.account(global.account.as_deref())?;
        Ok(Self {
            config,
            manager,
            token,
        })
    }

    fn operations(&self) -> FileOperations<'_> {
        FileOperations::new(&self.manager, &self.config.commit_messages)
    }
}

/// Handle the tree command
pub async fn handle_tree(args: RepoArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::open(global)?;
    let target = Target::resolve(&args, &session.config)?;

    let tree = session.operations().tree(&session.token, target.repo_ref()).await?;

    for entry in &tree.tree {
        let suffix = if entry.is_blob() { "" } else { "/" };
        println!("{}{}", entry.path, suffix);
    }
    if tree.truncated {
        eprintln!("(listing truncated by the server)");
    }
    Ok(())
}

/// Handle the commits command
pub async fn handle_commits(args: CommitsArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::open(global)?;
    let target = Target::resolve(&args.repo, &session.config)?;

    let commits = session
        .operations()
        .commits(&session.token, target.repo_ref(), &args.path)
        .await?;

    if commits.is_empty() {
        println!("No commits found for {} on {}.", args.path, target.branch);
        return Ok(());
    }

    for commit in commits {
        let short_sha: String = commit.sha.chars().take(8).collect();
        let summary = commit.commit.message.lines().next().unwrap_or("");
        let (author, date) = commit
            .commit
            .author
            .as_ref()
            .map(|a| (a.name.as_str(), a.date.as_deref().unwrap_or("")))
            .unwrap_or(("", ""));
        println!("{}  {}  {}  {}", short_sha, date, author, summary);
    }
    Ok(())
}

/// Handle the upload command
pub async fn handle_upload(args: UploadArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::open(global)?;
    let target = Target::resolve(&args.repo, &session.config)?;
    let content = fs::read(&args.file)?;

    let result = session
        .operations()
        .upload(
            &session.token,
            target.repo_ref(),
            &args.path,
            &content,
            args.sha.as_deref(),
        )
        .await?;

    let action = if args.sha.is_some() { "Updated" } else { "Created" };
    println!("✓ {} {} on {}", action, args.path, target.branch);
    println!("  Commit: {}", result.commit.sha);
    if let Some(sha) = result.content_sha() {
        println!("  Content sha: {}", sha);
    }
    Ok(())
}

/// Handle the delete command
pub async fn handle_delete(args: DeleteArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::open(global)?;
    let target = Target::resolve(&args.repo, &session.config)?;

    let result = session
        .operations()
        .delete(&session.token, target.repo_ref(), &args.path, &args.sha)
        .await?;

    println!("✓ Deleted {} on {}", args.path, target.branch);
    println!("  Commit: {}", result.commit.sha);
    Ok(())
}

/// Handle the download command
pub async fn handle_download(args: DownloadArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::open(global)?;
    let target = Target::resolve(&args.repo, &session.config)?;

    let file = session
        .operations()
        .download(&session.token, target.repo_ref(), &args.path)
        .await?;

    match &args.output {
        Some(output) => {
            fs::write(output, &file.data)?;
            println!("✓ Saved {} to {}", args.path, output.display());
            println!("  Content sha: {}", file.sha);
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&file.data)?;
            stdout.flush()?;
            eprintln!("sha: {}", file.sha);
        }
    }
    Ok(())
}
