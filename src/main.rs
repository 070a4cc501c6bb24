//! gitea-link - Gitea account linking and repository file access
//!
//! Links Gitea accounts through OAuth 2.0, keeps their tokens fresh and
//! reads or writes repository files with them.
//!
//! Available as the `gitea-link` command.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gitea_link::cli::commands::{Cli, Commands};
use gitea_link::cli::{account, auth, config, files};
use gitea_link::error::{GiteaLinkError, Result};
use gitea_link::gitea::error_handler::{is_not_found, is_unauthorized};

#[tokio::main]
async fn main() {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        handle_error(e);
        std::process::exit(1);
    }
}

/// Print errors with extra hints for rejected or missing resources
fn handle_error(e: GiteaLinkError) {
    eprintln!("Error: {}", e);

    if is_unauthorized(&e) {
        eprintln!();
        eprintln!("  → The token was rejected. Run 'gitea-link auth refresh', or link the account again with 'gitea-link auth login'.");
    } else if is_not_found(&e) {
        eprintln!();
        eprintln!("  → Check the repository (--repo), branch (--branch) and file path.");
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Auth(args) => auth::handle_auth(args.command, &global).await,
        Commands::Account(args) => account::handle_account(args.command).await,
        Commands::Tree(args) => files::handle_tree(args, &global).await,
        Commands::Commits(args) => files::handle_commits(args, &global).await,
        Commands::Upload(args) => files::handle_upload(args, &global).await,
        Commands::Delete(args) => files::handle_delete(args, &global).await,
        Commands::Download(args) => files::handle_download(args, &global).await,
        Commands::Config(args) => config::handle_config(args.command),
    }
}
