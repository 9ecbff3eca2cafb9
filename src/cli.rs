use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dispatch processing jobs for new or changed artifact versions in package
/// repositories.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Configuration file (toml, yaml or json); replaces the default search.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Do not write anything to the database.
    #[arg(long, global = true)]
    pub dry_run: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Scan repositories and handle every new or changed artifact version.
    Run {
        /// Repositories to scan; all known repositories if omitted.
        #[arg(value_name = "REPOSITORY")]
        repositories: Vec<String>,
    },
    /// Manage the repository directory.
    #[command(subcommand)]
    Repo(RepoCommand),
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum RepoCommand {
    /// Register a repository, or change the URL of an existing one.
    Add { name: String, url: String },
    /// Remove a repository and every digest recorded for it.
    Remove { name: String },
    /// List known repositories.
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["tracker", "run"], Command::Run { repositories: vec![] })]
    #[case(&["tracker", "run", "stable", "incubator"], Command::Run { repositories: vec!["stable".into(), "incubator".into()] })]
    #[case(&["tracker", "repo", "list"], Command::Repo(RepoCommand::List))]
    #[case(&["tracker", "repo", "remove", "stable"], Command::Repo(RepoCommand::Remove { name: "stable".into() }))]
    #[case(
        &["tracker", "repo", "add", "stable", "https://charts.example.com"],
        Command::Repo(RepoCommand::Add { name: "stable".into(), url: "https://charts.example.com".into() })
    )]
    fn test_commands(#[case] args: &[&str], #[case] expected: Command) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.command, expected);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tracker", "run", "--dry-run", "--config", "tracker.toml"]).unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.config, Some(PathBuf::from("tracker.toml")));
    }

    #[test]
    fn test_repo_add_requires_url() {
        assert!(Cli::try_parse_from(["tracker", "repo", "add", "stable"]).is_err());
    }
}
