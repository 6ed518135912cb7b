use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shellform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Plan and apply resources managed through shell commands", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check a declaration without running anything
    Validate(DeclarationArgs),

    /// Show what apply would do
    Plan(PlanArgs),

    /// Create or update the resource
    Apply(ApplyArgs),

    /// Fetch the outputs of an existing instance again
    Refresh(RefreshArgs),

    /// Destroy an existing instance
    Destroy(DestroyArgs),

    /// Run the read commands against the inputs alone
    Query(DeclarationArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct DeclarationArgs {
    /// Declaration file (.toml or .json)
    #[arg(value_name = "FILE")]
    pub declaration: PathBuf,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub decl: DeclarationArgs,

    /// State of the existing instance; without it the plan creates one
    #[arg(short, long, env = "SHELLFORM_STATE")]
    pub state: Option<PathBuf>,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub decl: DeclarationArgs,

    /// State of the existing instance; without it a new one is created
    #[arg(short, long, env = "SHELLFORM_STATE")]
    pub state: Option<PathBuf>,

    /// Write the resulting state here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show the plan without running anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub decl: DeclarationArgs,

    /// State of the instance to refresh
    #[arg(short, long, env = "SHELLFORM_STATE")]
    pub state: PathBuf,

    /// Write the refreshed state here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub decl: DeclarationArgs,

    /// State of the instance to destroy
    #[arg(short, long, env = "SHELLFORM_STATE")]
    pub state: PathBuf,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "shellform",
            "-vv",
            "apply",
            "disk.toml",
            "--state",
            "s.json",
            "-o",
            "out.json",
            "--yes",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.decl.declaration, PathBuf::from("disk.toml"));
        assert_eq!(args.state, Some(PathBuf::from("s.json")));
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
        assert!(args.yes);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_refresh_requires_state() {
        assert!(Cli::try_parse_from(["shellform", "refresh", "disk.toml"]).is_err());
    }
}
