use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use stackline_core::executor::types::Direction;

#[derive(Parser, Debug)]
#[command(
    name = "stackline",
    version,
    about = "Deploy and destroy infrastructure stacks in dependency order"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by `deploy` and `destroy`.
#[derive(ClapArgs, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the project file.
    #[arg(long, default_value = "projects.yml")]
    pub config: PathBuf,

    /// Org that stacks live in; stack names become `org/stack`.
    #[arg(long)]
    pub org: Option<String>,

    /// Directory holding the projects (inside the checkout with `--git-url`).
    #[arg(long)]
    pub path: Option<String>,

    /// Clone projects from this git repository.
    #[arg(long)]
    pub git_url: Option<String>,

    #[arg(long, default_value = "main")]
    pub git_branch: String,

    /// Print the execution plan and exit.
    #[arg(long, default_value_t = false)]
    pub preview: bool,

    /// Emit JSON lines instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Stop after the first stage with a failed stack and exit non-zero.
    #[arg(long, default_value_t = false)]
    pub stop_on_failure: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DeployArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Append failed stacks to this file.
    #[arg(long)]
    pub error_file: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy stacks, dependencies first.
    Deploy(DeployArgs),
    /// Destroy stacks, dependents first.
    Destroy(DestroyArgs),
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Deploy(args) => &args.common,
            Self::Destroy(args) => &args.common,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Deploy(_) => Direction::Apply,
            Self::Destroy(_) => Direction::Teardown,
        }
    }

    pub fn error_file(&self) -> Option<&PathBuf> {
        match self {
            Self::Deploy(args) => args.error_file.as_ref(),
            Self::Destroy(_) => None,
        }
    }
}
