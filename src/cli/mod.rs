//! Command line surface of a bootstrapped service.
//!
//! # Responsibilities
//! - Define the flags every service accepts
//! - Build the `clap::Command`, standalone or for embedding as a subcommand
//!
//! # Design Decisions
//! - Flags are a `clap::Args` struct, so they flatten into any parser
//! - `--version` only exists when the service was given a version

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches};

use crate::module::Selection;

pub mod version;

pub use version::Version;

/// Flags accepted by every service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct Flags {
    /// Use config file
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    #[command(flatten)]
    pub selection: Selection,

    /// Run setup phase
    #[arg(long)]
    pub setup: bool,

    /// Describe accepted environment variables and exit
    #[arg(long)]
    pub help_config: bool,

    /// Exit before start phase
    #[arg(long)]
    pub exit_before_start: bool,

    /// Print configuration
    #[arg(long)]
    pub print_config: bool,
}

/// The service command with all [`Flags`].
pub fn command(name: &str, version: Option<&Version>) -> Command {
    let command = Flags::augment_args(Command::new(name.to_string()).about("bootstrapped service"));

    match version {
        Some(version) => command.version(version.to_string()),
        None => command,
    }
}

/// Parse process arguments, exiting on `--help`, `--version`, or bad input.
pub fn parse(command: Command) -> Flags {
    let matches = command.get_matches();
    Flags::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

/// Parse `args` (including the binary name) without exiting.
pub fn try_parse_from<I, T>(command: Command, args: I) -> Result<Flags, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command.try_get_matches_from(args)?;
    Flags::from_arg_matches(&matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let flags = try_parse_from(
            command("svc", None),
            [
                "svc",
                "-c",
                "svc.toml",
                "--only",
                "db,api",
                "--only",
                "cache",
                "--enable=metrics",
                "--setup",
                "--print-config",
            ],
        )
        .unwrap();

        assert_eq!(flags.config_path, Some(PathBuf::from("svc.toml")));
        assert_eq!(flags.selection.onlys, vec!["db", "api", "cache"]);
        assert_eq!(flags.selection.enables, vec!["metrics"]);
        assert!(flags.setup);
        assert!(flags.print_config);
        assert!(!flags.exit_before_start);
        assert!(!flags.help_config);
    }

    #[test]
    fn test_version_flag_only_with_version() {
        let err = try_parse_from(command("svc", None), ["svc", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);

        let version = Version::new("v1", "abc", "today");
        let err = try_parse_from(command("svc", Some(&version)), ["svc", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
