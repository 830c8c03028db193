//! Command-line argument parsing and validation

use crate::core::{FailurePolicy, RunFlags};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Flags that take the following token as their value
const VALUE_FLAGS: &[&str] = &["config", "packageJSON", "on-error"];

/// Flags that stand alone
const SWITCH_FLAGS: &[&str] = &["watch", "optimize", "debug"];

/// UltraBundle - builds JavaScript and TypeScript bundles from a JSON target list
#[derive(Parser, Debug)]
#[command(name = "ultrabundle")]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(args_override_self = true)]
pub struct Args {
    /// Path of the target config array
    #[arg(long, default_value = "./bundles.json")]
    pub config: PathBuf,

    /// Path of the package metadata file
    #[arg(long = "packageJSON", default_value = "./package.json")]
    pub package_json: PathBuf,

    /// Keep rebuilding targets as their sources change
    #[arg(long)]
    pub watch: bool,

    /// Enable the per-target optimizations
    #[arg(long)]
    pub optimize: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// What to do with the remaining targets once one fails
    #[arg(long = "on-error", value_enum, default_value_t = OnError::FailFast)]
    pub on_error: OnError,
}

/// Failure handling selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    /// Stop at the first failing target
    FailFast,
    /// Build every target, then fail if any did
    Collect,
}

impl From<OnError> for FailurePolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::FailFast => Self::FailFast,
            OnError::Collect => Self::CollectResults,
        }
    }
}

impl Args {
    pub fn run_flags(&self) -> RunFlags {
        RunFlags {
            config: self.config.clone(),
            package_json: self.package_json.clone(),
            watch: self.watch,
            optimize: self.optimize,
        }
    }
}

/// Reduce a raw argument list to the flags [`Args`] understands.
///
/// Unknown tokens are dropped. A value flag with nothing after it is dropped
/// too, leaving its default in effect, and yields a warning. Values are
/// passed on in `--flag=value` form so they may start with a dash.
pub fn normalize_args<I>(raw: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut raw = raw.into_iter();
    let mut args: Vec<String> = raw.next().into_iter().collect();
    let mut warnings = Vec::new();

    while let Some(token) = raw.next() {
        let Some(name) = token.strip_prefix("--") else {
            continue;
        };

        if SWITCH_FLAGS.contains(&name) {
            args.push(token);
        } else if VALUE_FLAGS.contains(&name) {
            match raw.next() {
                Some(value) => args.push(format!("--{name}={value}")),
                None => warnings.push(format!(
                    "The --{name} setting require an argument afterwards"
                )),
            }
        } else if name
            .split_once('=')
            .is_some_and(|(flag, _)| VALUE_FLAGS.contains(&flag))
        {
            args.push(token);
        }
    }

    (args, warnings)
}

/// Parse command line arguments
pub fn parse_args<I>(raw: I) -> (Args, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let (args, warnings) = normalize_args(raw);
    (Args::parse_from(args), warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &[&str]) -> (Vec<String>, Vec<String>) {
        normalize_args(raw.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["ultrabundle"]).unwrap();
        assert_eq!(args.config, PathBuf::from("./bundles.json"));
        assert_eq!(args.package_json, PathBuf::from("./package.json"));
        assert!(!args.watch);
        assert!(!args.optimize);
        assert!(!args.debug);
        assert_eq!(args.on_error, OnError::FailFast);
    }

    #[test]
    fn test_parse_all_flags() {
        let args = Args::try_parse_from([
            "ultrabundle",
            "--config",
            "ci/bundles.json",
            "--packageJSON=pkg.json",
            "--watch",
            "--optimize",
            "--on-error",
            "collect",
        ])
        .unwrap();

        let flags = args.run_flags();
        assert_eq!(flags.config, PathBuf::from("ci/bundles.json"));
        assert_eq!(flags.package_json, PathBuf::from("pkg.json"));
        assert!(flags.watch);
        assert!(flags.optimize);
        assert_eq!(
            FailurePolicy::from(args.on_error),
            FailurePolicy::CollectResults
        );
    }

    #[test]
    fn test_no_help_surface() {
        assert!(Args::try_parse_from(["ultrabundle", "--help"]).is_err());
        let (args, _) = normalize(&["ultrabundle", "--help", "--version"]);
        assert_eq!(args, vec!["ultrabundle"]);
    }

    #[test]
    fn test_unknown_flags_are_dropped() {
        let (args, warnings) = normalize(&["ultrabundle", "--verbose", "stray", "-x", "--watch"]);
        assert_eq!(args, vec!["ultrabundle", "--watch"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_value_warns_and_keeps_default() {
        let (args, warnings) = normalize(&["ultrabundle", "--optimize", "--config"]);
        assert_eq!(args, vec!["ultrabundle", "--optimize"]);
        assert_eq!(
            warnings,
            vec!["The --config setting require an argument afterwards"]
        );

        let args = Args::try_parse_from(args).unwrap();
        assert_eq!(args.config, PathBuf::from("./bundles.json"));
    }

    #[test]
    fn test_value_is_taken_verbatim() {
        let (args, warnings) = normalize(&["ultrabundle", "--packageJSON", "--watch"]);
        assert_eq!(args, vec!["ultrabundle", "--packageJSON=--watch"]);
        assert!(warnings.is_empty());

        let args = Args::try_parse_from(args).unwrap();
        assert_eq!(args.package_json, PathBuf::from("--watch"));
        assert!(!args.watch);
    }

    #[test]
    fn test_repeated_flags_last_wins() {
        let (args, _) = normalize(&[
            "ultrabundle",
            "--config",
            "a.json",
            "--watch",
            "--config",
            "b.json",
            "--watch",
        ]);
        let args = Args::try_parse_from(args).unwrap();
        assert_eq!(args.config, PathBuf::from("b.json"));
        assert!(args.watch);
    }
}
