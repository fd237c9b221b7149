//! Command line of `ringenv`.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "ringenv",
    version,
    about = "Print the environment, optionally modified"
)]
pub struct Cli {
    /// Start with an empty environment.
    #[arg(short = 'i', long = "ignore-environment")]
    pub ignore_environment: bool,

    /// Remove NAME from the environment (applied before assignments).
    #[arg(short, long, value_name = "NAME")]
    pub unset: Vec<String>,

    /// Print the environment as a JSON object.
    #[arg(long)]
    pub json: bool,

    /// Print only the value of NAME.
    #[arg(long, value_name = "NAME", conflicts_with = "json")]
    pub get: Option<String>,

    /// Variables to set, as NAME=VALUE.
    #[arg(value_name = "NAME=VALUE")]
    pub assignments: Vec<String>,
}

/// Return true for `NAME=VALUE` with a non-empty name.
pub fn is_assignment(arg: &str) -> bool {
    arg.split_once('=').is_some_and(|(name, _)| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_assignments() {
        let cli = Cli::try_parse_from(["ringenv", "-i", "-u", "HOME", "--unset", "LANG", "A=1"])
            .expect("parse");
        assert!(cli.ignore_environment);
        assert_eq!(cli.unset, vec!["HOME", "LANG"]);
        assert_eq!(cli.assignments, vec!["A=1"]);
        assert!(!cli.json);
        assert_eq!(cli.get, None);
    }

    #[test]
    fn json_conflicts_with_get() {
        assert!(Cli::try_parse_from(["ringenv", "--json", "--get", "A"]).is_err());
    }

    #[test]
    fn assignment_shape() {
        assert!(is_assignment("A=1"));
        assert!(is_assignment("A="));
        assert!(is_assignment("A=b=c"));
        assert!(!is_assignment("=1"));
        assert!(!is_assignment("A"));
    }
}
