use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lint HAML templates with the configured Ruby tool
    Check(CheckArgs),
    /// Create a default configuration file
    Init {
        /// Where to write the configuration
        #[arg(default_value = ".hamlint.toml")]
        path: String,
    },
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Files or directories to lint
    #[arg(required = false)]
    pub paths: Vec<String>,

    /// Autocorrect offenses and write the templates back
    #[arg(short, long, default_value = "false")]
    pub fix: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Exclude specific files or directories (comma-separated glob patterns)
    #[arg(long)]
    pub exclude: Option<String>,

    /// Respect .gitignore files when scanning directories
    /// When not specified, uses config file value (default: true)
    #[arg(long, num_args(0..=1), require_equals(true), default_missing_value = "true")]
    pub respect_gitignore: Option<bool>,

    /// Output format for lint results
    #[arg(long, value_parser = ["text", "json"], default_value = "text")]
    pub output_format: String,

    /// Show debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print diagnostics, but nothing else
    #[arg(short, long)]
    pub quiet: bool,

    /// Process files one at a time
    #[arg(long)]
    pub no_parallel: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_args() {
        let cli = Cli::parse_from([
            "hamlint",
            "check",
            "app/views",
            "--fix",
            "--output-format",
            "json",
            "--respect-gitignore=false",
        ]);
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.paths, vec!["app/views"]);
        assert!(args.fix);
        assert_eq!(args.output_format, "json");
        assert_eq!(args.respect_gitignore, Some(false));
        assert!(!args.no_parallel);
    }

    #[test]
    fn test_reject_unknown_format() {
        assert!(Cli::try_parse_from(["hamlint", "check", "--output-format", "sarif"]).is_err());
    }

    #[test]
    fn test_init_default_path() {
        let cli = Cli::parse_from(["hamlint", "init"]);
        assert!(matches!(cli.command, Commands::Init { ref path } if path == ".hamlint.toml"));
    }
}
