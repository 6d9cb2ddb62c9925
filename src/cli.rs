use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "certpoll")]
#[command(about = "Probe a domain's TLS certificate and the reachability of an address block")]
pub struct Cli {
    /// Host name, address, host:port, URL or CIDR block to probe
    pub target: String,

    /// Wait for every unit and print all results instead of the first
    #[arg(short, long)]
    pub all: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Give up on the whole probe after this many seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// TCP connect timeout in seconds
    #[arg(long)]
    pub dial_timeout: Option<u64>,

    /// Reachability checks allowed in flight during a sweep
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Report certificates that do not chain to a trusted root as invalid
    #[arg(long)]
    pub verify_chain: bool,

    /// YAML config file (defaults to $CERTPOLL_CONFIG)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(long)]
    pub log_stderr: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_args() {
        let cli = Cli::try_parse_from(["certpoll", "example.com"]).unwrap();
        assert_eq!(cli.target, "example.com");
        assert!(!cli.all);
        assert!(!cli.json);
        assert!(cli.timeout.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "certpoll", "10.0.0.0/30", "--all", "--json", "--timeout", "30", "--dial-timeout", "2",
            "--max-in-flight", "8", "--verify-chain", "--config", "probe.yml", "--log-stderr",
        ])
        .unwrap();
        assert!(cli.all && cli.json && cli.verify_chain && cli.log_stderr);
        assert_eq!(cli.timeout, Some(30));
        assert_eq!(cli.dial_timeout, Some(2));
        assert_eq!(cli.max_in_flight, Some(8));
        assert_eq!(cli.config, Some(PathBuf::from("probe.yml")));
    }

    #[test]
    fn test_target_required() {
        assert!(Cli::try_parse_from(["certpoll"]).is_err());
    }
}
