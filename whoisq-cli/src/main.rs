use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use whoisq_core::colors::CatppuccinExt;
use whoisq_core::output::{get_formatter, OutputFormat, OutputFormatter};
use whoisq_core::{Backend, QueryOptions, Whois, WhoisConfig};

#[derive(Parser)]
#[command(name = "whoisq")]
#[command(about = "WHOIS lookups that understand compound TLDs and retry with the registrable domain")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human or json)
    #[arg(short, long, default_value = "human", global = true)]
    format: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the registration record for a domain
    Query(QueryArgs),
    /// Like query, printed as a flat key/value map
    Get(QueryArgs),
    /// List supported TLDs
    Tlds,
}

#[derive(Args)]
struct QueryArgs {
    /// Domain name to look up
    domain: String,

    /// Skip the response cache
    #[arg(long)]
    force: bool,

    /// Persist the response cache to this file
    #[arg(long, value_name = "PATH")]
    cache_file: Option<PathBuf>,

    /// Seconds to wait after each uncached query
    #[arg(long, value_name = "SECONDS", default_value_t = 0)]
    slow_down: u64,

    /// Accept output from a whois command that exited non-zero
    #[arg(long)]
    ignore_returncode: bool,

    /// WHOIS server to query instead of the registry default
    #[arg(short, long)]
    server: Option<String>,

    /// Log TLD hints and retries
    #[arg(short, long)]
    verbose: bool,

    /// Drop comment and redacted lines before parsing
    #[arg(long)]
    cleanup: bool,

    /// Convert internationalized labels to punycode before querying
    #[arg(long)]
    idn: bool,

    /// How to fetch WHOIS data (socket or command)
    #[arg(long, default_value = "socket")]
    backend: String,

    /// Per-query timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    timeout: u64,
}

impl QueryArgs {
    fn config(&self) -> anyhow::Result<WhoisConfig> {
        let backend: Backend = self.backend.parse().map_err(anyhow::Error::msg)?;
        Ok(WhoisConfig::new()
            .with_backend(backend)
            .with_timeout(Duration::from_secs(self.timeout)))
    }

    fn options(&self) -> QueryOptions {
        let mut options = QueryOptions::new()
            .force(self.force)
            .slow_down(Duration::from_secs(self.slow_down))
            .ignore_returncode(self.ignore_returncode)
            .verbose(self.verbose)
            .with_cleanup_results(self.cleanup)
            .internationalized(self.idn);
        if let Some(server) = &self.server {
            options = options.server(server.clone());
        }
        if let Some(path) = &self.cache_file {
            options = options.cache_file(path.clone());
        }
        options
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "whoisq_core=debug,warn" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Query(args) | Commands::Get(args) => args.verbose,
        Commands::Tlds => false,
    };
    init_tracing(verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let output_format: OutputFormat = cli.format.parse().unwrap_or_default();
    let formatter = get_formatter(output_format);

    if let Err(e) = execute_command(cli.command, formatter.as_ref()).await {
        eprintln!("{} {}", "Error:".ctp_red(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn execute_command(command: Commands, formatter: &dyn OutputFormatter) -> anyhow::Result<()> {
    match command {
        Commands::Query(args) => {
            let whois = Whois::with_config(args.config()?);
            match whois.query(&args.domain, &args.options()).await? {
                Some(domain) => println!("{}", formatter.format_domain(&domain)),
                None => println!("{}", formatter.format_absent(&args.domain)),
            }
        }
        Commands::Get(args) => {
            let whois = Whois::with_config(args.config()?);
            let map = whois.get(&args.domain, &args.options()).await?;
            println!("{}", formatter.format_map(&map));
        }
        Commands::Tlds => {
            println!("{}", formatter.format_tlds(&whoisq_core::valid_tlds()));
        }
    }
    Ok(())
}
