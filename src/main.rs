//! prm - monitor your pull requests across GitHub and Harness

mod cli;

use anstream::eprintln;
use clap::{Args, Parser, Subcommand};
use cli::style::Stylize;
use pr_monitor::output::OutputFormat;
use pr_monitor::types::{ProviderType, StateFilter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prm")]
#[command(about = "Monitor your pull requests across GitHub and Harness")]
#[command(version = pr_monitor::VERSION)]
struct Cli {
    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Provider directory file
    #[arg(long, global = true, env = "PRM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a resource
    Add {
        #[command(subcommand)]
        resource: AddResource,
    },
    /// Remove a resource
    Remove {
        #[command(subcommand)]
        resource: RemoveResource,
    },
    /// Refresh cached provider identity and repositories (default: providers)
    Refresh {
        #[command(subcommand)]
        resource: Option<RefreshResource>,
    },
    /// List pull requests (default) or providers
    List(ListArgs),
    /// Remove every configured provider
    Purge {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum AddResource {
    /// Add an SCM provider
    Provider {
        /// Unique provider name
        name: String,

        /// Provider type
        #[arg(short = 't', long = "type", value_enum)]
        provider_type: ProviderType,

        /// Provider host URL, e.g. https://github.com
        #[arg(short = 'H', long)]
        host: String,

        /// Personal access token; prompted for when unset
        #[arg(long, env = "PRM_PAT", hide = true, hide_env_values = true)]
        pat: Option<String>,
    },
}

#[derive(Subcommand)]
enum RemoveResource {
    /// Remove an SCM provider
    Provider {
        /// Provider name
        name: String,
    },
}

#[derive(Subcommand)]
enum RefreshResource {
    /// Refresh SCM providers
    Providers(FilterArgs),
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Only this provider type
    #[arg(short = 't', long = "type", value_enum)]
    provider_type: Option<ProviderType>,

    /// Only the provider with this name
    #[arg(short, long)]
    name: Option<String>,
}

#[derive(Args)]
#[command(args_conflicts_with_subcommands = true)]
struct ListArgs {
    #[command(subcommand)]
    resource: Option<ListResource>,

    #[command(flatten)]
    prs: PrsArgs,
}

#[derive(Subcommand)]
enum ListResource {
    /// List pull requests
    Prs(PrsArgs),
    /// List configured providers
    Providers(FilterArgs),
}

#[derive(Args, Clone, Default)]
struct PrsArgs {
    /// PR state
    #[arg(short, long, value_enum, default_value_t = StateFilter::Open)]
    state: StateFilter,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    #[command(flatten)]
    filter: FilterArgs,
}

impl From<FilterArgs> for pr_monitor::store::ProviderFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            provider_type: args.provider_type,
            name: args.name,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "pr_monitor=debug,prm=debug" } else { "warn" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> pr_monitor::Result<()> {
    let ctx = cli::CommandContext::new(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Add {
            resource:
                AddResource::Provider {
                    name,
                    provider_type,
                    host,
                    pat,
                },
        }) => cli::run_add_provider(&ctx, &name, provider_type, &host, pat).await,
        Some(Commands::Remove {
            resource: RemoveResource::Provider { name },
        }) => cli::run_remove_provider(&ctx, &name),
        Some(Commands::Refresh { resource }) => {
            let RefreshResource::Providers(filter) =
                resource.unwrap_or(RefreshResource::Providers(FilterArgs::default()));
            cli::run_refresh_providers(&ctx, &filter.into()).await
        }
        Some(Commands::List(list)) => match list.resource {
            Some(ListResource::Providers(filter)) => cli::run_list_providers(&ctx, &filter.into()),
            Some(ListResource::Prs(prs)) => list_prs(&ctx, prs).await,
            None => list_prs(&ctx, list.prs).await,
        },
        Some(Commands::Purge { force }) => cli::run_purge(&ctx, force),
        None => list_prs(&ctx, PrsArgs::default()).await,
    }
}

async fn list_prs(ctx: &cli::CommandContext, prs: PrsArgs) -> pr_monitor::Result<()> {
    cli::run_list_prs(ctx, &prs.filter.into(), prs.state, prs.output).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "Error:".error());
            ExitCode::FAILURE
        }
    }
}
