mod commands;
mod config;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Overrides};

#[derive(Parser)]
#[command(name = "untis-exams")]
#[command(about = "Fetch WebUntis exams and push them to Google Calendar")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.config/untis-exams/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: OverrideArgs,
}

#[derive(Args)]
struct OverrideArgs {
    /// WebUntis server, e.g. neilo.webuntis.com
    #[arg(long, global = true)]
    server: Option<String>,

    /// School login name
    #[arg(long, global = true)]
    school: Option<String>,

    /// WebUntis username
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// WebUntis password
    #[arg(short = 'P', long, global = true)]
    password: Option<String>,

    /// chrono format for dates, e.g. %d.%m.%Y
    #[arg(long, global = true)]
    date_format: Option<String>,

    /// IANA timezone the exams take place in
    #[arg(long, global = true)]
    timezone: Option<String>,
}

#[derive(Args)]
struct RangeArgs {
    /// First day to fetch (default: start of the current school year)
    #[arg(long)]
    from: Option<String>,

    /// Last day to fetch (default: end of the current school year)
    #[arg(long)]
    to: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search schools by name or town
    Search {
        /// Search text
        query: String,
    },

    /// Fetch and list exams
    Exams {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Fetch exams and reconcile them with a Google calendar
    Push {
        #[command(flatten)]
        range: RangeArgs,

        /// Target calendar id (bare group ids are expanded)
        #[arg(long)]
        calendar_id: Option<String>,

        /// OAuth bearer token for the Google Calendar API (default: $GOOGLE_ACCESS_TOKEN)
        #[arg(long)]
        access_token: Option<String>,
    },
}

impl From<RangeArgs> for commands::RangeParams {
    fn from(args: RangeArgs) -> Self {
        Self {
            from: args.from,
            to: args.to,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("untis_exams={log_level},untis_exams_core={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Search { query } => commands::search_command(query).await,

        Commands::Exams { range } => {
            let config = load_config(cli.config.as_deref(), cli.overrides, None)?;
            commands::exams_command(config, range.into()).await
        }

        Commands::Push {
            range,
            calendar_id,
            access_token,
        } => {
            let config = load_config(cli.config.as_deref(), cli.overrides, calendar_id)?;
            commands::push_command(config, range.into(), access_token).await
        }
    }
}

fn load_config(
    path: Option<&Path>,
    overrides: OverrideArgs,
    calendar_id: Option<String>,
) -> Result<Config> {
    let mut config = Config::load(path)?;
    config.apply(Overrides {
        server: overrides.server,
        school: overrides.school,
        username: overrides.username,
        password: overrides.password,
        calendar_id,
        date_format: overrides.date_format,
        timezone: overrides.timezone,
    });
    config.validate()?;
    Ok(config)
}
