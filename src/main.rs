use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chronodose::booker::{BookingContext, Orchestrator, RunSummary, SettingsResolver, StopReason};
use chronodose::client::DoctolibClient;
use chronodose::config::Config;
use chronodose::locations::load_locations;
use chronodose::session::Session;

#[derive(Parser)]
#[command(
    name = "chronodose",
    version,
    about = "Polls vaccination centers and books the first two-dose appointment available",
    long_about = None
)]
struct Cli {
    /// Account username (email)
    #[arg(short, long)]
    username: Option<String>,

    /// Account password
    #[arg(short, long)]
    password: Option<String>,

    /// File listing one booking page URL per line
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// Number of concurrent workers (1-16)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Seconds to wait before each poll
    #[arg(short, long)]
    sleep: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Exact name of the visit motive to book
    #[arg(long)]
    visit_motive: Option<String>,

    /// Service root URL
    #[arg(long)]
    base_url: Option<String>,

    /// TOML configuration file; environment variables are used otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::from_env()?,
        };

        if let Some(username) = &self.username {
            config.account.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.account.password = password.clone();
        }
        if let Some(file) = &self.file {
            config.booking.locations_file = file.clone();
        }
        if let Some(workers) = self.workers {
            config.booking.workers = workers;
        }
        if let Some(sleep) = self.sleep {
            config.booking.poll_interval_secs = sleep;
        }
        if let Some(timeout) = self.timeout {
            config.booking.request_timeout_secs = timeout;
        }
        if let Some(motive) = &self.visit_motive {
            config.booking.visit_motive = motive.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.service.base_url = base_url.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    let summary = run(config).await?;
    report(&summary);

    Ok(if summary.is_booked() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("chronodose=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("chronodose={level},warn"))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn run(config: Config) -> Result<RunSummary> {
    let locations = load_locations(&config.booking.locations_file)
        .await
        .context("Failed to load locations")?;

    let client = DoctolibClient::with_base_url(&config.service.base_url, config.request_timeout())
        .context("Failed to create HTTP client")?
        .with_user_agent(config.service.user_agent.clone());

    let session = Session::login(
        Arc::new(client),
        &config.account.username,
        &config.account.password,
    )
    .await
    .context("Login failed")?;

    let ctx = BookingContext::new(Arc::new(session))
        .with_resolver(SettingsResolver::new(config.booking.visit_motive.clone()))
        .with_pacing(config.poll_interval());

    let orchestrator = Orchestrator::new(ctx, locations, config.booking.workers)?;

    let stop = orchestrator.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, waiting for workers to finish their cycle");
            stop.trigger(StopReason::Interrupted);
        }
    });

    Ok(orchestrator.run().await)
}

fn report(summary: &RunSummary) {
    match &summary.booking {
        Some(booking) => {
            println!("Appointment booked at {}", booking.location);
            println!("  First dose:     {}", booking.first_slot);
            println!("  Follow-up dose: {}", booking.follow_up_slot);
            println!("  Appointment id: {}", booking.appointment_id);
        }
        None => {
            println!("No appointment booked ({:?})", summary.stop_reason);
        }
    }

    let stats = &summary.stats;
    println!(
        "Polls: {}, no availability: {}, settings failures: {}, abandoned: {}",
        stats.polls, stats.unavailable, stats.settings_failures, stats.abandoned
    );
}
