use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Select, Text};
use std::io::Write;
use tokio::runtime::Handle;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use weathernow_core::{Config, FetchController, Inbox, Units, View};

use crate::view::TerminalView;

const UNIT_LABELS: &[&str] = &["Celsius (°C)", "Fahrenheit (°F)"];

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weathernow", version, about = "Real-time weather via OpenWeatherMap")]
pub struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to `interactive`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and default units in the config file.
    Configure,

    /// Show current weather for one city and exit.
    Show {
        /// City name, e.g. "Mumbai" or "London,GB".
        city: String,

        /// metric or imperial; defaults to the configured units.
        #[arg(short, long, value_parser = parse_units)]
        units: Option<Units>,
    },

    /// Prompt for cities until Esc.
    Interactive {
        /// Units preselected in the prompt.
        #[arg(short, long, value_parser = parse_units)]
        units: Option<Units>,
    },
}

fn parse_units(value: &str) -> Result<Units, String> {
    Units::try_from(value).map_err(|e| e.to_string())
}

const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

impl Cli {
    /// Logs go to stderr so they never interleave with the card on stdout.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_filter_from_verbosity(self.verbose)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Command::Configure) => configure(),
            Some(Command::Show { city, units }) => show(&city, units).await,
            Some(Command::Interactive { units }) => interactive(units).await,
            None => interactive(None).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    // Read the file alone so an OWM_API_KEY in the environment is not persisted.
    let mut config = Config::load_from(&Config::config_file_path()?)?;

    let key = Password::new("OpenWeatherMap API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("API key prompt aborted")?;

    let choice = Select::new("Default units:", UNIT_LABELS.to_vec())
        .with_starting_cursor(unit_index(config.default_units))
        .raw_prompt()
        .context("Units prompt aborted")?;

    config.api_key = Some(key.trim().to_string());
    config.default_units = Units::all()[choice.index];
    let path = config.save()?;
    info!(path = %path.display(), "configuration saved");

    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn controller() -> anyhow::Result<(Config, FetchController, Inbox)> {
    let config = Config::load()?;
    debug!(
        weather_url = %config.weather_url,
        units = %config.default_units,
        timeout_secs = config.timeout_secs,
        "configuration loaded"
    );
    let (controller, inbox) = FetchController::from_config(config.clone(), Handle::current())
        .context("Failed to create HTTP client")?;
    Ok((config, controller, inbox))
}

async fn show(city: &str, units: Option<Units>) -> anyhow::Result<()> {
    let (config, controller, mut inbox) = controller()?;
    let mut view = TerminalView::stdout();

    show_with(
        &controller,
        &mut inbox,
        &mut view,
        city,
        units.unwrap_or(config.default_units),
    )
    .await
}

/// A rejected submission is returned, not rendered, so `main` reports it once.
async fn show_with<W: Write>(
    controller: &FetchController,
    inbox: &mut Inbox,
    view: &mut TerminalView<W>,
    city: &str,
    units: Units,
) -> anyhow::Result<()> {
    let request = controller.submit(city, units)?;

    view.status(&format!("Fetching weather for {}…", request.city));
    inbox
        .next(view)
        .await
        .ok_or_else(|| anyhow!("Fetch worker stopped without a result"))?;

    if view.failed() {
        return Err(anyhow!("Weather fetch for '{}' failed", request.city));
    }
    info!(seq = request.seq, city = %request.city, "weather shown");
    Ok(())
}

async fn interactive(units: Option<Units>) -> anyhow::Result<()> {
    let (config, controller, mut inbox) = controller()?;
    let mut view = TerminalView::stdout();

    let mut city = "Mumbai".to_string();
    let mut units = units.unwrap_or(config.default_units);

    loop {
        let input = match Text::new("City:").with_initial_value(&city).prompt() {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };

        let choice = match Select::new("Units:", UNIT_LABELS.to_vec())
            .with_starting_cursor(unit_index(units))
            .raw_prompt()
        {
            Ok(choice) => choice,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };
        units = Units::all()[choice.index];

        let request = match controller.submit(&input, units) {
            Ok(request) => request,
            Err(err) => {
                view.render_error(&err);
                continue;
            }
        };
        city = request.city.clone();

        view.status(&format!("Fetching weather for {}… (Ctrl-C to cancel)", request.city));
        let cancelled = tokio::select! {
            delivered = inbox.next(&mut view) => delivered.is_none(),
            _ = tokio::signal::ctrl_c() => true,
        };
        if cancelled {
            controller.cancel();
            view.status("Cancelled.");
        } else {
            info!(seq = request.seq, failed = view.failed(), "submission finished");
        }
    }

    Ok(())
}

fn unit_index(units: Units) -> usize {
    Units::all().iter().position(|u| *u == units).unwrap_or(0)
}
