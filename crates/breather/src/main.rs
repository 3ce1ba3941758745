//! breather - take a break from the apps you doomscroll
//!
//! Each subcommand is one execution context and runs as its own process.
//! The contexts share nothing but the state database:
//! - Controller actions (`select`, `enable`, `disable`, `status`)
//! - The foreground poller (`run`)
//! - The background monitor (`monitor ...`), driven by the scheduler
//! - The shield content provider (`shield`), driven by the enforcer

use anyhow::{Context, Result};
use breather_api::{BlockMode, Selection, SelectionToken, ShieldTarget};
use breather_config::{CURRENT_CONFIG_VERSION, Settings, load_config, load_config_or_default};
use breather_core::{Adapters, BackgroundMonitor, Controller, ForegroundPoller, ShieldProvider};
use breather_host_api::{HostCapabilities, LogNotifier, Notifier};
use breather_host_linux::{DesktopNotifier, JsonScheduler, ShieldFile};
use breather_store::{SqliteStore, StateStore};
use breather_util::{ActivityName, BreatherError, EventName, Timestamp, default_config_path};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// breather - voluntary cool-down for distracting apps and sites
#[derive(Parser, Debug)]
#[command(name = "breather")]
#[command(about = "Voluntary cool-down for distracting apps and sites", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/breather/config.toml)
    #[arg(short, long, global = true, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set BREATHER_DATA_DIR env var)
    #[arg(short, long, global = true, env = "BREATHER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Choose what to block
    Select {
        /// Application token (repeatable)
        #[arg(long = "app")]
        apps: Vec<String>,

        /// Category token (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Web domain (repeatable)
        #[arg(long = "domain")]
        domains: Vec<String>,
    },

    /// Turn protection on
    Enable {
        /// instant or delayed (default: keep the stored mode)
        #[arg(long)]
        mode: Option<BlockMode>,
    },

    /// Turn protection off
    Disable,

    /// Show the current phase and countdown
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Foreground poller. SIGUSR1 pauses it, SIGUSR2 resumes it.
    Run,

    /// Background monitor callbacks
    #[command(subcommand)]
    Monitor(MonitorCommand),

    /// Compute shield labels for a target about to be shown
    Shield {
        #[arg(long, value_enum, default_value_t = TargetKind::Application)]
        target: TargetKind,

        #[arg(long)]
        token: String,

        /// Category token for the *-in-category kinds
        #[arg(long)]
        category: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration file
    CheckConfig,
}

#[derive(Subcommand, Debug)]
enum MonitorCommand {
    /// A scheduled interval started
    IntervalStart {
        #[arg(long, default_value = ActivityName::DELAYED_BLOCK)]
        activity: String,
    },

    /// A scheduled interval ended
    IntervalEnd {
        #[arg(long, default_value = ActivityName::DELAYED_BLOCK)]
        activity: String,
    },

    /// Usage of the selection crossed a threshold
    Threshold {
        #[arg(long, default_value = ActivityName::PROTECTION)]
        activity: String,

        #[arg(long, default_value = EventName::THRESHOLD_REACHED)]
        event: String,
    },

    /// Fire interval-start callbacks for due schedule entries
    Dispatch,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TargetKind {
    Application,
    ApplicationInCategory,
    WebDomain,
    WebDomainInCategory,
}

/// Adapters and settings shared by every context in this process
struct Host {
    settings: Settings,
    adapters: Adapters,
    scheduler: Arc<JsonScheduler>,
    capabilities: HostCapabilities,
}

impl Host {
    fn new(args: &Args) -> Result<Self> {
        let mut settings = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;
        if let Some(data_dir) = &args.data_dir {
            settings.service = settings.service.with_data_dir(data_dir.clone());
        }

        let store_path = settings.service.store_path();
        let store: Arc<dyn StateStore> = Arc::new(
            SqliteStore::open(&store_path)
                .with_context(|| format!("Failed to open store at {:?}", store_path))?,
        );
        if !store.is_healthy() {
            warn!(path = %store_path.display(), "Store health check failed");
        }

        let scheduler = Arc::new(JsonScheduler::new(settings.service.schedule_path.clone()));

        let mut capabilities = HostCapabilities::linux_desktop();
        let notifier: Arc<dyn Notifier> =
            if settings.service.notifications && DesktopNotifier::is_available() {
                Arc::new(DesktopNotifier::new())
            } else {
                capabilities.can_notify = false;
                Arc::new(LogNotifier)
            };

        debug!(
            store = %store_path.display(),
            shield = %settings.service.shield_path.display(),
            schedules = %settings.service.schedule_path.display(),
            "Host adapters ready"
        );

        let adapters = Adapters {
            store,
            engine: Arc::new(ShieldFile::new(settings.service.shield_path.clone())),
            scheduler: scheduler.clone(),
            notifier,
        };

        Ok(Self {
            settings,
            adapters,
            scheduler,
            capabilities,
        })
    }

    /// Foreground controller; clears orphans left by an earlier install
    fn controller(&self) -> Controller {
        let controller = Controller::new(
            self.adapters.clone(),
            self.settings.lifecycle,
            self.capabilities,
        );
        controller.cleanup_orphans(Timestamp::now());
        controller
    }

    fn monitor(&self) -> BackgroundMonitor {
        BackgroundMonitor::new(self.adapters.clone(), self.settings.lifecycle)
    }

    fn shield(&self) -> ShieldProvider {
        ShieldProvider::new(self.adapters.clone(), self.settings.lifecycle)
    }
}

fn selection_from(apps: Vec<String>, categories: Vec<String>, domains: Vec<String>) -> Selection {
    Selection {
        applications: apps.into_iter().map(SelectionToken::new).collect(),
        categories: categories.into_iter().map(SelectionToken::new).collect(),
        web_domains: domains.into_iter().map(SelectionToken::new).collect(),
    }
}

fn shield_target(kind: TargetKind, token: String, category: Option<String>) -> Result<ShieldTarget> {
    let token = SelectionToken::new(token);
    let category = || {
        category
            .clone()
            .map(SelectionToken::new)
            .context("--category is required for this target kind")
    };

    Ok(match kind {
        TargetKind::Application => ShieldTarget::Application { token },
        TargetKind::ApplicationInCategory => ShieldTarget::ApplicationInCategory {
            token,
            category: category()?,
        },
        TargetKind::WebDomain => ShieldTarget::WebDomain { token },
        TargetKind::WebDomainInCategory => ShieldTarget::WebDomainInCategory {
            token,
            category: category()?,
        },
    })
}

/// Foreground poller until SIGINT/SIGTERM
async fn run_foreground(controller: Controller) -> Result<()> {
    let poller = ForegroundPoller::new(controller);
    let mut phases = poller.subscribe();
    let (visible_tx, visible_rx) = watch::channel(true);
    let poll_task = tokio::spawn(poller.run(visible_rx));

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut sigusr1 =
        signal(SignalKind::user_defined1()).context("Failed to install SIGUSR1 handler")?;
    let mut sigusr2 =
        signal(SignalKind::user_defined2()).context("Failed to install SIGUSR2 handler")?;

    info!("Foreground poller running");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = sigusr1.recv() => {
                info!("Backgrounded");
                visible_tx.send_replace(false);
            }
            _ = sigusr2.recv() => {
                info!("Became active");
                visible_tx.send_replace(true);
            }
            changed = phases.changed() => {
                if changed.is_err() {
                    break;
                }
                let phase = *phases.borrow_and_update();
                println!("{phase}");
            }
        }
    }

    drop(visible_tx);
    poll_task.await.context("Poller task failed")?;
    info!("Foreground poller stopped");
    Ok(())
}

fn check_config(path: &Path) -> Result<()> {
    let settings =
        load_config(path).with_context(|| format!("Invalid configuration: {}", path.display()))?;
    let lifecycle = &settings.lifecycle;

    println!("Configuration is valid");
    println!();
    println!("Summary:");
    println!("  Config version: {}", CURRENT_CONFIG_VERSION);
    println!("  Data directory: {}", settings.service.data_dir.display());
    println!("  Allowance: {}s", lifecycle.allowance.as_secs());
    println!("  Block: {}s", lifecycle.block.as_secs());
    println!("  Delayed trigger: {:?}", lifecycle.delayed_trigger);
    println!("  Usage threshold: {} min", lifecycle.usage_threshold_minutes);
    println!("  Poll interval: {}ms", lifecycle.poll_interval.as_millis());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!(version = env!("CARGO_PKG_VERSION"), command = ?args.command, "breather starting");

    if let Command::CheckConfig = args.command {
        return check_config(&args.config);
    }

    let host = Host::new(&args)?;
    let now = Timestamp::now();

    match args.command {
        Command::Select {
            apps,
            categories,
            domains,
        } => {
            let config = host
                .controller()
                .select(selection_from(apps, categories, domains))?;
            println!("{}", config.selection.summary("selected"));
        }

        Command::Enable { mode } => match host.controller().enable(mode, now) {
            Ok(phase) => println!("{phase}"),
            Err(BreatherError::Unavailable(reason)) => {
                println!("Protection unavailable: {reason}");
            }
            Err(e) => return Err(e.into()),
        },

        Command::Disable => {
            println!("{}", host.controller().disable(now));
        }

        Command::Status { json } => {
            let status = host.controller().status(now);
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{status}");
            }
        }

        Command::Run => run_foreground(host.controller()).await?,

        Command::Monitor(command) => {
            let monitor = host.monitor();
            match command {
                MonitorCommand::IntervalStart { activity } => {
                    monitor.interval_did_start(&ActivityName::new(activity), now);
                }
                MonitorCommand::IntervalEnd { activity } => {
                    monitor.interval_did_end(&ActivityName::new(activity));
                }
                MonitorCommand::Threshold { activity, event } => {
                    monitor.event_did_reach_threshold(
                        &ActivityName::new(activity),
                        &EventName::new(event),
                        now,
                    );
                }
                MonitorCommand::Dispatch => {
                    let due = host
                        .scheduler
                        .take_due(now)
                        .context("Failed to read schedules")?;
                    monitor.dispatch(&due, now);
                }
            }
        }

        Command::Shield {
            target,
            token,
            category,
            json,
        } => {
            let target = shield_target(target, token, category)?;
            let content = host.shield().render(&target, now);
            if json {
                println!("{}", serde_json::to_string_pretty(&content)?);
            } else {
                println!("{}", content.title);
                println!("{}", content.subtitle);
                println!("[{}]", content.primary_button);
            }
        }

        Command::CheckConfig => {}
    }

    Ok(())
}
