use crate::{
    config::{self, Config},
    core::{Aggregate, GroupsConfig, RunOptions},
    google, print,
    reconcile::{AdminService, Reconciler, SettingsService},
    validation,
};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[clap(
    name = "groups-reconciler",
    version,
    about = "Reconciles Google Groups with a declarative configuration"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "groups_reconciler=info,warn",
        env = "GROUPS_RECONCILER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    /// The configuration file.
    #[clap(long, default_value = "config.yaml")]
    config: PathBuf,

    /// A groups file, or a directory of `groups.yaml` files. Overrides the
    /// configured `groups-path`.
    #[clap(long)]
    groups_path: Option<PathBuf>,

    /// The number of groups reconciled concurrently.
    #[clap(long)]
    worker_count: Option<usize>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Checks the groups configuration without contacting the directory.
    Validate,

    /// Logs the changes that would be made, without making them.
    Plan(ClientArgs),

    /// Validates the groups configuration and applies it.
    Apply(ClientArgs),

    /// Prints the existing groups as a groups configuration.
    Print(ClientArgs),
}

#[derive(Debug, clap::Args)]
struct ClientArgs {
    /// A bearer token for the directory APIs. Overrides the configured
    /// `token-file`.
    #[clap(long, env = "GROUPS_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            config,
            groups_path,
            worker_count,
            command,
        } = self;

        log_format
            .try_init(log_level)
            .expect("must configure logging");

        let mut config = Config::load(&config)?;
        if let Some(path) = groups_path {
            config.groups_path = path;
        }
        if let Some(count) = worker_count {
            config.worker_count = count;
        }

        match command {
            Command::Validate => {
                let groups = config::load_groups(&config.groups_path)?;
                report("validation", validation::validate(&groups))?;
                info!(groups = groups.groups.len(), "Groups configuration is valid");
                Ok(())
            }

            Command::Plan(client) => {
                let groups = config::load_groups(&config.groups_path)?;
                let reconciler = client.reconciler(&config, RunOptions { confirm: false })?;
                reconcile(&reconciler, &groups).await
            }

            Command::Apply(client) => {
                let groups = config::load_groups(&config.groups_path)?;
                report("validation", validation::validate(&groups))?;
                let reconciler = client.reconciler(&config, RunOptions { confirm: true })?;
                reconcile(&reconciler, &groups).await
            }

            Command::Print(client) => {
                let reconciler = client.reconciler(&config, RunOptions::default())?;
                let snapshot = print::snapshot(reconciler.admin(), reconciler.settings()).await?;
                print!("{}", print::to_yaml(&snapshot)?);
                Ok(())
            }
        }
    }
}

// === impl ClientArgs ===

impl ClientArgs {
    fn reconciler(self, config: &Config, options: RunOptions) -> Result<Reconciler> {
        let token = match self.access_token {
            Some(token) => token,
            None => match config.read_token()? {
                Some(token) => token,
                None => bail!("an access token is required: set --access-token or token-file"),
            },
        };

        let http = google::Http::new(token)?;
        let directory = google::Directory::new(http.clone()).with_customer(&config.customer);
        let settings = google::Settings::new(http);
        let admin = AdminService::new(Arc::new(directory), google::not_found(), options);
        let settings = SettingsService::new(Arc::new(settings), google::not_found(), options);
        Ok(Reconciler::new(admin, settings).with_workers(config.worker_count))
    }
}

async fn reconcile(reconciler: &Reconciler, groups: &GroupsConfig) -> Result<()> {
    info!(groups = groups.groups.len(), "Reconciling groups");
    report("reconciliation", reconciler.reconcile_groups(&groups.groups).await)?;
    info!("Reconciliation complete");
    Ok(())
}

fn report(what: &str, res: Result<(), Aggregate>) -> Result<()> {
    let Err(errors) = res else {
        return Ok(());
    };
    for error in errors.errors() {
        error!("{error:#}");
    }
    bail!("{what} failed with {} error(s)", errors.len())
}
