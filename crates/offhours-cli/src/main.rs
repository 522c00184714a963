//! Offhours CLI - daily stop/start scheduling for a Kubernetes cluster.
//!
//! This is the entry point for the `offhours` binary.

mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use offhours_cluster::{AzureConfig, ClusterConfig, ControlPlaneClient, KubeControlPlane};
use offhours_control::{
    query_status, shutdown, LifecycleConfig, LifecycleController, NodePoolConfig, Scheduler,
    Shutdown, StartOutcome, StopOutcome,
};
use offhours_core::{ScheduleConfig, ScheduleTimezone, TimeOfDay};
use offhours_store::FileStateStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Offhours - stop a cluster's workloads after hours and bring them back in
/// the morning.
#[derive(Parser, Debug)]
#[command(name = "offhours")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Namespace whose workloads are managed.
    #[arg(long, global = true, env = "OFFHOURS_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Daily stop time (HH:MM).
    #[arg(long, global = true, env = "OFFHOURS_STOP_TIME", default_value = "14:45")]
    stop_time: TimeOfDay,

    /// Daily start time (HH:MM).
    #[arg(long, global = true, env = "OFFHOURS_START_TIME", default_value = "08:00")]
    start_time: TimeOfDay,

    /// Timezone for both triggers: `utc`, `local`, a zone like `Europe/Madrid`,
    /// or an offset like `+01:00`.
    #[arg(long, global = true, env = "OFFHOURS_TIMEZONE", default_value = "utc")]
    timezone: ScheduleTimezone,

    /// Directory holding the persisted stop state.
    ///
    /// Defaults to `/var/lib/offhours/<cluster-name>`.
    #[arg(long, global = true, env = "OFFHOURS_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Managed cluster name.
    #[arg(long, global = true, env = "AKS_CLUSTER_NAME")]
    cluster_name: Option<String>,

    /// Resource group of the managed cluster.
    #[arg(long, global = true, env = "AZURE_RESOURCE_GROUP")]
    resource_group: Option<String>,

    /// Azure subscription that owns the cluster.
    #[arg(long, global = true, env = "AZURE_SUBSCRIPTION_ID")]
    subscription_id: Option<String>,

    /// Bearer token for the Azure Resource Manager API.
    #[arg(long, global = true, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
    azure_token: Option<String>,

    /// Azure Resource Manager endpoint.
    #[arg(
        long,
        global = true,
        env = "AZURE_MANAGEMENT_URL",
        default_value = AzureConfig::DEFAULT_MANAGEMENT_URL
    )]
    management_url: String,

    /// Node pool scaled to zero on stop and restored on start.
    #[arg(long, global = true, env = "OFFHOURS_NODE_POOL")]
    node_pool: Option<String>,

    /// Node count the start sequence restores the node pool to.
    #[arg(long, global = true, env = "OFFHOURS_NODE_POOL_COUNT", default_value_t = 2)]
    node_pool_count: u32,

    /// Namespace where backup objects are created.
    #[arg(
        long,
        global = true,
        env = "OFFHOURS_BACKUP_NAMESPACE",
        default_value = "dataprotection-microsoft"
    )]
    backup_namespace: String,

    /// Seconds to wait after restoring replicas before a start completes.
    #[arg(long, global = true, env = "OFFHOURS_SETTLE_GRACE_SECS", default_value_t = 120)]
    settle_grace_secs: u64,

    /// Seconds between scheduler ticks.
    #[arg(long, global = true, env = "OFFHOURS_POLL_INTERVAL_SECS", default_value_t = 60)]
    poll_interval_secs: u64,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Back up, scale workloads to zero and record the stop.
    Stop,
    /// Restore replica counts from the last stop.
    Start,
    /// Run the daily scheduler until SIGINT or SIGTERM.
    ///
    /// Run a single scheduler per cluster; two schedulers would race on the
    /// same stop state.
    Schedule,
    /// Show whether the cluster is running or stopped.
    Status,
    /// Scale the configured node pool directly.
    NodePool {
        /// Target node count.
        count: u32,
        /// Pool to scale instead of the configured one.
        #[arg(long)]
        pool: Option<String>,
    },
}

impl Args {
    fn schedule(&self) -> anyhow::Result<ScheduleConfig> {
        ScheduleConfig::new(self.stop_time, self.start_time, self.timezone)
            .context("Invalid schedule")
    }

    fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            PathBuf::from("/var/lib/offhours")
                .join(self.cluster_name.as_deref().unwrap_or("default"))
        })
    }

    fn azure(&self) -> Option<AzureConfig> {
        Some(AzureConfig {
            subscription_id: self.subscription_id.clone()?,
            resource_group: self.resource_group.clone()?,
            cluster_name: self.cluster_name.clone()?,
            access_token: self.azure_token.clone()?,
            management_url: self.management_url.clone(),
        })
    }

    fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            backup_namespace: self.backup_namespace.clone(),
            azure: self.azure(),
            ..ClusterConfig::from_env()
        }
    }

    fn lifecycle_config(&self) -> anyhow::Result<LifecycleConfig> {
        let mut config = LifecycleConfig::new(&self.namespace, self.schedule()?)
            .with_settle_grace(Duration::from_secs(self.settle_grace_secs))
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs.max(1)));
        if let Some(pool) = &self.node_pool {
            config = config.with_node_pool(NodePoolConfig::new(pool, self.node_pool_count));
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,offhours=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<u8> {
    match args.command {
        Command::Status => {
            let store = FileStateStore::open(args.state_dir())?;
            let status = query_status(&store);
            output::print(&status, args.json)?;
            Ok(status.exit_code())
        }
        Command::NodePool { count, ref pool } => {
            let pool = pool
                .clone()
                .or_else(|| args.node_pool.clone())
                .context("No node pool given; pass --pool or set OFFHOURS_NODE_POOL")?;
            let cluster = KubeControlPlane::new(args.cluster_config()).await?;
            cluster.scale_node_pool(&pool, count).await?;
            println!("Scaled node pool {pool} to {count}");
            Ok(0)
        }
        Command::Stop => {
            let controller = connect(&args, listen_for_shutdown()).await?;
            match controller.stop().await {
                Ok(outcome) => {
                    output::print_stop(&outcome, args.json)?;
                    Ok(stop_exit_code(&outcome))
                }
                Err(e) => {
                    eprintln!("stop failed: {e}");
                    Ok(e.exit_code())
                }
            }
        }
        Command::Start => {
            let controller = connect(&args, listen_for_shutdown()).await?;
            match controller.start().await {
                Ok(outcome) => {
                    output::print_start(&outcome, args.json)?;
                    Ok(start_exit_code(&outcome))
                }
                Err(e) => {
                    eprintln!("start failed: {e}");
                    Ok(e.exit_code())
                }
            }
        }
        Command::Schedule => {
            let config = args.lifecycle_config()?;
            let shutdown = listen_for_shutdown();
            let controller = connect(&args, shutdown.clone()).await?;
            let scheduler = Scheduler::new(config.schedule, config.poll_interval, shutdown);

            let controller = &controller;
            scheduler
                .run(
                    || async move { controller.stop().await.map(drop) },
                    || async move { controller.start().await.map(drop) },
                )
                .await;
            Ok(0)
        }
    }
}

/// A sequence cut short by a signal exits non-zero so wrappers can retry it.
fn stop_exit_code(outcome: &StopOutcome) -> u8 {
    match outcome {
        StopOutcome::AlreadyStopped { .. } => 0,
        StopOutcome::Stopped(report) => u8::from(report.interrupted),
        StopOutcome::Interrupted { .. } => 1,
    }
}

fn start_exit_code(outcome: &StartOutcome) -> u8 {
    u8::from(matches!(outcome, StartOutcome::Interrupted(_)))
}

/// Turn SIGINT/SIGTERM into a cooperative shutdown request.
///
/// Running sequences stop at the next safe checkpoint instead of being
/// killed between a scale call and the state write.
fn listen_for_shutdown() -> Shutdown {
    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Received shutdown signal");
        trigger.request();
    });
    shutdown
}

async fn connect(
    args: &Args,
    shutdown: Shutdown,
) -> anyhow::Result<LifecycleController<KubeControlPlane, FileStateStore>> {
    let config = args.lifecycle_config()?;
    let state_dir = args.state_dir();
    let store = FileStateStore::open(&state_dir)
        .with_context(|| format!("Failed to open state directory {}", state_dir.display()))?;
    tracing::debug!(state_dir = %state_dir.display(), "Opened state store");

    let cluster = KubeControlPlane::new(args.cluster_config())
        .await
        .context("Failed to connect to the cluster")?;
    tracing::info!(
        namespace = %config.namespace,
        stop = %config.schedule.stop_time(),
        start = %config.schedule.start_time(),
        node_pool = config.node_pool.as_ref().map(|p| p.name.as_str()),
        "Connected to Kubernetes cluster"
    );

    Ok(LifecycleController::new(Arc::new(cluster), Arc::new(store), config).with_shutdown(shutdown))
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM, only Ctrl-C is handled");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["offhours", "status"]).unwrap();
        let config = args.lifecycle_config().unwrap();

        assert_eq!(config.namespace, "default");
        assert_eq!(config.schedule, ScheduleConfig::default());
        assert_eq!(config.settle_grace, Duration::from_secs(120));
        assert!(config.node_pool.is_none());
        assert_eq!(args.state_dir(), PathBuf::from("/var/lib/offhours/default"));
    }

    #[test]
    fn explicit_options() {
        let args = Args::try_parse_from([
            "offhours",
            "schedule",
            "--stop-time",
            "19:00",
            "--start-time",
            "7:30",
            "--timezone",
            "+01:00",
            "--cluster-name",
            "aks-demo",
            "--node-pool",
            "agentpool",
            "--node-pool-count",
            "3",
        ])
        .unwrap();
        let config = args.lifecycle_config().unwrap();

        assert_eq!(config.schedule.stop_time(), TimeOfDay::new(19, 0).unwrap());
        assert_eq!(config.schedule.start_time(), TimeOfDay::new(7, 30).unwrap());
        assert_eq!(config.node_pool, Some(NodePoolConfig::new("agentpool", 3)));
        assert_eq!(args.state_dir(), PathBuf::from("/var/lib/offhours/aks-demo"));
        // No subscription or token, so node pool scaling is unavailable.
        assert!(args.azure().is_none());
    }

    #[test]
    fn identical_trigger_times_rejected() {
        let args = Args::try_parse_from([
            "offhours",
            "stop",
            "--stop-time",
            "08:00",
            "--start-time",
            "08:00",
        ])
        .unwrap();
        assert!(args.lifecycle_config().is_err());
    }

    #[test]
    fn interrupted_sequences_exit_non_zero() {
        let report = offhours_control::StopReport {
            stopped_at: "2024-03-04T14:45:00Z".parse().unwrap(),
            backup_id: None,
            recorded: 1,
            scaled: 1,
            failures: Vec::new(),
            interrupted: true,
        };
        assert_eq!(stop_exit_code(&StopOutcome::Interrupted { backup_id: None }), 1);
        assert_eq!(stop_exit_code(&StopOutcome::Stopped(report.clone())), 1);

        let completed = offhours_control::StopReport {
            interrupted: false,
            ..report
        };
        assert_eq!(stop_exit_code(&StopOutcome::Stopped(completed)), 0);
        assert_eq!(start_exit_code(&StartOutcome::AlreadyRunning), 0);
    }

    #[test]
    fn invalid_time_rejected_by_parser() {
        assert!(Args::try_parse_from(["offhours", "stop", "--stop-time", "25:00"]).is_err());
    }
}
