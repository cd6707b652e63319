//! complexratio-ctl - inspect and change complexratiod policies

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use complexratio_api::{Command, EventPayload, PolicyDocument, PolicyRecord, ResponsePayload};
use complexratio_ipc::IpcClient;
use complexratio_util::default_socket_path;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "complexratio-ctl")]
#[command(about = "Inspect and change complexratiod stop policies", long_about = None)]
struct Args {
    /// Socket path (or set COMPLEXRATIO_SOCKET env var)
    #[arg(short, long, env = "COMPLEXRATIO_SOCKET", default_value_os_t = default_socket_path())]
    socket: PathBuf,

    #[command(subcommand)]
    command: CtlCommand,
}

#[derive(Subcommand, Debug)]
enum CtlCommand {
    /// Print every group's policy
    Get {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one group's policy; unspecified fields keep their current value
    Set {
        group: String,
        #[arg(long)]
        activated: Option<bool>,
        /// Ratio threshold
        #[arg(long)]
        ratio: Option<f64>,
        /// Minimum seeding time in hours
        #[arg(long)]
        time: Option<f64>,
        /// Seeding time ceiling in hours
        #[arg(long)]
        force_stop: Option<f64>,
    },

    /// Print daemon health
    Health,

    /// Print events as they happen
    Watch,

    /// Check that the daemon answers
    Ping,
}

/// Field overrides for `set`
#[derive(Debug, Default, Clone, Copy)]
struct RecordOverrides {
    activated: Option<bool>,
    ratio: Option<f64>,
    time: Option<f64>,
    force_stop: Option<f64>,
}

impl RecordOverrides {
    fn apply(self, mut record: PolicyRecord) -> PolicyRecord {
        if let Some(activated) = self.activated {
            record.activated = activated;
        }
        if let Some(ratio) = self.ratio {
            record.ratio_threshold = ratio;
        }
        if let Some(time) = self.time {
            record.time_threshold = time;
        }
        if let Some(force_stop) = self.force_stop {
            record.force_stop_threshold = force_stop;
        }
        record
    }
}

fn format_record(group: &str, record: &PolicyRecord) -> String {
    format!(
        "{:<20} {:<9} ratio > {:<8} after {:>8}h   force stop after {:>8}h",
        group,
        if record.activated { "active" } else { "inactive" },
        record.ratio_threshold,
        record.time_threshold,
        record.force_stop_threshold
    )
}

fn format_event(payload: &EventPayload) -> String {
    match payload {
        EventPayload::JobStopped {
            job_id,
            name,
            group,
            reason,
            ratio,
            seeding_hours,
        } => format!(
            "stopped {} ({}) in '{}': {}, ratio {:.2}, seeded {:.1}h",
            name, job_id, group, reason, ratio, seeding_hours
        ),
        EventPayload::GroupCreated { group } => format!("created policy for group '{}'", group),
        EventPayload::ConfigUpdated { groups } => format!("updated groups: {}", groups.join(", ")),
        EventPayload::Shutdown => "daemon shutting down".to_string(),
    }
}

async fn fetch_policies(client: &mut IpcClient) -> Result<PolicyDocument> {
    match client.call(Command::GetConfig).await? {
        ResponsePayload::Config { policies } => Ok(policies),
        other => bail!("Unexpected response: {:?}", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!(socket = %args.socket.display(), "Connecting to complexratiod");
    let mut client = IpcClient::connect(&args.socket)
        .await
        .with_context(|| format!("Failed to connect to daemon at {:?}", args.socket))?;

    match args.command {
        CtlCommand::Get { json } => {
            let policies = fetch_policies(&mut client).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&policies)?);
            } else {
                for (group, record) in &policies {
                    println!("{}", format_record(group, record));
                }
            }
        }

        CtlCommand::Set {
            group,
            activated,
            ratio,
            time,
            force_stop,
        } => {
            let current = fetch_policies(&mut client).await?;
            let overrides = RecordOverrides {
                activated,
                ratio,
                time,
                force_stop,
            };
            let record = overrides.apply(current.get(&group).copied().unwrap_or_default());

            let mut update = PolicyDocument::new();
            update.insert(group.clone(), record);
            client.call(Command::SetConfig { update }).await?;
            println!("{}", format_record(&group, &record));
        }

        CtlCommand::Health => match client.call(Command::GetHealth).await? {
            ResponsePayload::Health(health) => {
                println!("{}", serde_json::to_string_pretty(&health)?);
            }
            other => bail!("Unexpected response: {:?}", other),
        },

        CtlCommand::Watch => {
            let mut events = client.subscribe().await?;
            loop {
                let event = events.next().await?;
                println!(
                    "{} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    format_event(&event.payload)
                );
            }
        }

        CtlCommand::Ping => {
            client.call(Command::Ping).await?;
            println!("pong");
        }
    }

    Ok(())
}
