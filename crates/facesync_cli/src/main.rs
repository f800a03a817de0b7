mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use facesync_client::{FaceOps, HttpFaceClient, RemoteEndpoint};
use facesync_transfer::{
    purge_person_groups, wait_for_training, SnapshotTransfer, TransferRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use config::RuntimeConfig;

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Person group administration and cross-region snapshot migration"
)]
struct Cli {
    /// TOML configuration with [source] and [target] endpoint sections.
    #[arg(long, global = true, default_value = "config/facesync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Migrate the configured person group from the source to the target region.
    Migrate {
        /// Person group to migrate; overrides transfer.person_group_id.
        #[arg(long)]
        group: Option<String>,
        /// Delete the migrated target group after a successful transfer.
        #[arg(long)]
        cleanup: bool,
    },
    #[command(subcommand)]
    Groups(GroupsCommand),
    #[command(subcommand)]
    Snapshots(SnapshotsCommand),
    /// Detect a face in one image and search another image for it.
    FindSimilar {
        #[arg(long)]
        face_image: String,
        #[arg(long)]
        candidate_image: String,
        #[arg(long, value_enum, default_value_t = Site::Source)]
        site: Site,
    },
    /// Detect faces in an image and identify them against a trained group.
    Identify {
        #[arg(long)]
        group: String,
        #[arg(long)]
        image: String,
        #[arg(long, value_enum, default_value_t = Site::Source)]
        site: Site,
    },
    /// Start training a person group and wait for it to finish.
    Train {
        #[arg(long)]
        group: String,
        #[arg(long, value_enum, default_value_t = Site::Source)]
        site: Site,
    },
    /// Create a person in a group and register face images for them.
    Enroll {
        #[arg(long)]
        group: String,
        #[arg(long)]
        name: String,
        #[arg(long = "image", required = true)]
        images: Vec<String>,
        #[arg(long, value_enum, default_value_t = Site::Source)]
        site: Site,
    },
}

#[derive(Debug, Subcommand)]
enum GroupsCommand {
    /// List person groups per region.
    List {
        #[arg(long, value_enum, default_value_t = SiteSelection::Both)]
        site: SiteSelection,
    },
    Create {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value_t = Site::Source)]
        site: Site,
    },
    Delete {
        #[arg(long)]
        id: String,
        #[arg(long, value_enum, default_value_t = Site::Source)]
        site: Site,
    },
    /// Delete every person group, then list again to verify.
    Purge {
        #[arg(long, value_enum, default_value_t = SiteSelection::Both)]
        site: SiteSelection,
    },
}

#[derive(Debug, Subcommand)]
enum SnapshotsCommand {
    List {
        #[arg(long, value_enum, default_value_t = Site::Source)]
        site: Site,
    },
    Delete {
        #[arg(long)]
        id: String,
        #[arg(long, value_enum, default_value_t = Site::Source)]
        site: Site,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Site {
    Source,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SiteSelection {
    Source,
    Target,
    Both,
}

impl SiteSelection {
    fn sites(self) -> &'static [Site] {
        match self {
            Self::Source => &[Site::Source],
            Self::Target => &[Site::Target],
            Self::Both => &[Site::Source, Site::Target],
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = RuntimeConfig::load(&cli.config)?;

    match cli.command {
        Command::Migrate { group, cleanup } => migrate(&config, group, cleanup).await,
        Command::Groups(command) => groups(&config, command).await,
        Command::Snapshots(command) => snapshots(&config, command).await,
        Command::FindSimilar {
            face_image,
            candidate_image,
            site,
        } => find_similar(&config, site, &face_image, &candidate_image).await,
        Command::Identify { group, image, site } => {
            identify(&config, site, &group, &image).await
        }
        Command::Train { group, site } => train(&config, site, &group).await,
        Command::Enroll {
            group,
            name,
            images,
            site,
        } => enroll(&config, site, &group, &name, &images).await,
    }
}

fn site_config<'a>(config: &'a RuntimeConfig, site: Site) -> &'a config::SiteConfig {
    match site {
        Site::Source => &config.source,
        Site::Target => &config.target,
    }
}

fn client_for(config: &RuntimeConfig, site: Site) -> Result<Arc<dyn FaceOps>> {
    let section = site_config(config, site);
    let endpoint = RemoteEndpoint::new(&section.endpoint, section.key.clone())
        .with_context(|| format!("invalid endpoint URL {}", section.endpoint))?;
    Ok(Arc::new(HttpFaceClient::new(endpoint)?))
}

/// Ctrl-C flips the returned token so in-flight polling loops unwind instead
/// of waiting out their full attempt cap.
fn spawn_interrupt_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received: cancelling wait");
            trigger.cancel();
        }
    });
    cancel
}

async fn migrate(config: &RuntimeConfig, group: Option<String>, cleanup: bool) -> Result<()> {
    let group = group
        .or_else(|| config.person_group_id.clone())
        .ok_or_else(|| {
            anyhow!("no person group configured: pass --group or set transfer.person_group_id")
        })?;

    let source = client_for(config, Site::Source)?;
    let target = client_for(config, Site::Target)?;

    let mut apply_scope = vec![
        config.source.subscription_id.clone(),
        config.target.subscription_id.clone(),
    ];
    apply_scope.extend(config.extra_apply_scope.iter().cloned());

    let cancel = spawn_interrupt_handler();
    let transfer = SnapshotTransfer::new(source, target.clone()).with_policy(config.poll_policy);
    let request = TransferRequest {
        person_group_id: group.clone(),
        apply_scope,
    };
    let outcome = transfer
        .run(&request, &cancel)
        .await
        .context("snapshot transfer failed")?;

    println!(
        "migrated person group {} as {}",
        group, outcome.target_person_group_id
    );
    println!("snapshot id: {}", outcome.snapshot_id);

    if cleanup {
        target
            .delete_person_group(&outcome.target_person_group_id)
            .await
            .context("failed to delete migrated person group")?;
        println!(
            "deleted migrated person group {}",
            outcome.target_person_group_id
        );
    }
    Ok(())
}

async fn groups(config: &RuntimeConfig, command: GroupsCommand) -> Result<()> {
    match command {
        GroupsCommand::List { site } => {
            for site in site.sites() {
                let client = client_for(config, *site)?;
                let groups = client.list_person_groups().await?;
                println!(
                    "{} person groups at {}:",
                    groups.len(),
                    site_config(config, *site).endpoint
                );
                for group in groups {
                    println!("  {} ({})", group.person_group_id, group.name);
                }
            }
            Ok(())
        }
        GroupsCommand::Create { id, name, site } => {
            client_for(config, site)?.create_person_group(&id, &name).await?;
            println!("created person group {id}");
            Ok(())
        }
        GroupsCommand::Delete { id, site } => {
            client_for(config, site)?.delete_person_group(&id).await?;
            println!("deleted person group {id}");
            Ok(())
        }
        GroupsCommand::Purge { site } => {
            for site in site.sites() {
                let client = client_for(config, *site)?;
                let report = purge_person_groups(client.as_ref()).await?;
                println!(
                    "deleted {} person groups at {}",
                    report.deleted.len(),
                    site_config(config, *site).endpoint
                );
                if !report.remaining.is_empty() {
                    bail!(
                        "{} person groups still present after purge",
                        report.remaining.len()
                    );
                }
            }
            Ok(())
        }
    }
}

async fn snapshots(config: &RuntimeConfig, command: SnapshotsCommand) -> Result<()> {
    match command {
        SnapshotsCommand::List { site } => {
            let snapshots = client_for(config, site)?.list_snapshots().await?;
            if snapshots.is_empty() {
                println!("no snapshots");
            }
            for snapshot in snapshots {
                println!(
                    "{}  {}  scope: {}",
                    snapshot.id,
                    snapshot.kind,
                    snapshot.apply_scope.join(", ")
                );
            }
            Ok(())
        }
        SnapshotsCommand::Delete { id, site } => {
            client_for(config, site)?.delete_snapshot(&id).await?;
            println!("deleted snapshot {id}");
            Ok(())
        }
    }
}

async fn find_similar(
    config: &RuntimeConfig,
    site: Site,
    face_image: &str,
    candidate_image: &str,
) -> Result<()> {
    let client = client_for(config, site)?;

    let probes = client.detect_faces(face_image).await?;
    let probe = probes
        .first()
        .ok_or_else(|| anyhow!("no face detected in {face_image}"))?;
    info!(face = %probe.face_id, "searching with detected face");

    let candidates = client.detect_faces(candidate_image).await?;
    if candidates.is_empty() {
        bail!("no face detected in {candidate_image}");
    }
    let candidate_ids: Vec<String> = candidates
        .iter()
        .map(|face| face.face_id.clone())
        .collect();

    let matches = client.find_similar(&probe.face_id, &candidate_ids).await?;
    if matches.is_empty() {
        println!("no similar faces found");
    }
    for found in matches {
        println!(
            "face {} matches with confidence {:.2}",
            found.face_id, found.confidence
        );
    }
    Ok(())
}

async fn identify(
    config: &RuntimeConfig,
    site: Site,
    group: &str,
    image: &str,
) -> Result<()> {
    let client = client_for(config, site)?;

    let faces = client.detect_faces(image).await?;
    if faces.is_empty() {
        bail!("no face detected in {image}");
    }
    let face_ids: Vec<String> = faces.iter().map(|face| face.face_id.clone()).collect();

    let results = client.identify(&face_ids, group).await?;
    if results.is_empty() {
        println!("no person identified in group {group}");
    }
    for result in results {
        match result.top_candidate() {
            Some(candidate) => println!(
                "face {} identified as person {} with confidence {:.2}",
                result.face_id, candidate.person_id, candidate.confidence
            ),
            None => println!("face {} matched nobody", result.face_id),
        }
    }
    Ok(())
}

async fn train(config: &RuntimeConfig, site: Site, group: &str) -> Result<()> {
    let client = client_for(config, site)?;
    client.train_person_group(group).await?;
    info!(group, "training started");

    let cancel = spawn_interrupt_handler();
    let report = wait_for_training(client.as_ref(), group, config.poll_policy, &cancel).await?;
    println!("training of {} finished: {}", group, report.status);
    Ok(())
}

async fn enroll(
    config: &RuntimeConfig,
    site: Site,
    group: &str,
    name: &str,
    images: &[String],
) -> Result<()> {
    let client = client_for(config, site)?;
    let person_id = client.create_person(group, name).await?;
    for image in images {
        let face_id = client.add_person_face(group, &person_id, image).await?;
        info!(person = %person_id, face = %face_id, "registered face");
    }
    println!(
        "enrolled {} as person {} with {} faces",
        name,
        person_id,
        images.len()
    );
    Ok(())
}
