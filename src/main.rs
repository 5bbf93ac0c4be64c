use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use dialoguer::Confirm;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;
use crate::context::GcpContext;
use crate::orchestrator::Orchestrator;
use crate::provider::falcon::FalconClient;
use crate::provider::gcp::{ProjectEnumerator, RegistryDiscoverer, ServiceAccountProvisioner};

mod cli;
mod config;
mod context;
mod model;
mod orchestrator;
mod provider;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _guard = initialize_logging()?;

    let args = cli::Args::parse();
    let config = config::load(args.config.as_deref())?;
    let settings = Settings::from_env(config)?;
    info!(host_project = %settings.host_project, "Starting gar-registrar");

    let orchestrator = build_orchestrator(settings).await?;

    if args.deprovision {
        deprovision(&orchestrator, args.yes).await
    } else {
        println!("Discovering Artifact Registry repositories and registering them with Falcon");
        let summary = orchestrator.register().await?;
        println!();
        print!("{summary}");
        Ok(())
    }
}

async fn build_orchestrator(settings: Settings) -> Result<Orchestrator> {
    let context = GcpContext::new(&settings.host_project);
    let credentials = context.create_credentials()?;

    let projects = ProjectEnumerator::new(credentials.clone()).await?;
    let registries = RegistryDiscoverer::new(credentials.clone()).await?;
    let accounts = ServiceAccountProvisioner::new(
        credentials,
        &context.host_project,
        &settings.gcp.service_account_name,
        settings.gcp.roles,
    )
    .await?;
    let falcon = FalconClient::new(settings.falcon_base_url, settings.falcon_credentials)?;

    Ok(Orchestrator::new(
        Arc::new(projects),
        Arc::new(registries),
        Arc::new(accounts),
        Arc::new(falcon),
        settings.gcp.locations,
    ))
}

async fn deprovision(orchestrator: &Orchestrator, assume_yes: bool) -> Result<()> {
    let summary = orchestrator
        .deprovision(|registrations| {
            println!("GAR registrations to remove:");
            for registration in registrations {
                println!("  {}", registration.label());
            }
            assume_yes || confirm_removal(registrations.len())
        })
        .await?;
    println!();
    print!("{summary}");
    Ok(())
}

fn confirm_removal(count: usize) -> bool {
    Confirm::new()
        .with_prompt(format!("Remove {count} registration(s) from Falcon?"))
        .default(false)
        .interact()
        .unwrap_or_else(|err| {
            warn!(%err, "Could not read confirmation, treating it as no");
            false
        })
}

fn initialize_logging() -> Result<WorkerGuard> {
    let directory = dirs::data_local_dir().map_or_else(
        || std::path::PathBuf::from("logs"),
        |path| path.join("gar-registrar").join("logs"),
    );
    std::fs::create_dir_all(&directory)?;

    let file_appender = tracing_appender::rolling::daily(&directory, "gar-registrar.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_filter(EnvFilter::new("gar_registrar=debug,info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                ),
        )
        .init();

    Ok(guard)
}
