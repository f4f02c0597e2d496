use anyhow::Context;
use clap::Parser;
use cvisb_dbx::cli::{Cli, Commands, print_one, print_out, writes_payload};
use cvisb_dbx::config::config::AppConfig;
use cvisb_dbx::config::loader::ConfigLoader;
use cvisb_dbx::dropbox::client::DropboxClient;
use cvisb_dbx::dropbox::types::{Metadata, WriteMode};
use cvisb_dbx::dropbox::{FileStore, create_data_folders, create_file_store};
use cvisb_dbx::observability::{RunMetrics, init_tracing};
use cvisb_dbx::services::pipeline::ExperimentSource;
use cvisb_dbx::services::{Pipeline, create_pipeline};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ConfigLoader::load()?,
    };
    apply_overrides(&mut config, &cli.command);

    let _guard = init_tracing(&config.logging)?;
    info!("Configuration loaded (root folder: {})", config.dropbox.root_folder);

    ConfigLoader::validate(&config, cli.dry_run || cli.command.is_offline())?;

    let metrics = Arc::new(RunMetrics::default());
    let store = create_file_store(&config.dropbox, cli.dry_run, metrics.clone())?;

    let result = dispatch(&cli, config, store, metrics.clone()).await;
    if result.is_err() {
        metrics.record_error();
    }
    if matches!(cli.command, Commands::Run { .. }) && !cli.json {
        eprint!("{}", metrics.gather());
    } else {
        tracing::debug!("Run metrics:\n{}", metrics.gather());
    }
    result
}

/// 命令行参数覆盖配置中的生成参数
fn apply_overrides(config: &mut AppConfig, command: &Commands) {
    let (patients, seed) = match command {
        Commands::Generate { patients, seed } | Commands::Run { patients, seed, .. } => {
            (*patients, *seed)
        }
        _ => (None, None),
    };
    if let Some(patients) = patients {
        config.generator.patients = patients;
    }
    if seed.is_some() {
        config.generator.seed = seed;
    }
}

fn experiment_source(expt_file: &Option<PathBuf>) -> ExperimentSource {
    match expt_file {
        Some(path) => ExperimentSource::Local(path.clone()),
        None => ExperimentSource::Dropbox,
    }
}

fn metadata_row(entry: &Metadata) -> String {
    match entry {
        Metadata::File(file) => format!(
            "{}\t{}\t{}",
            file.path_display.as_deref().unwrap_or(&file.name),
            file.size,
            file.server_modified.to_rfc3339()
        ),
        Metadata::Folder(folder) => {
            format!("{}/", folder.path_display.as_deref().unwrap_or(&folder.name))
        }
        Metadata::Deleted(deleted) => format!(
            "{} (deleted)",
            deleted.path_display.as_deref().unwrap_or(&deleted.name)
        ),
    }
}

async fn write_output(out: &Option<PathBuf>, bytes: &[u8]) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            tokio::fs::write(path, bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => std::io::stdout().write_all(bytes)?,
    }
    Ok(())
}

async fn dispatch(
    cli: &Cli,
    config: AppConfig,
    store: Arc<dyn FileStore>,
    metrics: Arc<RunMetrics>,
) -> anyhow::Result<()> {
    let json = cli.json;
    if cli.dry_run && cli.command.bypasses_store() {
        anyhow::bail!("fetch-link downloads directly from Dropbox and cannot run with --dry-run");
    }
    match &cli.command {
        Commands::Account => {
            let account = store.current_account().await?;
            print_one(json, account, |a| {
                format!("{} <{}> ({})", a.name.display_name, a.email, a.account_id)
            })?;
        }
        Commands::Ls { path } => {
            let entries = store.list_folder(path).await?;
            print_out(json, &entries, metadata_row)?;
        }
        Commands::Stat { path } => {
            let entry = store.get_metadata(path).await?;
            print_one(json, entry, metadata_row)?;
        }
        Commands::Get { path, out } => {
            let (meta, bytes) = store.download(path).await?;
            if writes_payload(json, out) {
                write_output(out, &bytes).await?;
            }
            if json {
                print_one(json, meta, |_| String::new())?;
            }
        }
        Commands::Put {
            local,
            remote,
            overwrite,
        } => {
            let bytes = tokio::fs::read(local)
                .await
                .with_context(|| format!("failed to read {}", local.display()))?;
            let meta = store
                .upload(bytes, remote, WriteMode::from_overwrite(*overwrite))
                .await?;
            print_one(json, meta, |m| {
                format!(
                    "uploaded {} ({} bytes, rev {})",
                    m.path_display.as_deref().unwrap_or(&m.name),
                    m.size,
                    m.rev
                )
            })?;
        }
        Commands::Mkdir { path } => {
            let meta = store.create_folder(path).await?;
            print_one(json, meta, |m| {
                format!("created {}", m.path_display.as_deref().unwrap_or(&m.name))
            })?;
        }
        Commands::InitFolders => {
            let created = create_data_folders(store.as_ref(), &config.dropbox.root_folder).await?;
            print_out(json, &created, |p| format!("created {}", p))?;
        }
        Commands::FetchLink { url, out } => {
            let client = DropboxClient::new(&config.dropbox)?.with_metrics(metrics);
            let bytes = client.fetch_shared_link(url).await?;
            write_output(out, &bytes).await?;
        }
        Commands::Generate { .. } => {
            let pipeline = create_pipeline(config, store);
            let (_patients, report) = pipeline.generate().await?;
            print_one(json, report, |r| {
                format!(
                    "{} patients, {} samples -> {}",
                    r.patients,
                    r.samples,
                    r.published.join(", ")
                )
            })?;
        }
        Commands::UploadDummies { expt_file } => {
            let pipeline = create_pipeline(config, store);
            let files = expected_files(&pipeline, expt_file).await?;
            let uploaded = pipeline.upload_dummies(&files).await?;
            print_out(json, &uploaded, |p| p.clone())?;
        }
        Commands::Reconcile { expt_file } => {
            let pipeline = create_pipeline(config, store);
            let mut files = expected_files(&pipeline, expt_file).await?;
            let (report, published) = pipeline.reconcile(&mut files).await?;
            print_one(json, report, |r| {
                format!(
                    "{} present, {} absent ({} files in {} folders) -> {}",
                    r.present, r.absent, r.listed, r.folders, published
                )
            })?;
        }
        Commands::Run { expt_file, .. } => {
            let pipeline = create_pipeline(config, store);
            let report = pipeline.run(&experiment_source(expt_file)).await?;
            print_one(json, report, |r| {
                format!(
                    "{} patients, {} samples, {} experiments, {} expected files\n\
                     {} dummies uploaded, {} present, {} absent\n\
                     published: {}",
                    r.patients,
                    r.samples,
                    r.experiments,
                    r.expected_files,
                    r.dummies_uploaded,
                    r.reconcile.present,
                    r.reconcile.absent,
                    r.published.join(", ")
                )
            })?;
        }
    }
    Ok(())
}

async fn expected_files(
    pipeline: &Pipeline,
    expt_file: &Option<PathBuf>,
) -> anyhow::Result<Vec<cvisb_dbx::models::ExpectedFile>> {
    let patients = pipeline.load_roster().await?;
    let (_experiments, files) = pipeline
        .expected_files(&patients, &experiment_source(expt_file))
        .await?;
    Ok(files)
}
