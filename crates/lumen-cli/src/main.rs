//! Lumen CLI - manage the model artifacts of a Lumen vision device.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumen_core::{Capabilities, FileUpload, HandlerRegistry, ModelStoreApi};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(about = "Discover, validate and install vision model artifacts")]
struct Args {
    /// Models directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable the RKNN handler instead of probing the host
    #[arg(long, global = true)]
    rknn: bool,

    /// Enable the CoreML handlers instead of probing the host
    #[arg(long, global = true)]
    coreml: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List discovered artifacts
    List {
        /// Only list artifacts of this backend
        #[arg(long)]
        backend: Option<String>,
    },
    /// Install a model file (or package archive) with its labels file
    Install {
        model: PathBuf,
        labels: PathBuf,
    },
    /// Show the registered backends and their upload types
    Backends,
    /// Copy bundled artifacts into the models directory, keeping existing ones
    ExtractBundled { source: PathBuf },
}

impl Args {
    /// Explicit flags win over host detection.
    fn capabilities(&self) -> Capabilities {
        if self.rknn || self.coreml {
            Capabilities {
                rknn: self.rknn,
                coreml: self.coreml,
            }
        } else {
            Capabilities::detect()
        }
    }

    fn models_dir(&self) -> PathBuf {
        self.models_dir
            .clone()
            .unwrap_or_else(lumen_core::config::default_models_dir)
    }
}

async fn run(args: &Args) -> Result<Value> {
    let models_dir = args.models_dir();
    info!("Models directory: {}", models_dir.display());

    let registry = HandlerRegistry::from_capabilities(args.capabilities());
    if registry.is_empty() {
        warn!("No model handlers are enabled on this host. Pass --rknn or --coreml");
    }
    let store = ModelStoreApi::new(registry, &models_dir)
        .await
        .context("Failed to open model store")?;

    let output = match &args.command {
        Command::List { backend } => match backend {
            Some(backend) => {
                let mut by_backend = serde_json::Map::new();
                by_backend.insert(
                    backend.clone(),
                    serde_json::to_value(store.list_artifacts(backend))?,
                );
                Value::Object(by_backend)
            }
            None => serde_json::to_value(&*store.snapshot())?,
        },
        Command::Install { model, labels } => {
            let model_upload = FileUpload::from_path(model);
            let labels_upload = FileUpload::from_path(labels);
            let catalog = store
                .install_upload(model_upload, labels_upload)
                .await
                .with_context(|| format!("Failed to install {}", model.display()))?;
            json!({
                "success": true,
                "installed": model.file_name().map(|n| n.to_string_lossy().into_owned()),
                "models": catalog.len(),
            })
        }
        Command::Backends => json!({
            "backends": store.supported_backends(),
            "default": store.default_artifact().map(|a| a.display_name()),
        }),
        Command::ExtractBundled { source } => {
            let report = store
                .extract_bundled(source)
                .await
                .with_context(|| format!("Failed to extract bundled models from {}", source.display()))?;
            serde_json::to_value(report)?
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let output = run(&args).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_capability_flags_override_detection() {
        let args = parse(&["lumen", "--rknn", "backends"]);
        assert_eq!(
            args.capabilities(),
            Capabilities {
                rknn: true,
                coreml: false
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["lumen", "list", "--backend", "RKNN", "--models-dir", "/tmp/m"]);
        assert_eq!(args.models_dir(), PathBuf::from("/tmp/m"));
        assert!(matches!(args.command, Command::List { backend: Some(ref b) } if b == "RKNN"));
    }

    #[tokio::test]
    async fn test_install_then_list() {
        let temp_dir = TempDir::new().unwrap();
        let models = temp_dir.path().join("models");
        let model = temp_dir.path().join("note-640-640-yolov5s.rknn");
        let labels = temp_dir.path().join("note-640-640-yolov5s-labels.txt");
        fs::write(&model, b"w").unwrap();
        fs::write(&labels, "person\n").unwrap();
        let models_arg = models.to_string_lossy().into_owned();
        let model_arg = model.to_string_lossy().into_owned();
        let labels_arg = labels.to_string_lossy().into_owned();

        let install = parse(&[
            "lumen", "--rknn", "--models-dir", &models_arg, "install", &model_arg, &labels_arg,
        ]);
        let output = run(&install).await.unwrap();
        assert_eq!(output["success"], true);
        assert_eq!(output["models"], 1);

        let list = parse(&["lumen", "--rknn", "--models-dir", &models_arg, "list", "--backend", "RKNN"]);
        let output = run(&list).await.unwrap();
        assert_eq!(output["RKNN"][0]["labels"][0], "person");
    }

    #[tokio::test]
    async fn test_install_rejects_mismatched_pair() {
        let temp_dir = TempDir::new().unwrap();
        let models = temp_dir.path().join("models");
        let model = temp_dir.path().join("note-640-640-yolov5s.rknn");
        let labels = temp_dir.path().join("note-320-320-yolov5s-labels.txt");
        fs::write(&model, b"w").unwrap();
        fs::write(&labels, "person\n").unwrap();
        let models_arg = models.to_string_lossy().into_owned();
        let model_arg = model.to_string_lossy().into_owned();
        let labels_arg = labels.to_string_lossy().into_owned();

        let install = parse(&[
            "lumen", "--rknn", "--models-dir", &models_arg, "install", &model_arg, &labels_arg,
        ]);
        assert!(run(&install).await.is_err());
        assert!(!models.join("note-640-640-yolov5s.rknn").exists());
    }
}
