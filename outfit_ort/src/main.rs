mod annotate;
mod config;
mod process_image;

use std::path::PathBuf;

use clap::Parser;
use ort_common::{init_runtime, OnnxSegmenter, YoloLocator};
use outfit_common::{AnalysisError, AnalysisResult, ClothingAnalyzer};
use tracing_subscriber::prelude::*;

use crate::config::AppConfig;

#[derive(Debug, Parser)]
pub struct Args {
    /// Input images (.jpeg/.png). Each one is analyzed independently.
    #[arg(required_unless_present = "self_test")]
    inputs: Vec<PathBuf>,
    /// Whether to attempt to use `cuda` hw acceleration.
    /// This may silently fail and fallback to cpu acceleration presently.
    #[arg(long, action, default_value = "false")]
    cuda: bool,
    /// Yolov8 onnx detection model.
    #[arg(long, short, default_value = "_models/yolov8n.onnx")]
    model: PathBuf,
    /// Optional foreground segmentation onnx model. Without it whole crops
    /// are clustered.
    #[arg(long)]
    seg_model: Option<PathBuf>,
    /// JSON settings file (analyzer, locator and segmenter sections).
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Overrides the number of color clusters.
    #[arg(long)]
    clusters: Option<usize>,
    /// Overrides the clustering seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Don't write `.out.json` / `.out.jpg` next to the inputs.
    #[arg(long, action, default_value = "false")]
    no_output: bool,
    /// Run color extraction on a synthetic image and exit; needs no models.
    #[arg(long, action, default_value = "false")]
    self_test: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging. stdout is reserved for the json report.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "warn,outfit_ort=info,outfit_common=info,ort_common=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut app_config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(clusters) = args.clusters {
        app_config.analyzer.clustering.clusters = clusters;
    }
    if let Some(seed) = args.seed {
        app_config.analyzer.clustering.seed = seed;
    }
    tracing::debug!(?app_config, "resolved configuration");

    if args.self_test {
        let namer = outfit_common::ColorNamer::default();
        let description = self_test::run(&app_config.analyzer.clustering, &namer)?;
        println!("{description}");
        return Ok(());
    }

    let ep_name = init_runtime(args.cuda)?;
    let locator = YoloLocator::from_file(&args.model, app_config.locator.clone())?;
    log::info!("Prepared ort {ep_name} session with model: {:?}", args.model);

    let mut analyzer = ClothingAnalyzer::new(locator, app_config.analyzer.clone());
    if let Some(seg_model) = &args.seg_model {
        match OnnxSegmenter::from_file(seg_model, app_config.segmenter.clone()) {
            Ok(segmenter) => analyzer = analyzer.with_segmenter(segmenter),
            Err(err) => log::warn!("Segmentation model unavailable, using whole crops: {err:#}"),
        }
    }

    let mut reports = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let result = process_image::process_image(input, &analyzer, !args.no_output)
            .unwrap_or_else(|err| {
                log::error!("{input:?}: {err:#}");
                AnalysisResult::Failed(AnalysisError::Input(format!("{err:#}")))
            });
        reports.push(serde_json::json!({ "input": input, "result": result }));
    }

    let report = if reports.len() == 1 {
        reports.remove(0)
    } else {
        serde_json::Value::Array(reports)
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
