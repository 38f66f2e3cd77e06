use anyhow::Context;
use clap::Parser;
use generator::profile::{write_synthetic_batch, GeneratorConfig};
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::{write_report, write_results, Runner};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Estimate the angle of arrival of a sound source from numbered stereo WAV files"
)]
struct Args {
    /// Parent directory of the audio files (1.wav, 2.wav, ...)
    #[arg(short, long)]
    directory: PathBuf,
    /// Number of audio files to process
    #[arg(short, long, required_unless_present = "synthesize")]
    number: Option<usize>,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Parallel estimation tasks (defaults to the available parallelism)
    #[arg(long)]
    workers: Option<usize>,
    /// Also write a JSON report with lags and confidences
    #[arg(long)]
    report: Option<PathBuf>,
    /// Write this many synthetic recordings into the directory instead of estimating
    #[arg(long)]
    synthesize: Option<usize>,
    /// Seed for synthetic recordings
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.workers)
    };
    if let Some(workers) = args.workers {
        workflow_config.workers = workers;
    }

    if let Some(count) = args.synthesize {
        let generator = GeneratorConfig {
            speed_of_sound: workflow_config.estimator.speed_of_sound,
            mic_distance: workflow_config.estimator.mic_distance,
            seed: args.seed,
            ..Default::default()
        };
        let angles = write_synthetic_batch(&args.directory, count, &generator)?;
        println!(
            "Wrote {} synthetic recordings to \"{}\"",
            angles.len(),
            args.directory.display()
        );
        return Ok(());
    }

    let number = args.number.context("--number is required")?;
    let runner = Runner::new(workflow_config.clone())?;
    println!("Start processing:\n");
    let result = runner.execute(&args.directory, number)?;

    let out_path = args.directory.join(&workflow_config.result_file);
    println!(
        "\nAll jobs finished! Writing results to \"{}\" ...\n",
        out_path.display()
    );
    write_results(&out_path, &result.records)?;

    if let Some(report) = &args.report {
        write_report(report, &result.records)?;
    }

    let metrics = result.metrics;
    log::info!(
        "processed {} recordings, {} failed, {} low confidence",
        metrics.processed,
        metrics.errors,
        metrics.low_confidence
    );

    Ok(())
}
