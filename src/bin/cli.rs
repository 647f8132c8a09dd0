//! CLI application for body measurement estimation and evaluation.
//!
//! Usage:
//!   body-measure measure --height 180 --gender male          # Human-readable output
//!   body-measure measure --height 70 --system imperial --json
//!   body-measure generate --samples 50 -o dataset.json
//!   body-measure evaluate --candidate me.json --csv report.csv
//!   body-measure sizes --candidate me.json --gender female

use std::path::{Path, PathBuf};

use body_measure::{
    evaluate, generate_dataset, recommend_sizes, AccuracyAnalysis, AccuracyLevel, BodyEstimate,
    CsvReport, Dataset, DatasetParams, EmptyOverlapPolicy, Estimator, EvaluationParams,
    EvaluationResult, Gender, LandmarkInput, LandmarkSet, MeasurementKey, MeasurementSet,
    MeasurementSystem, ModelVariant, PoseLandmarks, PrecisionMode, SizeRecommendation,
};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "body-measure")]
#[command(author, version, about = "Anatomically constrained body measurement estimation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate body measurements from height and optional landmarks
    Measure(MeasureArgs),
    /// Generate a synthetic dataset
    Generate(GenerateArgs),
    /// Evaluate candidate measurements against a dataset
    Evaluate(EvaluateArgs),
    /// Recommend clothing sizes for a set of measurements
    Sizes(SizesArgs),
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MeasureArgs {
    /// Height in the selected measurement system (cm or inches)
    #[arg(long)]
    height: f64,

    #[arg(long, default_value = "male")]
    gender: Gender,

    /// Body model variant (SMPL, SMPL-X, STAR, PARE, SPIN, SIZER)
    #[arg(long, default_value = "SMPL")]
    model: ModelVariant,

    #[arg(long, default_value = "metric")]
    system: MeasurementSystem,

    /// Ratio bound table (standard or high-precision)
    #[arg(long, default_value = "standard")]
    precision: PrecisionMode,

    /// Front-view landmarks (named joints or raw pose JSON)
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Side-view landmarks (named joints or raw pose JSON)
    #[arg(long)]
    side: Option<PathBuf>,

    /// Repeat constraint correction until no ratio changes
    #[arg(long)]
    iterate: bool,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Number of samples
    #[arg(long, default_value = "10")]
    samples: usize,

    /// standard, high or research-grade
    #[arg(long, default_value = "standard")]
    accuracy: AccuracyLevel,

    /// Dataset name
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    seed: Option<u64>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Candidate measurements as JSON
    #[arg(long)]
    candidate: PathBuf,

    /// Dataset JSON; a synthetic dataset is generated when omitted
    #[arg(long)]
    dataset: Option<PathBuf>,

    #[arg(long, default_value = "10")]
    samples: usize,

    #[arg(long, default_value = "standard")]
    accuracy: AccuracyLevel,

    /// Leave samples without shared measurements out of the averages
    #[arg(long)]
    exclude_empty: bool,

    #[arg(long)]
    seed: Option<u64>,

    /// Also write a CSV report
    #[arg(long)]
    csv: Option<PathBuf>,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(Args, Debug)]
struct SizesArgs {
    /// Measurements as JSON
    #[arg(long)]
    candidate: PathBuf,

    #[arg(long, default_value = "other")]
    gender: Gender,

    #[command(flatten)]
    out: OutputArgs,
}

/// Output structure for `measure`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeasureOutput {
    gender: Gender,
    model_variant: ModelVariant,
    measurement_system: MeasurementSystem,
    confidence: f64,
    /// Centimeters, rounded to 0.1
    measurements: MeasurementSet,
    refined: Vec<MeasurementKey>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateOutput {
    dataset: String,
    result: EvaluationResult,
    analysis: AccuracyAnalysis,
}

#[derive(Serialize)]
struct SizesOutput {
    gender: Gender,
    sizes: SizeRecommendation,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Measure(args) => run_measure(args, cli.verbose),
        Command::Generate(args) => run_generate(args, cli.verbose),
        Command::Evaluate(args) => run_evaluate(args, cli.verbose),
        Command::Sizes(args) => run_sizes(args, cli.verbose),
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn run_measure(args: &MeasureArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let estimator = Estimator::builder()
        .gender(args.gender)
        .model_variant(args.model)
        .measurement_system(args.system)
        .precision(args.precision)
        .iterate_to_convergence(args.iterate)
        .build()?;

    let landmarks = LandmarkInput {
        front: args.landmarks.as_deref().map(load_landmarks).transpose()?,
        side: args.side.as_deref().map(load_landmarks).transpose()?,
    };

    let mut rng = make_rng(args.seed);
    let estimate = estimator.estimate(args.height, &landmarks, &mut rng)?;
    let output = measure_output(&estimator, estimate);

    let output_str = if args.out.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_measurements(&output)
    };
    emit(&output_str, args.out.output.as_deref(), verbose)
}

fn measure_output(estimator: &Estimator, estimate: BodyEstimate) -> MeasureOutput {
    MeasureOutput {
        gender: estimator.gender(),
        model_variant: estimate.model_variant,
        measurement_system: estimator.measurement_system(),
        confidence: estimate.confidence,
        measurements: estimate.measurements.rounded(1),
        refined: estimate.refined,
        warnings: estimate.warnings.iter().map(|w| w.to_string()).collect(),
    }
}

fn run_generate(args: &GenerateArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut params = DatasetParams::with_samples(args.samples, args.accuracy);
    if let Some(name) = &args.name {
        params.name = name.clone();
    }

    let mut rng = make_rng(args.seed);
    let dataset = generate_dataset(&params, &mut rng)?;
    let output_str = serde_json::to_string_pretty(&dataset)?;
    emit(&output_str, args.output.as_deref(), verbose)
}

fn run_evaluate(args: &EvaluateArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let candidate = load_measurements(&args.candidate)?;

    let dataset = match &args.dataset {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            serde_json::from_str::<Dataset>(&json)?
        }
        None => {
            let params = DatasetParams::with_samples(args.samples, args.accuracy);
            generate_dataset(&params, &mut make_rng(args.seed))?
        }
    };

    let params = EvaluationParams {
        empty_overlap: if args.exclude_empty {
            EmptyOverlapPolicy::Exclude
        } else {
            EmptyOverlapPolicy::CountAsZero
        },
    };
    let result = evaluate(&candidate, &dataset, &params)?;

    if let Some(path) = &args.csv {
        let today = chrono::Utc::now().date_naive();
        let csv = CsvReport::new(&result, &dataset.name, today).to_csv();
        std::fs::write(path, csv)?;
        if verbose {
            eprintln!("CSV report written to {:?}", path);
        }
    }

    let analysis = AccuracyAnalysis::from_result(&result);
    let output = EvaluateOutput {
        dataset: dataset.name,
        result,
        analysis,
    };

    let output_str = if args.out.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_evaluation(&output)
    };
    emit(&output_str, args.out.output.as_deref(), verbose)
}

fn run_sizes(args: &SizesArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let measurements = load_measurements(&args.candidate)?;
    let output = SizesOutput {
        gender: args.gender,
        sizes: recommend_sizes(&measurements, args.gender),
    };

    let output_str = if args.out.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_sizes(&output)
    };
    emit(&output_str, args.out.output.as_deref(), verbose)
}

fn emit(output: &str, path: Option<&Path>, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = path {
        std::fs::write(path, output)?;
        if verbose {
            eprintln!("Output written to {:?}", path);
        }
    } else {
        println!("{}", output);
    }
    Ok(())
}

fn load_measurements(path: &Path) -> Result<MeasurementSet, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Accept either named joints or positional detector output.
fn load_landmarks(path: &Path) -> Result<LandmarkSet, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    match serde_json::from_str::<LandmarkSet>(&json) {
        Ok(set) => Ok(set),
        Err(named_err) => {
            debug!(error = %named_err, "not a named landmark map, trying pose output");
            let pose: PoseLandmarks = serde_json::from_str(&json)?;
            Ok(LandmarkSet::from_pose(&pose))
        }
    }
}

fn format_measurements(output: &MeasureOutput) -> String {
    let mut s = String::new();
    let system = output.measurement_system;

    s.push_str(&format!("Model: {} ({})\n", output.model_variant, output.gender));
    s.push_str(&format!("Confidence: {:.1}%\n", output.confidence * 100.0));

    s.push_str("\nMeasurements:\n");
    for (key, value) in output.measurements.iter() {
        let formatted = if key == MeasurementKey::Height {
            system.format_height(value)
        } else {
            system.format_length(value)
        };
        s.push_str(&format!("  {:<18} {}\n", key.as_str(), formatted));
    }

    if !output.refined.is_empty() {
        let names: Vec<&str> = output.refined.iter().map(|k| k.as_str()).collect();
        s.push_str(&format!("\nRefined from landmarks: {}\n", names.join(", ")));
    }

    if !output.warnings.is_empty() {
        s.push_str("\nWarnings:\n");
        for w in &output.warnings {
            s.push_str(&format!("  {}\n", w));
        }
    }

    s
}

fn format_evaluation(output: &EvaluateOutput) -> String {
    let mut s = String::new();
    let r = &output.result;

    s.push_str(&format!("Dataset: {} ({} samples)\n", output.dataset, r.sample_count));
    if r.excluded_samples > 0 {
        s.push_str(&format!("Samples without shared measurements: {}\n", r.excluded_samples));
    }
    s.push_str(&format!("MAE: {:.2} cm\n", r.mae));
    s.push_str(&format!("Deviation: {:.2}%\n", r.percentage_deviation));
    s.push_str(&format!("Precision score: {:.1}\n", output.analysis.precision_score));

    if !r.key_measurements.is_empty() {
        s.push_str("\nBy measurement:\n");
        for k in &r.key_measurements {
            s.push_str(&format!(
                "  {:<18} {:>6.2}%  {:>6.2} cm\n",
                k.name.as_str(),
                k.deviation,
                k.mae
            ));
        }
    }

    if !output.analysis.recommendations.is_empty() {
        s.push_str("\nRecommendations:\n");
        for rec in &output.analysis.recommendations {
            s.push_str(&format!("  {}\n", rec));
        }
    }

    s
}

fn format_sizes(output: &SizesOutput) -> String {
    let mut s = String::new();
    let sizes = &output.sizes;

    s.push_str(&format!("Gender: {}\n\n", output.gender));
    for (label, size) in [
        ("T-shirt", sizes.tshirt),
        ("Shirt", sizes.shirt),
        ("Jacket", sizes.jacket),
        ("Pants", sizes.pants),
    ] {
        s.push_str(&format!("  {:<8} {:<4} {}\n", label, size.as_str(), size.fit_description()));
    }

    s
}
