use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clustering::orchestrator::Orchestrator;
use config::clustering::ClusteringConfig;
use config::enums::RemainderPolicy;
use dataset::input::csv::CsvReader;
use dataset::input::read_records;
use dataset::output::csv::CsvWriter;
use dataset::output::write_records;
use log::info;
use prometheus_client::registry::Registry;

#[derive(Parser, Debug)]
#[command(version, about = "Distributed k-means over a song dataset", long_about = None)]
#[command(arg_required_else_help = true)]
struct Args {
    /// Input CSV file
    dataset_path: PathBuf,

    /// YAML or JSON config file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short = 'k', long)]
    num_clusters: Option<usize>,

    #[arg(long)]
    max_iterations: Option<usize>,

    #[arg(short = 'p', long)]
    num_workers: Option<usize>,

    /// Threads per worker for the assignment step (0 = share of available parallelism)
    #[arg(short = 't', long)]
    num_threads: Option<usize>,

    /// coordinator | round_robin
    #[arg(long)]
    remainder_policy: Option<RemainderPolicy>,

    #[arg(long)]
    seed: Option<u64>,

    /// Output CSV file. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    print_metrics: bool,
}

fn build_config(args: &Args) -> Result<ClusteringConfig> {
    let mut config = match &args.config {
        Some(path) => ClusteringConfig::from_file(path)?,
        None => ClusteringConfig::default(),
    };
    if let Some(num_clusters) = args.num_clusters {
        config.num_clusters = num_clusters;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(num_workers) = args.num_workers {
        config.num_workers = num_workers;
    }
    if let Some(num_threads) = args.num_threads {
        config.num_threads = num_threads;
    }
    if let Some(remainder_policy) = args.remainder_policy {
        config.remainder_policy = remainder_policy;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    info!("Config: {:?}", config);

    let mut input = CsvReader::open(&args.dataset_path)?;
    let records = read_records(&mut input);

    let outcome = Orchestrator::new(config)?.run(records)?;
    info!(
        "{} records clustered in {} rounds ({:?}), {} clusters reseeded",
        outcome.records.len(),
        outcome.rounds,
        outcome.termination,
        outcome.num_reseeded
    );

    match &args.output {
        Some(path) => {
            let mut writer = CsvWriter::create(path)?;
            write_records(&mut writer, &outcome.records)?;
            info!("Wrote {} rows to {}", writer.num_written(), path.display());
        }
        None => {
            let mut writer = CsvWriter::new(std::io::stdout().lock());
            write_records(&mut writer, &outcome.records)?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let mut registry = Registry::default();
    metrics::register_metrics(&mut registry);

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    if args.print_metrics {
        match metrics::encode_metrics(&registry) {
            Ok(text) => eprint!("{}", text),
            Err(e) => eprintln!("Failed to encode metrics: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use clustering::model::Record;
    use dataset::input::csv::CsvReader;
    use tempdir::TempDir;

    use super::*;

    const SONGS_CSV: &str = "\
acousticness,danceability,energy,instrumentalness,valence,tempo,liveness,loudness,speechiness,duration_ms,popularity,year,key
0,0,0,0,0,0,0,0,0,0,0,0,0
0,1,0,0,0,0,0,0,0,0,0,0,0
1,0,0,0,0,0,0,0,0,0,0,0,0
10,10,0,0,0,0,0,0,0,0,0,0,0
10,11,0,0,0,0,0,0,0,0,0,0,0
11,10,0,0,0,0,0,0,0,0,0,0,0
";

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new("test_cli").unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "num_clusters: 6\nnum_workers: 3\nseed: 1\n").unwrap();

        let args = Args::parse_from([
            "kmeans",
            "songs.csv",
            "--config",
            config_path.to_str().unwrap(),
            "-k",
            "2",
            "--remainder-policy",
            "round_robin",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.num_clusters, 2);
        assert_eq!(config.num_workers, 3);
        assert_eq!(config.seed, Some(1));
        assert_eq!(config.remainder_policy, RemainderPolicy::RoundRobin);
        assert_eq!(config.max_iterations, 100);
    }

    #[test]
    fn test_invalid_flags_rejected() {
        assert!(Args::try_parse_from(["kmeans"]).is_err());
        assert!(Args::try_parse_from(["kmeans", "a.csv", "--remainder-policy", "spread"]).is_err());

        let args = Args::parse_from(["kmeans", "a.csv", "--num-clusters", "0"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_run_end_to_end() {
        let temp_dir = TempDir::new("test_cli").unwrap();
        let input_path = temp_dir.path().join("songs.csv");
        let output_path = temp_dir.path().join("out.csv");
        std::fs::write(&input_path, SONGS_CSV).unwrap();

        let args = Args::parse_from([
            "kmeans",
            input_path.to_str().unwrap(),
            "-k",
            "2",
            "-p",
            "4",
            "-t",
            "1",
            "--seed",
            "3",
            "--output",
            output_path.to_str().unwrap(),
        ]);
        run(&args).unwrap();

        let text = std::fs::read_to_string(&output_path).unwrap();
        assert!(text.lines().next().unwrap().ends_with(",clusterId"));
        let labels: Vec<String> = text
            .lines()
            .skip(1)
            .map(|line| line.rsplit(',').next().unwrap().to_string())
            .collect();
        assert_eq!(labels.len(), 6);
        // Two groups of three, whichever ids they got.
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);

        // Output keeps the input schema and row order.
        let mut reader = CsvReader::open(&output_path).unwrap();
        let records: Vec<Record> = read_records(&mut reader);
        assert_eq!(records[3].features.values()[0], 10.0);
        assert_eq!(records[4].features.values()[1], 11.0);
    }

    #[test]
    fn test_run_missing_input() {
        let args = Args::parse_from(["kmeans", "/nonexistent/songs.csv"]);
        assert!(run(&args).is_err());
    }
}
