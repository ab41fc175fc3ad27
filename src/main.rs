use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ticket_analyzer::frequency::unresolved_frequent_words;
use ticket_analyzer::models::TicketExport;
use ticket_analyzer::report::{print_analysis, print_summary};
use ticket_analyzer::summary::{summarize, SummaryOptions, MAX_INACTIVE_DAYS};
use ticket_analyzer::{analyze_titles, PipelineConfig};

const UNRESOLVED_TOP_WORDS: usize = 15;
const SUMMARY_TOP: usize = 20;

#[derive(Parser, Debug)]
#[command(version, about = "Clusters, topics and word graphs for GLPI ticket exports", long_about = None)]
struct Args {
    /// `;`-separated GLPI ticket export
    path: PathBuf,
    #[clap(short, long, help = "Number of k-means clusters")]
    clusters: Option<usize>,
    #[clap(short, long, help = "Number of LDA topics")]
    topics: Option<usize>,
    #[clap(short, long, help = "Keywords shown per cluster and topic")]
    keywords: Option<usize>,
    #[clap(long, help = "Minimum number of titles for a co-occurrence edge")]
    threshold: Option<usize>,
    #[clap(long, help = "Share of each cluster used to train the probe")]
    train_fraction: Option<f64>,
    #[clap(long, help = "Seed for every randomized step")]
    seed: Option<u64>,
    #[clap(
        long,
        default_value_t = 7,
        value_parser = clap::value_parser!(i64).range(0..=MAX_INACTIVE_DAYS),
        help = "Days without modification before a ticket counts as inactive"
    )]
    inactive_days: i64,
    #[clap(long, help = "JSON file overriding the default pipeline configuration")]
    config: Option<PathBuf>,
    #[clap(long, help = "Print the results as JSON instead of a report")]
    json: bool,
    #[clap(short, long, help = "Show only the title analysis, not the export summary")]
    analysis_only: bool,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(k) = self.clusters {
            config.num_clusters = k;
        }
        if let Some(topics) = self.topics {
            config.num_topics = topics;
        }
        if let Some(keywords) = self.keywords {
            config.keywords_per_group = keywords;
        }
        if let Some(threshold) = self.threshold {
            config.cooccurrence_threshold = threshold;
        }
        if let Some(fraction) = self.train_fraction {
            config.probe.train_fraction = fraction;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.pipeline_config()?;
    info!("Path: {}", args.path.display());

    let export = TicketExport::from_csv_file(&args.path)?;
    let summary = if args.analysis_only {
        None
    } else {
        let options = SummaryOptions {
            now: Local::now().naive_local(),
            inactive_days: args.inactive_days,
            top: SUMMARY_TOP,
        };
        Some(summarize(&export, &options)?)
    };

    let unresolved = unresolved_frequent_words(
        export
            .records
            .iter()
            .map(|r| (r.title.as_deref(), r.status.as_deref())),
        &config.noise.cooccurrence_set(),
        UNRESOLVED_TOP_WORDS,
    );
    let report = analyze_titles(&export.titles(), &config)?;

    if args.json {
        let bundle = json!({
            "summary": summary,
            "unresolved_words": unresolved,
            "analysis": report,
        });
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        return Ok(());
    }

    if let Some(summary) = &summary {
        print_summary(summary);
    }
    print_analysis(&report, &unresolved);
    Ok(())
}
