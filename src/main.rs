use clap::Parser;
use relgraph::config::{CliConfig, RenderConfig};
use relgraph::engine::InferenceEngine;
use relgraph::html::{self, RenderError};
use relgraph::presentation::GroupFilter;
use relgraph::{dictionary, metadata};
use std::fs;
use std::path::PathBuf;
use std::process;

/// Infer table relationships from naming conventions and render them as an
/// interactive HTML graph
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQLite database to inspect
    database: PathBuf,

    /// Table dictionary CSV (table_code, explanation_cn, explanation_en)
    #[arg(long)]
    tables_csv: Option<PathBuf>,

    /// Column dictionary CSV (column_code, meaning_cn, meaning_en)
    #[arg(long)]
    columns_csv: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Groups to show; repeat for several (default: all)
    #[arg(short, long = "group")]
    groups: Vec<String>,

    /// Ideal edge length of the layout (50-800)
    #[arg(long)]
    spring_length: Option<u32>,

    /// Layout relaxation steps (1-1000)
    #[arg(long)]
    iterations: Option<u32>,

    /// Page title
    #[arg(long)]
    title: Option<String>,

    /// Print the available groups and link keys instead of rendering
    #[arg(long)]
    list: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<log::Level>,
}

impl From<&Cli> for CliConfig {
    fn from(cli: &Cli) -> Self {
        CliConfig {
            spring_length: cli.spring_length,
            iterations: cli.iterations,
            title: cli.title.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let config = match RenderConfig::from_cli(CliConfig::from(&cli)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let (filter, unknown) = if cli.groups.is_empty() {
        (GroupFilter::all(), Vec::new())
    } else {
        GroupFilter::from_names(&cli.groups)
    };
    if !unknown.is_empty() {
        eprintln!("Unknown groups: {}", unknown.join(", "));
        process::exit(1);
    }

    let source = metadata::load_or_empty(&cli.database);
    let dict = dictionary::load_or_empty(cli.tables_csv.as_deref(), cli.columns_csv.as_deref());
    let graph = InferenceEngine::new().infer(&source, &dict);

    if cli.list {
        let groups: Vec<String> = graph.groups().iter().map(|g| g.to_string()).collect();
        println!("Groups: {}", groups.join(", "));
        println!("Link keys:");
        for key in graph.link_keys() {
            println!("  {}", key);
        }
        return;
    }

    let page = match html::render_page(&graph, &filter, &config) {
        Ok(page) => page,
        Err(e @ RenderError::EmptySelection { .. }) => {
            eprintln!("Warning: {}", e);
            process::exit(2);
        }
        Err(e) => {
            eprintln!("Render error: {}", e);
            process::exit(1);
        }
    };

    match cli.output {
        Some(path) => {
            if let Err(e) = fs::write(&path, &page) {
                eprintln!("Failed to write {}: {}", path.display(), e);
                process::exit(1);
            }
        }
        None => print!("{}", page),
    }
}
