use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use parkscrape::target::{ScrapeTarget, Strategy, load_targets, select_targets};
use parkscrape::utils::TargetOverrides;
use parkscrape::{OutputFormat, TabularExporter, presets, run_target};

#[derive(Parser)]
#[command(name = "parkscrape")]
#[command(about = "A Technopark and Infopark job and company scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum ListFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
struct RunArgs {
    #[arg(help = "Names of the targets to run, in order")]
    targets: Vec<String>,

    #[arg(
        short = 'f',
        long,
        default_value = "xlsx",
        value_parser = |s: &str| s.parse::<OutputFormat>().map_err(|e| e.to_string()),
        help = "Output file format (xlsx or csv)"
    )]
    format: OutputFormat,

    #[arg(long, default_value = ".", help = "Directory the output files are written to")]
    output_dir: PathBuf,

    #[arg(long, help = "Load target definitions from a JSON file instead of the built-ins")]
    targets_file: Option<PathBuf>,

    #[arg(long, help = "Delay between requests in milliseconds")]
    delay_ms: Option<u64>,

    #[arg(long, help = "Per-request timeout in seconds")]
    timeout_secs: Option<u64>,

    #[arg(long, help = "Maximum number of search pages per keyword")]
    max_pages: Option<u32>,

    #[arg(long, help = "Accept invalid TLS certificates (insecure)")]
    insecure: bool,

    #[arg(long, help = "First ID for ID-range targets")]
    start: Option<u32>,

    #[arg(long, help = "Last ID for ID-range targets")]
    end: Option<u32>,

    #[arg(
        short = 'k',
        long = "keyword",
        help = "Search keyword for keyword-search targets (repeatable)"
    )]
    keywords: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape the given targets (all of them by default) and write one file per target
    Run(RunArgs),
    /// Show the available target definitions
    Targets {
        #[arg(long, help = "Load target definitions from a JSON file instead of the built-ins")]
        targets_file: Option<PathBuf>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: ListFormat,
    },
}

impl Commands {
    /// Running with no subcommand scrapes every target with default settings.
    fn or_default(command: Option<Commands>) -> Commands {
        command.unwrap_or_else(|| Commands::Run(RunArgs::parse_from(["run"])))
    }
}

fn load_or_builtin(targets_file: Option<PathBuf>) -> Vec<ScrapeTarget> {
    match targets_file {
        Some(path) => load_targets(&path).unwrap_or_else(|e| {
            log::error!("Error loading targets from {}: {}", path.display(), e);
            process::exit(1);
        }),
        None => presets::all(),
    }
}

fn describe(target: &ScrapeTarget) -> String {
    match &target.strategy {
        Strategy::IdRange {
            url_prefix,
            start,
            end,
            ..
        } => format!("{}{{{}..={}}}", url_prefix, start, end),
        Strategy::KeywordSearch {
            search_url,
            keywords,
            ..
        } => format!("{} [{}]", search_url, keywords.join(", ")),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match Commands::or_default(cli.command) {
        Commands::Run(RunArgs {
            targets,
            format,
            output_dir,
            targets_file,
            delay_ms,
            timeout_secs,
            max_pages,
            insecure,
            start,
            end,
            keywords,
        }) => {
            let overrides = TargetOverrides {
                delay_ms,
                timeout_secs,
                max_pages,
                insecure,
                start,
                end,
                keywords,
            };
            let overrides = overrides.validate().unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            let available = load_or_builtin(targets_file);
            let mut selected = select_targets(available, &targets).unwrap_or_else(|e| {
                log::error!("{}", e);
                process::exit(1);
            });

            for target in &mut selected {
                overrides.apply(target);
                if let Err(e) = target.validate() {
                    log::error!("{}", e);
                    process::exit(1);
                }
            }

            let exporter = TabularExporter::new(format, output_dir);

            for target in selected {
                if target.client.accept_invalid_certs {
                    log::warn!(
                        "{}: TLS certificate verification disabled (--insecure)",
                        target.name
                    );
                }
                log::info!("Running {}: {}", target.name, describe(&target));

                let output = target.output.clone();
                let report = run_target(target).await.unwrap_or_else(|e| {
                    log::error!("{}", e);
                    process::exit(1);
                });

                for record in &report.records {
                    println!("{}", record);
                }
                print!("{}", report);

                match exporter.export(report, &output) {
                    Ok(path) => println!("Data saved to '{}'", path.display()),
                    Err(e) => {
                        log::error!("Failed to save {}: {}", exporter.path_for(&output).display(), e);
                        process::exit(1);
                    }
                }
            }
        }

        Commands::Targets {
            targets_file,
            format,
        } => {
            let targets = load_or_builtin(targets_file);

            match format {
                ListFormat::Json => match serde_json::to_string_pretty(&targets) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        log::error!("Error serializing to JSON: {}", e);
                        process::exit(1);
                    }
                },
                ListFormat::Text => {
                    for (i, target) in targets.iter().enumerate() {
                        println!("{:>3}. {:<22} {}", i + 1, target.name, describe(target));
                        println!(
                            "     -> {} (sheet '{}')",
                            target.output.file_stem, target.output.sheet
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_runs_all_targets_with_defaults() {
        let cli = Cli::try_parse_from(["parkscrape"]).expect("bare invocation should parse");
        assert!(cli.command.is_none());

        let Commands::Run(args) = Commands::or_default(cli.command) else {
            panic!("expected the run command");
        };
        assert!(args.targets.is_empty());
        assert_eq!(args.format, OutputFormat::Xlsx);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(!args.insecure);
    }

    #[test]
    fn test_explicit_run_keeps_its_arguments() {
        let cli = Cli::try_parse_from([
            "parkscrape",
            "-l",
            "debug",
            "run",
            "infopark-jobs",
            "-f",
            "csv",
            "-k",
            "c#",
        ])
        .unwrap();

        let Commands::Run(args) = Commands::or_default(cli.command) else {
            panic!("expected the run command");
        };
        assert_eq!(args.targets, vec!["infopark-jobs"]);
        assert_eq!(args.format, OutputFormat::Csv);
        assert_eq!(args.keywords, vec!["c#"]);
    }
}
