//! Diffdeck CLI - Pack a repository, or a set of changes, into one document.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use diffdeck::changes::{parse_changes, records_from_changes};
use diffdeck::classify::FileClassifier;
use diffdeck::config::{Config, CONFIG_FILE_NAME};
use diffdeck::errors::{exit_code, DiffdeckError};
use diffdeck::filter::{parse_pattern_list, PatternMatcher};
use diffdeck::output::{format_changes, format_output, records_to_json, write_output, OutputStyle};
use diffdeck::record::FileRecord;
use diffdeck::scanner::Scanner;
use diffdeck::security::{create_report, ReportFormat, SecurityChecker};
use diffdeck::tree::{format_size, render_tree, RenderOptions};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "diffdeck")]
#[command(about = "Pack a repository, or a set of changes, into one document for LLMs")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories and write a packed document
    Pack {
        /// Directories to scan (default: current directory)
        paths: Vec<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        format: FormatArgs,

        /// Skip the secret detection pass
        #[arg(long)]
        no_security_check: bool,

        /// Also write the security findings to this file (JSON for `.json`)
        #[arg(long, value_name = "FILE")]
        security_report: Option<PathBuf>,
    },

    /// List the files a pack would include
    Scan {
        /// Directories to scan (default: current directory)
        paths: Vec<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Show as a tree
        #[arg(long)]
        tree: bool,
    },

    /// Render a document from a JSON array of file changes
    Changes {
        /// JSON file with `[{"path", "oldPath", "content", "status"}]` entries
        file: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Write a default configuration file
    Init {
        /// Configuration file to create
        #[arg(long, short = 'c', default_value = CONFIG_FILE_NAME)]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Configuration file
    #[arg(long, short = 'c', default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Include patterns, comma-separated (replaces configured ones)
    #[arg(long)]
    include: Option<String>,

    /// Extra ignore patterns, comma-separated
    #[arg(long, short = 'i')]
    ignore: Option<String>,

    /// Files larger than this many bytes are listed but not read
    #[arg(long)]
    max_file_size: Option<u64>,

    /// Match patterns case-insensitively
    #[arg(long)]
    case_insensitive: bool,

    /// Number of concurrent file readers
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Args)]
struct FormatArgs {
    /// Output file, `-` for stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Document style
    #[arg(long, value_enum)]
    style: Option<StyleArg>,

    /// Number of largest files listed in the summary
    #[arg(long)]
    top_files_len: Option<usize>,

    /// Prefix file contents with line numbers
    #[arg(long)]
    output_show_line_numbers: bool,

    /// Drop comment lines from file contents
    #[arg(long)]
    remove_comments: bool,

    /// Drop blank lines from file contents
    #[arg(long)]
    remove_empty_lines: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StyleArg {
    Plain,
    Markdown,
    Xml,
}

impl From<StyleArg> for OutputStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Plain => OutputStyle::Plain,
            StyleArg::Markdown => OutputStyle::Markdown,
            StyleArg::Xml => OutputStyle::Xml,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let json_output = json_flag(&cli.command);

    let result = match cli.command {
        Commands::Pack {
            paths,
            scan,
            format,
            no_security_check,
            security_report,
        } => run_pack(paths, scan, format, no_security_check, security_report),
        Commands::Scan {
            paths,
            scan,
            json,
            tree,
        } => run_scan(paths, scan, json, tree),
        Commands::Changes { file, scan, format } => run_changes(file, scan, format),
        Commands::Init { config, force } => run_init(config, force),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "diffdeck", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn json_flag(cmd: &Commands) -> bool {
    match cmd {
        Commands::Scan { json, .. } => *json,
        Commands::Pack { .. }
        | Commands::Changes { .. }
        | Commands::Init { .. }
        | Commands::Completions { .. } => false,
    }
}

/// Load the configuration and fold command-line overrides into it.
fn load_config(scan: &ScanArgs, format: Option<&FormatArgs>) -> Result<Config, DiffdeckError> {
    let mut config = Config::load(&scan.config)?;

    if let Some(include) = &scan.include {
        config.include = parse_pattern_list(include);
    }
    if let Some(ignore) = &scan.ignore {
        config.ignore.custom_patterns.extend(parse_pattern_list(ignore));
    }
    if let Some(size) = scan.max_file_size {
        config.scan.max_file_size = size;
    }
    if scan.case_insensitive {
        config.scan.case_sensitive = false;
    }
    if let Some(workers) = scan.workers {
        config.scan.workers = workers;
    }

    if let Some(format) = format {
        if let Some(output) = &format.output {
            config.output.file_path = output.clone();
        }
        if let Some(style) = format.style {
            config.output.style = style.into();
        }
        if let Some(top) = format.top_files_len {
            config.output.top_files_length = top;
        }
        config.output.show_line_numbers |= format.output_show_line_numbers;
        config.output.remove_comments |= format.remove_comments;
        config.output.remove_empty_lines |= format.remove_empty_lines;
    }

    config.validate()?;
    Ok(config)
}

fn scan_base(paths: &[PathBuf]) -> PathBuf {
    paths.first().cloned().unwrap_or_else(|| PathBuf::from("."))
}

fn scan_records(
    paths: &[PathBuf],
    config: &Config,
    tree_view: bool,
) -> Result<Vec<FileRecord>, DiffdeckError> {
    let base = scan_base(paths);
    let options = config.scan_options(&base)?.tree_view(tree_view);
    let records = Scanner::new(options).scan(paths)?;

    if records.iter().map(FileRecord::file_count).sum::<usize>() == 0 {
        return Err(DiffdeckError::NoFilesFound(base));
    }
    Ok(records)
}

// --- Pack command ---

fn run_pack(
    paths: Vec<PathBuf>,
    scan: ScanArgs,
    format: FormatArgs,
    no_security_check: bool,
    security_report: Option<PathBuf>,
) -> Result<(), DiffdeckError> {
    let config = load_config(&scan, Some(&format))?;
    let records = scan_records(&paths, &config, false)?;

    let check = config.security.enable_security_check && !no_security_check;
    let issues = if check {
        SecurityChecker::new()?.check(&records)
    } else {
        Vec::new()
    };
    if !issues.is_empty() {
        warn!(issues = issues.len(), "potential secrets found, see the Security Findings section");
    }

    if let Some(path) = &security_report {
        if check {
            let report = create_report(&issues, ReportFormat::for_path(path))?;
            write_output(&report, path)?;
        } else {
            warn!(path = %path.display(), "security check disabled, report not written");
        }
    }

    let document = format_output(&records, &issues, &config.format_options()?);
    write_output(&document, &config.output.file_path)?;

    if config.output.file_path != Path::new("-") {
        let files = records.iter().filter(|r| !r.is_directory).count();
        info!(files, path = %config.output.file_path.display(), "document written");
        eprintln!(
            "Packed {} files into {} ({})",
            files,
            config.output.file_path.display(),
            format_size(document.len() as u64)
        );
    }

    Ok(())
}

// --- Scan command ---

fn run_scan(paths: Vec<PathBuf>, scan: ScanArgs, json: bool, tree: bool) -> Result<(), DiffdeckError> {
    let config = load_config(&scan, None)?;
    let records = scan_records(&paths, &config, tree)?;

    if json {
        println!("{}", records_to_json(&records)?);
    } else if tree {
        print!("{}", render_tree(&records, &RenderOptions::with_metadata()));
    } else {
        use std::io::{BufWriter, Write};
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        for record in &records {
            if record.is_directory {
                writeln!(out, "{}/", record.path)?;
            } else {
                let kind = record.mime_type().unwrap_or("not read");
                writeln!(out, "{}\t{}\t{}", record.path, format_size(record.size), kind)?;
            }
        }
        out.flush()?;
    }

    Ok(())
}

// --- Changes command ---

fn run_changes(file: PathBuf, scan: ScanArgs, format: FormatArgs) -> Result<(), DiffdeckError> {
    let config = load_config(&scan, Some(&format))?;

    let json = fs::read_to_string(&file).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DiffdeckError::PathNotFound(file.clone()),
        io::ErrorKind::PermissionDenied => DiffdeckError::PermissionDenied(file.clone()),
        _ => DiffdeckError::Io(e),
    })?;
    let changes = parse_changes(&json).map_err(|source| DiffdeckError::Changes {
        path: file.clone(),
        source,
    })?;

    let options = config.scan_options(Path::new("."))?;
    let matcher = PatternMatcher::new(&options.patterns);
    let records = records_from_changes(
        changes,
        &matcher,
        &FileClassifier::new(),
        options.walk.max_file_size,
    );

    let document = format_changes(&records, &config.format_options()?);
    write_output(&document, &config.output.file_path)?;
    info!(changes = records.len(), "changes document written");

    Ok(())
}

// --- Init command ---

fn run_init(path: PathBuf, force: bool) -> Result<(), DiffdeckError> {
    if path.exists() && !force {
        return Err(DiffdeckError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists (use --force to overwrite)", path.display()),
        )));
    }

    Config::default().save(&path)?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}
