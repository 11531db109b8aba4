use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use kiln_lexer::{Lexer, Token, TokenKind};
use kiln_packager::{PackagerClient, RangeMap};
use kiln_rewrite::RewriteError;
use kiln_worker::{CompilationContext, LoaderContext, LoaderOptions};
use tracing_subscriber::EnvFilter;

use kiln_driver::build::default_out_dir;
use kiln_driver::config::validate_config;
use kiln_driver::{create_orchestrator, load_config, load_config_file, parse_package_json, KilnConfig, ProjectBuilder};

#[derive(Parser)]
#[command(
    name = "kiln",
    version = "0.1.0",
    about = "Kiln module transpiler",
    long_about = "Rewrites ECMAScript modules to CommonJS on worker threads and\nfetches prebuilt dependency bundles from a packager."
)]
struct Cli {
    /// Path to a kiln.toml (default: the project's own)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads, overriding `[workers] count`
    #[arg(short = 'j', long, global = true)]
    workers: Option<usize>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lex a JavaScript file and show tokens (debug)
    Lex {
        /// Input JavaScript file
        input: PathBuf,

        /// Show token positions
        #[arg(short, long)]
        positions: bool,
    },

    /// Parse a JavaScript file and show its top-level statements (debug)
    Parse {
        /// Input JavaScript file
        input: PathBuf,
    },

    /// Rewrite module syntax to CommonJS and print the result
    Rewrite {
        /// Input JavaScript file
        input: PathBuf,
    },

    /// Run one file through the transpile pipeline
    Transpile {
        /// Input JavaScript file
        input: PathBuf,

        /// Treat the file as part of an installed package
        #[arg(long)]
        dependency: bool,

        /// Pass CommonJS through without a worker round trip
        #[arg(long)]
        simple_require: bool,
    },

    /// Resolve and fetch the dependencies of a package.json
    Fetch {
        /// Path to package.json
        package_json: PathBuf,

        /// Write the manifest here instead of printing a summary
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Transpile every module reachable from a project's entry
    Build {
        /// Project directory
        project: PathBuf,

        /// Output directory (default: <project>/dist)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Entry module relative to the project root
        #[arg(long)]
        entry: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let overrides = Overrides {
        config: cli.config,
        workers: cli.workers,
    };
    match cli.command {
        Commands::Lex { input, positions } => lex_command(&input, positions),
        Commands::Parse { input } => parse_command(&input),
        Commands::Rewrite { input } => rewrite_command(&input),
        Commands::Transpile {
            input,
            dependency,
            simple_require,
        } => {
            let config = overrides.resolve(Path::new("."))?;
            transpile_command(&input, &config, dependency, simple_require).await
        }
        Commands::Fetch { package_json, out } => {
            let project_dir = package_json.parent().unwrap_or_else(|| Path::new("."));
            let config = overrides.resolve(project_dir)?;
            fetch_command(&package_json, out.as_deref(), &config).await
        }
        Commands::Build { project, out, entry } => {
            let config = overrides.resolve(&project)?;
            build_command(&project, out, entry.as_deref(), config).await
        }
    }
}

struct Overrides {
    config: Option<PathBuf>,
    workers: Option<usize>,
}

impl Overrides {
    /// Loads `--config` or the project's kiln.toml, then applies flags.
    fn resolve(&self, project_dir: &Path) -> Result<KilnConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path).with_context(|| format!("loading {}", path.display()))?,
            None => load_config(project_dir)?,
        };
        if let Some(workers) = self.workers {
            config.workers.count = workers;
            validate_config(&config)?;
        }
        Ok(config)
    }
}

fn lex_command(input: &Path, positions: bool) -> Result<ExitCode> {
    let source = read_source_file(input)?;
    let filename = input.to_string_lossy().to_string();

    let tokens = Lexer::new(&source).tokenize();

    println!("Tokens for {}:\n", filename);
    println!("{}", "=".repeat(80));

    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Eof {
            println!("\n{:4} | {:?}", i, token.kind);
            break;
        }

        if positions {
            println!(
                "{:4} | {:20?} | {:?} | {}..{}",
                i, token.kind, token.value, token.span.start, token.span.end
            );
        } else {
            println!("{:4} | {:20?} | {:?}", i, token.kind, token.value);
        }
    }

    println!("{}", "=".repeat(80));
    println!("\nTotal tokens: {}", tokens.len());

    let error_count = tokens.iter().filter(|t| t.kind == TokenKind::Error).count();
    if error_count > 0 {
        println!("\nLexer errors found: {}", error_count);
        report_lexer_errors(&tokens, &filename, &source)?;
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

fn parse_command(input: &Path) -> Result<ExitCode> {
    let source = read_source_file(input)?;
    let filename = input.to_string_lossy().to_string();

    match kiln_parser::parse(&source) {
        Ok(program) => {
            println!("{:#?}", program);
            Ok(ExitCode::SUCCESS)
        }
        Err(errors) => {
            for err in &errors {
                report_error("E1000", "Parse error", &err.message, err.span.start, err.span.end, &filename, &source)?;
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn rewrite_command(input: &Path) -> Result<ExitCode> {
    let source = read_source_file(input)?;
    let filename = input.to_string_lossy().to_string();

    match kiln_rewrite::rewrite(&source) {
        Ok(output) => {
            print!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Err(RewriteError::Parse { message, span }) => {
            report_error("E1000", "Parse error", &message, span.start, span.end, &filename, &source)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn transpile_command(
    input: &Path,
    config: &KilnConfig,
    dependency: bool,
    simple_require: bool,
) -> Result<ExitCode> {
    let source = read_source_file(input)?;
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "index.js".to_string());
    let module_path = if dependency {
        format!("{}/{}", config.transpile.dependency_root.trim_end_matches('/'), file_name)
    } else {
        format!("/{}", file_name)
    };

    let orchestrator = create_orchestrator(config);
    let options = LoaderOptions {
        simple_require,
        ..LoaderOptions::default()
    };
    let mut ctx = LoaderContext::new(module_path, options);

    match orchestrator.transpile(&source, &mut ctx).await {
        Ok(code) => {
            println!("{}", code);
            for dependency in ctx.dependencies() {
                eprintln!("{} -> {}", ctx.path(), dependency);
            }
            for directory in ctx.directory_dependencies() {
                eprintln!("{} -> {}/*", ctx.path(), directory);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn fetch_command(package_json: &Path, out: Option<&Path>, config: &KilnConfig) -> Result<ExitCode> {
    let package = parse_package_json(package_json)?;
    let ranges: RangeMap = package.dependencies.clone();

    let client = PackagerClient::new(config.packager.packager_config()).with_policy(config.packager.retry_policy());
    let Some(manifest) = client.fetch(&ranges).await? else {
        println!("No dependencies to fetch");
        return Ok(ExitCode::SUCCESS);
    };

    match out {
        Some(out) => {
            let json = serde_json::to_string_pretty(manifest.as_ref())?;
            fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
            println!("Manifest written to: {}", out.display());
        }
        None => {
            for dependency in &manifest.dependencies {
                println!("{}@{}", dependency.name, dependency.version);
            }
            println!("\n{} files", manifest.file_count());
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn build_command(
    project: &Path,
    out: Option<PathBuf>,
    entry: Option<&str>,
    config: KilnConfig,
) -> Result<ExitCode> {
    let out_dir = out.unwrap_or_else(|| default_out_dir(project));
    let builder = ProjectBuilder::new(config);

    let report = builder
        .build(project, entry)
        .await
        .with_context(|| format!("building {}", project.display()))?;

    let written = report.write_to(&out_dir).await?;
    println!("{} modules written to: {}", written, out_dir.display());

    let mut failed = false;
    for node in report.graph.failed_modules() {
        failed = true;
        for error in &node.errors {
            eprintln!("{}: {}", node.path, error);
        }
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

// Helper functions

fn read_source_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn report_lexer_errors(tokens: &[Token], filename: &str, source: &str) -> io::Result<()> {
    for token in tokens.iter().filter(|t| t.kind == TokenKind::Error) {
        report_error(
            "E0001",
            "Lexical error",
            &token.value,
            token.span.start,
            token.span.end,
            filename,
            source,
        )?;
    }
    Ok(())
}

fn report_error(
    code: &str,
    title: &str,
    message: &str,
    start: usize,
    end: usize,
    filename: &str,
    source: &str,
) -> io::Result<()> {
    let span = (filename, start..end);
    Report::build(ReportKind::Error, span.clone())
        .with_code(code)
        .with_message(title)
        .with_label(Label::new(span).with_message(message).with_color(Color::Red))
        .finish()
        .print((filename, Source::from(source)))
}
