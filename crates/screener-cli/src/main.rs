//! Screener command-line interface.
//!
//! ```text
//! screener evaluate --job job.txt resumes/*.pdf
//! screener evaluate --job-text "Junior Rust developer" --format json cv.png
//! screener decode reply.txt
//! screener providers
//! ```

mod report;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{BufRead, IsTerminal, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use screener_core::{decode_response_with, mime_for_path, DecodeOptions, DecodeStrategy, ResumeFile};
use screener_runtime::{
    ApiCredential, CredentialSource, ProviderRegistry, Screener, ScreenerConfig,
};

use report::Report;

#[derive(Parser)]
#[command(name = "screener", version)]
#[command(about = "Screen resumes against a job description with a multimodal LLM")]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate resumes (images or PDFs) against a job description
    Evaluate(EvaluateArgs),
    /// Decode a saved model reply without calling the model
    Decode(DecodeArgs),
    /// List model providers and their default configuration
    Providers,
}

#[derive(Args)]
struct EvaluateArgs {
    /// File holding the job description ("-" for stdin)
    #[arg(long, required_unless_present = "job_text", conflicts_with = "job_text")]
    job: Option<PathBuf>,

    /// Job description given inline
    #[arg(long)]
    job_text: Option<String>,

    /// YAML or JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum files evaluated at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Reply format requested from the model
    #[arg(long, value_enum)]
    response_format: Option<ResponseFormat>,

    /// Keep a copy of each normalized image in this directory
    #[arg(long)]
    save_normalized: Option<PathBuf>,

    /// Read the API key from stdin: a hidden prompt at a terminal, otherwise the first line
    #[arg(long)]
    api_key_stdin: bool,

    /// Resume files
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct DecodeArgs {
    /// File holding the reply (stdin when omitted or "-")
    input: Option<PathBuf>,

    /// Reject out-of-range ratings or percentage
    #[arg(long)]
    strict: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ResponseFormat {
    Json,
    Tuple,
    Lines,
}

impl From<ResponseFormat> for DecodeStrategy {
    fn from(value: ResponseFormat) -> Self {
        match value {
            ResponseFormat::Json => DecodeStrategy::Json,
            ResponseFormat::Tuple => DecodeStrategy::Tuple,
            ResponseFormat::Lines => DecodeStrategy::Lines,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Evaluate(args) => evaluate(args).await,
        Command::Decode(args) => decode(args),
        Command::Providers => providers(),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,screener={level},screener_core={level},screener_runtime={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn evaluate(args: EvaluateArgs) -> Result<()> {
    let job_from_stdin = args.job.as_deref() == Some(Path::new("-"));
    if job_from_stdin && args.api_key_stdin {
        bail!("--job - and --api-key-stdin cannot both read stdin");
    }

    let mut config = match &args.config {
        Some(path) => ScreenerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScreenerConfig::default(),
    };
    if let Some(n) = args.concurrency {
        config.max_concurrency = n;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(format) = args.response_format {
        config.response_format = format.into();
    }
    config.validate().context("Invalid configuration")?;

    let job_description = match (&args.job, args.job_text) {
        (_, Some(text)) => text,
        (Some(path), None) => read_text(path)?,
        (None, None) => bail!("a job description is required (--job or --job-text)"),
    };
    if job_description.trim().is_empty() {
        bail!("job description is empty");
    }

    let credential = if args.api_key_stdin {
        Some(ApiCredential::new(
            read_api_key()?,
            CredentialSource::Interactive,
            "API key",
        ))
    } else {
        None
    };

    let provider = ProviderRegistry::with_defaults()
        .create(&config.provider, &config.provider_config, credential)
        .context("Failed to set up model provider")?;

    let files = args
        .files
        .iter()
        .map(|path| read_resume(path))
        .collect::<Result<Vec<_>>>()?;

    let model = config.model.clone();
    let mut builder = Screener::builder().provider(provider).config(config);
    if let Some(dir) = args.save_normalized {
        builder = builder.save_normalized(dir);
    }
    let screener = builder.build()?;
    screener.check_provider().await?;

    let results = screener.screen(files, &job_description).await;
    let report = Report::new(model, results);

    match args.format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if report.summary.failed > 0 {
        tracing::warn!(
            failed = report.summary.failed,
            total = report.summary.total,
            "Some resumes could not be evaluated"
        );
    }
    Ok(())
}

fn decode(args: DecodeArgs) -> Result<()> {
    let text = match &args.input {
        Some(path) => read_text(path)?,
        None => read_text(Path::new("-"))?,
    };

    let options = DecodeOptions {
        strict_ranges: args.strict,
    };
    let record = decode_response_with(&text, options).context("Could not decode reply")?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn providers() -> Result<()> {
    for info in ProviderRegistry::with_defaults().catalog() {
        println!("{}: {}", info.provider_type, info.description);
        println!("  default provider_config: {}", info.default_config);
    }
    Ok(())
}

/// At a terminal the key is typed without echo.
fn read_api_key() -> Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return rpassword::prompt_password("API key: ").context("Failed to read API key");
    }
    read_first_line(stdin.lock())
}

fn read_first_line(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read API key from stdin")?;
    Ok(line)
}

fn read_text(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Unknown extensions are passed through so the file is reported as
/// unsupported instead of aborting the run.
fn read_resume(path: &Path) -> Result<ResumeFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read resume {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime = mime_for_path(path).unwrap_or("application/octet-stream");
    Ok(ResumeFile::new(name, mime, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_evaluate_requires_job_and_files() {
        assert!(Cli::try_parse_from(["screener", "evaluate", "cv.pdf"]).is_err());
        assert!(Cli::try_parse_from(["screener", "evaluate", "--job-text", "Rust dev"]).is_err());
        assert!(Cli::try_parse_from([
            "screener", "evaluate", "--job", "job.txt", "--job-text", "x", "cv.pdf"
        ])
        .is_err());
    }

    #[test]
    fn test_evaluate_parses_overrides() {
        let cli = Cli::try_parse_from([
            "screener",
            "-v",
            "evaluate",
            "--job-text",
            "Rust dev",
            "--concurrency",
            "2",
            "--response-format",
            "tuple",
            "--format",
            "json",
            "a.pdf",
            "b.png",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Command::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(args.concurrency, Some(2));
        assert_eq!(args.files.len(), 2);
        assert!(matches!(args.format, OutputFormat::Json));
        assert_eq!(
            DecodeStrategy::from(args.response_format.unwrap()),
            DecodeStrategy::Tuple
        );
    }

    #[test]
    fn test_read_resume_unknown_extension() {
        let path = std::env::temp_dir().join(format!("screener-cli-{}.docx", std::process::id()));
        std::fs::write(&path, b"not really docx").unwrap();

        let file = read_resume(&path).unwrap();
        assert_eq!(file.mime, "application/octet-stream");
        assert!(file.name.ends_with(".docx"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_providers_subcommand_parses() {
        let cli = Cli::try_parse_from(["screener", "providers"]).unwrap();
        assert!(matches!(cli.command, Command::Providers));
    }

    #[test]
    fn test_piped_api_key_reads_first_line_only() {
        let input = std::io::Cursor::new("  AIzaSyD-piped-key  \nsecond line\n");
        let line = read_first_line(input).unwrap();

        let credential = ApiCredential::new(line, CredentialSource::Interactive, "API key");
        assert_eq!(credential.expose(), "AIzaSyD-piped-key");
        assert!(!format!("{:?}", credential).contains("piped"));
    }

    #[test]
    fn test_read_resume_missing_file_is_error() {
        assert!(read_resume(Path::new("/definitely/not/here.pdf")).is_err());
    }
}
