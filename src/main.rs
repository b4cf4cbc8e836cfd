// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use voxvision::app_config::{self, Config, RemoteStrategy};
use voxvision::app_controller::{Controller, RunOptions};

/// CLI Wrapper for RemoteStrategy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliRemoteStrategy {
    Vision,
    Job,
    None,
}

impl From<CliRemoteStrategy> for RemoteStrategy {
    fn from(cli_strategy: CliRemoteStrategy) -> Self {
        match cli_strategy {
            CliRemoteStrategy::Vision => RemoteStrategy::Vision,
            CliRemoteStrategy::Job => RemoteStrategy::Job,
            CliRemoteStrategy::None => RemoteStrategy::None,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a document or image to speech (default command)
    Convert(ConvertArgs),

    /// Generate shell completions for voxvision
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input file (txt, pdf, png, jpg) or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    #[command(flatten)]
    options: ConvertOptions,
}

#[derive(clap::Args, Debug, Clone)]
struct ConvertOptions {
    /// Output directory (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Write the transcript and stop before language detection
    #[arg(long)]
    transcript_only: bool,

    /// Also write the transcript next to the audio
    #[arg(long)]
    save_transcript: bool,

    /// Remote image description strategy
    #[arg(long, value_enum)]
    remote: Option<CliRemoteStrategy>,

    /// Disable the local OCR fallback
    #[arg(long)]
    no_ocr: bool,
}

/// VoxVision - documents and images to speech
///
/// Extracts the text of a document, describes its images, detects the
/// language and synthesizes an MP3 narration.
#[derive(Parser, Debug)]
#[command(name = "voxvision")]
#[command(version)]
#[command(about = "Turn documents and images into spoken audio")]
#[command(long_about = "VoxVision extracts text from plain text, PDF and image files, describes embedded images, detects the language and narrates the result as MP3.

EXAMPLES:
    voxvision report.pdf                          # Convert using default config
    voxvision -f report.pdf                       # Force overwrite existing files
    voxvision convert scan.png -o out/            # Write outputs into out/
    voxvision convert notes.pdf --transcript-only # Only write notes.transcript.txt
    voxvision convert docs/ --remote none         # Describe images with local OCR only
    voxvision completions bash > voxvision.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. Empty API keys are read from GROQ_API_KEY,
    OPENAI_API_KEY, ANTHROPIC_API_KEY and VOXVISION_JOB_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    #[command(flatten)]
    options: ConvertOptions,
}

// @struct: Custom logger implementation, filtered by the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color prefix for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "voxvision", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Convert(args)) => run_convert(args).await,
        None => {
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("INPUT_PATH is required when no subcommand is specified")
            })?;
            run_convert(ConvertArgs { input_path, options: cli.options }).await
        }
    }
}

async fn run_convert(args: ConvertArgs) -> Result<()> {
    let options = args.options;

    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(Path::new(&options.config_path))?;

    // Override config with CLI options if provided
    if let Some(remote) = &options.remote {
        config.description.remote = remote.clone().into();
    }
    if options.no_ocr {
        config.description.ocr.enabled = false;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    // Transcript-only runs never reach detection or synthesis
    if !options.transcript_only {
        config.validate()
            .context("Configuration validation failed")?;
    }

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;
    let run_options = RunOptions {
        force_overwrite: options.force_overwrite,
        transcript_only: options.transcript_only,
        save_transcript: options.save_transcript,
    };

    let input_path = args.input_path;
    if input_path.is_file() {
        let output_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| {
                input_path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."))
                    .to_path_buf()
            });
        controller.run(input_path, output_dir, &run_options).await?;
    } else if input_path.is_dir() {
        controller.run_folder(input_path, options.output_dir.clone(), &run_options).await?;
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    Ok(())
}
