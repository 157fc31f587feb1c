mod display;

use std::path::PathBuf;

use clap::{Args, Parser};
use log::debug;
use simplelog::ColorChoice;

use crate::{
    checksum::ChecksumAlgorithm,
    config::{Config, ConfigError},
    coordinate::{ArtifactCoordinate, CoordinateError},
    pipeline::{InstallRequest, Pipeline},
};

use display::DisplayManager;

/// Installed when no coordinate is given.
pub const DEFAULT_COORDINATE: &str = "io.zipkin.java:zipkin-server:LATEST:exec";
pub const DEFAULT_TARGET: &str = "zipkin.jar";

/// Global output flags
#[derive(Debug, Clone, Copy, Args)]
pub struct GlobalFlags {
    #[arg(short, long, action = clap::ArgAction::Count, default_value_t = 0)]
    /// Verbosity level
    pub verbosity: u8,
    /// Enable debug output and write a log file
    #[arg(long, default_value_t = false)]
    pub debug: bool,
    /// Disable color output
    #[arg(long, default_value_t = false)]
    pub no_color: bool,
}

impl GlobalFlags {
    /// `--debug` counts as the highest verbosity.
    pub fn effective_verbosity(&self) -> u8 {
        if self.debug {
            self.verbosity.max(2)
        } else {
            self.verbosity
        }
    }
}

/// Downloads a Maven artifact and verifies its checksum and signature.
///
/// Without arguments the latest Zipkin server is installed to ./zipkin.jar.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    /// Artifact to install, GROUP:ARTIFACT:VERSION[:CLASSIFIER]; VERSION may be LATEST
    #[arg(requires = "target")]
    pub coordinate: Option<ArtifactCoordinate>,
    /// File or directory to write the artifact to
    #[arg(requires = "coordinate", value_parser = clap::value_parser!(PathBuf))]
    pub target: Option<PathBuf>,
    #[command(flatten)]
    pub global: GlobalFlags,
    /// Configuration file
    #[arg(short, long, value_parser = clap::value_parser!(PathBuf))]
    pub config: Option<PathBuf>,
    /// Timeout in seconds for each HTTP request
    #[arg(short, long)]
    pub timeout: Option<u64>,
    /// Checksum published next to the artifact to verify against
    #[arg(short = 'a', long)]
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    /// Do not verify the checksum
    #[arg(long, default_value_t = false)]
    pub skip_checksum: bool,
    /// Do not verify signatures
    #[arg(long, default_value_t = false)]
    pub skip_signature: bool,
}

impl Cli {
    pub fn request(&self) -> Result<InstallRequest, CoordinateError> {
        let coordinate = match &self.coordinate {
            Some(coordinate) => coordinate.clone(),
            None => DEFAULT_COORDINATE.parse()?,
        };

        Ok(InstallRequest {
            coordinate,
            target: self
                .target
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET)),
        })
    }

    /// Loads the configuration file, if any, and applies flag overrides.
    pub async fn config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path).await?,
            None => Config::default(),
        };

        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(algorithm) = self.checksum_algorithm {
            config.checksum_algorithm = algorithm;
        }
        if self.skip_checksum {
            config.verify_checksum = false;
        }
        if self.skip_signature {
            config.verify_signature = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(flags: &GlobalFlags) -> anyhow::Result<()> {
    let color = if flags.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let level = match flags.effective_verbosity() {
        0 => return Ok(()),
        1 => simplelog::LevelFilter::Info,
        _ => simplelog::LevelFilter::Debug,
    };

    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![simplelog::TermLogger::new(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        color,
    )];
    if flags.debug {
        loggers.push(simplelog::WriteLogger::new(
            simplelog::LevelFilter::Debug,
            simplelog::Config::default(),
            std::fs::File::create(format!(
                "quickstart_{}.log",
                chrono::Local::now().format("%Y%m%dT%H%M%S")
            ))?,
        ));
    }

    simplelog::CombinedLogger::init(loggers)?;
    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await
    }
}

/// Runs the installer and returns the process exit code.
pub async fn cli() -> anyhow::Result<i32> {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help and version requests are printed to stdout and are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print()?;
            return Ok(code);
        }
    };

    if args.global.no_color {
        colored::control::set_override(false);
    }
    init_logging(&args.global)?;

    debug!("{:?}", args);
    let config = args.config().await?;
    let request = args.request()?;

    let display = DisplayManager::new(args.global.effective_verbosity());
    display.report_start(&request);

    let mut pipeline = Pipeline::from_config(&config)?.with_interrupt(ctrl_c);
    if let Some(reporter) = display.reporter() {
        pipeline = pipeline.with_reporter(reporter);
    }
    let outcome = pipeline.run(&request).await;
    drop(pipeline);

    display.finish(&outcome).await;
    Ok(outcome.exit_code())
}
