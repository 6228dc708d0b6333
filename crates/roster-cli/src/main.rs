use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use roster_core::{parse_tolerance, FrameSource, MatchPolicy, RawImage};
use roster_engine::{
    prefill_name, CheckInService, CommandExtractor, CommandLine, CommandRecognizer,
    EnrollmentService, IdentifyService,
};
use roster_hw::{Camera, StillImage};
use roster_store::{EmbeddingStore, Ledger};
use std::path::PathBuf;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "roster", about = "Face-verified attendance")]
struct Cli {
    /// Database path (overrides config and ROSTER_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Maximum embedding distance accepted as a match
    #[arg(long, global = true, value_parser = parse_tolerance)]
    tolerance: Option<f64>,
    /// Registry-wide match policy: first or nearest
    #[arg(long, global = true)]
    policy: Option<MatchPolicy>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct NameArgs {
    /// Name to enroll or check in
    #[arg(short, long)]
    name: Option<String>,
    /// Read the name from a handwriting image via the OCR program
    #[arg(long, value_name = "IMG")]
    name_from: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll (or re-enroll) a face under a name
    Enroll {
        #[command(flatten)]
        who: NameArgs,
        /// Use a still image instead of the camera
        #[arg(long, value_name = "IMG")]
        image: Option<PathBuf>,
    },
    /// Verify a face against its enrolled name and record attendance
    Checkin {
        #[command(flatten)]
        who: NameArgs,
        /// Where the check-in happened (default from config)
        #[arg(short, long)]
        location: Option<String>,
        /// Use a still image instead of the camera
        #[arg(long, value_name = "IMG")]
        image: Option<PathBuf>,
    },
    /// Find which enrolled identity the current face belongs to
    Identify {
        /// Use a still image instead of the camera
        #[arg(long, value_name = "IMG")]
        image: Option<PathBuf>,
    },
    /// List enrolled identities
    List,
    /// Remove an enrolled identity (ledger history is kept)
    Remove {
        name: String,
    },
    /// Show recorded check-ins
    Log {
        /// Only this identity
        #[arg(short, long)]
        name: Option<String>,
        /// Show at most this many, newest last
        #[arg(short = 'k', long)]
        limit: Option<usize>,
    },
    /// Show configuration and store status
    Status,
    /// Run camera diagnostics
    Test,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(tolerance) = cli.tolerance {
        config.tolerance = tolerance;
    }
    if let Some(policy) = cli.policy {
        config.match_policy = policy;
    }
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Enroll { who, image } => {
            let name = resolve_name(&config, who)?;
            let mut store = open_store(&config)?;
            let mut source = frame_source(&config, image);

            let identity = EnrollmentService::new(&mut store, extractor(&config)?)
                .enroll(&name, source.as_mut())?;
            println!("Enrolled {}", identity.name);
        }
        Commands::Checkin {
            who,
            location,
            image,
        } => {
            let name = resolve_name(&config, who)?;
            let store = open_store(&config)?;
            let mut ledger = open_ledger(&config)?;
            let mut source = frame_source(&config, image);

            let event = CheckInService::new(&store, &mut ledger, extractor(&config)?)
                .with_tolerance(config.tolerance)
                .with_default_location(config.default_location.clone())
                .check_in(&name, source.as_mut(), location.as_deref())?;
            println!(
                "{} checked in at {} ({})",
                event.identity, event.timestamp, event.location
            );
        }
        Commands::Identify { image } => {
            let store = open_store(&config)?;
            let mut source = frame_source(&config, image);

            let found = IdentifyService::new(&store, extractor(&config)?)
                .with_tolerance(config.tolerance)
                .with_policy(config.match_policy)
                .identify(source.as_mut())?;
            match found {
                Some(m) => println!("{} (distance {:.3})", m.name, m.distance),
                None => println!("No enrolled identity matches"),
            }
        }
        Commands::List => {
            let store = open_store(&config)?;
            if store.is_empty() {
                println!("No identities enrolled");
            }
            for name in store.names() {
                println!("{name}");
            }
        }
        Commands::Remove { name } => {
            let mut store = open_store(&config)?;
            if store.remove(&name)? {
                println!("Removed {name}");
            } else {
                bail!("'{name}' is not enrolled");
            }
        }
        Commands::Log { name, limit } => {
            let ledger = open_ledger(&config)?;
            let mut events = match &name {
                Some(n) => ledger.entries_for(n)?,
                None => match limit {
                    Some(k) => ledger.recent(k)?,
                    None => ledger.entries()?,
                },
            };
            if let (Some(_), Some(k)) = (&name, limit) {
                let skip = events.len().saturating_sub(k);
                events.drain(..skip);
            }
            if events.is_empty() {
                println!("No check-ins recorded");
            }
            for e in events {
                println!("{:>6}  {}  {:<20}  {}", e.id, e.timestamp, e.identity, e.location);
            }
        }
        Commands::Status => {
            let store = open_store(&config)?;
            let ledger = open_ledger(&config)?;
            let status = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "db_path": config.db_path.display().to_string(),
                "identities": store.len(),
                "checkins": ledger.len()?,
                "embedding_dim": store.dim(),
                "tolerance": config.tolerance,
                "match_policy": config.match_policy.to_string(),
                "camera": config.camera_device,
                "camera_present": std::path::Path::new(&config.camera_device).exists(),
                "extractor_configured": config.extractor_cmd.is_some(),
                "ocr_configured": config.ocr_cmd.is_some(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Test => {
            println!("Running camera diagnostics...");
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No V4L2 capture devices found");
            }
            for d in &devices {
                println!("{}  {} ({}, {})", d.path, d.name, d.driver, d.bus);
            }

            let mut camera = Camera::new(config.camera_device.clone(), config.warmup_frames);
            let frame = camera
                .capture_frame()
                .with_context(|| format!("capturing from {}", config.camera_device))?;
            println!(
                "Captured {}x{} frame from {}, mean brightness {:.1}",
                frame.width,
                frame.height,
                config.camera_device,
                mean_brightness(&frame)
            );
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<EmbeddingStore> {
    EmbeddingStore::open(&config.db_path, config.embedding_dim)
        .with_context(|| format!("opening identities in {}", config.db_path.display()))
}

fn open_ledger(config: &Config) -> Result<Ledger> {
    Ledger::open(&config.db_path)
        .with_context(|| format!("opening ledger in {}", config.db_path.display()))
}

fn frame_source(config: &Config, image: Option<PathBuf>) -> Box<dyn FrameSource> {
    match image {
        Some(path) => Box::new(StillImage::new(path)),
        None => Box::new(Camera::new(config.camera_device.clone(), config.warmup_frames)),
    }
}

fn extractor(config: &Config) -> Result<CommandExtractor> {
    let line = config
        .extractor_cmd
        .as_deref()
        .and_then(CommandLine::parse)
        .ok_or(roster_core::ExtractError::NotConfigured)
        .context("set extractor_cmd in the config file or ROSTER_EXTRACTOR_CMD")?;
    Ok(CommandExtractor::new(line))
}

/// `--name` wins; otherwise read the name from a handwriting image.
fn resolve_name(config: &Config, who: NameArgs) -> Result<String> {
    if let Some(name) = who.name {
        return Ok(name);
    }
    let path = who
        .name_from
        .ok_or_else(|| anyhow!("pass --name or --name-from"))?;

    let image = roster_hw::load_image(&path)?;
    let suggested = match config.ocr_cmd.as_deref().and_then(CommandLine::parse) {
        Some(line) => prefill_name(&mut CommandRecognizer::new(line), &image),
        None => {
            tracing::warn!(error = %roster_core::RecognizeError::NotConfigured, "cannot read name from image");
            None
        }
    };

    match suggested {
        Some(name) => {
            println!("Recognized name: {name}");
            Ok(name)
        }
        None => bail!(
            "could not read a name from {}; pass --name instead",
            path.display()
        ),
    }
}

fn mean_brightness(frame: &RawImage) -> f32 {
    if frame.data.is_empty() {
        return 0.0;
    }
    frame.data.iter().map(|&b| b as f32).sum::<f32>() / frame.data.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_checkin_requires_a_name_source() {
        assert!(Cli::try_parse_from(["roster", "checkin"]).is_err());
        assert!(Cli::try_parse_from(["roster", "checkin", "-n", "A", "--name-from", "x.png"]).is_err());
        let cli = Cli::try_parse_from(["roster", "checkin", "-n", "Alice", "-l", "lab"]).unwrap();
        match cli.command {
            Commands::Checkin { who, location, image } => {
                assert_eq!(who.name.as_deref(), Some("Alice"));
                assert_eq!(location.as_deref(), Some("lab"));
                assert!(image.is_none());
            }
            _ => panic!("expected checkin"),
        }
    }

    #[test]
    fn test_global_policy_flag() {
        let cli = Cli::try_parse_from(["roster", "identify", "--policy", "nearest"]).unwrap();
        assert_eq!(cli.policy, Some(MatchPolicy::Nearest));
    }

    #[test]
    fn test_tolerance_flag_rejects_nan_and_negative() {
        let cli = Cli::try_parse_from(["roster", "list", "--tolerance", "0.4"]).unwrap();
        assert_eq!(cli.tolerance, Some(0.4));
        for bad in ["NaN", "inf", "-0.5"] {
            assert!(
                Cli::try_parse_from(["roster", "list", "--tolerance", bad]).is_err(),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn test_policy_flag_rejects_alias() {
        assert!(Cli::try_parse_from(["roster", "identify", "--policy", "best"]).is_err());
    }
}
