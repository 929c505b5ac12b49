//! Skim Guard CLI
//!
//! Command-line front end for field inspections: score a terminal,
//! watch a live emitter feed, review stored evidence and push
//! confirmed records out of the device.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use skim_guard::{
    classify::{ClassifiedEmitter, ThreatClassifier},
    config::FileConfig,
    custody::{CustodyAuthority, OutboxTransport},
    metrics::{ActivityCounters, MetricsRegistry, MetricsSnapshot},
    record::{DetectionRecord, DetectionStatus},
    risk::{AnalysisResult, RiskEngine},
    scan::{CaptureResult, EmitterObservation, Environment, GeoLocation, InspectionChecklist},
    signal::ObservationTracker,
    vault::{EvidenceVault, FileKeyProvider, RecordEntry},
};
use std::error::Error;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{info, warn};

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "skim-guard", version, about = "Payment-terminal skimmer assessment and evidence custody")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the vault data directory from the configuration.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score one inspection and optionally store it as evidence.
    Assess(AssessArgs),
    /// Classify a live JSON-lines emitter feed from stdin until EOF or Ctrl-C.
    Scan {
        #[arg(short, long)]
        environment: Option<Environment>,
        /// Show unmatched emitters as unverified instead of hiding them.
        #[arg(long)]
        audit: bool,
        /// Refresh interval in milliseconds.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// List stored records, most recent first.
    List,
    /// Change the custody status of a record.
    Status {
        id: String,
        status: DetectionStatus,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Print the disclosable form of a confirmed record.
    Export { id: String },
    /// Push queued, confirmed records to the outbox.
    Sync {
        #[arg(long)]
        outbox: Option<PathBuf>,
    },
    /// Print vault statistics.
    Stats,
    /// Print vault, assessment and sync metrics in Prometheus text format.
    Metrics,
}

#[derive(Args)]
struct AssessArgs {
    #[arg(short, long)]
    environment: Option<Environment>,

    #[arg(long)]
    loose_parts: bool,
    #[arg(long)]
    mismatched_colors: bool,
    #[arg(long)]
    hidden_camera: bool,
    #[arg(long)]
    keypad_obstruction: bool,
    /// Operator noticed a suspicious wireless signal.
    #[arg(long)]
    bluetooth_signal: bool,

    /// JSON-lines file of emitter observations.
    #[arg(long)]
    observations: Option<PathBuf>,
    /// Emitter ids the operator flags as threats regardless of name.
    #[arg(long = "flag")]
    flagged: Vec<String>,
    #[arg(long)]
    audit: bool,

    /// JPEG snapshot of the terminal.
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long, requires = "longitude")]
    latitude: Option<f64>,
    #[arg(long, requires = "latitude")]
    longitude: Option<f64>,
    #[arg(long)]
    accuracy: Option<f64>,

    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    device_type: Option<String>,

    /// Store the result in the evidence vault.
    #[arg(long)]
    save: bool,
}

/// Observation line as produced by the radio collaborator. The timestamp
/// is optional; missing ones are stamped on arrival.
#[derive(Deserialize)]
struct FeedLine {
    id: String,
    #[serde(default)]
    name: String,
    rssi: i32,
    #[serde(default)]
    timestamp: Option<i64>,
}

impl FeedLine {
    fn into_observation(self) -> EmitterObservation {
        let mut observation = EmitterObservation::new(self.id, self.name, self.rssi);
        if let Some(ts) = self.timestamp.and_then(DateTime::<Utc>::from_timestamp_millis) {
            observation.timestamp = ts;
        }
        observation
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Skim Guard v{}", skim_guard::VERSION);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.vault.data_dir = dir;
        config.vault.validate()?;
    }

    match cli.command {
        Command::Assess(args) => assess(&config, args),
        Command::Scan {
            environment,
            audit,
            interval_ms,
        } => scan(
            &config,
            environment.unwrap_or(config.scan.environment),
            audit,
            Duration::from_millis(interval_ms),
        ),
        Command::List => list(&open_authority(&config)?),
        Command::Status { id, status, notes } => {
            let record = open_authority(&config)?.update_status(&id, status, notes)?;
            println!("{} {}", record.id, record.status);
            Ok(())
        }
        Command::Export { id } => {
            let disclosed = open_authority(&config)?.export(&id)?;
            println!("{}", serde_json::to_string_pretty(&disclosed)?);
            Ok(())
        }
        Command::Sync { outbox } => {
            let authority = open_authority(&config)?;
            let transport = OutboxTransport::new(outbox.unwrap_or_else(|| config.vault.outbox_path()))?;
            let report = authority.drain_sync_queue(&transport)?;
            note_activity(&config, |c| c.record_sync(&report));
            println!(
                "uploaded {}, failed {}, withheld {}, superseded {}",
                report.uploaded, report.failed, report.withheld, report.superseded
            );
            Ok(())
        }
        Command::Stats => {
            let stats = open_authority(&config)?.stats()?;
            println!("total:        {}", stats.total);
            println!("high risk:    {}", stats.high_risk);
            println!("confirmed:    {}", stats.confirmed);
            println!("pending sync: {}", stats.pending_sync);
            println!("corrupted:    {}", stats.corrupted);
            Ok(())
        }
        Command::Metrics => {
            let stats = open_authority(&config)?.stats()?;
            let registry = MetricsRegistry::new()?;
            registry.update(&MetricsSnapshot::from(stats));
            registry.update_activity(&ActivityCounters::load(config.vault.metrics_path())?);
            print!("{}", registry.encode()?);
            Ok(())
        }
    }
}

fn open_authority(config: &FileConfig) -> CliResult<CustodyAuthority> {
    let keys = FileKeyProvider::new(config.vault.key_path());
    let vault = EvidenceVault::open(&config.vault.data_dir, &keys, config.vault.hash_algorithm)?;
    Ok(CustodyAuthority::new(vault).with_suspicion_threshold(config.scoring.suspicion_threshold))
}

/// Folds one event into the persisted counters. A failure here never fails
/// the command that produced the event.
fn note_activity(config: &FileConfig, change: impl FnOnce(&mut ActivityCounters)) {
    let path = config.vault.metrics_path();
    if let Err(e) = ActivityCounters::amend(&path, change) {
        warn!(path = %path.display(), error = %e, "Could not update activity counters");
    }
}

fn build_classifier(config: &FileConfig, audit: bool) -> CliResult<ThreatClassifier> {
    let mut classifier_config = config.classifier.clone();
    if audit {
        classifier_config.smart_filter = false;
    }
    Ok(ThreatClassifier::new(classifier_config)?)
}

fn assess(config: &FileConfig, args: AssessArgs) -> CliResult {
    let environment = args.environment.unwrap_or(config.scan.environment);
    let classifier = build_classifier(config, args.audit)?;
    let engine = RiskEngine::new(config.scoring.clone());

    let mut tracker = ObservationTracker::new();
    if let Some(path) = &args.observations {
        let file = std::io::BufReader::new(std::fs::File::open(path)?);
        for line in file.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: FeedLine = serde_json::from_str(&line)?;
            tracker.observe(parsed.into_observation());
        }
    }

    let observations = tracker.snapshot();
    let mut emitters = Vec::with_capacity(observations.len());
    for observation in observations {
        if args.flagged.contains(&observation.id) {
            emitters.push(ClassifiedEmitter::operator_flagged(observation, "Operator Flagged"));
        } else if let Some(classified) = classifier.classify_observation(&observation, environment) {
            emitters.push(classified);
        }
    }

    let checklist = InspectionChecklist {
        loose_parts: args.loose_parts,
        mismatched_colors: args.mismatched_colors,
        hidden_camera: args.hidden_camera,
        keypad_obstruction: args.keypad_obstruction,
        bluetooth_signal: args.bluetooth_signal,
    };
    let analysis = engine.score(checklist, emitters, environment);
    note_activity(config, |c| c.record_assessment(&analysis));
    print_analysis(&analysis);

    if !args.save {
        return Ok(());
    }

    let image_data = match &args.image {
        Some(path) => format!("data:image/jpeg;base64,{}", BASE64.encode(std::fs::read(path)?)),
        None => String::new(),
    };
    let mut capture = CaptureResult::new(image_data);
    if let (Some(latitude), Some(longitude)) = (args.latitude, args.longitude) {
        capture = capture.with_location(GeoLocation {
            latitude,
            longitude,
            accuracy: args.accuracy,
        });
    }

    let mut record = DetectionRecord::new(capture, analysis);
    record.notes = args.notes;
    record.device_type = args.device_type;

    let id = open_authority(config)?.submit(record)?;
    println!("stored {}", id);
    Ok(())
}

fn print_analysis(analysis: &AnalysisResult) {
    println!(
        "risk score {} ({}) in {}",
        analysis.risk_score,
        if analysis.is_suspicious { "SUSPICIOUS" } else { "clear" },
        analysis.environment
    );
    for emitter in &analysis.detected_devices {
        print_emitter(emitter);
    }
}

fn print_emitter(emitter: &ClassifiedEmitter) {
    println!(
        "  {:<24} {:>4} dBm  {:?}/{:?}  {}",
        emitter.observation.name,
        emitter.rssi(),
        emitter.method(),
        emitter.tier(),
        emitter.classification.label().unwrap_or("-"),
    );
}

fn scan(config: &FileConfig, environment: Environment, audit: bool, interval: Duration) -> CliResult {
    let classifier = build_classifier(config, audit)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    // Stdin reader feeds the tracker through a channel so the display loop
    // never blocks on input.
    let (tx, rx) = mpsc::channel::<EmitterObservation>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FeedLine>(&line) {
                Ok(parsed) => {
                    if tx.send(parsed.into_observation()).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Skipping malformed observation line"),
            }
        }
    });

    info!(environment = %environment, "Scan started, Ctrl-C to stop");

    let mut tracker = ObservationTracker::new();
    loop {
        let (consumed, disconnected) = tracker.drain(&rx);
        if consumed > 0 {
            let threats = classifier.classify_all(&tracker.snapshot(), environment);
            println!("-- {} emitters, {} reported", tracker.len(), threats.len());
            threats.iter().for_each(print_emitter);
        }
        if disconnected || !running.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(interval);
    }

    info!(emitters = tracker.len(), "Scan stopped");
    Ok(())
}

fn list(authority: &CustodyAuthority) -> CliResult {
    for entry in authority.list_detections()? {
        match entry {
            RecordEntry::Intact(record) => println!(
                "{}  {}  {:<9}  score {:>3}{}  sync {:?}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.id,
                record.status.as_str(),
                record.analysis.risk_score,
                if record.analysis.is_suspicious { "!" } else { " " },
                record.sync_status,
            ),
            RecordEntry::Corrupted(c) => println!(
                "{}  {}  CORRUPTED  {}",
                c.timestamp_ms
                    .and_then(DateTime::<Utc>::from_timestamp_millis)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "????-??-?? ??:??:??".to_string()),
                c.id,
                c.reason
            ),
        }
    }
    Ok(())
}
