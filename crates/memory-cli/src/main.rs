mod console;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use memory_core::{IngestReport, Library, PlaybackStatus, Session, SessionOptions, Step};

use console::{ConsoleDisplay, LinkPlayback};

#[derive(Parser)]
#[command(
    name = "memory-machine",
    version,
    about = "Pair a song from your listening history with a photo taken the same week"
)]
struct Cli {
    /// Directory with Streams*.json listening history exports
    #[arg(long)]
    history: Option<PathBuf>,

    /// Directory with .jpg/.jpeg photos
    #[arg(long)]
    photos: Option<PathBuf>,

    /// JSON config file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Filename glob for history exports
    #[arg(long)]
    history_pattern: Option<String>,

    /// Seed the random draws for a reproducible sequence
    #[arg(long)]
    seed: Option<u64>,

    /// Playback start offset in milliseconds
    #[arg(long)]
    start_ms: Option<u64>,

    /// Maximum display width in pixels
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum display height in pixels
    #[arg(long)]
    max_height: Option<u32>,

    /// Draw this many pairs and exit instead of waiting for input
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Print each pair as a JSON line
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn options(&self) -> anyhow::Result<SessionOptions> {
        let mut options = match &self.config {
            Some(path) => SessionOptions::load(path)?,
            None => SessionOptions::default(),
        };
        if let Some(dir) = &self.history {
            options.history_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.photos {
            options.photo_dir = Some(dir.clone());
        }
        if let Some(pattern) = &self.history_pattern {
            options.history_pattern = pattern.clone();
        }
        if self.seed.is_some() {
            options.seed = self.seed;
        }
        if let Some(ms) = self.start_ms {
            options.start_offset_ms = ms;
        }
        if let Some(w) = self.max_width {
            options.max_width = w;
        }
        if let Some(h) = self.max_height {
            options.max_height = h;
        }
        Ok(options)
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memory_core=info,memory_cli=info".into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn summarize(label: &str, report: &IngestReport) {
    eprintln!(
        "{}: {} items from {} files ({} files skipped, {} records skipped, {} warnings)",
        label,
        report.items_ingested,
        report.files_seen,
        report.files_skipped,
        report.items_skipped,
        report.warnings.len()
    );
}

fn print_step(out: &mut impl Write, step: &Step, json: bool) -> anyhow::Result<()> {
    match &step.playback {
        PlaybackStatus::Failed(reason) => {
            tracing::warn!("playback of {:?} failed: {}", step.sample.event.uri, reason)
        }
        PlaybackStatus::DeviceUnavailable(reason) => tracing::info!("no playback: {}", reason),
        PlaybackStatus::Started | PlaybackStatus::NoTrack => {}
    }
    if let Some(err) = &step.display_error {
        tracing::warn!("cannot show {}: {}", step.sample.photo.path.display(), err);
    }

    if json {
        serde_json::to_writer(&mut *out, &step.sample)?;
        writeln!(out)?;
        return Ok(());
    }

    match &step.playback {
        PlaybackStatus::Started => {}
        PlaybackStatus::NoTrack => writeln!(out, "  (no track to play)")?,
        PlaybackStatus::DeviceUnavailable(_) => writeln!(out, "  (no playback)")?,
        PlaybackStatus::Failed(_) => writeln!(out, "  (playback failed)")?,
    }
    if step.display_error.is_some() {
        writeln!(out, "  (cannot show photo)")?;
    }
    writeln!(out, "  week {}", step.sample.week)?;
    Ok(())
}

/// Fail up front with both directories named when no week can be drawn.
fn check_overlap(library: &Library, options: &SessionOptions) -> anyhow::Result<()> {
    if library.overlap_weeks() > 0 {
        return Ok(());
    }
    let dir = |d: &Option<PathBuf>| {
        d.as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    };
    anyhow::bail!(
        "no week has both listening history and photos: {} has plays in {} weeks, {} has photos in {} weeks",
        dir(&options.history_dir),
        library.history.week_count(),
        dir(&options.photo_dir),
        library.photos.week_count()
    )
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let options = cli.options()?;
    let t_total = std::time::Instant::now();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} [{prefix}] {pos}/{len} {msg}")?,
    );
    let library = memory_core::load_library(&options, &|stage, current, total, message| {
        pb.set_prefix(stage.to_string());
        pb.set_length(total);
        pb.set_position(current + 1);
        pb.set_message(message.to_string());
    })?;
    pb.finish_and_clear();

    summarize("history", &library.history_report);
    summarize("photos", &library.photo_report);
    eprintln!(
        "{} weeks with both music and photos ({:.2}s)",
        library.overlap_weeks(),
        t_total.elapsed().as_secs_f64()
    );

    check_overlap(&library, &options)?;

    let sampler = library.into_sampler(options.seed);
    let mut session = Session::new(sampler, options.start_offset_ms);
    // In JSON mode stdout carries only the samples
    let console = || -> Box<dyn Write> {
        if cli.json {
            Box::new(io::stderr())
        } else {
            Box::new(io::stdout())
        }
    };
    let mut display = ConsoleDisplay::new(console(), options.max_width, options.max_height);
    let mut playback = LinkPlayback::new(console());

    let shown = Arc::new(AtomicU64::new(0));
    {
        let shown = Arc::clone(&shown);
        ctrlc::set_handler(move || {
            eprintln!("\nInterrupted after {} pairs", shown.load(Ordering::Relaxed));
            std::process::exit(130);
        })?;
    }

    if let Some(count) = cli.count {
        for _ in 0..count {
            let step = session.next(&mut display, &mut playback)?;
            print_step(&mut io::stdout().lock(), &step, cli.json)?;
            shown.store(session.steps(), Ordering::Relaxed);
        }
        tracing::info!("{} pairs drawn", session.steps());
        return Ok(());
    }

    eprintln!("Enter for the next pair, q to quit.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let step = session.next(&mut display, &mut playback)?;
        print_step(&mut io::stdout().lock(), &step, cli.json)?;
        shown.store(session.steps(), Ordering::Relaxed);

        let Some(line) = lines.next() else { break };
        let line = line?;
        if matches!(line.trim(), "q" | "quit" | "exit") {
            break;
        }
    }

    eprintln!("Done! {} pairs shown", session.steps());
    Ok(())
}
