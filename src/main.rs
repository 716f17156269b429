use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use reqprof::event::decode;
use reqprof::event_log::split;
use reqprof::sink::VAR_KEYS;
use reqprof::{
    AllocatorSnapshots, CollectOutcome, CountingAllocator, FileSink, LogSink, MemoryStore,
    Profiler, ReporterSink, StoreKeys, SystemClock, VarSink,
};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator::system();

#[derive(Parser, Debug)]
#[command(name = "reqprof", about = "Request-scoped memory and timing profiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a persisted event log slot and print its events as JSON.
    Decode {
        /// Raw slot value, or `-` to read it from stdin.
        log: String,
    },
    /// Profile a simulated request whose scripting context is entered several times.
    Demo {
        /// Id the report is filed under.
        #[arg(long, default_value = "demo-request")]
        request_id: String,
        /// Named events to push, spread over the entries.
        #[arg(long = "event", default_values_t = vec!["load_config".to_string(), "render".to_string()])]
        events: Vec<String>,
        /// Where the finished report goes.
        #[arg(long, value_enum, default_value_t = SinkKind::Log)]
        sink: SinkKind,
        /// Directory for the file sink.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Number of times the host enters the scripting context.
        #[arg(long, default_value_t = 2)]
        entries: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SinkKind {
    Log,
    File,
    Var,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { log } => run_decode(log)?,
        Commands::Demo {
            request_id,
            events,
            sink,
            out_dir,
            entries,
        } => run_demo(request_id, events, sink, out_dir, entries)?,
    }

    Ok(())
}

fn run_decode(log: String) -> Result<()> {
    let log = if log == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read event log from stdin")?;
        buffer.trim_end().to_string()
    } else {
        log
    };

    let key = StoreKeys::default().events;
    let events = split(Some(log.as_str()), &key)?
        .into_iter()
        .enumerate()
        .map(|(idx, fragment)| {
            decode(fragment).with_context(|| format!("fragment {} is corrupt", idx + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}

fn run_demo(
    request_id: String,
    events: Vec<String>,
    sink_kind: SinkKind,
    out_dir: PathBuf,
    entries: usize,
) -> Result<()> {
    let mut store = MemoryStore::new().with_var("request_id", request_id.as_str());
    let snapshots = Arc::new(AllocatorSnapshots::new());
    let clock = Arc::new(SystemClock);

    let mut sink: Box<dyn ReporterSink> = match sink_kind {
        SinkKind::Log => Box::new(LogSink::default()),
        SinkKind::File => Box::new(FileSink::new(out_dir.clone())),
        SinkKind::Var => Box::new(VarSink),
    };

    let entries = entries.max(1);
    let per_entry = events.len().div_ceil(entries).max(1);
    let mut retained = Vec::new();
    for entry in 0..entries {
        let chunk = events.chunks(per_entry).nth(entry).unwrap_or_default();
        // Each entry gets a fresh profiler: only the store survives between entries.
        let mut profiler = Profiler::new(&mut store, snapshots.clone(), clock.clone());
        let outcome = profiler
            .init(None)
            .with_context(|| format!("entry {} failed to initialise", entry + 1))?;
        tracing::debug!(entry = entry + 1, ?outcome, "entered scripting context");
        for name in chunk {
            retained.push(vec![0u8; 16 * 1024]);
            profiler
                .push_event(name)
                .with_context(|| format!("failed to record event {name:?}"))?;
        }
    }

    // End-of-request hook, again with nothing but the store to go on.
    let mut profiler = Profiler::new(&mut store, snapshots, clock);
    match profiler
        .collect(&mut *sink)
        .context("failed to collect profiler report")?
    {
        CollectOutcome::Delivered(report) => {
            let summary = report.summary();
            println!(
                "report {}\tevents={}\telapsed_ms={}\tsize_growth={}\tblocks_growth={}",
                report.id(),
                report.events().len(),
                summary.elapsed_time_ms,
                summary.size_growth,
                summary.nblocks_growth
            );
        }
        CollectOutcome::AlreadyCollected => println!("report already collected"),
    }
    drop(retained);

    match sink_kind {
        SinkKind::Var => {
            for key in VAR_KEYS {
                println!("{key}\t{}", store.get_ref(key).unwrap_or("-"));
            }
        }
        SinkKind::File => println!("wrote {}", out_dir.join(format!("{request_id}.json")).display()),
        SinkKind::Log => {}
    }

    Ok(())
}
