use anyhow::Context;
use herald_center::{
    Event, EventId, KEY_ID, KEY_TYPE, NotificationCenter, PostMode, Priority, SinkError, SlotTarget,
};
use herald_config::{HeraldConfig, load_config};
use herald_logger::{LevelFilter, Logger, LoggerError};
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const SAVED: &str = "demo.document.saved";
const PROGRESS: &str = "demo.sync.progress";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let loaded = load_config::<HeraldConfig>(Some("herald"));
    let cfg = loaded.as_ref().cloned().unwrap_or_default();

    let _log = init_logging(&cfg).context("Critical: Logging could not be initialized")?;
    if let Err(err) = &loaded {
        warn!(error = %err, "No usable configuration file, running with defaults");
    }

    let center = NotificationCenter::with_config(&cfg.center);
    let saved = EventId::new(SAVED)?;
    let progress = EventId::new(PROGRESS)?;

    let mut connections = Vec::new();
    connections.push(center.connect_fn(&center.well_known().connected, |event| {
        info!(
            event = event.get_str(KEY_ID).unwrap_or_default(),
            kind = event.get_str(KEY_TYPE).unwrap_or_default(),
            "Sink connected"
        );
    })?);

    // Connected before registration: stays deferred until the worker's events exist.
    connections.push(center.connect_fn(&saved, |event| {
        info!(document = event.get_str("path").unwrap_or("?"), "Document saved");
    })?);
    let status: Rc<dyn SlotTarget> = Rc::new(StatusBar);
    connections.push(center.connect_slot(&progress, status, "showMessage(const Event&)")?);

    center.register(&saved);
    center.register(&progress);

    let poster = center.poster();
    let worker = thread::spawn(move || {
        for step in 1..=3u64 {
            poster.post_with(Event::new(progress.clone()).with("step", step), Priority::Low, PostMode::Soon);
            thread::sleep(Duration::from_millis(10));
        }
        poster.post_with(
            Event::new(saved.clone()).with("path", "notes/today.md"),
            Priority::High,
            PostMode::Soon,
        );
        poster.quit();
    });

    center.run().await;
    worker.join().map_err(|_| anyhow::anyhow!("Worker thread panicked"))?;

    center.dump_registered_events();
    center.disconnect_all(&mut connections);
    center.process_events();

    Ok(())
}

fn init_logging(cfg: &HeraldConfig) -> Result<Logger, LoggerError> {
    let level = cfg.logging.level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let builder = Logger::builder()
        .name(env!("CARGO_PKG_NAME"))
        .level(level)
        .console(cfg.logging.console)
        .verbose_flag(&cfg.center.debug_flag_path);
    let builder = match &cfg.logging.env_filter {
        Some(filter) => builder.env_filter(filter),
        None => builder,
    };

    match &cfg.logging.directory {
        Some(directory) if cfg.logging.json => builder.path(directory).json().init(),
        Some(directory) => builder.path(directory).init(),
        None => builder.init(),
    }
}

/// A toolkit widget with one slot that reports sync progress.
#[derive(Debug)]
struct StatusBar;

impl SlotTarget for StatusBar {
    fn object_name(&self) -> &str {
        "StatusBar"
    }

    fn slots(&self) -> &[&str] {
        &["clear()", "showMessage(Event)"]
    }

    fn invoke_slot(&self, index: usize, args: &[&Event]) -> Result<(), SinkError> {
        match (index, args.first()) {
            (0, _) => info!("Status cleared"),
            (1, Some(event)) => {
                info!(step = ?event.get("step"), "Sync progress");
            },
            _ => return Err(SinkError::callback(format!("slot {index} called without its event"))),
        }
        Ok(())
    }
}
