use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval, sleep};
use tracing::{Level, debug, error, info, warn};

use lume_log::{LogConfig, init_logging, parse_level};
use lume_schema::Validatable;
use lume_script::api::{CommandQueue, EventQueue, EventType, WidgetEvent};
use lume_script::{ScriptEngine, ScriptError};

mod host;
use host::WidgetStore;

mod layout;
use layout::Layout;

mod scripts;

const VERSION: &str = "0.1.0";

/// How long shutdown waits for the worker to finish already queued events
const SETTLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Lume Viewer - headless widget host driving UI scripts
#[derive(Parser, Debug)]
#[command(name = "lume_viewer")]
#[command(author = "Lume Project")]
#[command(version = VERSION)]
#[command(about = "Runs a UI layout and its scripts without a window", long_about = None)]
struct Args {
    /// Path to the layout file (JSON)
    #[arg(short, long)]
    layout: PathBuf,

    /// Number of ticks to run before exiting (0 = until Ctrl+C)
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Host loop frequency in ticks per second
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=1000))]
    tick_rate: u64,

    /// Click a widget on the first tick (repeatable)
    #[arg(long = "click", value_name = "WIDGET_ID")]
    clicks: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LUME_LOG_LEVEL")]
    log_level: String,

    /// Also write logs to this file
    #[arg(long, env = "LUME_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // We can't log errors yet, so we use eprintln! for early failures
    let layout = match Layout::from_json_file(&args.layout) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("Failed to load layout from '{}': {}", args.layout.display(), e);
            std::process::exit(1);
        }
    };
    if let Err(e) = layout.validate() {
        eprintln!("Layout validation error: {}", e);
        std::process::exit(1);
    }

    let log_level = parse_level(&args.log_level).unwrap_or_else(|| {
        eprintln!("Warning: Invalid log level '{}', using INFO", args.log_level);
        Level::INFO
    });

    let log_config = match &args.log_file {
        Some(path) => match File::create(path) {
            Ok(file) => LogConfig::new("lume_viewer::")
                .with_level(log_level)
                .with_log_file(file),
            Err(e) => {
                eprintln!("Unable to create log file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => LogConfig::<File>::new("lume_viewer::").with_level(log_level),
    };

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Lume Viewer v{}", VERSION);
    info!("Layout: {}", args.layout.display());

    debug!("Settings:");
    debug!("  Widgets: {}", layout.widgets.len());
    debug!("  Scripts: {}", layout.scripts.len());
    debug!("  Interactions: {}", layout.interactions.len());
    debug!("  Tick Rate: {} Hz", args.tick_rate);
    debug!("  Event Queue Capacity: {}", layout.engine.event_queue_capacity);
    debug!("  Log Level: {}", log_level);

    if let Err(e) = run(&args, layout).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: &Args, layout: Layout) -> Result<(), ScriptError> {
    let mut store = WidgetStore::from_specs(&layout.widgets);
    info!("Hosting {} widgets", store.len());

    let events = Arc::new(EventQueue::with_capacity(layout.engine.event_queue_capacity));
    let commands = Arc::new(CommandQueue::new());
    let engine = ScriptEngine::new(Arc::clone(&events), Arc::clone(&commands), layout.engine.clone())?;

    engine.set_ui_tree(store.widgets())?;

    let loaded = scripts::load_layout_scripts(&engine, &layout, &args.layout);
    let bound = scripts::bind_layout_widgets(&engine, &layout, &store);
    info!("Loaded {} scripts, bound {} widgets", loaded, bound);

    // Scripts may queue commands at load time (top-level code)
    apply_commands(&commands, &mut store);

    engine.start()?;

    let last_scheduled = layout.last_interaction_tick();
    if args.ticks > 0 {
        info!("Entering host loop for {} ticks", args.ticks);
        if last_scheduled > args.ticks {
            warn!("Interactions scheduled after tick {} will not run", args.ticks);
        }
    } else {
        info!("Entering host loop...(Use Ctrl+C to shutdown)");
    }

    let mut tick_interval = interval(Duration::from_micros(1_000_000 / args.tick_rate));
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut tick: u64 = 0;
    let mut pushed: u64 = 0;

    loop {
        tokio::select! {
            biased;

            _ = &mut ctrl_c => {
                info!("Received shutdown signal (Ctrl+C)");
                break;
            }

            _ = tick_interval.tick() => {
                tick += 1;
                pushed += push_tick_events(tick, &args.clicks, &layout, &store, &events);
                apply_commands(&commands, &mut store);

                if args.ticks > 0 && tick >= args.ticks {
                    break;
                }
            }
        }
    }

    // Give the worker a chance to finish events pushed on the last ticks
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    while engine.is_running() && engine.stats().processed < pushed && Instant::now() < deadline {
        sleep(Duration::from_millis(5)).await;
    }

    engine.stop();
    apply_commands(&commands, &mut store);

    let stats = engine.stats();
    info!(
        "Shutdown after {} ticks: {} events pushed, {} processed, {} handled, {} dropped, {} failed",
        tick, pushed, stats.processed, stats.handled, stats.dropped, stats.failed
    );
    log_widget_summary(&store);

    Ok(())
}

/// Push the events scheduled for `tick`, returning how many the queue accepted
fn push_tick_events(
    tick: u64,
    clicks: &[String],
    layout: &Layout,
    store: &WidgetStore,
    events: &EventQueue,
) -> u64 {
    let mut outgoing = Vec::new();

    if tick == 1 {
        for widget_id in clicks {
            outgoing.push(WidgetEvent::new(EventType::Click, widget_id.clone()));
        }
    }

    for interaction in layout.interactions_at(tick) {
        let target = match &interaction.target {
            Some(target) => Some(target.clone()),
            None => store
                .hit_test(interaction.x, interaction.y)
                .map(|widget| widget.id.clone()),
        };

        match target {
            Some(widget_id) => outgoing.push(interaction.to_event(&widget_id)),
            None => debug!(
                "Tick {}: {} at ({}, {}) hit no widget",
                tick, interaction.event_type, interaction.x, interaction.y
            ),
        }
    }

    let mut accepted = 0;
    for event in outgoing {
        match store.get(&event.widget_id) {
            None => {
                warn!("Tick {}: {} for unknown widget '{}' skipped", tick, event.event_type, event.widget_id);
                continue;
            }
            Some(widget) if event.event_type.is_pointer() && !widget.enabled => {
                debug!("Tick {}: {} on disabled widget '{}' skipped", tick, event.event_type, event.widget_id);
                continue;
            }
            Some(_) => {}
        }

        let (event_type, widget_id) = (event.event_type, event.widget_id.clone());
        if events.push(event) {
            debug!("Tick {}: queued {} for '{}'", tick, event_type, widget_id);
            accepted += 1;
        } else {
            warn!("Event queue full, dropped {} for '{}'", event_type, widget_id);
        }
    }

    accepted
}

/// Drain the command queue and apply it to the host widgets
fn apply_commands(commands: &CommandQueue, store: &mut WidgetStore) {
    let batch = commands.pop_all();
    if batch.is_empty() {
        return;
    }
    let applied = store.apply_all(&batch);
    debug!("Applied {}/{} widget commands", applied, batch.len());
}

fn log_widget_summary(store: &WidgetStore) {
    info!("Final widget state (focus: {}):", store.focused().unwrap_or("none"));
    for widget in store.widgets() {
        info!(
            "  {} [{}] text={:?} visible={} enabled={} focused={} color={}",
            widget.id,
            widget.widget_type,
            widget.text,
            widget.visible,
            widget.enabled,
            widget.focused,
            widget.color
        );
        for (name, value) in &widget.properties {
            info!("    {} = {}", name, value);
        }
    }
}
