//! JavaScript script engine (QuickJS)
//!
//! One engine owns exactly one QuickJS context. Every access to it (script
//! loading, tree projection, handler dispatch, introspection) goes through a
//! single mutex, because the context is not safe for concurrent entry.
//!
//! # Critical sections
//!
//! - `vm`: the QuickJS runtime and context
//! - `registry`: loaded scripts and widget bindings
//! - `tree`: the last UI tree handed to `set_ui_tree`
//!
//! When two are needed they are always taken in that order.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use rquickjs::{Context, Ctx, Persistent, Promise, Runtime, Value};
use tracing::{debug, error, info, warn};

use crate::api::script::StatsCounters;
use crate::api::{
    CommandQueue, EngineStats, EventQueue, ScriptInfo, UiTree, Widget, WidgetEvent,
    WidgetScriptBinding,
};
use crate::error::{Result, ScriptError};

use super::bindings;
use super::config::ScriptEngineConfig;
use super::projection;

/// QuickJS runtime plus its single context
///
/// Field order matters: the context must be dropped before its runtime.
struct JsVm {
    context: Context,
    runtime: Runtime,
}

impl JsVm {
    fn new(config: &ScriptEngineConfig) -> Result<Self> {
        let runtime = Runtime::new()?;
        runtime.set_max_stack_size(config.max_stack_size);
        if config.memory_limit > 0 {
            runtime.set_memory_limit(config.memory_limit);
        }

        let context = Context::full(&runtime)?;
        context.with(|ctx| bindings::setup_globals(ctx, config.enable_console))?;

        Ok(Self { context, runtime })
    }

    /// Run queued promise jobs (e.g. continuations of async handlers)
    fn drain_jobs(&self) {
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => continue,
                Ok(false) => break,
                Err(exception) => {
                    let message = exception
                        .0
                        .with(|ctx| bindings::format_js_error(&ctx, &rquickjs::Error::Exception));
                    warn!("Pending script job threw an exception: {}", message);
                }
            }
        }
    }
}

#[derive(Default)]
struct ScriptRegistry {
    scripts: HashMap<String, ScriptInfo>,
    bindings: HashMap<String, WidgetScriptBinding>,
}

/// State shared between the engine handle and its worker thread
struct EngineShared {
    config: ScriptEngineConfig,
    events: Arc<EventQueue>,
    commands: Arc<CommandQueue>,
    vm: Mutex<JsVm>,
    registry: RwLock<ScriptRegistry>,
    tree: RwLock<Option<Arc<UiTree>>>,
    running: AtomicBool,
    stats: StatsCounters,
}

enum Dispatch {
    Handled,
    Unresolved(String),
}

/// Result of calling a handler, before pending jobs have run
enum Invocation {
    Done(Dispatch),
    /// Promise returned by an async handler
    Async(Persistent<Promise<'static>>),
}

impl EngineShared {
    fn lock_vm(&self) -> MutexGuard<'_, JsVm> {
        self.vm.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn binding_for(&self, widget_id: &str) -> Option<WidgetScriptBinding> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .bindings
            .get(widget_id)
            .cloned()
    }

    fn dispatch(&self, event: WidgetEvent) {
        self.dispatch_event(&event);
        self.stats.record_processed();
    }

    fn dispatch_event(&self, event: &WidgetEvent) {
        let Some(binding) = self.binding_for(&event.widget_id) else {
            debug!(widget_id = %event.widget_id, "No script bound, dropping {} event", event.event_type);
            self.stats.record_dropped();
            return;
        };
        let Some(handler) = binding.handler(event.event_type) else {
            debug!(widget_id = %event.widget_id, "No handler for {} event", event.event_type);
            self.stats.record_dropped();
            return;
        };

        let vm = self.lock_vm();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let result = vm
                .context
                .with(|ctx| self.invoke(&ctx, &binding, handler, event));
            vm.drain_jobs();
            match result? {
                Invocation::Done(dispatch) => Ok(dispatch),
                Invocation::Async(promise) => vm.context.with(|ctx| settle_async_handler(&ctx, promise)),
            }
        }));

        match outcome {
            Ok(Ok(Dispatch::Handled)) => self.stats.record_handled(),
            Ok(Ok(Dispatch::Unresolved(reason))) => {
                warn!(handler = handler, widget_id = %event.widget_id, "Handler not resolved: {}", reason);
                self.stats.record_dropped();
            }
            Ok(Err(message)) => {
                error!(handler = handler, widget_id = %event.widget_id, "Script handler failed: {}", message);
                self.stats.record_failed();
            }
            Err(payload) => {
                error!(
                    handler = handler,
                    widget_id = %event.widget_id,
                    "Script handler panicked: {}",
                    panic_message(payload.as_ref())
                );
                self.stats.record_failed();
            }
        }
    }

    fn invoke<'js>(
        &self,
        ctx: &Ctx<'js>,
        binding: &WidgetScriptBinding,
        handler: &str,
        event: &WidgetEvent,
    ) -> std::result::Result<Invocation, String> {
        let js_err = |e: rquickjs::Error| bindings::format_js_error(ctx, &e);

        bindings::set_script_id(ctx, &binding.script_path).map_err(js_err)?;

        let func = match bindings::resolve_handler(ctx, handler) {
            Ok(func) => func,
            Err(reason) => return Ok(Invocation::Done(Dispatch::Unresolved(reason))),
        };

        let target = bindings::create_widget_api(ctx, &self.commands, &event.widget_id, binding.widget_type)
            .map_err(js_err)?;
        let event_obj = bindings::create_event_object(ctx, event, &target).map_err(js_err)?;

        let returned: Value = func.call((target, event_obj)).map_err(js_err)?;
        match returned.into_promise() {
            Some(promise) => Ok(Invocation::Async(Persistent::save(ctx, promise))),
            None => Ok(Invocation::Done(Dispatch::Handled)),
        }
    }
}

/// Check an async handler's promise once the job queue has drained
///
/// A promise still pending here waits on something outside the engine and
/// counts as handled.
fn settle_async_handler(
    ctx: &Ctx<'_>,
    promise: Persistent<Promise<'static>>,
) -> std::result::Result<Dispatch, String> {
    let promise = promise.restore(ctx).map_err(|e| e.to_string())?;
    match promise.result::<Value>() {
        Some(Err(e)) => Err(format!(
            "Unhandled promise rejection: {}",
            bindings::format_js_error(ctx, &e)
        )),
        _ => Ok(Dispatch::Handled),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Worker loop: block on the event queue or the stop signal, whichever fires first
fn run_worker(shared: Arc<EngineShared>, stop_rx: Receiver<()>) {
    debug!("Script worker loop started");
    let events = shared.events.receiver().clone();

    loop {
        crossbeam_channel::select! {
            recv(stop_rx) -> _ => break,
            recv(events) -> msg => match msg {
                Ok(event) => shared.dispatch(event),
                Err(_) => {
                    warn!("Event queue closed, script worker exiting");
                    shared.running.store(false, Ordering::SeqCst);
                    break;
                }
            },
        }
    }

    debug!("Script worker loop exited");
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Script engine driving widget handlers from an [`EventQueue`]
///
/// States are `Stopped -> Running -> Stopped`. Handlers only ever produce
/// commands on the [`CommandQueue`]; the host applies them.
pub struct ScriptEngine {
    shared: Arc<EngineShared>,
    worker: Mutex<Option<Worker>>,
}

impl ScriptEngine {
    /// Create a stopped engine with console and `Global` installed
    pub fn new(
        events: Arc<EventQueue>,
        commands: Arc<CommandQueue>,
        config: ScriptEngineConfig,
    ) -> Result<Self> {
        debug!("Initializing QuickJS runtime for scripts");
        let vm = JsVm::new(&config)?;

        let shared = EngineShared {
            config,
            events,
            commands,
            vm: Mutex::new(vm),
            registry: RwLock::new(ScriptRegistry::default()),
            tree: RwLock::new(None),
            running: AtomicBool::new(false),
            stats: StatsCounters::default(),
        };

        info!("JavaScript script engine initialized");
        Ok(Self {
            shared: Arc::new(shared),
            worker: Mutex::new(None),
        })
    }

    /// Spawn the processing loop
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() && self.is_running() {
            return Err(ScriptError::AlreadyRunning);
        }
        // A worker that exited on its own (closed queue) is reaped here
        if let Some(stale) = worker.take() {
            let _ = stale.handle.join();
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let shared = Arc::clone(&self.shared);
        self.shared.running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name(self.shared.config.worker_thread_name.clone())
            .spawn(move || run_worker(shared, stop_rx));
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                return Err(ScriptError::Spawn(e));
            }
        };

        *worker = Some(Worker { stop_tx, handle });
        info!("Script engine started");
        Ok(())
    }

    /// Ask the processing loop to exit and wait for it; no-op when stopped
    ///
    /// An in-flight handler runs to completion first.
    pub fn stop(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(current) = worker.take() else {
            return;
        };

        let _ = current.stop_tx.send(());
        if current.handle.join().is_err() {
            error!("Script worker thread panicked");
        }
        self.shared.running.store(false, Ordering::SeqCst);
        info!("Script engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Compile and run `source` in the engine context under `path`
    ///
    /// A module-style default export becomes a global named after the file stem
    /// (`scripts/loginButton.js` -> `loginButton`). On failure nothing is recorded.
    pub fn load_script(&self, path: &str, source: &str) -> Result<()> {
        let vm = self.shared.lock_vm();

        vm.context.with(|ctx| -> Result<()> {
            bindings::reset_module_exports(&ctx)?;
            bindings::set_script_id(&ctx, path)?;

            if let Err(e) = ctx.eval::<(), _>(source) {
                return Err(ScriptError::Load {
                    path: path.to_string(),
                    message: bindings::format_js_error(&ctx, &e),
                });
            }

            if let Some(name) = bindings::publish_default_export(&ctx, path)? {
                debug!(script = path, "Default export published as global '{}'", name);
            }
            Ok(())
        })?;
        vm.drain_jobs();

        self.shared
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .scripts
            .insert(
                path.to_string(),
                ScriptInfo {
                    path: path.to_string(),
                    source: source.to_string(),
                    loaded: true,
                },
            );

        info!(script = path, "Script loaded");
        Ok(())
    }

    pub fn script(&self, path: &str) -> Option<ScriptInfo> {
        self.shared
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .scripts
            .get(path)
            .cloned()
    }

    /// Paths of all loaded scripts, sorted
    pub fn loaded_scripts(&self) -> Vec<String> {
        let registry = self.shared.registry.read().unwrap_or_else(PoisonError::into_inner);
        let mut paths: Vec<String> = registry.scripts.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Bind a widget to a loaded script, replacing any previous binding
    pub fn register_widget(&self, widget_id: &str, binding: WidgetScriptBinding) -> Result<()> {
        let mut registry = self.shared.registry.write().unwrap_or_else(PoisonError::into_inner);
        if !registry.scripts.contains_key(&binding.script_path) {
            return Err(ScriptError::ScriptNotLoaded(binding.script_path));
        }

        debug!(
            widget_id = widget_id,
            script = %binding.script_path,
            "Registered {} handler(s)",
            binding.handlers.len()
        );
        registry.bindings.insert(widget_id.to_string(), binding);
        Ok(())
    }

    pub fn unregister_widget(&self, widget_id: &str) -> Option<WidgetScriptBinding> {
        self.shared
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .bindings
            .remove(widget_id)
    }

    pub fn binding(&self, widget_id: &str) -> Option<WidgetScriptBinding> {
        self.shared.binding_for(widget_id)
    }

    /// Whether `name` resolves to a callable the same way dispatch resolves it
    pub fn has_handler(&self, name: &str) -> bool {
        let vm = self.shared.lock_vm();
        vm.context
            .with(|ctx| bindings::resolve_handler(&ctx, name).is_ok())
    }

    /// Rebuild the UI tree and reinstall `RootElement`
    pub fn set_ui_tree<W: Widget>(&self, widgets: &[W]) -> Result<()> {
        let tree = Arc::new(UiTree::build(widgets));

        let vm = self.shared.lock_vm();
        vm.context
            .with(|ctx| projection::install_root_element(&ctx, &tree, &self.shared.commands))?;

        debug!(
            widgets = tree.widget_count(),
            root = %tree.root().id,
            "UI tree projected into script context"
        );
        *self.shared.tree.write().unwrap_or_else(PoisonError::into_inner) = Some(tree);
        Ok(())
    }

    pub fn ui_tree(&self) -> Option<Arc<UiTree>> {
        self.shared
            .tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `f` with exclusive access to the script context
    pub fn with_context<F, R>(&self, f: F) -> R
    where
        F: for<'js> FnOnce(Ctx<'js>) -> R + Send,
        R: Send,
    {
        let vm = self.shared.lock_vm();
        let result = vm.context.with(f);
        vm.drain_jobs();
        result
    }

    pub fn stats(&self) -> EngineStats {
        self.shared.stats.snapshot()
    }

    pub fn event_queue(&self) -> &Arc<EventQueue> {
        &self.shared.events
    }

    pub fn command_queue(&self) -> &Arc<CommandQueue> {
        &self.shared.commands
    }

    pub fn config(&self) -> &ScriptEngineConfig {
        &self.shared.config
    }
}

impl Drop for ScriptEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
