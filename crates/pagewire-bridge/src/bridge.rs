use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pagewire_channel::{ChannelError, SlotEndpoint};
use pagewire_frame::{
    ConsoleKind, ErrorDescriptor, Frame, FrameError, FrameKind, InvokePayload, MessagePayload,
    SlotReader, SlotWriter, MESSAGE_SOURCE_CONSOLE,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::LinkConfig;
use crate::error::{BridgeError, Result};
use crate::event::{BridgeEvent, ConsoleMessage};
use crate::pending::PendingMap;
use crate::poll::{poll_until, tick_delay, PollConfig};
use crate::remote::ScriptFuture;
use crate::script::{is_truthy, Script};

/// The host's capability to run code in the remote environment outside the
/// slot protocol: installing the service runtime and defining callback
/// stubs. How this reaches the remote side (script injection, an embedded
/// runtime, a test double) is the embedder's concern.
pub trait RuntimeInjector: Send + Sync {
    /// Install (or reinstall) the service runtime in the remote
    /// environment.
    fn install(&self) -> Result<()>;

    /// Define a callback stub under `name` in the remote global scope.
    fn define(&self, name: &str) -> Result<()>;
}

/// Injector for hosts whose remote environment is provisioned externally.
pub struct NullInjector;

impl RuntimeInjector for NullInjector {
    fn install(&self) -> Result<()> {
        Ok(())
    }

    fn define(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

/// A host function invocable from remote code.
pub type HostFn = Arc<dyn Fn(Vec<Value>) -> ScriptFuture + Send + Sync>;

/// Host-side correlation/dispatch engine.
///
/// Owns the table of in-flight requests, encodes outgoing evaluate/call
/// frames, decodes incoming ones, and resolves the matching pending
/// request or forwards unsolicited traffic as [`BridgeEvent`]s. Nothing a
/// single request does — failing, timing out, arriving malformed — ever
/// stops the receive loop or disturbs other pending requests.
pub struct Bridge {
    writer: SlotWriter,
    reader: SlotReader,
    pending: Arc<PendingMap>,
    exposed: Arc<Mutex<HashMap<String, HostFn>>>,
    runtime: Arc<dyn RuntimeInjector>,
    events: mpsc::UnboundedSender<BridgeEvent>,
    config: LinkConfig,
    task: Mutex<Option<JoinHandle<()>>>,
    attached: AtomicBool,
}

impl Bridge {
    /// Build a bridge over one end of a slot link.
    ///
    /// Returns the bridge and the stream of out-of-band events (console
    /// output, page errors). The receive loop does not run until
    /// [`attach`](Self::attach).
    pub fn new(
        endpoint: SlotEndpoint,
        runtime: Arc<dyn RuntimeInjector>,
        config: LinkConfig,
    ) -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let bridge = Self {
            writer: SlotWriter::with_retry_interval(
                Arc::clone(endpoint.sender()),
                config.write_retry_interval,
            ),
            reader: SlotReader::new(Arc::clone(endpoint.receiver())),
            pending: Arc::new(PendingMap::new()),
            exposed: Arc::new(Mutex::new(HashMap::new())),
            runtime,
            events,
            config,
            task: Mutex::new(None),
            attached: AtomicBool::new(false),
        };
        (bridge, event_rx)
    }

    /// Install the remote runtime, start the receive loop, and re-define
    /// every previously exposed function.
    ///
    /// Safe to call again after the remote environment was recreated
    /// (e.g. a reload): the old loop is stopped, the runtime reinstalled,
    /// and host-side registrations survive.
    pub fn attach(&self) -> Result<()> {
        self.runtime.install()?;

        if let Some(previous) = lock(&self.task).take() {
            previous.abort();
        }
        let state = ReceiveState {
            reader: self.reader.clone(),
            writer: self.writer.clone(),
            pending: Arc::clone(&self.pending),
            exposed: Arc::clone(&self.exposed),
            events: self.events.clone(),
            config: self.config,
        };
        *lock(&self.task) = Some(tokio::spawn(receive_loop(state)));
        self.attached.store(true, Ordering::SeqCst);

        let names: Vec<String> = lock(&self.exposed).keys().cloned().collect();
        for name in names {
            self.runtime.define(&name)?;
        }
        Ok(())
    }

    /// Whether the receive loop is running.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Stop the receive loop and fail every in-flight request with
    /// [`BridgeError::Detached`].
    pub fn detach(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
        self.attached.store(false, Ordering::SeqCst);
        self.pending.drain();
    }

    /// Run a script in the remote environment and await its value.
    ///
    /// The returned future resolves when the remote side answers — however
    /// long that takes. Callers that need a deadline wrap this externally
    /// (see [`wait_for`](Self::wait_for)); such a wrapper timing out does
    /// NOT purge the request, so a late answer is still honored rather
    /// than misdelivered to a newer request.
    pub async fn evaluate(&self, script: Script, args: Vec<Value>) -> Result<Value> {
        if !self.is_attached() {
            return Err(BridgeError::Detached);
        }

        let key = self.pending.mint();
        let rx = self.pending.register(key);
        let payload = serde_json::to_value(script.into_call(args))?;
        self.writer.send(&Frame::call(key, payload)).await?;

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(remote)) => Err(BridgeError::Remote(remote)),
            Err(_) => Err(BridgeError::Detached),
        }
    }

    /// Re-evaluate a script until its value is truthy, under a poll
    /// deadline.
    ///
    /// Each attempt is an independent `evaluate`; attempts abandoned by
    /// the deadline stay pending per the late-answer policy. Remote
    /// failures abort the wait immediately.
    pub async fn wait_for(
        &self,
        config: PollConfig,
        script: Script,
        args: Vec<Value>,
    ) -> Result<Value> {
        poll_until(config, || {
            let script = script.clone();
            let args = args.clone();
            async move {
                match self.evaluate(script, args).await {
                    Ok(value) if is_truthy(&value) => Some(Ok(value)),
                    Ok(_) => None,
                    Err(err) => Some(Err(err)),
                }
            }
        })
        .await?
    }

    /// Register a synchronous host function invocable from remote code as
    /// `self.<name>(...)`.
    ///
    /// Registration is host-side state: it survives reattachment, which
    /// re-defines the remote stub automatically.
    pub fn expose<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(Vec<Value>) -> std::result::Result<Value, ErrorDescriptor> + Send + Sync + 'static,
    {
        self.expose_async(name, move |args| {
            let outcome = f(args);
            Box::pin(async move { outcome })
        })
    }

    /// Register a host function returning a future.
    pub fn expose_async<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(Vec<Value>) -> ScriptFuture + Send + Sync + 'static,
    {
        lock(&self.exposed).insert(name.to_string(), Arc::new(f));
        if self.is_attached() {
            self.runtime.define(name)?;
        }
        Ok(())
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("attached", &self.is_attached())
            .field("pending", &self.pending.len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the receive loop owns, detached from the `Bridge` value so
/// dropping the bridge is what stops the loop, not a reference cycle.
struct ReceiveState {
    reader: SlotReader,
    writer: SlotWriter,
    pending: Arc<PendingMap>,
    exposed: Arc<Mutex<HashMap<String, HostFn>>>,
    events: mpsc::UnboundedSender<BridgeEvent>,
    config: LinkConfig,
}

async fn receive_loop(state: ReceiveState) {
    let readable = state.reader.readable();
    loop {
        match state.reader.try_next() {
            Ok(Some(frame)) => {
                dispatch(&state, frame);
                // The slot just freed; the remote may already be deferring
                // its next write.
                continue;
            }
            Ok(None) => {}
            Err(FrameError::Channel(ChannelError::Closed)) => {
                debug!("channel closed; receive loop stopping");
                break;
            }
            // A malformed frame carries no reliable correlation key, so
            // there is no caller to reject; recover locally.
            Err(err) => warn!(%err, "discarding undecodable frame"),
        }
        tick_delay(&readable, state.config.poll_interval).await;
    }
}

fn dispatch(state: &ReceiveState, frame: Frame) {
    match frame.kind {
        FrameKind::Result => {
            let Some(key) = frame.key else {
                warn!("result frame without a correlation key");
                return;
            };
            let value = frame.payload.unwrap_or(Value::Null);
            if !state.pending.complete(key, Ok(value)) {
                debug!(key, "result for a retired key");
            }
        }
        FrameKind::Error => {
            let error = match frame.payload {
                Some(payload) => match serde_json::from_value::<ErrorDescriptor>(payload) {
                    Ok(descriptor) => descriptor.reconstruct(),
                    Err(err) => {
                        warn!(%err, "undecodable error payload");
                        ErrorDescriptor::new("Error", "undecodable remote error").reconstruct()
                    }
                },
                None => ErrorDescriptor::new("Error", "remote error without a payload").reconstruct(),
            };
            let delivered = match frame.key {
                Some(key) => state.pending.complete(key, Err(error.clone())),
                None => false,
            };
            if !delivered {
                // No waiting caller to reject; surface as a page error
                // instead of dropping it silently.
                let _ = state.events.send(BridgeEvent::PageError(error));
            }
        }
        FrameKind::Message => {
            let Some(payload) = frame.payload else {
                trace!("message frame without a payload");
                return;
            };
            match serde_json::from_value::<MessagePayload>(payload) {
                Ok(message) if message.source == MESSAGE_SOURCE_CONSOLE => {
                    let _ = state.events.send(BridgeEvent::Console(ConsoleMessage {
                        kind: message.kind.unwrap_or(ConsoleKind::Log),
                        args: message.data,
                    }));
                }
                // Other sources are reserved for future out-of-band
                // notifications.
                Ok(message) => trace!(source = %message.source, "ignoring reserved message"),
                Err(err) => warn!(%err, "undecodable message payload"),
            }
        }
        FrameKind::Call => {
            let Some(key) = frame.key else {
                warn!("call frame without a correlation key");
                return;
            };
            let payload = frame.payload.unwrap_or(Value::Null);
            let writer = state.writer.clone();
            match serde_json::from_value::<InvokePayload>(payload) {
                Ok(invoke) => {
                    let target = lock(&state.exposed).get(&invoke.name).cloned();
                    match target {
                        Some(host_fn) => {
                            let execution = host_fn(invoke.args);
                            tokio::spawn(async move {
                                let answer = match execution.await {
                                    Ok(value) => Frame::result(key, value),
                                    Err(descriptor) => Frame::error(Some(key), &descriptor),
                                };
                                if let Err(err) = writer.send(&answer).await {
                                    warn!(%err, key, "failed to answer exposed-function call");
                                }
                            });
                        }
                        None => {
                            let descriptor = ErrorDescriptor::type_error(format!(
                                "{} is not a function",
                                invoke.name
                            ));
                            tokio::spawn(async move {
                                if let Err(err) =
                                    writer.send(&Frame::error(Some(key), &descriptor)).await
                                {
                                    warn!(%err, key, "failed to reject unknown call target");
                                }
                            });
                        }
                    }
                }
                Err(err) => {
                    let descriptor =
                        ErrorDescriptor::type_error(format!("malformed call payload: {err}"));
                    tokio::spawn(async move {
                        if let Err(err) = writer.send(&Frame::error(Some(key), &descriptor)).await {
                            warn!(%err, key, "failed to report malformed call");
                        }
                    });
                }
            }
        }
    }
}
