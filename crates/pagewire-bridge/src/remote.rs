use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pagewire_channel::{ChannelError, SlotEndpoint};
use pagewire_frame::{
    CallMode, CallPayload, ConsoleKind, ErrorDescriptor, Frame, FrameError, FrameKind,
    InvokePayload, MessagePayload, RemoteError, SlotReader, SlotWriter,
};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::bridge::RuntimeInjector;
use crate::config::LinkConfig;
use crate::pending::PendingMap;
use crate::poll::tick_delay;

/// One execution request handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCall {
    pub source: String,
    pub mode: CallMode,
    pub args: Vec<Value>,
}

/// Outcome future of an engine execution.
///
/// Synchronous throws and asynchronous rejections both surface as the
/// `Err` arm — the service makes no distinction.
pub type ScriptFuture =
    Pin<Box<dyn Future<Output = std::result::Result<Value, ErrorDescriptor>> + Send>>;

/// The seam between the service and whatever actually runs the source.
///
/// Engines must produce JSON-encodable values; live handles (DOM nodes and
/// the like) have no defined structural serialization and must be
/// flattened to an opaque index by the engine before returning. Engine
/// code may call back into the host through the provided [`RemoteHandle`].
pub trait ScriptEngine: Send + Sync + 'static {
    fn execute(&self, call: ScriptCall, remote: RemoteHandle) -> ScriptFuture;
}

/// Capabilities available to remote code: host callbacks, console output,
/// and uncaught-error reporting.
#[derive(Clone)]
pub struct RemoteHandle {
    writer: SlotWriter,
    pending: Arc<PendingMap>,
    stubs: Arc<Mutex<HashSet<String>>>,
}

impl RemoteHandle {
    /// The intercepted console surface.
    pub fn console(&self) -> RemoteConsole {
        RemoteConsole {
            writer: self.writer.clone(),
        }
    }

    /// Invoke a host-exposed function by stub name.
    ///
    /// This is the reverse of the host's evaluate path: a key is minted
    /// from the remote side's own table, the call crosses as a `Call`
    /// frame, and the future resolves when the host answers. Names without
    /// an installed stub fail immediately.
    pub async fn call_host(
        &self,
        name: &str,
        args: Vec<Value>,
    ) -> std::result::Result<Value, RemoteError> {
        if !lock_stubs(&self.stubs).contains(name) {
            return Err(RemoteError::new(
                "TypeError",
                format!("self.{name} is not a function"),
            ));
        }

        let key = self.pending.mint();
        let rx = self.pending.register(key);
        let payload = serde_json::to_value(InvokePayload {
            name: name.to_string(),
            args,
        })
        .map_err(|err| RemoteError::new("Error", err.to_string()))?;

        if let Err(err) = self.writer.send(&Frame::call(key, payload)).await {
            return Err(RemoteError::new("Error", format!("host link failed: {err}")));
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(RemoteError::new("Error", "remote service shut down")),
        }
    }

    /// Report an error with no pending correlation, so the host can
    /// surface it as a page error instead of silently dropping it.
    pub async fn report_error(&self, descriptor: ErrorDescriptor) -> crate::error::Result<()> {
        self.writer.send(&Frame::error(None, &descriptor)).await?;
        Ok(())
    }
}

/// Console surface of the remote runtime.
///
/// Each call performs the original logging behavior (forwarded to
/// `tracing`) and additionally crosses the link as one `Message` frame —
/// interception is transparent, not a replacement.
pub struct RemoteConsole {
    writer: SlotWriter,
}

impl RemoteConsole {
    pub async fn log(&self, args: Vec<Value>) -> crate::error::Result<()> {
        self.emit(ConsoleKind::Log, args).await
    }

    pub async fn info(&self, args: Vec<Value>) -> crate::error::Result<()> {
        self.emit(ConsoleKind::Info, args).await
    }

    pub async fn warn(&self, args: Vec<Value>) -> crate::error::Result<()> {
        self.emit(ConsoleKind::Warn, args).await
    }

    pub async fn error(&self, args: Vec<Value>) -> crate::error::Result<()> {
        self.emit(ConsoleKind::Error, args).await
    }

    pub async fn dir(&self, args: Vec<Value>) -> crate::error::Result<()> {
        self.emit(ConsoleKind::Dir, args).await
    }

    async fn emit(&self, kind: ConsoleKind, args: Vec<Value>) -> crate::error::Result<()> {
        debug!(target: "pagewire::console", kind = kind.as_str(), args = ?args);
        self.writer
            .send(&Frame::message(MessagePayload::console(kind, args)))
            .await?;
        Ok(())
    }
}

/// The runtime living on the remote side of the link.
///
/// Decodes incoming `Call` frames, hands them to the engine, and answers
/// with `Result`/`Error` frames keyed to the request. Executions are
/// spawned onto the scheduler, so a call that yields does not block later
/// calls — answers may complete out of order.
pub struct RemoteService;

impl RemoteService {
    /// Start the service loop and return its controlling handle.
    pub fn spawn<E: ScriptEngine>(
        endpoint: SlotEndpoint,
        engine: E,
        config: LinkConfig,
    ) -> ServiceHandle {
        let stubs = Arc::new(Mutex::new(HashSet::new()));
        let pending = Arc::new(PendingMap::new());
        let writer = SlotWriter::with_retry_interval(
            Arc::clone(endpoint.sender()),
            config.write_retry_interval,
        );
        let reader = SlotReader::new(Arc::clone(endpoint.receiver()));
        let handle = RemoteHandle {
            writer,
            pending,
            stubs: Arc::clone(&stubs),
        };
        let task = tokio::spawn(run_service(reader, handle.clone(), Arc::new(engine), config));
        ServiceHandle {
            stubs,
            handle,
            task,
        }
    }
}

/// Controlling handle for a spawned [`RemoteService`].
///
/// Dropping the handle stops the service loop.
pub struct ServiceHandle {
    stubs: Arc<Mutex<HashSet<String>>>,
    handle: RemoteHandle,
    task: JoinHandle<()>,
}

impl ServiceHandle {
    /// The injection capability the host's bridge attaches through.
    pub fn injector(&self) -> ServiceInjector {
        ServiceInjector {
            stubs: Arc::clone(&self.stubs),
        }
    }

    /// Handle for code running inside the remote environment.
    pub fn remote_handle(&self) -> RemoteHandle {
        self.handle.clone()
    }

    /// Stop the service loop.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// In-process [`RuntimeInjector`] for a spawned service.
///
/// `install` models re-injecting the runtime into a fresh environment:
/// previously defined stubs are gone until the host defines them again.
#[derive(Clone)]
pub struct ServiceInjector {
    stubs: Arc<Mutex<HashSet<String>>>,
}

impl RuntimeInjector for ServiceInjector {
    fn install(&self) -> crate::error::Result<()> {
        lock_stubs(&self.stubs).clear();
        Ok(())
    }

    fn define(&self, name: &str) -> crate::error::Result<()> {
        lock_stubs(&self.stubs).insert(name.to_string());
        Ok(())
    }
}

fn lock_stubs(stubs: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    stubs.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_service<E: ScriptEngine>(
    reader: SlotReader,
    handle: RemoteHandle,
    engine: Arc<E>,
    config: LinkConfig,
) {
    let readable = reader.readable();
    loop {
        match reader.try_next() {
            Ok(Some(frame)) => {
                dispatch(&handle, &engine, frame);
                // Check again right away: the slot just freed and the host
                // may already be deferring a write.
                continue;
            }
            Ok(None) => {}
            Err(FrameError::Channel(ChannelError::Closed)) => {
                debug!("channel closed; remote service stopping");
                break;
            }
            Err(err) => warn!(%err, "discarding undecodable frame"),
        }
        tick_delay(&readable, config.poll_interval).await;
    }
}

fn dispatch<E: ScriptEngine>(handle: &RemoteHandle, engine: &Arc<E>, frame: Frame) {
    match frame.kind {
        FrameKind::Call => {
            let Some(key) = frame.key else {
                warn!("call frame without a correlation key");
                return;
            };
            let payload = frame.payload.unwrap_or(Value::Null);
            let writer = handle.writer.clone();
            match serde_json::from_value::<CallPayload>(payload) {
                Ok(call) => {
                    let execution = engine.execute(
                        ScriptCall {
                            source: call.source,
                            mode: call.mode,
                            args: call.args,
                        },
                        handle.clone(),
                    );
                    tokio::spawn(async move {
                        let answer = match execution.await {
                            Ok(value) => Frame::result(key, value),
                            Err(descriptor) => Frame::error(Some(key), &descriptor),
                        };
                        if let Err(err) = writer.send(&answer).await {
                            warn!(%err, key, "failed to answer call");
                        }
                    });
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
        FrameKind::Result => {
            let Some(key) = frame.key else {
                warn!("result frame without a correlation key");
                return;
            };
            let value = frame.payload.unwrap_or(Value::Null);
            if !handle.pending.complete(key, Ok(value)) {
                debug!(key, "answer for a retired key");
            }
        }
        FrameKind::Error => {
            let error = decode_error(frame.payload);
            match frame.key {
                Some(key) => {
                    if !handle.pending.complete(key, Err(error)) {
                        debug!(key, "error answer for a retired key");
                    }
                }
                // The host does not emit unsolicited errors toward the
                // remote side; log rather than crash the loop.
                None => warn!(%error, "unsolicited error frame from host"),
            }
        }
        FrameKind::Message => trace!("ignoring message frame on the remote side"),
    }
}

fn decode_error(payload: Option<Value>) -> RemoteError {
    match payload {
        Some(payload) => match serde_json::from_value::<ErrorDescriptor>(payload) {
            Ok(descriptor) => descriptor.reconstruct(),
            Err(err) => RemoteError::new("Error", format!("undecodable error payload: {err}")),
        },
        None => RemoteError::new("Error", "error frame without a payload"),
    }
}

#[cfg(test)]
mod tests {
    use pagewire_channel::{ChannelSlot, MemorySlot};
    use serde_json::json;

    use super::*;

    fn loopback_handle() -> (RemoteHandle, Arc<MemorySlot>) {
        let slot = Arc::new(MemorySlot::new());
        let handle = RemoteHandle {
            writer: SlotWriter::new(slot.clone()),
            pending: Arc::new(PendingMap::new()),
            stubs: Arc::new(Mutex::new(HashSet::new())),
        };
        (handle, slot)
    }

    #[tokio::test]
    async fn undefined_stub_rejects_without_touching_the_slot() {
        let (handle, slot) = loopback_handle();
        let err = handle.call_host("missing", vec![]).await.unwrap_err();
        assert_eq!(err.name, "TypeError");
        assert!(err.message.contains("missing"));
        assert!(!slot.is_occupied().unwrap());
    }

    #[tokio::test]
    async fn defined_stub_emits_a_keyed_call_frame() {
        let (handle, slot) = loopback_handle();
        handle.stubs.lock().unwrap().insert("double".to_string());

        let call = tokio::spawn({
            let handle = handle.clone();
            async move { handle.call_host("double", vec![json!(21)]).await }
        });

        // Wait for the frame to land, then answer it like the host would.
        let frame = loop {
            if let Some(text) = slot.try_read().unwrap() {
                break Frame::decode(&text).unwrap();
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        };
        assert_eq!(frame.kind, FrameKind::Call);
        let key = frame.key.unwrap();
        let invoke: InvokePayload = serde_json::from_value(frame.payload.unwrap()).unwrap();
        assert_eq!(invoke.name, "double");
        assert_eq!(invoke.args, vec![json!(21)]);

        handle.pending.complete(key, Ok(json!(42)));
        assert_eq!(call.await.unwrap().unwrap(), json!(42));
    }

    #[tokio::test]
    async fn console_emit_frames_one_message_per_call() {
        let (handle, slot) = loopback_handle();
        let console = handle.console();
        console.log(vec![json!("one"), json!(2)]).await.unwrap();

        let frame = Frame::decode(&slot.try_read().unwrap().unwrap()).unwrap();
        assert_eq!(frame.kind, FrameKind::Message);
        assert_eq!(frame.key, None);
        let message: MessagePayload = serde_json::from_value(frame.payload.unwrap()).unwrap();
        assert_eq!(message.source, "console");
        assert_eq!(message.kind, Some(ConsoleKind::Log));
        assert_eq!(message.data, vec![json!("one"), json!(2)]);
    }

    #[tokio::test]
    async fn report_error_frames_an_unsolicited_error() {
        let (handle, slot) = loopback_handle();
        handle
            .report_error(ErrorDescriptor::new("ReferenceError", "boom"))
            .await
            .unwrap();

        let frame = Frame::decode(&slot.try_read().unwrap().unwrap()).unwrap();
        assert_eq!(frame.kind, FrameKind::Error);
        assert_eq!(frame.key, None);
    }

    #[test]
    fn injector_install_clears_defined_stubs() {
        let stubs = Arc::new(Mutex::new(HashSet::new()));
        let injector = ServiceInjector {
            stubs: Arc::clone(&stubs),
        };
        injector.define("double").unwrap();
        assert!(stubs.lock().unwrap().contains("double"));
        injector.install().unwrap();
        assert!(stubs.lock().unwrap().is_empty());
    }
}
