//! Minimal end-to-end link: evaluate a couple of scripts against an
//! in-process remote and echo its console output.
//!
//! Run with `cargo run --example console-echo`.

use std::sync::Arc;

use pagewire::bridge::{
    Bridge, BridgeEvent, LinkConfig, RemoteHandle, RemoteService, Script, ScriptCall, ScriptEngine,
    ScriptFuture,
};
use pagewire::channel::MemorySlot;
use pagewire::frame::{CallMode, ErrorDescriptor};
use serde_json::{json, Value};

/// Toy engine: sums numeric arguments in function mode and echoes
/// expression sources to the console before returning their length.
struct EchoEngine;

impl ScriptEngine for EchoEngine {
    fn execute(&self, call: ScriptCall, remote: RemoteHandle) -> ScriptFuture {
        Box::pin(async move {
            match call.mode {
                CallMode::Function => {
                    let sum: i64 = call.args.iter().filter_map(Value::as_i64).sum();
                    Ok(json!(sum))
                }
                CallMode::Expression => {
                    remote
                        .console()
                        .log(vec![json!("evaluating"), json!(call.source.clone())])
                        .await
                        .map_err(|err| ErrorDescriptor::new("Error", err.to_string()))?;
                    Ok(json!(call.source.len()))
                }
            }
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let (host_end, remote_end) = MemorySlot::pair();
    let service = RemoteService::spawn(remote_end, EchoEngine, LinkConfig::default());
    let (bridge, mut events) = Bridge::new(
        host_end,
        Arc::new(service.injector()),
        LinkConfig::default(),
    );
    bridge.attach()?;

    let echo = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                BridgeEvent::Console(message) => {
                    println!("[console.{}] {:?}", message.kind.as_str(), message.args)
                }
                BridgeEvent::PageError(error) => println!("[pageerror] {error}"),
            }
        }
    });

    let length = bridge
        .evaluate(Script::expression("document.title"), vec![])
        .await?;
    println!("expression answered: {length}");

    let sum = bridge
        .evaluate(
            Script::function("(a, b, c) => a + b + c"),
            vec![json!(1), json!(2), json!(3)],
        )
        .await?;
    println!("function answered: {sum}");

    bridge.detach();
    service.shutdown();
    echo.abort();
    Ok(())
}
