//! A chat room served by an in-process hub.
//!
//! Run with `RUST_LOG=hubwire=debug cargo run -p hubwire --example chat` to
//! see the proxy's own logging.

use std::sync::Arc;

use hubwire::telemetry::TelemetryConfig;
use hubwire::{HubProxy, HubwireError, TypedHubProxy, Value};
use hubwire_loopback::LoopbackHub;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub user: String,
    pub text: String,
}

/// What the chat hub lets clients call.
#[hubwire::contract(rename_all = "PascalCase")]
pub trait ChatServer {
    /// Joins the room and returns how many users are in it.
    fn join(&self, user: String) -> u32;
    fn send(&self, message: Message);
    #[hub(name = "GetHistory")]
    fn history(&self, count: u32) -> Vec<Message>;
}

/// What the chat hub pushes to clients.
#[hubwire::contract(rename_all = "PascalCase")]
pub trait ChatClient {
    fn joined(&self, user: String, online: u32);
    fn received(&self, message: Message);
}

fn chat_hub() -> Arc<LoopbackHub> {
    let hub = Arc::new(LoopbackHub::new("chat"));
    let history = Arc::new(std::sync::Mutex::new(Vec::<Value>::new()));

    let events = Arc::downgrade(&hub);
    hub.method_fn("Join", move |ctx| {
        let user = ctx.arg(0)?.clone();
        if let Some(hub) = events.upgrade() {
            hub.push("Joined", vec![user, json!(1)]);
        }
        Ok(json!(1))
    });

    let events = Arc::downgrade(&hub);
    let log = Arc::clone(&history);
    hub.method_fn("Send", move |ctx| {
        let message = ctx.arg(0)?.clone();
        log.lock()
            .map_err(|_| hubwire::HubError::Transport("history poisoned".into()))?
            .push(message.clone());
        if let Some(hub) = events.upgrade() {
            hub.push("Received", vec![message]);
        }
        Ok(Value::Null)
    });

    hub.method_fn("GetHistory", move |ctx| {
        let count = ctx.arg(0)?.as_u64().unwrap_or_default() as usize;
        let log = history
            .lock()
            .map_err(|_| hubwire::HubError::Transport("history poisoned".into()))?;
        let start = log.len().saturating_sub(count);
        Ok(Value::Array(log[start..].to_vec()))
    });

    hub
}

#[tokio::main]
async fn main() -> Result<(), HubwireError> {
    if let Err(err) = TelemetryConfig::builder()
        .service_name("hubwire-chat")
        .log_level("info")
        .build()
        .init()
    {
        eprintln!("telemetry disabled: {err}");
    }

    let hub = chat_hub();
    let chat = TypedHubProxy::<dyn ChatServer, dyn ChatClient>::new(hub.clone())?;
    chat.set_state("user", json!("ana"));

    let _joined = chat.on(|c| c.joined(), |user: String, online: u32| {
        println!("* {user} joined ({online} online)");
    })?;
    let received = chat.on(|c| c.received(), |message: Message| {
        println!("<{}> {}", message.user, message.text);
    })?;

    let online = chat.invoke(|s| s.join("ana"))?.await?;
    println!("room has {online} user(s)");

    for text in ["hello", "anyone here?"] {
        let message = Message {
            user: "ana".to_string(),
            text: text.to_string(),
        };
        chat.send(|s| s.send(message))?.await?;
    }

    received.dispose();
    chat.send(|s| {
        s.send(Message {
            user: "ana".to_string(),
            text: "nobody hears this one".to_string(),
        })
    })?
    .await?;

    let history = chat.invoke(|s| s.history(10))?.await?;
    println!("history holds {} messages", history.len());
    println!("invocations: {}", hub.invocations().len());
    println!("state user = {:?}", hub.state("user"));

    hubwire::telemetry::shutdown_tracing();
    Ok(())
}
