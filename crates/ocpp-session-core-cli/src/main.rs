//! Drive an `ocpp-session-core` engine from newline-delimited JSON commands,
//! printing each lifecycle event as a JSON line on stdout. Intended as a
//! demo/inspection harness, not a real OCPP client — `DemoTransport` below
//! loops messages back through an in-memory queue instead of a socket.

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use ocpp_session_core::{
    Engine, Event, Message, MessageType, Role, SystemClock, Transport, TransportError, UuidGenerator,
    CONFIG_HEARTBEAT_INTERVAL, CONFIG_TX_ATTEMPTS, CONFIG_TX_RETRY_INTERVAL,
};
use serde::{Deserialize, Serialize};

/// Drive an OCPP session-core engine from stdin commands.
#[derive(Parser, Debug)]
#[command(name = "ocpp-session-core-cli", about = "Drive an OCPP session-core engine from stdin commands")]
struct Args {
    /// Read commands from a file instead of stdin.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Number of scheduler ticks to run after each command.
    #[arg(long, default_value_t = 1)]
    ticks_per_command: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Command {
    PushRequest {
        msg_type: String,
        #[serde(default)]
        payload: String,
        #[serde(default)]
        force: bool,
    },
    PushRequestDefer {
        msg_type: String,
        #[serde(default)]
        payload: String,
        #[serde(default)]
        timer_sec: u64,
    },
    PushResponse {
        request_id: String,
        msg_type: String,
        #[serde(default)]
        payload: String,
        #[serde(default)]
        is_error: bool,
    },
    /// Queue a message for the engine to pick up on its next inbound poll.
    Incoming {
        id: String,
        role: String,
        msg_type: String,
        #[serde(default)]
        payload: String,
    },
    SetConfig {
        key: String,
        value: i64,
    },
    /// Run a tick with no other side effect (useful to drain timers/heartbeats).
    Step,
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum OutEvent {
    Incoming { id: String, msg_type: String, payload: String },
    Outgoing { id: String, msg_type: String, payload: String },
    Free { id: String, msg_type: String, payload: String },
    Error { message: String },
}

/// Loopback transport for the demo harness: `send` prints the outgoing
/// message instead of writing to a socket, `recv` drains a queue fed by
/// `Command::Incoming`.
struct DemoTransport {
    inbound: Mutex<VecDeque<Message>>,
}

impl DemoTransport {
    fn new() -> Self {
        Self { inbound: Mutex::new(VecDeque::new()) }
    }

    fn push_inbound(&self, msg: Message) {
        self.inbound.lock().expect("inbound mutex poisoned").push_back(msg);
    }
}

impl Transport for DemoTransport {
    fn send(&self, msg: &Message) -> Result<(), TransportError> {
        print_event(OutEvent::Outgoing {
            id: msg.id.clone(),
            msg_type: msg.msg_type.as_str().to_string(),
            payload: String::from_utf8_lossy(&msg.payload).into_owned(),
        });
        Ok(())
    }

    fn recv(&self) -> Result<Option<Message>, TransportError> {
        Ok(self.inbound.lock().expect("inbound mutex poisoned").pop_front())
    }
}

fn print_event(event: OutEvent) {
    println!("{}", serde_json::to_string(&event).expect("OutEvent always serializes"));
}

fn on_event(event: Event) {
    let out = match event {
        Event::Incoming(msg) => OutEvent::Incoming {
            id: msg.id,
            msg_type: msg.msg_type.as_str().to_string(),
            payload: String::from_utf8_lossy(&msg.payload).into_owned(),
        },
        Event::Outgoing(msg) => OutEvent::Outgoing {
            id: msg.id,
            msg_type: msg.msg_type.as_str().to_string(),
            payload: String::from_utf8_lossy(&msg.payload).into_owned(),
        },
        Event::Free(msg) => OutEvent::Free {
            id: msg.id,
            msg_type: msg.msg_type.as_str().to_string(),
            payload: String::from_utf8_lossy(&msg.payload).into_owned(),
        },
        Event::Error(err) => OutEvent::Error { message: err.to_string() },
    };
    print_event(out);
}

fn parse_role(name: &str) -> Result<Role, String> {
    match name {
        "Call" => Ok(Role::Call),
        "CallResult" => Ok(Role::CallResult),
        "CallError" => Ok(Role::CallError),
        other => Err(format!("unknown role: {other}")),
    }
}

fn parse_msg_type(name: &str) -> Result<MessageType, String> {
    MessageType::from_str(name).ok_or_else(|| format!("unknown message type: {name}"))
}

fn known_config_key(name: &str) -> Result<&'static str, String> {
    match name {
        "HeartbeatInterval" => Ok(CONFIG_HEARTBEAT_INTERVAL),
        "TransactionMessageRetryInterval" => Ok(CONFIG_TX_RETRY_INTERVAL),
        "TransactionMessageAttempts" => Ok(CONFIG_TX_ATTEMPTS),
        other => Err(format!("unknown or read-only configuration key: {other}")),
    }
}

fn apply(engine: &Engine<DemoTransport, SystemClock, UuidGenerator>, command: Command) -> Result<(), String> {
    match command {
        Command::PushRequest { msg_type, payload, force } => {
            let msg_type = parse_msg_type(&msg_type)?;
            engine.push_request(msg_type, payload.into_bytes(), force).map_err(|e| e.to_string())?;
            Ok(())
        }
        Command::PushRequestDefer { msg_type, payload, timer_sec } => {
            let msg_type = parse_msg_type(&msg_type)?;
            engine.push_request_defer(msg_type, payload.into_bytes(), timer_sec).map_err(|e| e.to_string())?;
            Ok(())
        }
        Command::PushResponse { request_id, msg_type, payload, is_error } => {
            let msg_type = parse_msg_type(&msg_type)?;
            engine
                .push_response(&request_id, msg_type, payload.into_bytes(), is_error)
                .map_err(|e| e.to_string())
        }
        Command::Incoming { id, role, msg_type, payload } => {
            let role = parse_role(&role)?;
            let msg_type = parse_msg_type(&msg_type)?;
            engine.transport().push_inbound(Message { id, role, msg_type, payload: payload.into_bytes() });
            Ok(())
        }
        Command::SetConfig { key, value } => {
            let key = known_config_key(&key)?;
            engine.config().set_int(key, value);
            Ok(())
        }
        Command::Step => Ok(()),
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let engine = Engine::new(DemoTransport::new(), SystemClock, UuidGenerator);
    engine.init(Box::new(on_event)).expect("init never fails");

    let reader: Box<dyn BufRead> = match &args.file {
        Some(path) => {
            let file = std::fs::File::open(path).unwrap_or_else(|e| {
                eprintln!("error opening {}: {e}", path.display());
                std::process::exit(1);
            });
            Box::new(io::BufReader::new(file))
        }
        None => Box::new(io::BufReader::new(io::stdin())),
    };

    for line in reader.lines() {
        let line = line.unwrap_or_else(|e| {
            eprintln!("error reading input: {e}");
            std::process::exit(1);
        });
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command: Command = match serde_json::from_str(line) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("skipping malformed command: {e}");
                continue;
            }
        };

        if let Err(e) = apply(&engine, command) {
            eprintln!("command failed: {e}");
        }

        for _ in 0..args.ticks_per_command {
            engine.step().expect("step never fails");
        }
    }
}
