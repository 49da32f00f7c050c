//! Line-delimited JSON-over-TCP session protocol.
//!
//! Each connection is one explorer session: a loaded snapshot plus an
//! incoming and an outgoing view. A host-side plugin drives it with
//! `FOCUS`/`DEPTH`/`FILTER`/`CLICK` commands and renders the returned trees.

use std::cell::Cell;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::api::dto::{items_dto, FocusDto};
use crate::application::view::CallTreeView;
use crate::domain::node::CallNode;
use crate::domain::settings::Settings;
use crate::domain::tree::Direction;
use crate::infrastructure::demangle::RustcDemangler;
use crate::infrastructure::snapshot::ProgramSnapshot;
use crate::ports::{CallGraphSource, Navigator};

#[derive(Debug, Deserialize)]
struct CommandReq {
    command: String,
    params: Option<serde_json::Value>,
}

/// Remembers the last address a view navigated to.
#[derive(Default)]
struct LastNavigation(Cell<Option<u64>>);

impl Navigator for LastNavigation {
    fn navigate(&self, address: u64) {
        self.0.set(Some(address));
    }
}

struct Session {
    snapshot: Option<ProgramSnapshot>,
    in_view: CallTreeView,
    out_view: CallTreeView,
    demangler: RustcDemangler,
}

impl Session {
    fn new() -> Self {
        let settings = Settings::default();
        Self {
            snapshot: None,
            in_view: CallTreeView::new(Direction::Callers, &settings),
            out_view: CallTreeView::new(Direction::Callees, &settings),
            demangler: RustcDemangler,
        }
    }

    fn snapshot(&self) -> Result<&ProgramSnapshot> {
        self.snapshot
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No snapshot loaded; send LOAD first"))
    }

    fn view_mut(&mut self, direction: Direction) -> &mut CallTreeView {
        match direction {
            Direction::Callers => &mut self.in_view,
            Direction::Callees => &mut self.out_view,
        }
    }
}

pub fn start_server(port: u16) -> Result<()> {
    let address = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&address)
        .with_context(|| format!("Failed to bind to {}", address))?;

    println!("[calltree] API server listening on {}", address);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream) {
                        eprintln!("[api] connection error: {}", e);
                    }
                });
            }
            Err(e) => eprintln!("[api] accept error: {}", e),
        }
    }

    Ok(())
}

fn handle_connection(mut stream: TcpStream) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut session = Session::new();
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match process_command(&mut session, trimmed) {
            Ok(data) => json!({
                "status": "success",
                "data": data
            }),
            Err(e) => json!({
                "status": "error",
                "message": e.to_string()
            }),
        };

        let response_str = serde_json::to_string(&response)?;
        stream.write_all(response_str.as_bytes())?;
        stream.write_all(b"\n")?;

        if let Ok(req) = serde_json::from_str::<CommandReq>(trimmed) {
            if req.command == "SHUTDOWN" {
                println!("[api] shutdown requested");
                std::process::exit(0);
            }
        }
    }
    Ok(())
}

fn process_command(session: &mut Session, json_str: &str) -> Result<serde_json::Value> {
    let req: CommandReq = serde_json::from_str(json_str).context("Invalid JSON format")?;

    match req.command.as_str() {
        "PING" => Ok(json!("PONG")),
        "LOAD" => handle_load(session, req.params),
        "FOCUS" => handle_focus(session, req.params),
        "DEPTH" => handle_depth(session, req.params),
        "FILTER" => handle_filter(session, req.params),
        "CLICK" => handle_click(session, req.params, false),
        "GOTO" => handle_click(session, req.params, true),
        "SHUTDOWN" => Ok(json!("Shutting down...")),
        _ => anyhow::bail!("Unknown command: {}", req.command),
    }
}

fn require(params: Option<serde_json::Value>) -> Result<serde_json::Value> {
    params.ok_or_else(|| anyhow::anyhow!("Missing params"))
}

fn direction_param(params: &serde_json::Value) -> Result<Direction> {
    let s = params
        .get("direction")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing 'direction' param"))?;
    Direction::parse(s).ok_or_else(|| anyhow::anyhow!("Unknown direction: {}", s))
}

fn handle_load(session: &mut Session, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
    let params = require(params)?;
    let path_str = params
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing 'path' param"))?;

    let path = Path::new(path_str);
    if !path.exists() {
        anyhow::bail!("Snapshot path not found: {}", path_str);
    }

    let snapshot = ProgramSnapshot::load(path)?;
    println!(
        "[api] loaded {} ({} functions, {} symbols)",
        path_str,
        snapshot.function_count(),
        snapshot.symbol_count()
    );

    let settings = match params.get("settings").and_then(|v| v.as_str()) {
        Some(p) => Settings::load(Path::new(p))?,
        None => Settings::default(),
    };

    session.in_view = CallTreeView::new(Direction::Callers, &settings);
    session.out_view = CallTreeView::new(Direction::Callees, &settings);

    let counts = json!({
        "functions": snapshot.function_count(),
        "symbols": snapshot.symbol_count(),
    });
    session.snapshot = Some(snapshot);
    Ok(counts)
}

fn resolve_focus(snapshot: &ProgramSnapshot, params: &serde_json::Value) -> Result<CallNode> {
    if let Some(name) = params.get("function").and_then(|v| v.as_str()) {
        return snapshot
            .function_named(name)
            .ok_or_else(|| anyhow::anyhow!("No function named {}", name));
    }
    if let Some(addr) = params.get("address").and_then(|v| v.as_u64()) {
        return snapshot
            .function_at(addr)
            .ok_or_else(|| anyhow::anyhow!("No function at {:#x}", addr));
    }
    anyhow::bail!("Missing 'function' or 'address' param")
}

fn handle_focus(session: &mut Session, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
    let params = require(params)?;
    let func = resolve_focus(session.snapshot()?, &params)?;

    let Session {
        snapshot,
        in_view,
        out_view,
        demangler,
    } = session;
    let snapshot = snapshot
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No snapshot loaded; send LOAD first"))?;

    // A view that just navigated asked the host to skip this refresh.
    if !in_view.take_skip_refresh() {
        in_view.update_focus(snapshot, demangler, &func);
    }
    if !out_view.take_skip_refresh() {
        out_view.update_focus(snapshot, demangler, &func);
    }

    let dto = FocusDto {
        function: func.name.clone(),
        address: func.address,
        incoming: items_dto(&in_view.visible_items()),
        outgoing: items_dto(&out_view.visible_items()),
    };
    Ok(serde_json::to_value(dto)?)
}

fn handle_depth(session: &mut Session, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
    let params = require(params)?;
    let direction = direction_param(&params)?;
    let depth = params
        .get("depth")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| anyhow::anyhow!("Missing 'depth' param"))? as usize;

    let Session {
        snapshot,
        in_view,
        out_view,
        demangler,
    } = session;
    let snapshot = snapshot
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No snapshot loaded; send LOAD first"))?;
    let view = match direction {
        Direction::Callers => in_view,
        Direction::Callees => out_view,
    };
    view.set_depth(snapshot, demangler, depth);
    Ok(json!({ "items": items_dto(&view.visible_items()) }))
}

fn handle_filter(session: &mut Session, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
    let params = require(params)?;
    let direction = direction_param(&params)?;
    let text = params
        .get("text")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    let view = session.view_mut(direction);
    view.set_filter(text);
    Ok(json!({ "items": items_dto(&view.visible_items()) }))
}

fn handle_click(
    session: &mut Session,
    params: Option<serde_json::Value>,
    definition: bool,
) -> Result<serde_json::Value> {
    let params = require(params)?;
    let direction = direction_param(&params)?;
    let path: Vec<usize> = params
        .get("path")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("Missing 'path' param"))?
        .iter()
        .filter_map(|v| v.as_u64())
        .map(|v| v as usize)
        .collect();

    let Session {
        snapshot,
        in_view,
        out_view,
        ..
    } = session;
    let snapshot = snapshot
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No snapshot loaded; send LOAD first"))?;
    let navigator = LastNavigation::default();
    let view = match direction {
        Direction::Callers => in_view,
        Direction::Callees => out_view,
    };
    let address = if definition {
        view.double_click(&navigator, &path)
    } else {
        view.click(snapshot, &navigator, &path)
    };
    Ok(json!({ "address": address }))
}
