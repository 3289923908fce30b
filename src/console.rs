//! Text console host: prints the board and replays scripted pointer/toolbar
//! commands against a [`Session`]
//!
//! A script is JSON lines, one command per line:
//!
//! ```text
//! {"cmd": "edit"}
//! {"cmd": "press", "frame": "todo", "x": 320, "y": 10}
//! {"cmd": "move", "x": 330, "y": 420}
//! {"cmd": "release"}
//! {"cmd": "save"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt::Write as _;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

use crate::interaction::{CommitOutcome, PressTarget};
use crate::session::{BoardView, NavigationChoice, NavigationOutcome, Session};
use crate::store::LayoutStore;
use crate::types::Point;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ConsoleCommand {
    Edit,
    Press {
        frame: String,
        #[serde(default)]
        target: PressTarget,
        x: i32,
        y: i32,
    },
    Move {
        x: i32,
        y: i32,
    },
    Release,
    Escape,
    Save,
    Cancel,
    Reset,
    Toggle {
        frame: String,
    },
    Navigate {
        to: String,
    },
    Resolve {
        choice: NavigationChoice,
    },
    Confirm {
        allow: bool,
    },
    Show,
    Width {
        px: i32,
    },
}

/// Parse one script line. `Ok(None)` for blanks and comments.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let cmd = serde_json::from_str(line).context("Invalid console command")?;
    Ok(Some(cmd))
}

/// Apply one command and describe what happened. Session errors are reported
/// as text; they do not stop a script.
pub async fn execute<S: LayoutStore>(
    session: &mut Session,
    store: &S,
    cmd: ConsoleCommand,
) -> String {
    debug!(?cmd, "Console command");
    match cmd {
        ConsoleCommand::Edit => {
            session.enter_edit();
            "edit mode".to_string()
        }
        ConsoleCommand::Press { frame, target, x, y } => {
            format!("{:?}", session.pointer_down(&frame, target, Point::new(x, y)))
        }
        ConsoleCommand::Move { x, y } => match session.pointer_move(Point::new(x, y)) {
            Some(preview) => format!("preview {preview}"),
            None => "no gesture".to_string(),
        },
        ConsoleCommand::Release => describe_commit(&session.pointer_up()),
        ConsoleCommand::Escape => match session.cancel_gesture() {
            Some(id) => format!("gesture on '{id}' cancelled"),
            None => "no gesture".to_string(),
        },
        ConsoleCommand::Save => match session.save(store).await {
            Ok(()) => "saved".to_string(),
            Err(e) => format!("error: {e}"),
        },
        ConsoleCommand::Cancel => {
            session.cancel();
            "cancelled".to_string()
        }
        ConsoleCommand::Reset => match session.reset_to_default() {
            Ok(()) => "reset to default".to_string(),
            Err(e) => format!("error: {e}"),
        },
        ConsoleCommand::Toggle { frame } => match session.toggle_visibility(&frame) {
            Ok(true) => format!("'{frame}' shown"),
            Ok(false) => format!("'{frame}' hidden"),
            Err(e) => format!("error: {e}"),
        },
        ConsoleCommand::Navigate { to } => describe_navigation(&session.request_navigation(&to)),
        ConsoleCommand::Resolve { choice } => match session.resolve_navigation(choice, store).await {
            Ok(outcome) => describe_navigation(&outcome),
            Err(e) => format!("error: {e}"),
        },
        ConsoleCommand::Confirm { allow } => describe_navigation(&session.confirm_navigation(allow)),
        ConsoleCommand::Show => render_board(&session.view()),
        ConsoleCommand::Width { px } => {
            session.set_board_width(px);
            format!("board width {}", session.board_width())
        }
    }
}

fn describe_commit(outcome: &CommitOutcome) -> String {
    match outcome {
        CommitOutcome::NoGesture => "no gesture".to_string(),
        CommitOutcome::Unchanged { frame_id } => format!("'{frame_id}' unchanged"),
        CommitOutcome::Committed { frame_id, frame_box, .. } => {
            format!("'{frame_id}' -> {frame_box}")
        }
        CommitOutcome::Rejected { frame_id, blocked_by, .. } => {
            format!("'{frame_id}' rejected, overlaps '{blocked_by}'")
        }
    }
}

fn describe_navigation(outcome: &NavigationOutcome) -> String {
    match outcome {
        NavigationOutcome::Allowed(target) => format!("navigate to {target}"),
        NavigationOutcome::Blocked(target) => {
            format!("unsaved changes, leaving for {target} needs save/discard/cancel")
        }
        NavigationOutcome::Stay => "staying".to_string(),
    }
}

/// Replay a script, writing one result line per command. A line that does not
/// parse aborts the run.
pub async fn run_script<S, R, W>(session: &mut Session, store: &S, script: R, out: &mut W) -> Result<()>
where
    S: LayoutStore,
    R: BufRead,
    W: Write,
{
    for (n, line) in script.lines().enumerate() {
        let line = line.context("Failed to read script")?;
        let Some(cmd) = parse_line(&line).with_context(|| format!("line {}", n + 1))? else {
            continue;
        };
        let result = execute(session, store, cmd).await;
        if result.starts_with("error:") {
            warn!(line = n + 1, result = %result, "Command failed");
        }
        writeln!(out, "{result}")?;
    }
    Ok(())
}

/// Plain text table of a board view
pub fn render_board(view: &BoardView) -> String {
    let mut out = String::new();
    let mode = if view.edit_mode { "edit" } else { "view" };
    let dirty = if view.dirty { " (unsaved)" } else { "" };
    let _ = writeln!(out, "mode: {mode}{dirty}  height: {}", view.height);

    let title_width = view
        .frames
        .iter()
        .map(|f| f.title.len())
        .max()
        .unwrap_or(0)
        .max(5);
    for f in &view.frames {
        let marker = if f.dragging { "*" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {:<title_width$}  {:>5} {:>5} {:>5} {:>5}",
            f.title, f.frame_box.x, f.frame_box.y, f.frame_box.w, f.frame_box.h
        );
    }

    let actions: Vec<String> = view
        .toolbar
        .iter()
        .map(|a| format!("{a:?}").to_lowercase())
        .collect();
    let _ = write!(out, "[{}]", actions.join("] ["));
    out
}
