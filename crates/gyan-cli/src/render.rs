// Terminal renderer: observes ChatState and writes what changed.

use gyan::atoms::constants::{ASSISTANT_NAME, EMPTY_CONVERSATION_HINT, THINKING_INDICATOR};
use gyan::{ChatSnapshot, Role, StateObserver, Turn};
use parking_lot::Mutex;
use std::io::Write;

struct Progress {
    rendered_turns: usize,
    busy: bool,
    user_id: Option<String>,
}

pub struct TerminalRenderer<W: Write + Send> {
    out: Mutex<W>,
    progress: Mutex<Progress>,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        TerminalRenderer {
            out: Mutex::new(out),
            progress: Mutex::new(Progress { rendered_turns: 0, busy: false, user_id: None }),
        }
    }

    pub fn welcome(&self, snapshot: &ChatSnapshot) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "── {} AI Assistant ──", ASSISTANT_NAME);
        if snapshot.turns.is_empty() {
            let _ = writeln!(out, "{}", EMPTY_CONVERSATION_HINT);
        }
        let _ = writeln!(out, "(type /quit to leave, /history to reprint the conversation)");
        let _ = out.flush();
    }

    pub fn notice(&self, message: &str) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "· {}", message);
        let _ = out.flush();
    }

    pub fn prompt(&self) {
        let mut out = self.out.lock();
        let _ = write!(out, "> ");
        let _ = out.flush();
    }

    /// Reprint every turn regardless of what has been shown already.
    pub fn history(&self, snapshot: &ChatSnapshot) {
        let mut out = self.out.lock();
        if snapshot.turns.is_empty() {
            let _ = writeln!(out, "{}", EMPTY_CONVERSATION_HINT);
        }
        for turn in &snapshot.turns {
            write_turn(&mut *out, turn);
        }
        let _ = out.flush();
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> StateObserver for TerminalRenderer<W> {
    fn on_change(&self, snapshot: &ChatSnapshot) {
        let mut progress = self.progress.lock();
        let mut out = self.out.lock();

        if snapshot.user_id != progress.user_id {
            if let Some(id) = &snapshot.user_id {
                let _ = writeln!(out, "· Your User ID: {}", id);
            }
            progress.user_id = snapshot.user_id.clone();
        }

        // The user's own line is already on screen.
        for turn in snapshot.turns.iter().skip(progress.rendered_turns) {
            if turn.role() == Role::Model {
                write_turn(&mut *out, turn);
            }
        }
        progress.rendered_turns = snapshot.turns.len();

        if snapshot.busy && !progress.busy {
            let _ = writeln!(out, "… {}", THINKING_INDICATOR);
        }
        progress.busy = snapshot.busy;
        let _ = out.flush();
    }
}

fn write_turn(out: &mut dyn Write, turn: &Turn) {
    let who = match turn.role() {
        Role::User => "You",
        Role::Model => ASSISTANT_NAME,
    };
    let stamp = turn.created_at().with_timezone(&chrono::Local).format("%H:%M");
    let _ = writeln!(out, "[{}] {} › {}", stamp, who, turn.text());
}
