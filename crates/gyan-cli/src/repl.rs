// Interactive loop: stdin lines in, one pending submission at a time.

use crate::render::TerminalRenderer;
use gyan::{ChatSession, Sleeper, SubmitOutcome, Transport};
use log::error;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const STILL_WAITING: &str = "Still waiting for Gyan; that message was not sent.";

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    Quit,
    Eof,
}

/// Forward stdin lines from a detached OS thread. A blocking read there
/// never holds up runtime shutdown.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Drive `session` from `lines` until `/quit`, `/exit` or end of input.
/// On end of input an outstanding reply is awaited; on quit it is dropped.
pub async fn run<T, S, W>(
    session: Arc<ChatSession<T, S>>,
    renderer: &TerminalRenderer<W>,
    mut lines: mpsc::UnboundedReceiver<String>,
) -> LoopEnd
where
    T: Transport + 'static,
    S: Sleeper + 'static,
    W: Write + Send,
{
    let mut pending: Option<JoinHandle<SubmitOutcome>> = None;
    renderer.prompt();

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    if let Some(handle) = pending.take() {
                        finish(handle, renderer).await;
                    }
                    return LoopEnd::Eof;
                };
                match line.trim() {
                    "/quit" | "/exit" => {
                        if let Some(handle) = pending.take() {
                            handle.abort();
                        }
                        return LoopEnd::Quit;
                    }
                    "/history" => {
                        renderer.history(&session.state().snapshot());
                        renderer.prompt();
                    }
                    "" => renderer.prompt(),
                    _ if pending.is_some() => {
                        renderer.notice(STILL_WAITING);
                        renderer.prompt();
                    }
                    _ => pending = Some(spawn_submit(session.clone(), line.clone())),
                }
            }
            outcome = wait_pending(&mut pending), if pending.is_some() => {
                pending = None;
                if let Err(e) = outcome {
                    error!("[chat] submission task failed: {}", e);
                }
                renderer.prompt();
            }
        }
    }
}

async fn wait_pending(
    pending: &mut Option<JoinHandle<SubmitOutcome>>,
) -> Result<SubmitOutcome, tokio::task::JoinError> {
    match pending.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn spawn_submit<T, S>(session: Arc<ChatSession<T, S>>, line: String) -> JoinHandle<SubmitOutcome>
where
    T: Transport + 'static,
    S: Sleeper + 'static,
{
    tokio::spawn(async move { session.submit(&line).await })
}

async fn finish<W: Write + Send>(handle: JoinHandle<SubmitOutcome>, renderer: &TerminalRenderer<W>) {
    if let Err(e) = handle.await {
        error!("[chat] submission task failed: {}", e);
    }
    renderer.prompt();
}
