use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

use cinebot::conversation::SessionStore;

use super::output::{print_blocking, StdoutSink};

const PROMPT: &str = "> ";

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    NewSession,
    Quit,
    Message(&'a str),
}

/// Commands are matched ignoring padding; any other line, blank ones
/// included, is sent as typed.
fn classify(line: &str) -> Input<'_> {
    match line.trim() {
        "/new" => Input::NewSession,
        "/quit" | "/exit" => Input::Quit,
        _ => Input::Message(line),
    }
}

/// Line-based chat on stdin. One session at a time; `/new` replaces it.
pub(super) async fn run_repl(store: &SessionStore) -> anyhow::Result<()> {
    println!("Ask me about movies in theaters. /new starts over, /quit exits.");
    let mut session = store.start().await;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_blocking(PROMPT)?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match classify(&line) {
            Input::Quit => break,
            Input::NewSession => {
                store.end(session).await?;
                session = store.start().await;
                info!("Started new session {session}");
                println!("Started a new conversation.");
            }
            Input::Message(text) => {
                let mut sink = StdoutSink::new();
                if let Err(err) = store.handle_message(session, text, &mut sink).await {
                    error!("Turn failed in session {session}: {err}");
                    eprintln!("error: {err}");
                }
            }
        }
    }

    store.end(session).await?;
    Ok(())
}
