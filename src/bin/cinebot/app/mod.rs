mod output;
mod repl;
mod setup;

use std::sync::Arc;

use clap::Parser;
use cinebot::conversation::SessionStore;

use crate::args::CliArgs;
use crate::config::load_config;
use crate::logging::init_logging;

use output::StdoutSink;

pub async fn run() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let loaded = load_config(args.config.clone())?;
    let _logger = init_logging(&loaded.config.logging, &loaded.paths)?;

    let dispatcher = setup::build_dispatcher(&args, &loaded)?;
    let store = SessionStore::new(Arc::new(dispatcher));

    match args.prompt {
        Some(prompt) => run_once(&store, &prompt).await,
        None => repl::run_repl(&store).await,
    }
}

async fn run_once(store: &SessionStore, prompt: &str) -> anyhow::Result<()> {
    let session = store.start().await;
    let mut sink = StdoutSink::new();
    store.handle_message(session, prompt, &mut sink).await?;
    store.end(session).await?;
    Ok(())
}
