#[path = "cinebot/app/mod.rs"]
mod app;
#[path = "cinebot/args.rs"]
mod args;
#[path = "cinebot/config/mod.rs"]
mod config;
#[path = "cinebot/logging.rs"]
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
