use clap::Parser;
use std::path::PathBuf;

use cinebot::dispatch::Strategy;

#[derive(Parser, Debug)]
#[command(
    name = "cinebot",
    about = "Chat about movies in theaters: showtimes, reviews and tickets"
)]
pub struct CliArgs {
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
    /// review_prefetch, looping or tools
    #[arg(long, short = 's')]
    pub strategy: Option<Strategy>,
    #[arg(long, short = 'm')]
    pub model: Option<String>,
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub base_url: Option<String>,
    #[arg(long)]
    pub temperature: Option<f32>,
    #[arg(long)]
    pub max_tokens: Option<u32>,
    #[arg(long)]
    pub max_function_rounds: Option<usize>,
    /// YAML movie catalog to serve instead of the bundled one
    #[arg(long)]
    pub catalog: Option<PathBuf>,
    /// Answer a single message and exit
    #[arg(long, short = 'p')]
    pub prompt: Option<String>,
}
