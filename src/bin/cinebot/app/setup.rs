use std::env;
use std::sync::Arc;

use anyhow::Context;
use log::info;
use secrecy::{ExposeSecret, SecretString};

use cinebot::backends::openai::OpenAI;
use cinebot::dispatch::{DispatchConfig, Dispatcher};
use cinebot::movies::Catalog;

use crate::args::CliArgs;
use crate::config::LoadedConfig;

const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub(super) fn build_dispatcher(args: &CliArgs, loaded: &LoadedConfig) -> anyhow::Result<Dispatcher> {
    let config = &loaded.config;

    let mut options = config.model.generation_options();
    if let Some(model) = &args.model {
        options.model = model.clone();
    }
    if let Some(temperature) = args.temperature {
        options.temperature = Some(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        options.max_tokens = Some(max_tokens);
    }

    let api_key = resolve_api_key(
        args.api_key.clone(),
        env::var(API_KEY_ENV).ok(),
        config.model.api_key.as_ref(),
    )
    .with_context(|| {
        format!(
            "no OpenAI API key: pass --api-key, set {API_KEY_ENV} or add api_key to [model] in {}",
            loaded.paths.config_file.display()
        )
    })?;
    let base_url = args.base_url.clone().or_else(|| config.model.base_url.clone());
    let provider = OpenAI::new(api_key.expose_secret().as_str(), base_url, options)?;

    let catalog = match args.catalog.as_ref().or(config.catalog.path.as_ref()) {
        Some(path) => Catalog::from_yaml_file(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => Catalog::bundled()?,
    };

    let strategy = args.strategy.unwrap_or(config.dispatch.strategy);
    let mut dispatch = DispatchConfig::from_strategy(strategy);
    if let Some(rounds) = args
        .max_function_rounds
        .or(config.dispatch.max_function_rounds)
    {
        dispatch = dispatch.with_max_function_rounds(rounds);
    }
    info!(
        "Using {strategy} strategy with model {} (up to {} function calls per turn)",
        provider.model(),
        dispatch.max_function_rounds
    );

    Ok(Dispatcher::new(
        Arc::new(provider),
        Arc::new(catalog),
        dispatch,
    ))
}

/// Flag, then environment, then config file. Blank values are skipped.
fn resolve_api_key(
    flag: Option<String>,
    env: Option<String>,
    config: Option<&SecretString>,
) -> Option<SecretString> {
    flag.into_iter()
        .chain(env)
        .chain(config.map(|key| key.expose_secret().clone()))
        .find(|key| !key.trim().is_empty())
        .map(SecretString::new)
}
