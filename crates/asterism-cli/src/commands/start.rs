//! Implementation of the `asterism start` command.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use asterism_config::BaseConfig;
use asterism_deploy::StartOptions;
use asterism_vault::{EnvSnapshot, GITHUB_TOKEN_VAR};

pub async fn run(path: &Path, extra: Option<String>, options: Vec<String>, pull: bool) -> Result<()> {
    let base = BaseConfig::load(path)?;
    let mut env = EnvSnapshot::capture();
    if base.vault()?.needs_github_token(&env) {
        env = env.with(GITHUB_TOKEN_VAR, prompt_github_token()?);
    }

    let orchestrator = super::orchestrator()?.with_env(env);
    let opts = StartOptions {
        overlay: extra,
        overrides: options,
        pull,
    };
    let config = orchestrator.start(path, &opts).await?;
    println!(
        "Constellation {} started: {}",
        config.container_prefix, config.web_url
    );
    Ok(())
}

fn prompt_github_token() -> Result<String> {
    eprint!("GitHub token for vault login: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}
