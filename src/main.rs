use clap::Parser;
use code_exec::Language;
use code_exec_server::{create_app, run_server};
use code_runner::{build_state, AppConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address to listen on
    #[arg(short, long)]
    addr: Option<SocketAddr>,

    /// Base URL of the Piston-compatible runtime
    #[arg(long)]
    runtime_url: Option<String>,

    /// Per-run timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Language available without a Pro entitlement
    #[arg(long, value_parser = parse_language)]
    free_tier_language: Option<Language>,

    /// TOML file overriding runtime versions per language
    #[arg(long)]
    languages_file: Option<PathBuf>,
}

fn parse_language(tag: &str) -> Result<Language, String> {
    tag.parse().map_err(|e: code_exec::Error| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(addr) = args.addr {
        config = config.with_listen_addr(addr);
    }
    if let Some(url) = args.runtime_url {
        config = config.with_runtime_url(url);
    }
    if let Some(secs) = args.timeout {
        config = config.with_run_timeout_secs(secs);
    }
    if let Some(language) = args.free_tier_language {
        config = config.with_free_tier_language(language);
    }
    if let Some(path) = args.languages_file {
        config = config.with_languages_file(path);
    }
    config.validate()?;

    let app = create_app(build_state(&config)?);
    run_server(app, config.listen_addr).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_tier_and_languages_file_flags() {
        let args = Args::try_parse_from([
            "code-runner",
            "--free-tier-language",
            "python",
            "--languages-file",
            "languages.toml",
        ])
        .unwrap();
        assert_eq!(args.free_tier_language, Some(Language::Python));
        assert_eq!(args.languages_file, Some(PathBuf::from("languages.toml")));
    }

    #[test]
    fn test_unknown_free_tier_language_is_rejected() {
        let result = Args::try_parse_from(["code-runner", "--free-tier-language", "cobol"]);
        assert!(result.is_err());
    }
}
