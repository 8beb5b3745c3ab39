//! Preview binary - resolves one section the way a page would and prints it
//!
//! Usage:
//!   cargo run --bin preview -- hero          # Default language
//!   cargo run --bin preview -- hero sr       # Serbian, with fallback
//!
//! Uses the same environment variables as the server (DATABASE_URL or
//! CONTENT_API_URL/CONTENT_API_KEY, SUPPORTED_LANGUAGES, DEFAULT_LANGUAGE).

use anyhow::{bail, Result};
use serde_json::json;
use site_content::{build_service, build_store, config::Config, content::Resolution};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_content=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(section) = args.next() else {
        bail!("Usage: preview <section> [language]");
    };

    let config = Config::from_env()?;
    let store = build_store(&config).await?;
    let service = build_service(&config, store)?;

    let language = args
        .next()
        .unwrap_or_else(|| service.default_language().to_string());
    let key = service.key(&section, &language)?;

    info!("Resolving {}/{} from {} store", key.section, key.language, service.store_name());
    let resolution = service.resolve(&key).await?;

    let resolved_language = match &resolution {
        Resolution::Found(_) => Some(key.language.to_string()),
        Resolution::FellBack { language, .. } => Some(language.to_string()),
        Resolution::Empty => None,
    };

    let output = json!({
        "section": key.section.as_str(),
        "language": key.language.as_str(),
        "resolved_language": resolved_language,
        "status": resolution.status(),
        "content": resolution.bundle().as_ref(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
