//! oauth-token-page - render and drive the OAuth token-acquisition page

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oauth_token_page::client::{ClientContext, ClientRuntime, ClientState, HeadlessBrowser};
use oauth_token_page::{OAuthRequestInfo, PageConfig};

#[derive(Parser, Debug)]
#[command(name = "oauth-token-page")]
#[command(about = "Render and drive the OAuth token-acquisition page")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose the page (or the fallback error page) and write it out.
    Render {
        /// Instance URL injected into the page.
        #[arg(long)]
        instance_url: String,

        /// OAuth request descriptor as JSON.
        #[arg(long, value_name = "JSON")]
        oauth_req_info: String,

        /// Settings file (TOML). Defaults to the per-user config file.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Origin the fragments are fetched from.
        #[arg(long, env = "OAUTH_PAGE_ORIGIN")]
        origin: Option<String>,

        /// Read fragments from this directory.
        #[arg(long, env = "OAUTH_PAGE_ASSET_DIR", conflicts_with = "bundled")]
        asset_dir: Option<PathBuf>,

        /// Use the fragments built into the binary.
        #[arg(long)]
        bundled: bool,

        /// Timeout for HTTP fragment fetches, e.g. "10s".
        #[arg(long, value_parser = humantime::parse_duration)]
        fetch_timeout: Option<std::time::Duration>,

        /// Write the page here instead of stdout.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Run the client flow without a browser window.
    Acquire {
        /// Instance to fetch the token from.
        #[arg(long)]
        instance_url: String,

        /// Origin of the host serving the page (`/store-token` lives here).
        #[arg(long)]
        page_origin: String,

        /// OAuth request descriptor as JSON.
        #[arg(long, value_name = "JSON")]
        oauth_req_info: String,

        /// Token text to submit if the silent fetch is refused.
        /// Read from stdin when omitted.
        #[arg(long, hide_env_values = true, env = "OAUTH_PAGE_TOKEN")]
        token: Option<String>,

        /// Open the token page in the system browser on 401.
        #[arg(long)]
        open_browser: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match args.command {
        Command::Render {
            instance_url,
            oauth_req_info,
            config,
            origin,
            asset_dir,
            bundled,
            fetch_timeout,
            output,
        } => {
            let mut settings = match config {
                Some(path) => PageConfig::load(&path)?,
                None => PageConfig::load_default()?,
            };
            if let Some(origin) = origin {
                settings.origin_prefix = origin;
            }
            if let Some(dir) = asset_dir {
                settings.asset_dir = Some(dir);
            }
            if bundled {
                settings.bundled_assets = true;
            }
            if let Some(timeout) = fetch_timeout {
                settings.fetch_timeout = timeout;
            }

            render(&settings, &instance_url, &oauth_req_info, output).await
        }
        Command::Acquire {
            instance_url,
            page_origin,
            oauth_req_info,
            token,
            open_browser,
        } => acquire(instance_url, &page_origin, &oauth_req_info, token, open_browser).await,
    }
}

/// Composes the page and writes it to `output` or stdout.
async fn render(
    settings: &PageConfig,
    instance_url: &str,
    oauth_req_info: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let composer = settings.composer()?;
    let page = composer.render_json(instance_url, oauth_req_info).await;

    match output {
        Some(path) => {
            tokio::fs::write(&path, page.as_str())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), fallback = page.is_fallback(), "Wrote page");
        }
        None => println!("{page}"),
    }

    if page.is_fallback() {
        bail!("Page composition failed; wrote the fallback error page");
    }
    Ok(())
}

/// Drives the client state machine headlessly and prints the redirect target.
async fn acquire(
    instance_url: String,
    page_origin: &str,
    oauth_req_info: &str,
    token: Option<String>,
    open_browser: bool,
) -> Result<()> {
    let info = OAuthRequestInfo::parse(oauth_req_info)?;
    let browser = HeadlessBrowser::new(page_origin)?.with_system_browser(open_browser);
    let mut runtime = ClientRuntime::new(ClientContext::new(instance_url, info), browser);

    runtime.start().await;

    if let ClientState::ManualFallback { token_url, .. } = runtime.state() {
        eprintln!("\nThe instance refused the silent token request (401).");
        eprintln!("Open this URL in a browser where you are signed in:");
        eprintln!("{}\n", token_url);

        if open_browser {
            runtime.open_token_page().await;
        }

        let input = match token {
            Some(token) => token,
            None => {
                eprintln!("Paste the response, then press Ctrl-D:");
                let mut pasted = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut pasted)
                    .await
                    .context("Failed to read token from stdin")?;
                pasted
            }
        };
        runtime.submit_manual(input).await;
    }

    match runtime.state() {
        ClientState::SuccessRedirecting { redirect_to } => {
            println!("{redirect_to}");
            Ok(())
        }
        ClientState::Failed { message } => bail!("{message}"),
        ClientState::ManualFallback {
            notice: Some(notice),
            ..
        } => bail!("{notice}"),
        other => bail!("Token acquisition stopped in state '{}'", other.name()),
    }
}
