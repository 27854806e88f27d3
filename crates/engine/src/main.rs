//! worldcycle - offline rotation runner.
//!
//! Wrapper scripts run this before launching the server so a pending rotation
//! is applied while no world is loaded.
//!
//! ```text
//! worldcycle [apply|preview|status]
//! ```
//!
//! `WORLDCYCLE_SERVER_DIR` selects the server root (default: current directory).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use worldcycle_engine::infrastructure::offline_host::DirectoryHost;
use worldcycle_engine::infrastructure::server_files::ServerFiles;
use worldcycle_engine::App;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worldcycle_engine=info,worldcycle_domain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let server_dir = std::env::var("WORLDCYCLE_SERVER_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    let mode = std::env::args().nth(1).unwrap_or_else(|| "apply".to_string());
    tracing::info!(server_dir = %server_dir.display(), mode = %mode, "Starting worldcycle");

    let host = Arc::new(DirectoryHost::new(ServerFiles::new(&server_dir)));
    let app = App::new(host, &server_dir);

    let output = match mode.as_str() {
        "apply" => {
            let outcome = app
                .on_host_starting()
                .context("applying the pending rotation failed, see log")?;
            serde_json::to_string_pretty(&outcome)?
        }
        "preview" => {
            let preview = app
                .preview_next_rotation()
                .context("could not preview the next rotation, see log")?;
            serde_json::to_string_pretty(&preview)?
        }
        "status" => {
            let status = app
                .current_status()
                .context("could not read status, see log")?;
            serde_json::to_string_pretty(&status)?
        }
        other => bail!("unknown mode '{}', expected apply, preview or status", other),
    };

    println!("{}", output);
    Ok(())
}
