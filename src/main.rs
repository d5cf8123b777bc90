use anyhow::{Context, Result};
use tui_anime_app::config::AppConfig;
use tui_anime_app::internal::ui::app::App;
use tui_anime_app::tui;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first to get logging settings
    let config = AppConfig::load();

    // While the TUI owns the terminal, logs must not go to stdout/stderr.
    match tui::init() {
        Ok(terminal) => {
            let log_dir = config.logging.log_directory.as_deref().unwrap_or("logs");
            let file_appender = tracing_appender::rolling::daily(log_dir, "tui-anime-app.log");
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

            // RUST_LOG takes precedence over the config
            let env_filter = match std::env::var("RUST_LOG") {
                Ok(_) => tracing_subscriber::EnvFilter::from_default_env(),
                Err(_) => tracing_subscriber::EnvFilter::new(config.logging.filter_directives()),
            };

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact()
                .init();

            tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting");

            let mut app = App::new(config);
            let res = app.run(terminal).await;

            tui::restore().context("Failed to restore terminal")?;

            if let Err(err) = res {
                tracing::error!(error = ?err, "Application exited with error");
                eprintln!("{err:?}");
            }

            Ok(())
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .init();

            tracing::error!(error = %e, "Failed to initialize terminal");
            Err(e).context("Failed to initialize TUI")
        }
    }
}
