//! Structured logging init, matching the teacher's `utils::init_tracing`:
//! `RUST_LOG`-driven `EnvFilter` defaulting to `INFO`, file/line enabled,
//! ANSI disabled on Windows consoles.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(target_os = "windows")]
    let use_ansi = false;
    #[cfg(not(target_os = "windows"))]
    let use_ansi = true;

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .with_ansi(use_ansi)
            .with_line_number(true)
            .with_file(true)
            .finish(),
    )?;
    Ok(())
}
