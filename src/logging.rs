use eyre::{Result, WrapErr, eyre};
use log::LevelFilter;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

const APP_NAME: &str = "certpoll";

fn level_from_env() -> LevelFilter {
    std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info".to_string())
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info)
}

/// Initialize logging with timestamped lines, to the platform log file or,
/// with `to_stderr`, to stderr.
pub fn init_logging(to_stderr: bool) -> Result<()> {
    let log_level = level_from_env();

    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level).format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {} - {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if to_stderr {
        builder.target(env_logger::Target::Stderr);
        builder.try_init().wrap_err("installing logger")?;
        log::info!("Logging initialized to stderr, level {}", log_level);
        return Ok(());
    }

    let log_path = get_log_file_path()?;
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).wrap_err_with(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .wrap_err_with(|| format!("opening log file {}", log_path.display()))?;

    builder.target(env_logger::Target::Pipe(Box::new(file)));
    builder.try_init().wrap_err("installing logger")?;

    log::info!("Logging initialized to: {}", log_path.display());
    log::info!("Log level: {}", log_level);
    Ok(())
}

/// Get the system-specific log file path
pub fn get_log_file_path() -> Result<PathBuf> {
    let log_dir = if cfg!(target_os = "macos") {
        // macOS: ~/Library/Logs/certpoll/
        dirs::home_dir()
            .ok_or_else(|| eyre!("Could not find home directory"))?
            .join("Library")
            .join("Logs")
            .join(APP_NAME)
    } else if cfg!(target_os = "linux") && nix::unistd::getuid().is_root() {
        PathBuf::from("/var/log").join(APP_NAME)
    } else {
        // ~/.local/share/certpoll/logs/ and the fallback for other systems
        dirs::data_local_dir()
            .ok_or_else(|| eyre!("Could not find local data directory"))?
            .join(APP_NAME)
            .join("logs")
    };

    Ok(log_dir.join(format!("{APP_NAME}.log")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_generation() {
        let path = get_log_file_path().unwrap();
        assert!(path.to_string_lossy().contains(APP_NAME));
        assert!(path.to_string_lossy().ends_with("certpoll.log"));
    }
}
