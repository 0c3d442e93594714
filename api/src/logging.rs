use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Installs the process logger: `timestamp | target | LEVEL | message`,
/// filtered by `RUST_LOG` (default `info`), written to `log_file` when given.
pub fn init_logging(log_file: Option<&str>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} | {} | {} | {}",
            buf.timestamp_millis(),
            record.target(),
            record.level(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("logger already initialised")?;
    Ok(())
}
