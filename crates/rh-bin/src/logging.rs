use anyhow::Result;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Initializes the global logger, tees log lines to `logfile`, and returns a
/// progress-bar handle that can coexist with log output on the terminal.
pub fn init_logging_with_progress(logfile: &Path) -> Result<MultiProgress> {
    let file = OpenOptions::new().create(true).append(true).open(logfile)?;
    let file = Mutex::new(file);

    let logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(move |buf, record| {
            let line = format!(
                "[{} {} {}] {}\n",
                chrono::Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                record.args()
            );
            if let Ok(mut f) = file.lock() {
                let _ = f.write_all(line.as_bytes());
            }
            writeln!(buf, "{}", line.trim_end())
        })
        .build();

    let progress = MultiProgress::new();
    LogWrapper::new(progress.clone(), logger).try_init()?;
    Ok(progress)
}
