//! Tracing setup for the desktop binary.

use crate::{
    config::{self, LOG_LEVEL_ENV},
    error::{AnalyzerError, Result},
};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
};

pub const CRATE_TARGET: &str = "dna_analyzer";

/// Where `--log-file` sends output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogDestination {
    StderrOnly,
    DataDir,
    File(PathBuf),
}

impl LogDestination {
    pub fn from_flag(flag: Option<Option<PathBuf>>) -> Self {
        match flag {
            None => Self::StderrOnly,
            Some(None) => Self::DataDir,
            Some(Some(path)) => Self::File(path),
        }
    }

    pub fn path(&self) -> Option<PathBuf> {
        match self {
            Self::StderrOnly => None,
            Self::DataDir => Some(config::default_log_path()),
            Self::File(path) => Some(path.clone()),
        }
    }
}

/// Quiet wins, then explicit `-v` flags, then the environment, then WARN.
pub fn level_for(verbosity: u8, quiet: bool, env_level: Option<&str>) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => env_level
            .and_then(|v| LevelFilter::from_str(v.trim()).ok())
            .unwrap_or(LevelFilter::WARN),
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// HTTP and windowing crates stay at WARN unless everything is traced.
pub fn targets_for(level: LevelFilter) -> Targets {
    let dependencies = if level == LevelFilter::TRACE {
        LevelFilter::TRACE
    } else {
        level.min(LevelFilter::WARN)
    };
    Targets::new()
        .with_target(CRATE_TARGET, level)
        .with_default(dependencies)
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AnalyzerError::Storage(format!(
                "Could not create log directory '{}': {e}",
                parent.display()
            ))
        })?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

pub fn setup_logging(verbosity: u8, quiet: bool, destination: &LogDestination) -> Result<()> {
    let env_level = std::env::var(LOG_LEVEL_ENV).ok();
    let level = level_for(verbosity, quiet, env_level.as_deref());

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    let subscriber = tracing_subscriber::registry()
        .with(targets_for(level))
        .with(stderr_layer);

    match destination.path() {
        Some(path) => {
            let file = open_log_file(&path)?;
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_thread_ids(true);
            subscriber.with(file_layer).init();
        }
        None => subscriber.init(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tracing::Level;

    #[test]
    fn flags_then_environment_then_default() {
        assert_eq!(level_for(0, false, None), LevelFilter::WARN);
        assert_eq!(level_for(0, false, Some("debug")), LevelFilter::DEBUG);
        assert_eq!(level_for(0, false, Some(" info ")), LevelFilter::INFO);
        assert_eq!(level_for(0, false, Some("chatty")), LevelFilter::WARN);
        assert_eq!(level_for(1, false, Some("trace")), LevelFilter::INFO);
        assert_eq!(level_for(2, false, None), LevelFilter::DEBUG);
        assert_eq!(level_for(9, false, None), LevelFilter::TRACE);
        assert_eq!(level_for(3, true, Some("trace")), LevelFilter::OFF);
    }

    #[test]
    fn dependencies_stay_quiet_below_trace() {
        let targets = targets_for(LevelFilter::DEBUG);
        assert!(targets.would_enable("dna_analyzer::workflows", &Level::DEBUG));
        assert!(!targets.would_enable("reqwest::connect", &Level::DEBUG));
        assert!(targets.would_enable("reqwest::connect", &Level::WARN));

        let traced = targets_for(LevelFilter::TRACE);
        assert!(traced.would_enable("winit::window", &Level::TRACE));

        let quiet = targets_for(LevelFilter::OFF);
        assert!(!quiet.would_enable("reqwest", &Level::ERROR));
    }

    #[test]
    fn log_file_flag_forms() {
        assert_eq!(LogDestination::from_flag(None).path(), None);
        assert_eq!(
            LogDestination::from_flag(Some(None)).path(),
            Some(config::default_log_path())
        );
        let custom = PathBuf::from("/tmp/run.log");
        assert_eq!(
            LogDestination::from_flag(Some(Some(custom.clone()))),
            LogDestination::File(custom)
        );
    }

    #[test]
    fn log_file_is_appended_in_a_fresh_directory() {
        let td = tempdir().unwrap();
        let path = td.path().join("logs").join("dna_analyzer.log");
        {
            use std::io::Write;
            let mut file = open_log_file(&path).unwrap();
            writeln!(file, "first").unwrap();
            let mut again = open_log_file(&path).unwrap();
            writeln!(again, "second").unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
