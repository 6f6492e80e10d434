//! `gatherkit_log`:
//! tracing subscriber setup shared by gatherkit binaries.
//!
//! `RUST_LOG` always wins; otherwise the verbosity flags pick a level for the
//! gatherkit targets and everything else stays at `warn`.

use tracing_subscriber::EnvFilter;

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub enum EnumLogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl EnumLogLevel {
    /// `-q` beats any number of `-v`.
    pub fn from_flags(n_verbose: u8, if_quiet: bool) -> Self {
        if if_quiet {
            return Self::Error;
        }
        match n_verbose {
            0 => Self::Warn,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(level: EnumLogLevel, targets: &[&str]) -> String {
    let mut l_directives = vec!["warn".to_string()];
    l_directives.extend(
        targets
            .iter()
            .map(|target| format!("{target}={}", level.as_str())),
    );
    l_directives.join(",")
}

/// Install a stderr fmt subscriber. A second call is a no-op.
pub fn init(level: EnumLogLevel, targets: &[&str]) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level, targets)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::{EnumLogLevel, default_directives};

    #[test]
    fn quiet_overrides_verbose() {
        assert_eq!(EnumLogLevel::from_flags(3, true), EnumLogLevel::Error);
        assert_eq!(EnumLogLevel::from_flags(0, false), EnumLogLevel::Warn);
        assert_eq!(EnumLogLevel::from_flags(1, false), EnumLogLevel::Info);
        assert_eq!(EnumLogLevel::from_flags(2, false), EnumLogLevel::Debug);
        assert_eq!(EnumLogLevel::from_flags(9, false), EnumLogLevel::Trace);
    }

    #[test]
    fn directives_cover_each_target() {
        assert_eq!(
            default_directives(EnumLogLevel::Debug, &["gatherkit_io_fs", "gather_files"]),
            "warn,gatherkit_io_fs=debug,gather_files=debug"
        );
        assert_eq!(default_directives(EnumLogLevel::Warn, &[]), "warn");
    }

    #[test]
    fn init_twice_does_not_panic() {
        super::init(EnumLogLevel::Error, &["gatherkit_log"]);
        super::init(EnumLogLevel::Error, &["gatherkit_log"]);
    }
}
