use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Default directives when `RUST_LOG` is unset. Both binaries log under their
/// own crate targets.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "scratch_harvest=debug,compose_env=debug,info"
    } else {
        "scratch_harvest=info,compose_env=info"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Console logging plus, when `log_file` is given, a plain-text copy of every
/// event in that file (the per-session `session.log`).
pub fn init_cli_logger(verbose: bool, json: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    let console = if json {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .boxed()
    };

    let file_layer = match log_file {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(console)
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_enables_debug_for_both_binaries() {
        let directives = default_directives(true);
        assert!(directives.contains("scratch_harvest=debug"));
        assert!(directives.contains("compose_env=debug"));
        assert!(!default_directives(false).contains("debug"));
    }

    #[test]
    fn test_default_directives_parse() {
        for verbose in [true, false] {
            assert!(EnvFilter::try_new(default_directives(verbose)).is_ok());
        }
    }
}
