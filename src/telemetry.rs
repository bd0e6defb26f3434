use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// JSON-lines trace file; `LAPSETERM_TRACE_LOG` overrides the temp-dir default.
pub(crate) fn tracing_log_path() -> PathBuf {
    env::var("LAPSETERM_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("lapseterm_trace.jsonl"))
}

/// Install the global JSON subscriber once. Session events land here as structured records.
pub fn init_tracing(config: &AppConfig) {
    if !config.logs || config.no_logs {
        return;
    }

    let _ = TRACING_INIT.get_or_init(|| {
        let path = tracing_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(err) => {
                crate::log_debug(&format!(
                    "trace log '{}' unavailable: {err}",
                    path.display()
                ));
                return;
            }
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_target(true)
            .with_thread_names(true)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::info!(
                target: "lapseterm",
                version = env!("CARGO_PKG_VERSION"),
                "tracing started"
            );
        }
    });
}
