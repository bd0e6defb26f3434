use anyhow::{Context, Result};
use clap::Parser;
use lapseterm::{
    config::AppConfig,
    init_logging, log_debug, log_file_path,
    scheduler::{shared_camera, EventSink, SessionController},
    telemetry::init_tracing,
    ui, TimelapseApp,
};
use std::{env, fs};

#[cfg(not(test))]
fn main() -> Result<()> {
    run_with_args(env::args_os())
}

#[cfg_attr(test, allow(dead_code))]
fn run_with_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let mut config = AppConfig::parse_from(args);
    config.validate()?;

    if config.print_config {
        print!("{}", config.render_summary());
        return Ok(());
    }

    init_logging(&config);
    init_tracing(&config);
    log_debug("=== LapseTerm Started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            config.output_dir.display()
        )
    })?;

    let camera = config.capture_device()?;
    log_debug(&format!("capture command: {}", config.capture_cmd));
    let (events, receiver) = EventSink::channel();
    let controller = SessionController::new(
        config.scheduler_settings(),
        shared_camera(camera),
        Box::new(config.exporter()),
        events,
    );
    let mut app = TimelapseApp::new(controller, receiver);
    let result = ui::run_app(&mut app);

    log_debug("=== LapseTerm Exiting ===");
    if let Err(ref e) = result {
        log_debug(&format!("Exit with error: {e:#}"));
    }

    result
}
