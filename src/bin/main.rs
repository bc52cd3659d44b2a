use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use cadence_rs::{cli, config, telemetry};

fn main() {
    let cli = cli::parse_from(std::env::args_os());
    let _telemetry_guard = init_tracing(cli.verbose, cli.config.as_deref());

    // First Ctrl-C stops between commits or before the next push attempt; a second
    // one exits immediately. The shutdown hook must be registered before the flag.
    let cancel = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        let _ = signal_hook::flag::register_conditional_shutdown(signal, 130, cancel.clone());
        let _ = signal_hook::flag::register(signal, cancel.clone());
    }

    if let Err(e) = cli::run(cli, cancel) {
        tracing::debug!(
            stage = %e.stage(),
            transience = ?e.transience(),
            effect = e.effect().as_str(),
            "run failed"
        );
        eprintln!("error [{}]: {e}", e.stage());
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: u8, explicit: Option<&std::path::Path>) -> telemetry::TelemetryGuard {
    let cfg = match config::load(explicit) {
        Ok(cfg) => cfg,
        Err(_) => {
            // Reported properly once the command loads config again.
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    telemetry::init(telemetry::TelemetryConfig::new(verbose, cfg.logging))
}
