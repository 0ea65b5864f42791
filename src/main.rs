use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = jack::cli::parse();
    if let Err(e) = jack::tracing::init(cli.log_file.as_deref()) {
        log::warn!("⚠️ Logging to stderr only, log file unavailable: {e}");
    }

    match jack::app::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Operation failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
