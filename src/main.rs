use std::process::ExitCode;
use u_simopt::config::StudyConfig;
use u_simopt::study::run_study;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: u-simopt <study.toml|study.json>");
        return ExitCode::from(2);
    };

    let config = match StudyConfig::from_path(&path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(2);
        }
    };

    match run_study(&config) {
        Ok(result) if result.is_aborted() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
