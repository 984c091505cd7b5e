use std::process::ExitCode;

fn main() -> ExitCode {
    match simplejrpcd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("simplejrpcd: {error}");
            ExitCode::FAILURE
        }
    }
}
