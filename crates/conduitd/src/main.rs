use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match conduitd::run_daemon().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("conduitd: {error}");
            ExitCode::FAILURE
        }
    }
}
