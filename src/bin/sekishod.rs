use clap::Parser;
use std::process::ExitCode;
use tracing::{event, Level};

#[tokio::main]
async fn main() -> ExitCode {
    use sekisho::daemon::{init_tracing, sekishod};
    use sekisho::util::config::Config;

    dotenv::dotenv().ok();
    init_tracing();

    let config = Config::parse();
    match sekishod(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            event!(Level::ERROR, error = %e, "sekishod exited");
            ExitCode::FAILURE
        }
    }
}
