use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    use sekisho::util::cli::*;

    dotenv::dotenv().ok();

    let opts = Options::parse();
    let stdout = std::io::stdout();
    match run_cli_action(opts, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
