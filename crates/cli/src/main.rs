use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tutorkit_cli::run().await
}
