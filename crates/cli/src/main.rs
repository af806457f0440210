use std::process::ExitCode;

fn main() -> ExitCode {
    saldo_cli::run()
}
