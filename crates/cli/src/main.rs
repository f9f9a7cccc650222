use std::process::ExitCode;

fn main() -> ExitCode {
    budgetbook_cli::run()
}
