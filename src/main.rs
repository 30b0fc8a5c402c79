use std::process::ExitCode;

fn main() -> ExitCode {
    narration_export_lib::run()
}
