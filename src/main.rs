use std::process::ExitCode;

fn main() -> ExitCode {
    facewatch::run_cli()
}
