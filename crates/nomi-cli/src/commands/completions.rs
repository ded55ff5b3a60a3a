use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;
use crate::error::CliError;

/// Write a completion script for `shell` to `output_path`, or stdout.
pub fn run_completions(shell: Shell, output_path: Option<&Path>) -> Result<(), CliError> {
    let script = completion_script(shell);

    match output_path {
        Some(path) => {
            std::fs::write(path, script)?;
            println!("{}", path.display());
        }
        None => print!("{}", String::from_utf8_lossy(&script)),
    }
    Ok(())
}

pub fn completion_script(shell: Shell) -> Vec<u8> {
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();
    let mut script = Vec::new();
    clap_complete::generate(shell, &mut command, bin_name, &mut script);
    script
}
