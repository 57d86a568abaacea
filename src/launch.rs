//! Post-patch launch

use std::process::Command;

use tracing::info;

use binpatch_config::LaunchSpec;
use binpatch_core::Result;

/// Starts the configured executable once patching is done.
pub trait Launcher {
    /// Start the process and return its id without waiting for it.
    fn launch(&mut self, spec: &LaunchSpec) -> Result<u32>;
}

#[derive(Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&mut self, spec: &LaunchSpec) -> Result<u32> {
        let mut command = Command::new(&spec.executable);
        command.args(split_arguments(&spec.arguments));
        if let Some(dir) = spec.effective_working_dir() {
            command.current_dir(dir);
        }
        let child = command.spawn()?;
        info!("Started {} (pid {})", spec.executable.display(), child.id());
        Ok(child.id())
    }
}

/// Split a command line on whitespace. Double quotes group words and are
/// removed; `""` yields an empty argument.
pub fn split_arguments(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}
