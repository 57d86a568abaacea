//! Operator-facing console output

use std::io::{self, BufRead, Write};

use binpatch_core::ExitCode;

const RULE_WIDTH: usize = 64;

pub fn header() -> String {
    let title = format!("binpatch {}", env!("CARGO_PKG_VERSION"));
    format!("{}\n{title:^RULE_WIDTH$}\n{}", "=".repeat(RULE_WIDTH), "=".repeat(RULE_WIDTH))
}

/// Separator line with a centered caption, e.g. `----- Patching -----`.
pub fn splitter(caption: &str) -> String {
    let caption = format!(" {caption} ");
    format!("{caption:-^RULE_WIDTH$}")
}

pub fn usage() -> String {
    let mut text = String::from(
        "Usage: binpatch -c <config> [-f] [-r] [-w] [--log-file <path>] [--report <path>]\n\
         \n\
         \x20 -c <config>        use (or create) the config file; .ini is appended if missing\n\
         \x20 -f                 overwrite the config with defaults, then run (e.g. -fc <config>)\n\
         \x20 -r                 load each artifact from its newest backup when one exists\n\
         \x20 -w                 wait for Enter before exiting\n\
         \x20 --log-file <path>  also write the log to <path>\n\
         \x20 --report <path>    write a JSON run report to <path>\n\
         \n\
         Exit codes:\n",
    );
    for code in ExitCode::ALL {
        text.push_str(&format!("  {:>3}  {}\n", code.code(), code.name()));
    }
    text
}

pub fn wait_for_enter() {
    print!("Press Enter to exit...");
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}
