//! Terminal breakpoint handler: shows the paused call, reads a command.

use async_trait::async_trait;
use conductor_agent::{BreakpointCommand, BreakpointContext, BreakpointHandler};
use std::io::{BufRead, Write};

const HELP: &str = "    [c]ontinue | [s]kip | [e]dit {\"arg\": value}";

/// Breakpoint handler bound to the process's stdin and stderr.
///
/// End of input continues the call so piped runs cannot hang.
#[derive(Debug, Default)]
pub struct StdinBreakpoints;

/// Read one line from stdin without blocking the runtime.
pub async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    })
    .await
    .ok()
    .flatten()
}

#[async_trait]
impl BreakpointHandler for StdinBreakpoints {
    async fn decide(&self, context: &BreakpointContext) -> BreakpointCommand {
        eprintln!();
        eprint!("{}", context.render_verbose());
        eprintln!("{HELP}");

        loop {
            eprint!("  debug > ");
            let _ = std::io::stderr().flush();

            let Some(line) = read_line().await else {
                eprintln!();
                return BreakpointCommand::Continue;
            };
            match BreakpointCommand::parse(&line) {
                Some(command) => return command,
                None => eprintln!("{HELP}"),
            }
        }
    }
}
