//! Chanda console entry point.

use chanda_console::commands::{run_repl, Command, Console, Outcome};
use chanda_console::config::{strip_config_args, ConsoleConfig};
use chanda_console::error::ConsoleError;
use chanda_console::telemetry::init_tracing;
use std::io::IsTerminal;

#[tokio::main]
async fn main() -> Result<(), ConsoleError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = ConsoleConfig::load(&args)?;
    init_tracing(&config.logging)?;

    let mut console = Console::from_config(&config)?;
    let rest = strip_config_args(&args);

    if rest.is_empty() {
        let interactive = std::io::stdin().is_terminal();
        let input = tokio::io::BufReader::new(tokio::io::stdin());
        return run_repl(&mut console, input, &mut std::io::stdout(), interactive).await;
    }

    if let Outcome::Output(text) = console.execute(Command::parse(&rest)?).await? {
        println!("{}", text);
    }
    Ok(())
}
