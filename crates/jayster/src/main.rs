//! Jayster: terminal front-end for the Assessment ATM contract

use std::io::{self, Write};
use std::rc::Rc;

use jayster_adapters::AdapterConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;

mod app;
mod command;

use app::{App, Flow};
use command::Command;

fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("Starting Jayster");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let app = Rc::new(App::new(&AdapterConfig::from_env()));
    LocalSet::new().block_on(&runtime, run(app))?;

    tracing::info!("Jayster stopped");
    Ok(())
}

async fn run(app: Rc<App>) -> eyre::Result<()> {
    println!("Welcome to Jayster");
    app.start().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("jayster> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        if command.suspends() {
            let app = Rc::clone(&app);
            tokio::task::spawn_local(async move {
                app.handle(command).await;
            });
        } else if app.handle(command).await == Flow::Quit {
            break;
        }
    }
    Ok(())
}
