mod app;
mod render;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{Event, KeyEventKind};

use bccr_core::config::CoreConfig;
use bccr_core::tracing_setup::init_tracing;
use bccr_core::transport::MemoryTransport;
use bccr_core::CoreRuntime;

use crate::app::App;

#[derive(Parser, Debug)]
#[command(name = "bccr", about = "buddycloud console client")]
struct Args {
    /// Your channel address (user@domain).
    jid: String,

    /// Extra channels to subscribe to.
    #[arg(short = 'c', long = "channel")]
    channels: Vec<String>,

    /// Append logs to this file (or set BCCR_LOG_FILE).
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = CoreConfig::new(args.jid.clone());
    if let Some(path) = &args.log_file {
        config = config.with_log_file(path);
    }
    init_tracing(config.log_file.as_deref());

    // Restore the terminal before the panic message is printed.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let transport = Arc::new(MemoryTransport::new(&args.jid));
    for channel in &args.channels {
        transport.add_subscription(channel);
    }

    let mut runtime =
        CoreRuntime::new(&config, transport).context("failed to start the client runtime")?;
    runtime.set_active_channel(&args.jid);
    let notice_rx = runtime
        .take_notice_rx()
        .context("notice channel already taken")?;
    let mut app = App::new(&runtime, notice_rx);

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut app);
    ratatui::restore();
    runtime.shutdown();
    result
}

fn run(terminal: &mut ratatui::DefaultTerminal, app: &mut App) -> Result<()> {
    while !app.should_quit {
        app.drain_notices();
        terminal.draw(|frame| render::draw(frame, app))?;

        if crossterm::event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
    }
    Ok(())
}
