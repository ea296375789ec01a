//! Expert panel command-line interface.
//!
//! ```bash
//! expert-panel          # read a message from stdin, route it, answer it
//! expert-panel sample   # answer the built-in sample message with a fixed panel
//! ```
//!
//! Settings and API keys may also come from a `.env` file in the working
//! directory or a parent. Logging goes through `env_logger`; set
//! `RUST_LOG=expert_panel=debug` for per-unit detail.

use std::sync::Arc;

use anyhow::Context;
use expert_panel::config::{load_env_file, DEFAULT_SPECIALISTS};
use expert_panel::display::{read_message, Printer};
use expert_panel::{ExpertPanel, PanelConfig, PanelOutput, UnitOfWork};

const SAMPLE_MESSAGE: &str = "\
Subject: Strategic Team Restructuring and Leadership Alignment

Hi Expert Panel,

We're facing a critical decision about restructuring our 150-person engineering team \
while maintaining momentum on our key product initiatives. The challenge involves:

1. Leadership alignment across multiple product lines
2. Scaling team communication and decision-making processes
3. Negotiating resource allocation between competing priorities
4. Maintaining innovation velocity during organizational change

Looking for strategic guidance on approach and timing.

Best regards,
Sarah Johnson
VP Engineering";

const USAGE: &str = "\
Usage: expert-panel [sample]

  (no command)  read a message from stdin (finish with two empty lines)
  sample        answer a built-in sample message with a fixed panel";

#[tokio::main]
async fn main() {
    let env_file = load_env_file(None);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let printer = Printer::default();
    match env_file {
        Ok(Some(path)) => log::info!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(err) => {
            printer.error(&err.to_string());
            std::process::exit(1);
        }
    }
    let command = std::env::args().nth(1).map(|c| c.to_lowercase());

    let result = match command.as_deref() {
        None => run_interactive(&printer).await,
        Some("sample") => run_sample(&printer).await,
        Some(other) => {
            printer.error(&format!("Unknown command: {}", other));
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        printer.error(&format!("An error occurred while running the panel: {:#}", err));
        std::process::exit(1);
    }
}

fn build_panel(printer: &Printer) -> anyhow::Result<ExpertPanel> {
    let config = PanelConfig::from_env().context("invalid panel configuration")?;
    let progress = printer.clone();
    let panel = ExpertPanel::from_config(config)
        .context("failed to initialize expert panel")?
        .with_unit_callback(Arc::new(move |unit: &UnitOfWork| progress.unit_finished(unit)));
    Ok(panel)
}

async fn run_interactive(printer: &Printer) -> anyhow::Result<()> {
    let panel = build_panel(printer)?;
    printer.banner(panel.registry(), panel.config().max_experts);

    println!("\nEnter the message (press Enter twice when finished):");
    printer.rule(40);
    let message = read_message(std::io::stdin().lock()).context("failed to read message from stdin")?;
    if message.is_empty() {
        printer.error("No message provided. Exiting...");
        std::process::exit(1);
    }

    println!("\n📧 Processing message ({} characters)...", message.chars().count());
    printer.step("🧠 Router analyzing message content...");
    let routing = panel.route(&message).await?;
    printer.routing(&routing, panel.registry());

    printer.step("💬 Expert panel providing insights...");
    let output = panel.execute(&message, routing).await?;
    finish(printer, &panel, &output)
}

async fn run_sample(printer: &Printer) -> anyhow::Result<()> {
    let panel = build_panel(printer)?;

    printer.step("🧪 Running with the sample message and a fixed panel...");
    println!("🎯 Selected experts: {}", DEFAULT_SPECIALISTS.join(", "));
    let output = panel
        .run_with_selection(SAMPLE_MESSAGE, DEFAULT_SPECIALISTS.iter().copied())
        .await?;
    finish(printer, &panel, &output)
}

fn finish(printer: &Printer, panel: &ExpertPanel, output: &PanelOutput) -> anyhow::Result<()> {
    let path = &panel.config().output_file;
    output.save(path)?;
    printer.result(output, &path.display().to_string());
    println!("Finished in {:.1}s (run {})", output.duration_secs(), output.run_id);
    Ok(())
}
