use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use pobieracz::cli::{self, Cli, Command, EXIT_CANCELLED, EXIT_FAILED, Interrupt, Interrupts};
use pobieracz::config::PobieraczConfig;
use pobieracz::ui::{self, RunProgress};
use pobieracz::{Transfer, Worker, Workflow, WorkflowEvent, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = PobieraczConfig::load(&cli.config)?;

    match cli.command {
        Command::Extract { input } => {
            let text = input.read()?;
            let result = config.extractor()?.extract(&text);
            ui::print_fields(&result, &config.unknown_placeholder);
            Ok(ExitCode::SUCCESS)
        }
        Command::Fetch {
            input,
            output_dir,
            json,
        } => {
            config.apply_cli_output_dir(output_dir);
            let text = input.read()?;
            fetch(&config, &text, json).await
        }
    }
}

/// Runs one workflow to a terminal event. The first Ctrl-C cancels, a second
/// one abandons the run without waiting for a terminal event.
async fn fetch(config: &PobieraczConfig, text: &str, json: bool) -> Result<ExitCode> {
    let client =
        Transfer::build_client(config.connect_timeout()).context("failed to build HTTP client")?;
    let transfer = Transfer::new(client, config.chunk_size);
    let worker = Worker::spawn();
    let (workflow, mut events) = Workflow::new(
        config.workflow_settings(),
        config.extractor()?,
        transfer,
        worker.spawner(),
    );

    workflow.start(text)?;
    let progress = RunProgress::start();

    let mut interrupts = Interrupts::default();
    let mut listening = true;

    let code = loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break ExitCode::from(EXIT_FAILED);
                };
                progress.handle(&event);
                if let WorkflowEvent::Completed(report) = &event
                    && json
                {
                    progress.print_report(report);
                }
                if let Some(code) = cli::exit_code(&event) {
                    break ExitCode::from(code);
                }
            }
            signal = tokio::signal::ctrl_c(), if listening => match signal {
                Ok(()) => match interrupts.record() {
                    Interrupt::Cancel => {
                        workflow.cancel();
                    }
                    Interrupt::Abort => {
                        tracing::warn!(run_id = %workflow.run_id(), "aborting run");
                        progress.handle(&WorkflowEvent::Cancelled("aborted".into()));
                        break ExitCode::from(EXIT_CANCELLED);
                    }
                },
                Err(e) => {
                    listening = false;
                    tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                }
            },
        }
    };

    worker.shutdown_now();
    worker.join().await;
    Ok(code)
}
