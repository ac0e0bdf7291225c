#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;
mod output;

use std::path::Path;
use std::process::ExitCode;

use args::Args;
use clap::Parser;
use futures_util::StreamExt;
use output::Printer;
use switchboard_config::Config;
use switchboard_llm::{ApprovalDecision, LlmService, Message, Request, StreamEvent};
use tokio_util::sync::CancellationToken;

/// Loaded from the working directory when `--config` is not given
const DEFAULT_CONFIG: &str = "switchboard.toml";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(Path::new(DEFAULT_CONFIG))?,
        None => Config::default(),
    };

    switchboard_telemetry::init(config.telemetry.as_ref(), "warn")?;

    let service = LlmService::from_config(&config);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let request = build_request(&args).with_cancel(cancel);
    let mut printer = Printer::new(std::io::stdout(), std::io::stderr());

    if args.no_stream {
        let message = service.complete_with_retry(request).await;
        if let Some(error) = &message.error {
            printer.print(&StreamEvent::Error(error.clone()))?;
        } else {
            printer.print(&StreamEvent::TextDelta(message.content))?;
            printer.print(&StreamEvent::Done)?;
        }
    } else {
        let mut events = service.stream_with_retry(request);
        while let Some(event) = events.next().await {
            printer.print(&event)?;
        }
    }

    Ok(if printer.failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn build_request(args: &Args) -> Request {
    let mut request = match &args.resume {
        Some(response_id) => {
            let decisions = args
                .approve
                .iter()
                .map(|id| (id, true))
                .chain(args.deny.iter().map(|id| (id, false)))
                .map(|(id, approve)| ApprovalDecision {
                    approval_request_id: id.clone(),
                    approve,
                    reason: None,
                })
                .collect();
            Request::continuation(&args.model, response_id, decisions)
        }
        None => Request::new(
            &args.model,
            vec![Message::user(args.prompt.clone().unwrap_or_default())],
        ),
    };

    if let Some(system) = &args.system {
        request = request.with_system_prompt(system);
    }

    request
}
