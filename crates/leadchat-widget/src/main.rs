use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use leadchat_contracts::ChatRole;
use leadchat_widget::config::DEFAULT_RELAY_URL;
use leadchat_widget::{
    ChatWidget, EventBus, HttpRelay, Phase, QUICK_ACTIONS, RejectReason, SendOutcome,
    WidgetConfig, WidgetEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Parser)]
#[command(name = "leadchat", version, about = "Chat with the aicorelab.dev strategist from a terminal")]
struct Cli {
    /// Base URL of the relay server
    #[arg(long, env = "LEADCHAT_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    relay_url: String,

    /// Walk through the step-wise lead form while chatting
    #[arg(long)]
    guided: bool,

    /// Fire a quick action as the first message
    #[arg(long, value_name = "LABEL")]
    quick_action: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = WidgetConfig {
        relay_url: cli.relay_url,
        guided: cli.guided,
        ..WidgetConfig::default()
    };

    let relay = HttpRelay::new(&config.relay_url).context("Failed to build relay client")?;
    let widget = Arc::new(ChatWidget::new(&config, Arc::new(relay)));
    let mounted = widget.mount(&EventBus::global())?;
    widget.open();

    if let Some(welcome) = widget.controller().messages().first() {
        println!("assistant: {}\n", welcome.content);
    }
    let renderer = tokio::spawn(render(widget.subscribe()));

    if let Some(label) = cli.quick_action.as_deref() {
        run_quick_action(&widget, label).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "/quit" => break,
            "/actions" => {
                for (index, action) in QUICK_ACTIONS.iter().enumerate() {
                    println!("  {}. {}", index + 1, action.label);
                }
            }
            command if command.starts_with("/action") => {
                let picked = command
                    .trim_start_matches("/action")
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| QUICK_ACTIONS.get(index));
                match picked {
                    Some(action) => run_quick_action(&widget, action.label).await,
                    None => println!("Usage: /action <1-{}>", QUICK_ACTIONS.len()),
                }
            }
            _ => report(widget.send(&line).await),
        }

        if let Some(capture) = widget.controller().lead_capture() {
            let wizard = capture.wizard();
            if !wizard.is_complete() {
                let (step, total) = wizard.progress();
                println!("[lead {step}/{total}] {}", wizard.question());
            }
        }
    }

    mounted.unmount();
    renderer.abort();
    Ok(())
}

async fn run_quick_action(widget: &ChatWidget, label: &str) {
    match widget.quick_action(label).await {
        Some(outcome) => report(outcome),
        None => println!("Unknown quick action: {label}"),
    }
}

fn report(outcome: SendOutcome) {
    match outcome {
        SendOutcome::Rejected(RejectReason::Busy) => println!("(still answering, one moment)"),
        SendOutcome::Rejected(RejectReason::Empty) => {}
        SendOutcome::Truncated => println!("(reply was cut short)"),
        SendOutcome::Completed | SendOutcome::Failed | SendOutcome::Cancelled => {}
    }
}

fn prompt() -> anyhow::Result<()> {
    print!("you: ");
    std::io::stdout().flush()?;
    Ok(())
}

/// Print assistant text as it streams. Updates carry the whole content, so
/// only the unseen suffix is written.
async fn render(mut events: broadcast::Receiver<WidgetEvent>) {
    let mut current: Option<(String, usize)> = None;
    let mut stdout = std::io::stdout();

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            WidgetEvent::MessageAppended(entry) if entry.role == ChatRole::Assistant => {
                let _ = write!(stdout, "assistant: {}", entry.content);
                current = Some((entry.id, entry.content.len()));
            }
            WidgetEvent::MessageUpdated { id, content } => {
                if let Some((current_id, printed)) = current.as_mut()
                    && *current_id == id
                {
                    if let Some(unseen) = content.get(*printed..) {
                        let _ = write!(stdout, "{unseen}");
                    }
                    *printed = content.len();
                }
            }
            WidgetEvent::PhaseChanged(Phase::Idle) => {
                if current.take().is_some() {
                    let _ = writeln!(stdout, "\n");
                }
            }
            _ => {}
        }
        let _ = stdout.flush();
    }
}
