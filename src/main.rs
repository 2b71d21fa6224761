use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use lead_funnel::abandonment::LifecycleSignal;
use lead_funnel::cli::{self, Command};
use lead_funnel::config::FunnelConfig;
use lead_funnel::engagement::scroll_sources;
use lead_funnel::events::event_channel;
use lead_funnel::funnel::{Funnel, HeadlessPresenter, Signal, Stores};
use lead_funnel::store::{KeyValueStore, LibSqlStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the event stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = FunnelConfig::from_env().context("Invalid funnel configuration")?;

    let durable = LibSqlStore::open(&config.store_path).with_context(|| {
        format!("Failed to open store at {}", config.store_path.display())
    })?;
    let stores = Stores {
        ephemeral: Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>,
        durable: Arc::new(durable) as Arc<dyn KeyValueStore>,
    };

    eprintln!("📝 Lead Funnel v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Service: {}", config.service_config().display_name);
    eprintln!("   Store: {}", config.store_path.display());
    eprintln!("   Dwell: {}s", config.dwell.as_secs());
    eprintln!("   Type help for commands.\n");

    // ── Event collector ──────────────────────────────────────────────────
    let (tx, mut rx) = event_channel();
    let printer = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            match serde_json::to_string(&record) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!("Failed to serialize event: {}", e),
            }
        }
    });

    let mut funnel = Funnel::load(&config, stores, HeadlessPresenter::new(), tx);
    tracing::debug!(sources = ?scroll_sources(false), "Scroll sources");

    // ── REPL ─────────────────────────────────────────────────────────────
    let dwell = tokio::time::sleep(config.dwell);
    tokio::pin!(dwell);
    let mut dwell_done = false;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");

    loop {
        tokio::select! {
            () = &mut dwell, if !dwell_done => {
                dwell_done = true;
                funnel.handle(Signal::DwellElapsed);
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    eprint!("> ");
                    continue;
                }

                match cli::parse_command(&line) {
                    Ok(Command::Input(edit)) => edit.apply(funnel.presenter_mut()),
                    Ok(Command::Signal(signal)) => {
                        funnel.handle(signal);
                        report(&funnel);
                    }
                    Ok(Command::Help) => eprintln!("{}", cli::HELP),
                    Ok(Command::Quit) => break,
                    Err(msg) => eprintln!("❌ {msg}"),
                }
                eprint!("> ");
            }
        }
    }

    funnel.handle(Signal::Lifecycle(LifecycleSignal::PageHide));
    drop(funnel);
    printer.await.context("Event printer task failed")?;

    Ok(())
}

fn report(funnel: &Funnel<HeadlessPresenter>) {
    let presenter = funnel.presenter();
    eprintln!("   state: {}", funnel.state());
    if let Some(field) = &presenter.focused {
        eprintln!("   focus: {field}");
    }
    if let Some(outcome) = funnel.outcome() {
        eprintln!(
            "   tier: {} ({}) id: {}",
            outcome.decision.tier, outcome.decision.rule, outcome.receipt.short_id
        );
        if let Some(link) = &outcome.whatsapp_link {
            eprintln!("   whatsapp: {link}");
        }
    }
}
