/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Gateway demo.
//!
//! Connects every configured session, subscribes to a few FX pairs and logs
//! quotes and execution reports until Ctrl-C.
//!
//! Configuration comes from the JSON file named by `FIXGATE_CONFIG`, or from
//! `FIX_HOST`, `FIX_PORT`, `FIX_SENDER`, `FIX_TARGET`, `FIX_USERNAME` and
//! `FIX_PASSWORD` for a single session.
//!
//! Run with: `cargo run --example gateway`

use anyhow::Context;
use fixgate::prelude::*;
use std::env;
use std::time::Duration;
use tracing::{error, info, warn};

const SYMBOLS: [&str; 3] = ["EURUSD", "GBPUSD", "USDJPY"];

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

fn load_config() -> anyhow::Result<GatewayConfig> {
    if let Ok(path) = env::var("FIXGATE_CONFIG") {
        return GatewayConfig::load(&path).with_context(|| format!("loading {path}"));
    }

    let host = env::var("FIX_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("FIX_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(9876);
    let sender = env::var("FIX_SENDER").unwrap_or_else(|_| "GATEWAY".to_string());
    let target = env::var("FIX_TARGET").unwrap_or_else(|_| "LP".to_string());
    let sender = CompId::new(&sender).context("FIX_SENDER is not a valid CompID")?;
    let target = CompId::new(&target).context("FIX_TARGET is not a valid CompID")?;

    let mut session = SessionConfig::new("lp1", host, port, sender, target);
    if let (Ok(user), Ok(password)) = (env::var("FIX_USERNAME"), env::var("FIX_PASSWORD")) {
        session = session.with_credentials(user, password);
    }
    Ok(GatewayConfig::new(vec![session]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = load_config()?;
    let gateway = GatewayBuilder::from_config(config).build().await?;
    let events = gateway.events();

    let mut tasks = Vec::new();
    for (session_id, result) in gateway.connect_all() {
        match result {
            Ok(task) => tasks.push((session_id, task)),
            Err(err) => error!(session = %session_id, error = %err, "connect refused"),
        }
    }

    for session_id in gateway.session_ids() {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
        while gateway.session_status(&session_id)?.status != SessionStatus::LoggedIn {
            if tokio::time::Instant::now() > deadline {
                warn!(session = %session_id, "not logged in, skipping subscriptions");
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if gateway.session_status(&session_id)?.status != SessionStatus::LoggedIn {
            continue;
        }
        for symbol in SYMBOLS {
            match gateway.subscribe(&session_id, symbol).await {
                Ok(md_req_id) => info!(session = %session_id, symbol, md_req_id = %md_req_id, "subscribed"),
                Err(err) => warn!(session = %session_id, symbol, error = %err, "subscribe failed"),
            }
        }
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {}
        }
        for quote in events.quotes.try_iter() {
            info!(
                session = %quote.session_id,
                symbol = %quote.symbol,
                bid = %quote.bid,
                ask = %quote.ask,
                "quote"
            );
        }
        for report in events.executions.try_iter() {
            info!(
                session = %report.session_id,
                cl_ord_id = report.cl_ord_id.as_deref(),
                exec_type = ?report.exec_type,
                "execution report"
            );
        }
        for reject in events.md_rejects.try_iter() {
            warn!(session = %reject.session_id, md_req_id = %reject.md_req_id, text = reject.text.as_deref(), "subscription rejected");
        }
        if tasks.iter().all(|(_, task)| task.is_finished()) {
            warn!("all sessions ended");
            break;
        }
    }

    gateway.disconnect_all().await;
    for (session_id, task) in tasks {
        match task.await {
            Ok(Ok(())) => info!(session = %session_id, "session closed"),
            Ok(Err(err)) => warn!(session = %session_id, error = %err, "session ended with error"),
            Err(err) => error!(session = %session_id, error = %err, "session task failed"),
        }
    }

    let stats = gateway.event_stats();
    info!(
        quotes = stats.quotes.published,
        quotes_dropped = stats.quotes.dropped,
        executions = stats.executions.published,
        "event totals"
    );
    Ok(())
}
