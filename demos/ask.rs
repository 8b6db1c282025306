//! Streaming ask example.
//!
//! Streams an answer to stdout as it arrives, then prints the citations and
//! the execution flow reported in the metrics. Ctrl-C cancels the stream.
//!
//! Run with:
//! ```bash
//! RAGSTREAM_API_URL=http://localhost:8000 RAGSTREAM_API_TOKEN=your-token \
//!     cargo run --example ask -- "How do I rotate my API keys?"
//! ```

use ragstream::prelude::*;
use ragstream::{DecodeError, Frame};
use std::io::{self, Write};

/// Prints fragments as they arrive and keeps the latest snapshots.
#[derive(Default)]
struct ConsoleSink {
    citations: Vec<Citation>,
    metrics: Option<Metrics>,
}

impl StreamSink for ConsoleSink {
    fn on_answer_fragment(&mut self, text: &str) {
        print!("{text}");
        let _ = io::stdout().flush();
    }

    fn on_citations(&mut self, citations: Vec<Citation>) {
        self.citations = citations;
    }

    fn on_metrics(&mut self, metrics: Metrics) {
        self.metrics = Some(metrics);
    }

    fn on_terminate(&mut self) {
        println!();
    }

    fn on_decode_error(&mut self, frame: &Frame, error: &DecodeError) {
        tracing::warn!(event = %frame.event, %error, "Ignoring undecodable frame");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let question = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    if question.trim().is_empty() {
        anyhow::bail!("usage: ask <question>");
    }

    let client = AskClient::from_env()?;
    let cancel = CancellationToken::new();

    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut sink = ConsoleSink::default();
    let outcome = client
        .ask(&AskRequest::new(question), &mut sink, &cancel)
        .await?;

    if outcome == StreamOutcome::Cancelled {
        println!("\n(cancelled)");
        return Ok(());
    }

    if !sink.citations.is_empty() {
        println!("\nEvidence:");
        for citation in &sink.citations {
            match citation.score {
                Some(score) => println!("  [{}] {} ({score:.3})", citation.id, citation.title),
                None => println!("  [{}] {}", citation.id, citation.title),
            }
        }
    }

    if let Some(metrics) = &sink.metrics {
        println!("\nExecution flow:");
        for node in &metrics.node_history {
            let mark = if node.is_success() { "ok" } else { "failed" };
            match node.elapsed_ms {
                Some(ms) => println!("  {:<16} {mark:<6} {ms:.0}ms", node.node),
                None => println!("  {:<16} {mark}", node.node),
            }
        }
        if let Some(total) = metrics.total_elapsed() {
            println!("  total {total:.0}ms");
        }
    }

    Ok(())
}
