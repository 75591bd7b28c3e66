// src/bin/sentiblaster.rs

//! # SentiBlaster Binary
//!
//! Reads a Parquet dataset, asks a chat-completions service for the sentiment
//! of every row's text, segments the same text into words and writes the
//! dataset back out with two extra columns.
//!
//! Requests are batched; inside a batch they run concurrently under a shared
//! admission limit, with per-request timeouts and retry with backoff. Ctrl-C
//! stops the run after the current batch and the partial results are saved;
//! a second Ctrl-C exits at once with status 130.

use std::time::Duration;

use clap::Parser;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use SentiBlaster::annotator::AnnotationClient;
use SentiBlaster::config::annotator::Args;
use SentiBlaster::data_model::{Progress, SentimentLabel};
use SentiBlaster::error::Result;
use SentiBlaster::job_logic::run_annotation_job;
use SentiBlaster::orchestrator::BatchOrchestrator;
use SentiBlaster::utils::interrupt::{ctrl_c_stream, watch_interrupts, Interrupt};
use SentiBlaster::utils::telemetry::{init_tracing, serve_metrics};

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg} ETA {eta}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(200));
    pb
}

fn render_progress(pb: &ProgressBar, progress: &Progress) {
    pb.set_length(progress.total as u64);
    pb.set_position(progress.completed as u64);
    pb.set_message(format!(
        "batch {}/{} | {:.2} items/s",
        progress.batches_completed,
        progress.total_batches,
        progress.rate()
    ));
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e);
        }
    };
    if args.validate_config {
        info!(?config, "Configuration is valid");
        return Ok(());
    }

    if let Some(port) = args.metrics_port {
        serve_metrics("0.0.0.0", port).await?;
    }

    let api_key = args.require_api_key()?;
    let client = AnnotationClient::new(&config.client.to_client_config(api_key))?;

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<Progress>();
    let orchestrator = BatchOrchestrator::new(client).with_progress(progress_tx);

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if watch_interrupts(ctrl_c_stream(), cancel).await == Interrupt::Forced {
            std::process::exit(130);
        }
    });

    let pb = create_progress_bar();
    let pb_task = pb.clone();
    let progress_task = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            render_progress(&pb_task, &progress);
        }
    });

    let result = run_annotation_job(&args.input_file, &args.output_file, &config.run, &orchestrator).await;
    // Closes the progress channel so the bar task can finish.
    drop(orchestrator);
    if let Err(e) = progress_task.await {
        warn!(error = %e, "Progress task ended abnormally");
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            pb.abandon_with_message(format!("Failed: {}", e));
            error!(error = %e, "Annotation job failed");
            return Err(e);
        }
    };

    pb.finish_with_message(format!(
        "Annotated {} of {} rows with text in {}",
        summary.outcomes.total(),
        summary.items,
        HumanDuration(summary.elapsed)
    ));
    for label in SentimentLabel::ALL {
        let count = summary.outcomes.labelled.get(&label).copied().unwrap_or(0);
        info!(label = %label, count, "Label count");
    }
    info!(
        unrecognized = summary.outcomes.unrecognized,
        failed = summary.outcomes.failed,
        abandoned = summary.abandoned,
        output = %summary.output_path.display(),
        "Done"
    );

    Ok(())
}
