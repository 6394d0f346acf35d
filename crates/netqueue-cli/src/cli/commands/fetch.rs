//! `netqueue fetch <url>...` – download URLs through the request engine.

use anyhow::{bail, Context, Result};
use netqueue_core::config::NetqueueConfig;
use netqueue_core::{Engine, Response};
use std::fs;
use std::path::Path;
use tokio::sync::mpsc;

use crate::cli::output::{parse_http_url, OutputNames};
use crate::cli::progress::{percent, Throttle};

enum Event {
    Progress { index: usize, fraction: f32 },
    Done { index: usize, response: Response },
    Failed { index: usize, error: String },
}

pub async fn run_fetch(
    cfg: &NetqueueConfig,
    urls: &[String],
    jobs: Option<usize>,
    out_dir: &Path,
) -> Result<()> {
    let urls = urls
        .iter()
        .map(|u| parse_http_url(u))
        .collect::<Result<Vec<_>>>()?;
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;

    let engine = Engine::from_config(cfg);
    match jobs {
        Some(n) => engine.set_max_concurrent(i64::try_from(n.max(1)).unwrap_or(i64::MAX)),
        None if engine.max_concurrent() == 0 => {
            tracing::warn!("max_concurrent is 0 in config, running one download at a time");
            engine.set_max_concurrent(1);
        }
        None => {}
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let drained = engine.drained();
    for (index, url) in urls.iter().enumerate() {
        let (progress, done, failed) = (tx.clone(), tx.clone(), tx.clone());
        engine.download_progress(
            url.as_str(),
            move |fraction| {
                let _ = progress.send(Event::Progress { index, fraction });
            },
            move |response| {
                let _ = done.send(Event::Done { index, response });
            },
            move |error| {
                let _ = failed.send(Event::Failed { index, error });
            },
        );
    }
    drop(tx);
    tracing::info!(
        urls = urls.len(),
        jobs = engine.max_concurrent(),
        "fetch started"
    );

    let mut names = OutputNames::new(out_dir);
    let mut throttles = vec![Throttle::default(); urls.len()];
    let mut failures = 0usize;
    // Closes once every request has run and dropped its callbacks.
    while let Some(event) = rx.recv().await {
        match event {
            Event::Progress { index, fraction } => {
                if throttles[index].ready(fraction) {
                    println!("  [{}] {:5.1}%  {}", index + 1, percent(fraction), urls[index]);
                }
            }
            Event::Done { index, response } => {
                let path = names.claim(&urls[index]);
                fs::write(&path, &response.body)
                    .with_context(|| format!("write {}", path.display()))?;
                println!(
                    "Saved {} -> {} ({} bytes)",
                    urls[index],
                    path.display(),
                    response.body.len()
                );
            }
            Event::Failed { index, error } => {
                failures += 1;
                tracing::warn!(url = %urls[index], %error, "fetch failed");
                eprintln!("Failed {}: {}", urls[index], error);
            }
        }
    }
    drained.await;

    let stats = engine.stats();
    tracing::info!(finished = stats.finished, failures, "fetch completed");
    if failures > 0 {
        bail!("{} of {} download(s) failed", failures, urls.len());
    }
    Ok(())
}
