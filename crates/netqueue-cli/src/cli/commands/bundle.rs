//! `netqueue bundle <url> --version V` – cache-aware bundle fetch.

use anyhow::{bail, Context, Result};
use netqueue_core::config::NetqueueConfig;
use netqueue_core::transport::CurlOptions;
use netqueue_core::{Bundle, CurlTransport, DiskBundleCache, Engine, Services, Transport};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::cli::output::parse_http_url;
use crate::cli::progress::{percent, Throttle};

enum Event {
    Progress(f32),
    Done(Bundle),
    Failed(String),
}

pub async fn run_bundle(
    cfg: &NetqueueConfig,
    url: &str,
    version: u32,
    out: Option<&Path>,
) -> Result<()> {
    let url = parse_http_url(url)?;
    let runtime = Handle::current();
    let transport: Arc<dyn Transport> =
        Arc::new(CurlTransport::new(runtime.clone(), CurlOptions::from(cfg)));
    let cache = Arc::new(DiskBundleCache::new(
        cfg.bundle_dir(),
        Arc::clone(&transport),
        runtime.clone(),
    ));
    let source = if cache.is_cached(url.as_str(), version) {
        "cache"
    } else {
        "network"
    };
    tracing::debug!(url = %url, version, source, root = %cache.root().display(), "bundle lookup");

    let engine = Engine::with_runtime(runtime, 1, Services::new(transport, cache));
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let (progress, done, failed) = (tx.clone(), tx.clone(), tx);
    engine.download_or_cache_bundle(
        url.as_str(),
        version,
        move |f| {
            let _ = progress.send(Event::Progress(f));
        },
        move |bundle| {
            let _ = done.send(Event::Done(bundle));
        },
        move |error| {
            let _ = failed.send(Event::Failed(error));
        },
    );

    let mut throttle = Throttle::default();
    let mut bundle = None;
    while let Some(event) = rx.recv().await {
        match event {
            Event::Progress(f) => {
                if source == "network" && throttle.ready(f) {
                    println!("  {:5.1}%  {}", percent(f), url);
                }
            }
            Event::Done(b) => bundle = Some(b),
            Event::Failed(error) => bail!("bundle {} v{} failed: {}", url, version, error),
        }
    }
    let Some(bundle) = bundle else {
        bail!("bundle {} v{} was abandoned", url, version);
    };

    println!(
        "{} v{} from {}: {} bytes, sha256 {}",
        bundle.url(),
        bundle.version(),
        source,
        bundle.len(),
        bundle.digest()
    );
    if let Some(out) = out {
        fs::write(out, bundle.into_bytes()).with_context(|| format!("write {}", out.display()))?;
        println!("Wrote {}", out.display());
    }
    Ok(())
}
