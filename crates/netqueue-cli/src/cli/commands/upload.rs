//! `netqueue upload <url> --field k=v --file name=path` – multipart POST.

use anyhow::{anyhow, bail, Context, Result};
use netqueue_core::config::NetqueueConfig;
use netqueue_core::{Engine, Form, Response};
use std::fs;
use std::path::Path;
use tokio::sync::mpsc;

use crate::cli::output::parse_http_url;
use crate::cli::progress::{percent, Throttle};

enum Event {
    Upload(f32),
    Download(f32),
    Done(Response),
    Failed(String),
}

pub async fn run_upload(
    cfg: &NetqueueConfig,
    url: &str,
    fields: &[(String, String)],
    files: &[(String, String)],
) -> Result<()> {
    let url = parse_http_url(url)?;
    let form = build_form(fields, files)?;
    if form.is_empty() {
        bail!("nothing to upload: pass at least one --field or --file");
    }
    tracing::debug!(url = %url, parts = form.parts().len(), bytes = form.payload_len(), "upload prepared");

    let engine = Engine::from_config(cfg);
    if engine.max_concurrent() == 0 {
        engine.set_max_concurrent(1);
    }
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let (up, down, done, failed) = (tx.clone(), tx.clone(), tx.clone(), tx);
    engine.upload_progress(
        url.as_str(),
        form,
        move |f| {
            let _ = up.send(Event::Upload(f));
        },
        move |f| {
            let _ = down.send(Event::Download(f));
        },
        move |response| {
            let _ = done.send(Event::Done(response));
        },
        move |error| {
            let _ = failed.send(Event::Failed(error));
        },
    );

    let mut upload_throttle = Throttle::default();
    let mut download_throttle = Throttle::default();
    let mut outcome = None;
    while let Some(event) = rx.recv().await {
        match event {
            Event::Upload(f) => {
                if upload_throttle.ready(f) {
                    println!("  upload   {:5.1}%", percent(f));
                }
            }
            Event::Download(f) => {
                if download_throttle.ready(f) {
                    println!("  download {:5.1}%", percent(f));
                }
            }
            Event::Done(response) => outcome = Some(Ok(response)),
            Event::Failed(error) => outcome = Some(Err(error)),
        }
    }

    let response = match outcome {
        Some(Ok(response)) => response,
        Some(Err(error)) => bail!("upload to {} failed: {}", url, error),
        None => return Err(anyhow!("upload to {} was abandoned", url)),
    };
    println!("HTTP {} ({} bytes)", response.status, response.body.len());
    let text = response.text();
    if !text.trim().is_empty() {
        println!("{}", text.trim_end());
    }
    Ok(())
}

/// Text fields first, then file parts in argument order.
pub(crate) fn build_form(fields: &[(String, String)], files: &[(String, String)]) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.field(name, value);
    }
    for (name, path) in files {
        let path = Path::new(path);
        let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());
        form = form.file(name, filename, data);
    }
    Ok(form)
}
