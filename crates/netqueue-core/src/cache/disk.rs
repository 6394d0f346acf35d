//! On-disk bundle cache.
//!
//! Layout: one file per (url, version) named `<sha256(url)>-<version>.bundle`
//! under the cache root. A hit completes immediately with full progress. A miss
//! fetches through the configured transport, relays its progress, stores the
//! bytes atomically (temp file + rename) and drops older versions of the same
//! url.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::runtime::Handle;

use crate::error::TransportError;
use crate::operation::{self, Operation, OperationHandle};
use crate::transport::{Response, Transport};

use super::{url_key, Bundle, BundleCache};

const EXTENSION: &str = "bundle";

pub struct DiskBundleCache {
    root: PathBuf,
    transport: Arc<dyn Transport>,
    runtime: Handle,
}

impl DiskBundleCache {
    /// Cache rooted at `root`, fetching misses through `transport`. Miss
    /// handling runs on `runtime`.
    pub fn new(root: impl Into<PathBuf>, transport: Arc<dyn Transport>, runtime: Handle) -> Self {
        Self {
            root: root.into(),
            transport,
            runtime,
        }
    }

    /// Default cache root: `~/.cache/netqueue/bundles`.
    pub fn default_dir() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("netqueue")?;
        Ok(xdg_dirs.get_cache_home().join("bundles"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds (url, version).
    pub fn path_for(&self, url: &str, version: u32) -> PathBuf {
        self.root
            .join(format!("{}-{}.{}", url_key(url), version, EXTENSION))
    }

    pub fn is_cached(&self, url: &str, version: u32) -> bool {
        self.path_for(url, version).is_file()
    }
}

impl BundleCache for DiskBundleCache {
    fn load_or_download(&self, url: &str, version: u32) -> Operation<Bundle> {
        let path = self.path_for(url, version);
        if path.is_file() {
            match fs::read(&path) {
                Ok(data) => {
                    tracing::debug!(url, version, "bundle cache hit");
                    return Operation::completed(Bundle::decode(url, version, data));
                }
                Err(e) => {
                    tracing::warn!(url, version, error = %e, "unreadable cache entry, downloading again");
                }
            }
        }

        tracing::debug!(url, version, "bundle cache miss");
        let (handle, op) = operation::channel();
        let download = self.transport.get(url);
        let job = MissJob {
            root: self.root.clone(),
            path,
            url: url.to_string(),
            version,
        };
        self.runtime.spawn(job.run(download, handle));
        op
    }
}

struct MissJob {
    root: PathBuf,
    path: PathBuf,
    url: String,
    version: u32,
}

impl MissJob {
    async fn run(self, mut download: Operation<Response>, handle: OperationHandle<Bundle>) {
        while !download.is_done() {
            handle.set_progress(download.progress());
            tokio::select! {
                _ = download.changed() => {}
                // Dropping `download` abandons the underlying transfer.
                _ = handle.abandoned() => return,
            }
        }
        handle.set_progress(download.progress());

        if let Some(error) = download.error() {
            handle.fail(error);
            return;
        }
        let Some(response) = download.take_payload() else {
            handle.fail("download finished without a response");
            return;
        };

        let MissJob {
            root,
            path,
            url,
            version,
        } = self;
        let stored = tokio::task::spawn_blocking(move || {
            store(&root, &path, &url, &response.body)?;
            Ok::<_, io::Error>(Bundle::decode(url, version, response.body))
        })
        .await;
        match stored {
            Ok(result) => handle.complete(result.map_err(TransportError::Io)),
            Err(e) => handle.fail(format!("cache: {}", e)),
        }
    }
}

/// Write `data` to `path` atomically and remove other versions of `url`.
fn store(root: &Path, path: &Path, url: &str, data: &[u8]) -> io::Result<()> {
    fs::create_dir_all(root)?;
    let mut tmp = tempfile::NamedTempFile::new_in(root)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    let prefix = format!("{}-", url_key(url));
    for entry in fs::read_dir(root)?.flatten() {
        let candidate = entry.path();
        if candidate == path {
            continue;
        }
        let stale = candidate
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(&prefix) && n.ends_with(EXTENSION))
            .unwrap_or(false);
        if stale {
            if let Err(e) = fs::remove_file(&candidate) {
                tracing::warn!(path = %candidate.display(), error = %e, "could not remove stale bundle");
            }
        }
    }
    Ok(())
}
