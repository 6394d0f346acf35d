//! Request variants: units of work the [`Engine`](crate::engine::Engine) schedules.
//!
//! Each variant binds a resource identifier and a set of optional callbacks and
//! exposes a single `run` that drives one [`Operation`] to completion. `run`
//! suspends whenever the operation has not finished; on each wake-up it relays
//! progress to the bound progress callback(s), and on completion invokes either
//! the success or the error callback. Absent callbacks are skipped.
//!
//! The engine never looks at outcomes. It only learns that `run` returned.

mod bundle;
mod download;
mod upload;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::cache::{BundleCache, DiskBundleCache};
use crate::config::NetqueueConfig;
use crate::operation::Operation;
use crate::transport::{CurlOptions, CurlTransport, Transport};

pub use bundle::CachedBundle;
pub use download::{Download, DownloadWithError, DownloadWithProgress};
pub use upload::{Upload, UploadWithProgress};

/// Called once with the payload when a request succeeds.
pub type SuccessFn<T> = Box<dyn FnOnce(T) + Send>;
/// Called once with the failure reason when a request fails.
pub type ErrorFn = Box<dyn FnOnce(String) + Send>;
/// Called with the current fraction on every progress tick.
pub type ProgressFn = Box<dyn FnMut(f32) + Send>;

/// Collaborators a request needs to start its operation.
#[derive(Clone)]
pub struct Services {
    pub transport: Arc<dyn Transport>,
    pub cache: Arc<dyn BundleCache>,
}

impl Services {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<dyn BundleCache>) -> Self {
        Self { transport, cache }
    }

    /// libcurl transport plus an on-disk bundle cache under
    /// [`NetqueueConfig::bundle_dir`], configured from `cfg`.
    pub fn from_config(runtime: Handle, cfg: &NetqueueConfig) -> Self {
        let transport: Arc<dyn Transport> =
            Arc::new(CurlTransport::new(runtime.clone(), CurlOptions::from(cfg)));
        let cache: Arc<dyn BundleCache> = Arc::new(DiskBundleCache::new(
            cfg.bundle_dir(),
            Arc::clone(&transport),
            runtime,
        ));
        Self { transport, cache }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// Arbitrary future scheduled like a request. The engine gates its start and
/// observes its completion, nothing more.
pub struct Job(Pin<Box<dyn Future<Output = ()> + Send + 'static>>);

impl Job {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(Box::pin(future))
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Job")
    }
}

/// One schedulable unit of work.
#[derive(Debug)]
pub enum Request {
    /// GET, success callback only; failures are dropped.
    Download(Download),
    /// GET with success and error callbacks.
    DownloadWithError(DownloadWithError),
    /// GET with progress, success and error callbacks.
    DownloadWithProgress(DownloadWithProgress),
    /// Form POST with success and error callbacks.
    Upload(Upload),
    /// Form POST with upload progress, then download progress.
    UploadWithProgress(UploadWithProgress),
    /// Version-keyed bundle from the cache, downloading on a miss.
    CachedBundle(CachedBundle),
    Custom(Job),
}

impl Request {
    /// Short variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Download(_) => "download",
            Request::DownloadWithError(_) => "download_with_error",
            Request::DownloadWithProgress(_) => "download_with_progress",
            Request::Upload(_) => "upload",
            Request::UploadWithProgress(_) => "upload_with_progress",
            Request::CachedBundle(_) => "cached_bundle",
            Request::Custom(_) => "custom",
        }
    }

    /// Target URL, if the variant has one.
    pub fn url(&self) -> Option<&str> {
        match self {
            Request::Download(r) => Some(r.url()),
            Request::DownloadWithError(r) => Some(r.url()),
            Request::DownloadWithProgress(r) => Some(r.url()),
            Request::Upload(r) => Some(r.url()),
            Request::UploadWithProgress(r) => Some(r.url()),
            Request::CachedBundle(r) => Some(r.url()),
            Request::Custom(_) => None,
        }
    }

    /// Run to completion, invoking the bound callbacks along the way.
    pub async fn run(self, services: &Services) {
        let kind = self.kind();
        let url = self.url().unwrap_or("-").to_string();
        tracing::debug!(kind, url = %url, "request started");
        let outcome = match self {
            Request::Download(r) => r.run(services.transport.as_ref()).await,
            Request::DownloadWithError(r) => r.run(services.transport.as_ref()).await,
            Request::DownloadWithProgress(r) => r.run(services.transport.as_ref()).await,
            Request::Upload(r) => r.run(services.transport.as_ref()).await,
            Request::UploadWithProgress(r) => r.run(services.transport.as_ref()).await,
            Request::CachedBundle(r) => r.run(services.cache.as_ref()).await,
            Request::Custom(job) => {
                job.0.await;
                Outcome::Succeeded
            }
        };
        tracing::debug!(kind, url = %url, ?outcome, "request finished");
    }
}

macro_rules! into_request {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Request {
                fn from(r: $variant) -> Self {
                    Request::$variant(r)
                }
            }
        )*
    };
}

into_request!(
    Download,
    DownloadWithError,
    DownloadWithProgress,
    Upload,
    UploadWithProgress,
    CachedBundle
);

impl From<Job> for Request {
    fn from(job: Job) -> Self {
        Request::Custom(job)
    }
}

/// What a request observed at completion; for logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Succeeded,
    Failed,
}

pub(crate) fn report(callback: &mut Option<ProgressFn>, value: f32) {
    if let Some(cb) = callback.as_mut() {
        cb(value);
    }
}

/// Suspend until `op` is done, without reporting progress.
pub(crate) async fn wait_done<T>(op: &mut Operation<T>) {
    while !op.is_done() {
        op.changed().await;
    }
}

/// Suspend until `op` is done, reporting its progress on every wake-up and
/// once more, unconditionally, after completion.
pub(crate) async fn relay_progress<T>(op: &mut Operation<T>, on_progress: &mut Option<ProgressFn>) {
    while !op.is_done() {
        report(on_progress, op.progress());
        op.changed().await;
    }
    report(on_progress, op.progress());
}

/// Final success/error check on a finished operation.
pub(crate) fn dispatch<T>(
    op: &mut Operation<T>,
    on_success: Option<SuccessFn<T>>,
    on_error: Option<ErrorFn>,
) -> Outcome {
    if let Some(error) = op.error() {
        if let Some(cb) = on_error {
            cb(error);
        }
        return Outcome::Failed;
    }
    match op.take_payload() {
        Some(payload) => {
            if let Some(cb) = on_success {
                cb(payload);
            }
            Outcome::Succeeded
        }
        None => {
            if let Some(cb) = on_error {
                cb("operation finished without a payload".to_string());
            }
            Outcome::Failed
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    /// Shared event log for callback-order assertions.
    #[derive(Clone, Default)]
    pub(crate) struct Events(Arc<Mutex<Vec<String>>>);

    impl Events {
        pub(crate) fn push(&self, event: impl Into<String>) {
            self.0.lock().unwrap().push(event.into());
        }

        pub(crate) fn snapshot(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::Events;
    use super::*;
    use crate::operation;

    #[test]
    fn dispatch_success_calls_only_success() {
        let events = Events::default();
        let (handle, mut op) = operation::channel::<u8>();
        handle.finish(9);
        let (e1, e2) = (events.clone(), events.clone());
        let outcome = dispatch(
            &mut op,
            Some(Box::new(move |v| e1.push(format!("ok {}", v)))),
            Some(Box::new(move |e| e2.push(format!("err {}", e)))),
        );
        assert_eq!(outcome, Outcome::Succeeded);
        assert_eq!(events.snapshot(), vec!["ok 9"]);
    }

    #[test]
    fn dispatch_error_without_sink_is_silent() {
        let events = Events::default();
        let (handle, mut op) = operation::channel::<u8>();
        handle.fail("refused");
        let e1 = events.clone();
        let outcome = dispatch(&mut op, Some(Box::new(move |_| e1.push("ok"))), None);
        assert_eq!(outcome, Outcome::Failed);
        assert!(events.snapshot().is_empty());
    }

    #[test]
    fn report_skips_absent_callback() {
        let mut none: Option<ProgressFn> = None;
        report(&mut none, 0.5);
    }

    #[test]
    fn kind_and_url() {
        let request = Request::from(Download::new("http://x/a"));
        assert_eq!(request.kind(), "download");
        assert_eq!(request.url(), Some("http://x/a"));
        let job = Request::from(Job::new(async {}));
        assert_eq!(job.kind(), "custom");
        assert_eq!(job.url(), None);
    }
}
