//! Cache-aware bundle fetch.

use crate::cache::{Bundle, BundleCache};

use super::{dispatch, relay_progress, ErrorFn, Outcome, ProgressFn, SuccessFn};

/// Loads a bundle for (url, version) from the cache, downloading on a miss.
///
/// Bundles are typically large, so this variant always carries a progress
/// callback slot. Hit/miss is decided by the cache; the request only relays
/// progress and dispatches the decoded bundle or the error.
pub struct CachedBundle {
    url: String,
    version: u32,
    on_progress: Option<ProgressFn>,
    on_success: Option<SuccessFn<Bundle>>,
    on_error: Option<ErrorFn>,
}

impl CachedBundle {
    pub fn new(url: impl Into<String>, version: u32) -> Self {
        Self {
            url: url.into(),
            version,
            on_progress: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_progress(mut self, f: impl FnMut(f32) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(Bundle) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(String) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub(super) async fn run(mut self, cache: &dyn BundleCache) -> Outcome {
        let mut op = cache.load_or_download(&self.url, self.version);
        relay_progress(&mut op, &mut self.on_progress).await;
        dispatch(&mut op, self.on_success, self.on_error)
    }
}

impl std::fmt::Debug for CachedBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedBundle")
            .field("url", &self.url)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Events;
    use super::*;
    use crate::operation::{self, Operation, OperationHandle};
    use std::sync::Mutex;

    /// Cache double that records lookups and hands back a prepared operation.
    struct StubCache {
        lookups: Mutex<Vec<(String, u32)>>,
        next: Mutex<Option<Operation<Bundle>>>,
    }

    impl StubCache {
        fn with(op: Operation<Bundle>) -> Self {
            Self {
                lookups: Mutex::new(Vec::new()),
                next: Mutex::new(Some(op)),
            }
        }
    }

    impl BundleCache for StubCache {
        fn load_or_download(&self, url: &str, version: u32) -> Operation<Bundle> {
            self.lookups.lock().unwrap().push((url.to_string(), version));
            self.next.lock().unwrap().take().unwrap()
        }
    }

    #[tokio::test]
    async fn hit_reports_progress_and_bundle() {
        let bundle = Bundle::decode("http://x/b", 4, b"data".to_vec());
        let cache = StubCache::with(Operation::completed(bundle.clone()));
        let events = Events::default();
        let (e1, e2) = (events.clone(), events.clone());

        CachedBundle::new("http://x/b", 4)
            .on_progress(move |p| e1.push(format!("p {}", p)))
            .on_success(move |b| e2.push(format!("ok v{} {}", b.version(), b.len())))
            .run(&cache)
            .await;

        assert_eq!(cache.lookups.lock().unwrap().as_slice(), &[("http://x/b".to_string(), 4)]);
        assert_eq!(events.snapshot(), vec!["p 1", "ok v4 4"]);
    }

    #[tokio::test]
    async fn miss_failure_reaches_error_callback() {
        let (handle, op): (OperationHandle<Bundle>, _) = operation::channel();
        let cache = StubCache::with(op);
        let events = Events::default();
        let (e1, e2) = (events.clone(), events.clone());

        let driver = tokio::spawn(async move {
            handle.set_progress(0.3);
            tokio::task::yield_now().await;
            handle.fail("HTTP 503");
        });
        CachedBundle::new("http://x/b", 1)
            .on_success(move |_| e1.push("ok"))
            .on_error(move |err| e2.push(err))
            .run(&cache)
            .await;
        driver.await.unwrap();

        assert_eq!(events.snapshot(), vec!["HTTP 503"]);
    }
}
