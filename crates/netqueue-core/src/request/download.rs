//! GET request variants.

use crate::transport::{Response, Transport};

use super::{dispatch, relay_progress, wait_done, ErrorFn, Outcome, ProgressFn, SuccessFn};

/// Plain download: success callback only. Failures are dropped silently
/// since this variant has nowhere to report them; use
/// [`DownloadWithError`] when the caller needs to know.
pub struct Download {
    url: String,
    on_success: Option<SuccessFn<Response>>,
}

impl Download {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            on_success: None,
        }
    }

    pub fn on_success(mut self, f: impl FnOnce(Response) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(super) async fn run(self, transport: &dyn Transport) -> Outcome {
        let mut op = transport.get(&self.url);
        wait_done(&mut op).await;
        dispatch(&mut op, self.on_success, None)
    }
}

/// Download with success and error callbacks.
pub struct DownloadWithError {
    url: String,
    on_success: Option<SuccessFn<Response>>,
    on_error: Option<ErrorFn>,
}

impl DownloadWithError {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_success(mut self, f: impl FnOnce(Response) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Receives the failure reason verbatim from the transport.
    pub fn on_error(mut self, f: impl FnOnce(String) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(super) async fn run(self, transport: &dyn Transport) -> Outcome {
        let mut op = transport.get(&self.url);
        wait_done(&mut op).await;
        dispatch(&mut op, self.on_success, self.on_error)
    }
}

/// Download that also reports a progress fraction.
///
/// Progress is reported on every wake-up before completion and once more
/// after it, so the callback fires at least once even for operations that
/// finish instantly. Values are forwarded exactly as the transport reports
/// them.
pub struct DownloadWithProgress {
    url: String,
    on_progress: Option<ProgressFn>,
    on_success: Option<SuccessFn<Response>>,
    on_error: Option<ErrorFn>,
}

impl DownloadWithProgress {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            on_progress: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_progress(mut self, f: impl FnMut(f32) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(Response) + Send + 'static) -> Self {
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

    pub(super) async fn run(mut self, transport: &dyn Transport) -> Outcome {
        let mut op = transport.get(&self.url);
        relay_progress(&mut op, &mut self.on_progress).await;
        dispatch(&mut op, self.on_success, self.on_error)
    }
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for DownloadWithError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadWithError")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for DownloadWithProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadWithProgress")
            .field("url", &self.url)
            .field("has_progress", &self.on_progress.is_some())
            .finish_non_exhaustive()
    }
}
