//! One-call submitters for each request variant.

use crate::cache::Bundle;
use crate::request::{
    CachedBundle, Download, DownloadWithError, DownloadWithProgress, Upload, UploadWithProgress,
};
use crate::transport::{Form, Response};

use super::Engine;

impl Engine {
    /// GET `url`; `on_success` receives the response. Failures are dropped.
    pub fn download<S>(&self, url: impl Into<String>, on_success: S)
    where
        S: FnOnce(Response) + Send + 'static,
    {
        self.add(Download::new(url).on_success(on_success));
    }

    /// GET `url` with error reporting.
    pub fn download_check_error<S, E>(&self, url: impl Into<String>, on_success: S, on_error: E)
    where
        S: FnOnce(Response) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        self.add(
            DownloadWithError::new(url)
                .on_success(on_success)
                .on_error(on_error),
        );
    }

    /// GET `url` with progress and error reporting.
    pub fn download_progress<P, S, E>(
        &self,
        url: impl Into<String>,
        on_progress: P,
        on_success: S,
        on_error: E,
    ) where
        P: FnMut(f32) + Send + 'static,
        S: FnOnce(Response) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        self.add(
            DownloadWithProgress::new(url)
                .on_progress(on_progress)
                .on_success(on_success)
                .on_error(on_error),
        );
    }

    /// Load the bundle for (`url`, `version`) from the cache or download it.
    pub fn download_or_cache_bundle<P, S, E>(
        &self,
        url: impl Into<String>,
        version: u32,
        on_progress: P,
        on_success: S,
        on_error: E,
    ) where
        P: FnMut(f32) + Send + 'static,
        S: FnOnce(Bundle) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        self.add(
            CachedBundle::new(url, version)
                .on_progress(on_progress)
                .on_success(on_success)
                .on_error(on_error),
        );
    }

    /// POST `form` to `url` with error reporting.
    pub fn upload_check_error<S, E>(
        &self,
        url: impl Into<String>,
        form: Form,
        on_success: S,
        on_error: E,
    ) where
        S: FnOnce(Response) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        self.add(Upload::new(url, form).on_success(on_success).on_error(on_error));
    }

    /// POST `form` to `url`, reporting upload progress and then download progress.
    pub fn upload_progress<U, D, S, E>(
        &self,
        url: impl Into<String>,
        form: Form,
        on_upload_progress: U,
        on_download_progress: D,
        on_success: S,
        on_error: E,
    ) where
        U: FnMut(f32) + Send + 'static,
        D: FnMut(f32) + Send + 'static,
        S: FnOnce(Response) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        self.add(
            UploadWithProgress::new(url, form)
                .on_upload_progress(on_upload_progress)
                .on_download_progress(on_download_progress)
                .on_success(on_success)
                .on_error(on_error),
        );
    }
}
