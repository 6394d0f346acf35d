//! libcurl-backed transport.
//!
//! Each operation runs one `Easy` transfer on Tokio's blocking pool. The
//! libcurl progress callback publishes download and upload fractions into the
//! operation handle and aborts the transfer once the consumer has dropped the
//! operation.

use std::str;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::config::NetqueueConfig;
use crate::error::TransportError;
use crate::operation::{self, Operation, OperationHandle};

use super::{Form, Response, Transport};

/// Timeouts and identification applied to every transfer.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort if throughput stays below this many bytes/sec for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard wall-clock limit for one transfer.
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self::from(&NetqueueConfig::default())
    }
}

impl From<&NetqueueConfig> for CurlOptions {
    fn from(cfg: &NetqueueConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_limit: cfg.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

/// Real HTTP transport using the curl crate.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    runtime: Handle,
    options: CurlOptions,
}

impl CurlTransport {
    /// Transfers run on `runtime`'s blocking pool.
    pub fn new(runtime: Handle, options: CurlOptions) -> Self {
        Self { runtime, options }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }

    fn start(&self, url: &str, form: Option<Form>) -> Operation<Response> {
        let (handle, op) = operation::channel();
        let url = url.to_string();
        let options = self.options.clone();
        self.runtime
            .spawn_blocking(move || perform(&url, form.as_ref(), &options, handle));
        op
    }
}

impl Transport for CurlTransport {
    fn get(&self, url: &str) -> Operation<Response> {
        self.start(url, None)
    }

    fn post(&self, url: &str, form: &Form) -> Operation<Response> {
        self.start(url, Some(form.clone()))
    }
}

fn perform(
    url: &str,
    form: Option<&Form>,
    options: &CurlOptions,
    handle: OperationHandle<Response>,
) {
    match transfer(url, form, options, &handle) {
        Ok(response) => {
            if form.is_some() {
                handle.set_upload_progress(1.0);
            }
            handle.set_progress(1.0);
            tracing::debug!(url, status = response.status, bytes = response.body.len(), "transfer finished");
            handle.finish(response);
        }
        Err(TransportError::Abandoned) => {
            tracing::debug!(url, "transfer abandoned by consumer");
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "transfer failed");
            handle.fail(e.to_string());
        }
    }
}

fn transfer(
    url: &str,
    form: Option<&Form>,
    options: &CurlOptions,
    handle: &OperationHandle<Response>,
) -> Result<Response, TransportError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(options.connect_timeout)?;
    easy.low_speed_limit(options.low_speed_limit)?;
    easy.low_speed_time(options.low_speed_time)?;
    easy.timeout(options.timeout)?;
    if let Some(agent) = &options.user_agent {
        easy.useragent(agent)?;
    }
    if let Some(form) = form {
        easy.httppost(form.to_curl()?)?;
    }
    easy.progress(true)?;

    let mut headers: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                let line = s.trim_end();
                // A new status line starts the headers of a redirect target.
                if line.starts_with("HTTP/") {
                    headers.clear();
                }
                if !line.is_empty() {
                    headers.push(line.to_string());
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.progress_function(|dl_total, dl_now, ul_total, ul_now| {
            if handle.is_abandoned() {
                return false;
            }
            if ul_total > 0.0 {
                handle.set_upload_progress(fraction(ul_now, ul_total));
            }
            if dl_total > 0.0 {
                handle.set_progress(fraction(dl_now, dl_total));
            }
            true
        })?;
        if let Err(e) = transfer.perform() {
            if e.is_aborted_by_callback() {
                return Err(TransportError::Abandoned);
            }
            return Err(TransportError::Curl(e));
        }
    }

    let status = easy.response_code()?;
    if !(200..300).contains(&status) {
        return Err(TransportError::Http(status));
    }

    Ok(Response {
        url: url.to_string(),
        status,
        headers,
        body,
    })
}

fn fraction(now: f64, total: f64) -> f32 {
    (now / total) as f32
}
