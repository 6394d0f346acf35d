//! Form POST request variants.

use crate::transport::{Form, Response, Transport};

use super::{dispatch, relay_progress, report, wait_done, ErrorFn, Outcome, ProgressFn, SuccessFn};

/// Form upload reporting completion only.
pub struct Upload {
    url: String,
    form: Form,
    on_success: Option<SuccessFn<Response>>,
    on_error: Option<ErrorFn>,
}

impl Upload {
    pub fn new(url: impl Into<String>, form: Form) -> Self {
        Self {
            url: url.into(),
            form,
            on_success: None,
            on_error: None,
        }
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

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub(super) async fn run(self, transport: &dyn Transport) -> Outcome {
        let mut op = transport.post(&self.url, &self.form);
        wait_done(&mut op).await;
        dispatch(&mut op, self.on_success, self.on_error)
    }
}

/// Form upload with separate upload and download progress.
///
/// The upload callback runs while the request body is still being sent,
/// followed by one final upload tick. Only then does the download callback
/// start, again ending with one final tick, so every upload tick precedes
/// every download tick.
pub struct UploadWithProgress {
    url: String,
    form: Form,
    on_upload_progress: Option<ProgressFn>,
    on_download_progress: Option<ProgressFn>,
    on_success: Option<SuccessFn<Response>>,
    on_error: Option<ErrorFn>,
}

impl UploadWithProgress {
    pub fn new(url: impl Into<String>, form: Form) -> Self {
        Self {
            url: url.into(),
            form,
            on_upload_progress: None,
            on_download_progress: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_upload_progress(mut self, f: impl FnMut(f32) + Send + 'static) -> Self {
        self.on_upload_progress = Some(Box::new(f));
        self
    }

    pub fn on_download_progress(mut self, f: impl FnMut(f32) + Send + 'static) -> Self {
        self.on_download_progress = Some(Box::new(f));
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

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub(super) async fn run(mut self, transport: &dyn Transport) -> Outcome {
        let mut op = transport.post(&self.url, &self.form);

        while !op.is_done() && op.upload_progress() < 1.0 {
            report(&mut self.on_upload_progress, op.upload_progress());
            op.changed().await;
        }
        report(&mut self.on_upload_progress, op.upload_progress());

        relay_progress(&mut op, &mut self.on_download_progress).await;
        dispatch(&mut op, self.on_success, self.on_error)
    }
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("url", &self.url)
            .field("parts", &self.form.parts().len())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for UploadWithProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadWithProgress")
            .field("url", &self.url)
            .field("parts", &self.form.parts().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Events;
    use super::*;
    use crate::transport::{ManualTransport, Method};
    use std::sync::Arc;

    #[tokio::test]
    async fn upload_posts_form_and_reports_success() {
        let transport = Arc::new(ManualTransport::new());
        let events = Events::default();
        let e = events.clone();
        let request = Upload::new("http://x/submit", Form::new().field("name", "ada"))
            .on_success(move |r| e.push(format!("ok {}", r.status)));

        let t = Arc::clone(&transport);
        let driver = tokio::spawn(async move {
            let pending = t.next().await;
            assert_eq!(pending.method, Method::Post);
            assert_eq!(pending.form.as_ref().map(|f| f.parts().len()), Some(1));
            pending.respond("saved");
        });
        request.run(transport.as_ref()).await;
        driver.await.unwrap();

        assert_eq!(events.snapshot(), vec!["ok 200"]);
    }

    #[tokio::test]
    async fn upload_error_reaches_callback() {
        let transport = Arc::new(ManualTransport::new());
        let events = Events::default();
        let e = events.clone();
        let request = Upload::new("http://x/submit", Form::new()).on_error(move |err| e.push(err));

        let t = Arc::clone(&transport);
        let driver = tokio::spawn(async move { t.next().await.fail("HTTP 413") });
        request.run(transport.as_ref()).await;
        driver.await.unwrap();

        assert_eq!(events.snapshot(), vec!["HTTP 413"]);
    }

    #[tokio::test]
    async fn upload_phase_precedes_download_phase() {
        let transport = Arc::new(ManualTransport::new());
        let events = Events::default();
        let (e1, e2, e3) = (events.clone(), events.clone(), events.clone());
        let request = UploadWithProgress::new("http://x/submit", Form::new().field("k", "v"))
            .on_upload_progress(move |p| e1.push(format!("up {}", p)))
            .on_download_progress(move |p| e2.push(format!("down {}", p)))
            .on_success(move |_| e3.push("ok"));

        let t = Arc::clone(&transport);
        let driver = tokio::spawn(async move {
            let pending = t.next().await;
            pending.handle.set_upload_progress(0.5);
            tokio::task::yield_now().await;
            pending.handle.set_upload_progress(1.0);
            tokio::task::yield_now().await;
            pending.handle.set_progress(0.4);
            tokio::task::yield_now().await;
            pending.respond("done");
        });
        request.run(transport.as_ref()).await;
        driver.await.unwrap();

        let log = events.snapshot();
        let last_up = log.iter().rposition(|e| e.starts_with("up ")).unwrap();
        let first_down = log.iter().position(|e| e.starts_with("down ")).unwrap();
        assert!(last_up < first_down, "upload ticks must precede download ticks: {:?}", log);
        assert_eq!(log[last_up], "up 1");
        assert_eq!(log[log.len() - 2], "down 1");
        assert_eq!(log.last().map(String::as_str), Some("ok"));
    }

    #[tokio::test]
    async fn failure_before_upload_finishes_still_ticks_both_phases() {
        let transport = Arc::new(ManualTransport::new());
        let events = Events::default();
        let (e1, e2, e3) = (events.clone(), events.clone(), events.clone());
        let request = UploadWithProgress::new("http://x/submit", Form::new())
            .on_upload_progress(move |p| e1.push(format!("up {}", p)))
            .on_download_progress(move |p| e2.push(format!("down {}", p)))
            .on_error(move |err| e3.push(err));

        let t = Arc::clone(&transport);
        let driver = tokio::spawn(async move {
            let pending = t.next().await;
            pending.handle.set_upload_progress(0.2);
            pending.fail("connection reset");
        });
        request.run(transport.as_ref()).await;
        driver.await.unwrap();

        let log = events.snapshot();
        assert_eq!(log.last().map(String::as_str), Some("connection reset"));
        assert!(log.contains(&"up 0.2".to_string()));
        assert!(log.contains(&"down 0".to_string()));
    }
}
