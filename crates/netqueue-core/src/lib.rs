pub mod config;
pub mod logging;

pub mod cache;
pub mod engine;
pub mod error;
pub mod operation;
pub mod request;
pub mod transport;

pub use cache::{Bundle, BundleCache, DiskBundleCache};
pub use engine::{Engine, EngineStats, ListenerId};
pub use operation::{Operation, OperationHandle, OperationStatus};
pub use request::{
    CachedBundle, Download, DownloadWithError, DownloadWithProgress, Job, Request, Services,
    Upload, UploadWithProgress,
};
pub use transport::{CurlTransport, Form, ManualTransport, Response, Transport};
