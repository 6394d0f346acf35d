//! URL validation and output filenames for fetched bodies.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

const FALLBACK_NAME: &str = "download.bin";

/// Parse `raw` and require an http or https scheme.
pub fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid URL: {}", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => bail!("unsupported scheme `{}` in {}", other, raw),
    }
}

/// Filename hint for `url`: its last non-empty path segment, sanitized.
pub fn filename_for(url: &Url) -> String {
    let candidate = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(sanitize_filename)
        .unwrap_or_default();
    if candidate.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        candidate
    }
}

/// Makes a name safe as a single Linux path component.
///
/// Separators, NUL, whitespace and control characters become `_`, runs of
/// `_` collapse, leading/trailing dots and underscores are trimmed, and the
/// result is capped at 255 bytes.
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

/// Hands out distinct paths in one output directory. A repeated name gets a
/// `-N` suffix before its extension.
#[derive(Debug)]
pub struct OutputNames {
    dir: PathBuf,
    taken: HashSet<String>,
}

impl OutputNames {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            taken: HashSet::new(),
        }
    }

    pub fn claim(&mut self, url: &Url) -> PathBuf {
        let base = filename_for(url);
        let mut name = base.clone();
        let mut n = 1;
        while !self.taken.insert(name.clone()) {
            name = with_suffix(&base, n);
            n += 1;
        }
        self.dir.join(name)
    }
}

fn with_suffix(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, n, ext),
        _ => format!("{}-{}", name, n),
    }
}
