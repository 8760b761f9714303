//! Content acquisition: gather the Markdown source for one request from the
//! requested file, submitted text and a remote URL, in that order, falling
//! back to the configured default page when all of them come up empty.

use crate::{buffer::Buffer, config::Settings, error::AcquireError, fetch::Fetch};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// The sources one request asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRequest {
    pub file_path: Option<PathBuf>,
    pub inline_text: Option<String>,
    pub remote_url: Option<String>,
    pub raw: bool,
}

pub struct Acquirer<'a> {
    page_default: Option<&'a Path>,
    read_unit: usize,
    fetcher: &'a dyn Fetch,
}

impl<'a> Acquirer<'a> {
    pub fn new(settings: &'a Settings, fetcher: &'a dyn Fetch) -> Self {
        Self {
            page_default: settings.page_default.as_deref(),
            read_unit: settings.read_unit,
            fetcher,
        }
    }

    /// Accumulate every present source into one buffer.
    ///
    /// A failure to read the requested file never fails the request by
    /// itself: with nothing accumulated the default page decides, and
    /// without one the answer is NotFound. A failed remote fetch never
    /// fails the request.
    pub async fn acquire(&self, request: &ContentRequest) -> Result<Buffer, AcquireError> {
        let mut buffer = Buffer::new(self.read_unit)?;
        if let Some(path) = &request.file_path {
            match read_page_blocking(path.clone(), self.read_unit).await {
                Ok(page) => buffer = page,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "request page unavailable");
                }
            }
        }

        if let Some(text) = non_empty(&request.inline_text) {
            buffer.append(text.as_bytes())?;
        }

        if let Some(url) = non_empty(&request.remote_url) {
            let before = buffer.len();
            if let Err(err) = self.fetcher.fetch(url, &mut buffer).await {
                warn!(
                    url,
                    error = %err,
                    received = buffer.len() - before,
                    "remote fetch failed, continuing with content received so far"
                );
            }
        }

        if !buffer.is_empty() {
            return Ok(buffer);
        }

        match self.page_default {
            Some(default) => read_page_blocking(default.to_path_buf(), self.read_unit).await,
            None => Err(AcquireError::NotFound),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// Read a whole page file. Empty and directory paths are refused.
pub fn read_page(path: &Path, read_unit: usize) -> Result<Buffer, AcquireError> {
    if path.as_os_str().is_empty() || path.to_string_lossy().ends_with('/') || path.is_dir() {
        return Err(AcquireError::Forbidden);
    }

    let mut file = File::open(path).map_err(AcquireError::from_open)?;
    let mut buffer = Buffer::new(read_unit)?;
    buffer.read_from(&mut file).map_err(AcquireError::Internal)?;
    Ok(buffer)
}

async fn read_page_blocking(path: PathBuf, read_unit: usize) -> Result<Buffer, AcquireError> {
    tokio::task::spawn_blocking(move || read_page(&path, read_unit))
        .await
        .map_err(AcquireError::internal)?
}
