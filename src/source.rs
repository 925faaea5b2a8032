//! Where frames come from: `{index}.txt` under a remote base URL or a local
//! directory.

use std::path::PathBuf;

use futures_util::future::BoxFuture;
use reqwest::{Client, Url};
use tracing::info;

use crate::error::{Result, StreamError};
use crate::frame::Frame;

/// Retrieves the text of one frame by index.
pub trait FrameSource: Send + Sync {
    fn fetch(&self, index: usize) -> BoxFuture<'_, Result<String>>;
}

/// Fetch frames `0..count` in index order. The first failure aborts the whole
/// retrieval.
pub async fn fetch_frames(source: &dyn FrameSource, count: usize) -> Result<Vec<Frame>> {
    let mut frames = Vec::with_capacity(count);
    for index in 0..count {
        let text = source.fetch(index).await?;
        frames.push(Frame::from(text));
    }
    info!("frames successfully fetched: {}", frames.len());
    Ok(frames)
}

fn retrieval(index: usize, reason: impl ToString) -> StreamError {
    StreamError::Retrieval {
        index,
        reason: reason.to_string(),
    }
}

/// Frames served over HTTP(S), e.g. a raw file host.
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    /// `base` is treated as a directory: a missing trailing `/` is added so
    /// frame names resolve beneath it.
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        HttpSource {
            client: Client::new(),
            base,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn frame_url(&self, index: usize) -> Result<Url> {
        self.base
            .join(&format!("{index}.txt"))
            .map_err(|e| retrieval(index, e))
    }
}

impl FrameSource for HttpSource {
    fn fetch(&self, index: usize) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let url = self.frame_url(index)?;
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| retrieval(index, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(retrieval(index, format!("HTTP {status}")));
            }
            response.text().await.map_err(|e| retrieval(index, e))
        })
    }
}

/// Frames read from `<dir>/<index>.txt` on local disk.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirSource { dir: dir.into() }
    }
}

impl FrameSource for DirSource {
    fn fetch(&self, index: usize) -> BoxFuture<'_, Result<String>> {
        let path = self.dir.join(format!("{index}.txt"));
        Box::pin(async move {
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| retrieval(index, e))
        })
    }
}
