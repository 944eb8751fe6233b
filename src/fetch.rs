use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{PipelineError, Result};
use crate::info;

/// Network collaborator that materialises a URL as a local file.
///
/// The pipeline only ever talks to it through [`ensure`]; tests substitute
/// an in-memory implementation.
pub trait Fetcher {
    /// Stream `url` into the file at `dest`, overwriting it.
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// HTTP downloader with a configurable per-request timeout, reporting
/// progress at every 5% of received bytes when the server announces a
/// content length.
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let response = agent.get(url).call().map_err(|e| PipelineError::Download {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let total: Option<u64> = response
            .header("Content-Length")
            .and_then(|v| v.parse().ok());
        let bar = total.map(|t| {
            let bar = ProgressBar::new(t);
            if let Ok(style) =
                ProgressStyle::with_template("{bar:40} {percent}% {bytes}/{total_bytes}")
            {
                bar.set_style(style);
            }
            bar
        });

        let mut reader = response.into_reader();
        let mut out = File::create(dest)?;
        let mut buf = [0u8; 32 * 1024];
        let mut received: u64 = 0;
        let mut last_step: u64 = 0;
        loop {
            let n = reader.read(&mut buf).map_err(|e| PipelineError::Download {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            received += n as u64;
            // Redraw only when another 5% has arrived; reporting is
            // best-effort and never fails the download.
            if let (Some(total), Some(bar)) = (total, bar.as_ref()) {
                let step = received * 100 / total.max(1) / 5;
                if step > last_step {
                    last_step = step;
                    bar.set_position(received);
                }
            }
        }
        out.flush()?;
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        Ok(())
    }
}

/// Download `filename` into `data_root` if not present, and make sure the
/// result has the right size.
///
/// The local path is always `data_root/filename`. With `force` the file is
/// re-downloaded even when present. A size mismatch after the file exists
/// is fatal: the archive is corrupt or the wrong version.
pub fn ensure(
    fetcher: &dyn Fetcher,
    base_url: &str,
    filename: &str,
    data_root: &Path,
    expected_bytes: u64,
    force: bool,
) -> Result<PathBuf> {
    fs::create_dir_all(data_root)?;
    let dest = data_root.join(filename);
    if force || !dest.exists() {
        info!("attempting to download: {}", filename);
        fetcher.fetch(&format!("{}{}", base_url, filename), &dest)?;
        info!("download complete: {}", filename);
    }
    let actual = fs::metadata(&dest)?.len();
    if actual != expected_bytes {
        return Err(PipelineError::Integrity {
            path: dest,
            expected: expected_bytes,
            actual,
        });
    }
    info!("found and verified {}", dest.display());
    Ok(dest)
}
