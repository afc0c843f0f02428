use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;

use crate::checksum;
use crate::env;
use crate::progress::{ConsoleProgress, PercentTicker, ProgressSink};

const MANIFEST_URL: &str = "http://builds.nukacode.com/files.php";
const SLIM_ARCHIVE_URL: &str = "http://builds.nukacode.com/slim/latest.zip";
const FULL_ARCHIVE_URL: &str = "http://builds.nukacode.com/full/latest.zip";
const SLIM_FILE_NAME: &str = "laravel_slim.zip";
const FULL_FILE_NAME: &str = "laravel_full.zip";
const CANCELLED: &str = "download cancelled";

/// One build archive tracked by the fetcher. Fixed at startup.
#[derive(Debug, Clone)]
pub struct ArchiveTarget {
    pub label: &'static str,
    pub archive_url: String,
    pub local_path: PathBuf,
}

/// Keeps the local build archives in sync with the build server.
///
/// A single HTTP client is reused for both the manifest checks and the
/// archive downloads; targets are processed strictly one after another.
pub struct BuildFetcher {
    client: Client,
    manifest_url: String,
    targets: Vec<ArchiveTarget>,
}

impl BuildFetcher {
    pub fn new(manifest_url: impl Into<String>, targets: Vec<ArchiveTarget>) -> Self {
        Self {
            client: Client::new(),
            manifest_url: manifest_url.into(),
            targets,
        }
    }

    /// Fetcher wired to the NukaCode build server and the install directory.
    pub fn for_build_server() -> Self {
        Self::new(MANIFEST_URL, default_targets(&env::archive_dir()))
    }

    /// Bring every target up to date, sequentially: stale or missing
    /// archives are removed and redownloaded, current ones are skipped.
    pub async fn fetch_all(&self, cancel: Option<&AtomicBool>) -> Result<(), String> {
        for target in &self.targets {
            check_cancel(cancel)?;
            if !self.is_stale(&target.local_path).await? {
                debug!("fetch: {} archive is current, skipping", target.label);
                continue;
            }
            info!(
                "fetch: downloading {} build to {}",
                target.label,
                target.local_path.display()
            );
            cleanup(&target.local_path);
            self.download_with_progress(
                &target.archive_url,
                &target.local_path,
                ConsoleProgress::new(),
                cancel,
            )
            .await?;
            info!("fetch: {} build download complete", target.label);
        }
        Ok(())
    }

    /// Whether the local archive needs a download.
    ///
    /// A missing file is stale without consulting the server. Otherwise the
    /// file's MD5 is matched against the manifest; any manifest failure is
    /// fatal since there is no way to decide staleness without it.
    pub async fn is_stale(&self, local_path: &Path) -> Result<bool, String> {
        if !local_path.exists() {
            return Ok(true);
        }
        let digest = checksum::md5_file(local_path)?;
        let manifest = self.fetch_manifest().await?;
        Ok(!manifest
            .iter()
            .any(|entry| entry.eq_ignore_ascii_case(&digest)))
    }

    async fn fetch_manifest(&self) -> Result<Vec<String>, String> {
        let resp = self
            .client
            .get(&self.manifest_url)
            .send()
            .await
            .map_err(|e| format!("manifest request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("manifest request bad status: {e}"))?;
        let text = resp
            .text()
            .await
            .map_err(|e| format!("manifest body error: {e}"))?;
        serde_json::from_str(&text).map_err(|e| format!("manifest parse error: {e}"))
    }

    /// Stream `url` into `dest`, ticking the sink once per integer percent.
    ///
    /// Bytes are written as they arrive; on failure the partial file is left
    /// in place. A raised cancel flag removes the partial file instead.
    pub async fn download_with_progress<S: ProgressSink>(
        &self,
        url: &str,
        dest: &Path,
        sink: S,
        cancel: Option<&AtomicBool>,
    ) -> Result<(), String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("download request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("download status error: {e}"))?;

        if let Some(parent) = dest.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create download dir: {e}"))?;
        }
        let mut file = async_fs::File::create(dest)
            .await
            .map_err(|e| format!("failed to create archive file: {e}"))?;

        let total = resp.content_length();
        let mut stream = resp.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut ticker = PercentTicker::new(sink);

        while let Some(chunk) = stream.next().await {
            if is_cancelled(cancel) {
                let _ = async_fs::remove_file(dest).await;
                return Err(CANCELLED.into());
            }
            let chunk = chunk.map_err(|e| format!("download read error: {e}"))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("failed to write archive: {e}"))?;
            downloaded += chunk.len() as u64;
            ticker.update(downloaded, total);
        }

        file.flush()
            .await
            .map_err(|e| format!("failed to flush archive: {e}"))?;

        if let Some(total) = total
            && downloaded < total
        {
            return Err(format!(
                "download incomplete: received {downloaded} of {total} bytes"
            ));
        }

        ticker.finish();
        Ok(())
    }
}

/// The two archives the NukaCode installer ships, rooted at `base_dir`.
pub fn default_targets(base_dir: &Path) -> Vec<ArchiveTarget> {
    vec![
        ArchiveTarget {
            label: "slim",
            archive_url: SLIM_ARCHIVE_URL.to_owned(),
            local_path: base_dir.join(SLIM_FILE_NAME),
        },
        ArchiveTarget {
            label: "full",
            archive_url: FULL_ARCHIVE_URL.to_owned(),
            local_path: base_dir.join(FULL_FILE_NAME),
        },
    ]
}

/// Best-effort removal of a stale archive: clear any readonly bit, then
/// delete. Never fails; a delete error is only logged.
fn cleanup(path: &Path) {
    let Ok(meta) = fs::metadata(path) else {
        return;
    };
    let mut perms = meta.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        let _ = fs::set_permissions(path, perms);
    }
    if let Err(err) = fs::remove_file(path) {
        warn!(
            "fetch: could not remove stale archive {}: {err}",
            path.display()
        );
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.map(|flag| flag.load(Ordering::SeqCst)).unwrap_or(false)
}

fn check_cancel(cancel: Option<&AtomicBool>) -> Result<(), String> {
    if is_cancelled(cancel) {
        Err(CANCELLED.into())
    } else {
        Ok(())
    }
}
