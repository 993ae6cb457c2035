// Readiness gate
//
// Blocks startup until a marker file appears, e.g. a token written by a
// sidecar or init container.
//
// Numan Thabit 2025 Nov

use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Poll `path` every `interval` until it exists.
pub async fn wait_for_file(path: &Path, interval: Duration) {
	loop {
		match tokio::fs::try_exists(path).await {
			Ok(true) => {
				info!(path = %path.display(), "readiness file present");
				return;
			}
			Ok(false) => {
				info!(path = %path.display(), "waiting for readiness file");
			}
			Err(err) => {
				warn!(path = %path.display(), error = %err, "readiness file check failed; retrying");
			}
		}
		tokio::time::sleep(interval).await;
	}
}
