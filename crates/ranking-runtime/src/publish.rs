//! Copy generated documents into the directory served to the web client.

use std::path::{Path, PathBuf};

use ranking_core::error::{RankingError, Result};
use tracing::info;

use crate::pipeline::{DASHBOARD_FILE_NAME, RANKINGS_FILE_NAME};

/// Files copied by [`publish`], in copy order.
pub const PUBLISHED_FILES: [&str; 2] = [RANKINGS_FILE_NAME, DASHBOARD_FILE_NAME];

/// Paths written by a successful [`publish`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishReport {
    pub published: Vec<PathBuf>,
}

/// Copy both documents from `output_dir` into `publish_dir`, byte for byte.
///
/// `publish_dir` is created when missing. Each copy is staged and renamed
/// into place. Copying stops at the first failure; files already published
/// stay where they are.
pub fn publish(output_dir: &Path, publish_dir: &Path) -> Result<PublishReport> {
    std::fs::create_dir_all(publish_dir).map_err(|source| RankingError::Publish {
        path: publish_dir.to_path_buf(),
        source,
    })?;

    let mut report = PublishReport::default();
    for name in PUBLISHED_FILES {
        let src = output_dir.join(name);
        let dest = publish_dir.join(name);
        copy_atomic(&src, &dest)?;
        info!("Copied {} to {}", name, publish_dir.display());
        report.published.push(dest);
    }

    Ok(report)
}

fn copy_atomic(src: &Path, dest: &Path) -> Result<()> {
    let tmp = dest.with_extension("json.tmp");
    std::fs::copy(src, &tmp).map_err(|source| RankingError::Publish {
        path: src.to_path_buf(),
        source,
    })?;
    std::fs::rename(&tmp, dest).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        RankingError::Publish {
            path: dest.to_path_buf(),
            source,
        }
    })
}
