use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use stackline_core::project::ProjectSource;
use tempfile::TempDir;
use tokio::process::Command;

/// Directory that project working directories are resolved against.
///
/// A git checkout lives in a temporary directory that is removed when this
/// value is dropped, so keep it alive for the whole run.
#[derive(Debug)]
pub enum ProjectRoot {
    Local(PathBuf),
    Checkout { _dir: TempDir, root: PathBuf },
}

impl ProjectRoot {
    pub fn path(&self) -> &Path {
        match self {
            Self::Local(path) => path,
            Self::Checkout { root, .. } => root,
        }
    }
}

pub async fn materialize(source: &ProjectSource) -> Result<ProjectRoot> {
    match source {
        ProjectSource::Local { path } => Ok(ProjectRoot::Local(local_root(path)?)),
        ProjectSource::Git {
            url,
            branch,
            subdir,
        } => {
            let dir = tempfile::Builder::new()
                .prefix("stackline-")
                .tempdir()
                .context("Failed to create checkout directory")?;
            shallow_clone(url, branch, dir.path()).await?;

            let root = dir.path().join(subdir);
            if !root.is_dir() {
                bail!("Path '{}' does not exist in {url}@{branch}", subdir.display());
            }
            tracing::info!(url = %url, branch = %branch, root = %root.display(), "cloned project source");
            Ok(ProjectRoot::Checkout { _dir: dir, root })
        }
    }
}

fn local_root(path: &Path) -> Result<PathBuf> {
    let root = if path.as_os_str().is_empty() {
        std::env::current_dir().context("Failed to resolve current directory")?
    } else {
        path.to_path_buf()
    };
    if !root.is_dir() {
        bail!("Project path '{}' is not a directory", root.display());
    }
    Ok(root)
}

async fn shallow_clone(url: &str, branch: &str, dest: &Path) -> Result<()> {
    let output = Command::new("git")
        .args(["clone", "--depth", "1", "--single-branch", "--branch"])
        .arg(branch)
        .arg(url)
        .arg(dest)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| "Failed to execute git clone")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone of {url}@{branch} failed: {}", stderr.trim());
    }
    Ok(())
}
