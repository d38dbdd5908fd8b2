use std::io;
use std::path::Path;

use tempfile::TempDir;
use tracing::debug;

/// Name prefix of per-run scratch directories.
const SCRATCH_PREFIX: &str = ".yt2imgbrd-";

/// Scratch directory for one pipeline run.
///
/// Created under the output root so the final rename never crosses a
/// filesystem boundary. [`WorkingArea::remove`] deletes it at the end of a
/// run; the owned [`TempDir`] deletes it on early returns and panics too.
#[derive(Debug)]
pub struct WorkingArea {
    dir: TempDir,
}

impl WorkingArea {
    pub fn create(output_root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(output_root)?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(output_root)?;
        debug!(path = %dir.path().display(), "created working area");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the directory and every artifact inside it.
    pub fn remove(self) -> io::Result<()> {
        debug!(path = %self.dir.path().display(), "removing working area");
        self.dir.close()
    }
}
