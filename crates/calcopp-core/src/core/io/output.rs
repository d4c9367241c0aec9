use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// An output file written to a temporary location next to its target.
///
/// The file only appears under its final name after [`StagedOutput::commit`]; dropping an
/// uncommitted output deletes the temporary file.
#[derive(Debug)]
pub struct StagedOutput {
    target: PathBuf,
    file: NamedTempFile,
}

impl StagedOutput {
    pub fn create(target: impl AsRef<Path>) -> io::Result<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = NamedTempFile::new_in(dir)?;
        debug!(target = ?target, staging = ?file.path(), "Staging output file.");
        Ok(Self { target, file })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Runs `write` against a buffered writer over the staged file and flushes it.
    pub fn write_with<T, E>(
        &mut self,
        write: impl FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<io::Error>,
    {
        let mut writer = BufWriter::new(&mut self.file);
        let result = write(&mut writer)?;
        writer.flush()?;
        Ok(result)
    }

    pub fn commit(self) -> io::Result<PathBuf> {
        self.file.persist(&self.target).map_err(|e| e.error)?;
        Ok(self.target)
    }
}

/// A set of staged outputs committed together once a run has succeeded.
#[derive(Debug, Default)]
pub struct OutputBatch {
    staged: Vec<StagedOutput>,
}

impl OutputBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, target: impl AsRef<Path>) -> io::Result<&mut StagedOutput> {
        let index = self.staged.len();
        self.staged.push(StagedOutput::create(target)?);
        Ok(&mut self.staged[index])
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn commit(self) -> io::Result<Vec<PathBuf>> {
        self.staged.into_iter().map(StagedOutput::commit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn committed_output_appears_under_target_name() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.asc");
        let mut staged = StagedOutput::create(&target).unwrap();
        staged
            .write_with(|w| -> io::Result<()> { writeln!(w, "hello") })
            .unwrap();
        assert!(!target.exists());
        assert_eq!(staged.commit().unwrap(), target);
        assert_eq!(fs::read_to_string(&target).unwrap(), "hello\n");
    }

    #[test]
    fn dropped_batch_leaves_no_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut batch = OutputBatch::new();
            batch
                .stage(dir.path().join("a.xsf"))
                .unwrap()
                .write_with(|w| -> io::Result<()> { writeln!(w, "partial") })
                .unwrap();
            batch.stage(dir.path().join("b.vesta")).unwrap();
            assert_eq!(batch.len(), 2);
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn committed_batch_replaces_existing_targets() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.asc");
        fs::write(&target, "old").unwrap();
        let mut batch = OutputBatch::new();
        batch
            .stage(&target)
            .unwrap()
            .write_with(|w| -> io::Result<()> { write!(w, "new") })
            .unwrap();
        batch.commit().unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }
}
