use crate::{
    error::ArchiveError,
    types::{ContestId, Sample, SampleKind, TaskId},
};
use std::{
    collections::BTreeMap,
    fs,
    os::unix::fs::DirBuilderExt,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const DEFAULT_SAMPLE_DIR: &str = "sample";

/// On-disk sample store laid out as `<root>/<contest>/<task>/{in,out}/<index>.txt`.
#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_DIR)
    }
}

impl Archive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn task_dir(&self, contest: &ContestId, task: &TaskId) -> PathBuf {
        self.root.join(contest).join(task)
    }

    pub fn sample_path(
        &self,
        contest: &ContestId,
        task: &TaskId,
        kind: SampleKind,
        index: usize,
    ) -> PathBuf {
        self.task_dir(contest, task)
            .join(kind.to_string())
            .join(format!("{index}.txt"))
    }

    /// Write one sample text verbatim, replacing any previous file.
    pub fn write(
        &self,
        text: &str,
        index: usize,
        contest: &ContestId,
        task: &TaskId,
        kind: SampleKind,
    ) -> Result<PathBuf, ArchiveError> {
        let path = self.sample_path(contest, task, kind, index);
        if let Some(dir) = path.parent() {
            create_private_dir(dir)?;
        }
        fs::write(&path, text).map_err(|e| ArchiveError::io(&path, e))?;
        debug!(path = %path.display(), bytes = text.len(), "archived sample");
        Ok(path)
    }

    /// Write every pair of a task with its position as the index.
    pub fn write_all(
        &self,
        samples: &[Sample],
        contest: &ContestId,
        task: &TaskId,
    ) -> Result<(), ArchiveError> {
        for (index, sample) in samples.iter().enumerate() {
            self.write(&sample.input, index, contest, task, SampleKind::Input)?;
            self.write(&sample.output, index, contest, task, SampleKind::Output)?;
        }
        Ok(())
    }

    /// Read back a task's samples, ordered by numeric index.
    pub fn load(&self, contest: &ContestId, task: &TaskId) -> Result<Vec<Sample>, ArchiveError> {
        let dir = self.task_dir(contest, task);
        if !dir.is_dir() {
            return Err(ArchiveError::MissingTask(dir));
        }

        let inputs = read_kind(&dir.join(SampleKind::Input.to_string()))?;
        let mut outputs = read_kind(&dir.join(SampleKind::Output.to_string()))?;

        if let Some(index) = outputs.keys().find(|i| !inputs.contains_key(*i)) {
            return Err(ArchiveError::Unpaired {
                index: *index,
                missing: "in",
            });
        }

        let mut samples = Vec::with_capacity(inputs.len());
        for (index, input) in inputs {
            let output = outputs.remove(&index).ok_or(ArchiveError::Unpaired {
                index,
                missing: "out",
            })?;
            samples.push(Sample { input, output });
        }
        Ok(samples)
    }
}

fn read_kind(dir: &Path) -> Result<BTreeMap<usize, String>, ArchiveError> {
    let mut texts = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(texts);
    }

    let entries = fs::read_dir(dir).map_err(|e| ArchiveError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| ArchiveError::io(dir, e))?.path();
        let Some(index) = sample_index(&path) else {
            continue;
        };
        let text = fs::read_to_string(&path).map_err(|e| ArchiveError::io(&path, e))?;
        texts.insert(index, text);
    }
    Ok(texts)
}

fn sample_index(path: &Path) -> Option<usize> {
    if path.extension()? != "txt" {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

fn create_private_dir(dir: &Path) -> Result<(), ArchiveError> {
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .map_err(|e| ArchiveError::io(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (ContestId, TaskId) {
        ("abc059".parse().unwrap(), "b".parse().unwrap())
    }

    #[test]
    fn write_should_use_the_sample_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = Archive::new(tmp.path().join("sample"));
        let (contest, task) = ids();

        let path = archive
            .write("3\n", 0, &contest, &task, SampleKind::Input)
            .unwrap();

        assert_eq!(path, tmp.path().join("sample/abc059/b/in/0.txt"));
        assert_eq!(fs::read_to_string(path).unwrap(), "3\n");
    }

    #[test]
    fn write_should_create_owner_only_directories() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let archive = Archive::new(tmp.path().join("sample"));
        let (contest, task) = ids();
        archive
            .write("9", 0, &contest, &task, SampleKind::Output)
            .unwrap();

        let mode = fs::metadata(archive.task_dir(&contest, &task).join("out"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn write_should_overwrite_previous_samples() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = Archive::new(tmp.path());
        let (contest, task) = ids();

        archive
            .write("old and longer", 0, &contest, &task, SampleKind::Input)
            .unwrap();
        let path = archive
            .write("new", 0, &contest, &task, SampleKind::Input)
            .unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "new");
    }

    #[test]
    fn load_should_round_trip_exact_text() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = Archive::new(tmp.path());
        let (contest, task) = ids();
        let samples = vec![
            Sample {
                input: "  3 \r\n\n".into(),
                output: "9".into(),
            },
            Sample {
                input: "".into(),
                output: "\t\n".into(),
            },
        ];

        archive.write_all(&samples, &contest, &task).unwrap();
        assert_eq!(archive.load(&contest, &task).unwrap(), samples);
    }

    #[test]
    fn load_should_order_indices_numerically() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = Archive::new(tmp.path());
        let (contest, task) = ids();
        let samples = (0..12)
            .map(|i| Sample {
                input: format!("{i}\n"),
                output: format!("{}", i * i),
            })
            .collect::<Vec<_>>();

        archive.write_all(&samples, &contest, &task).unwrap();
        fs::write(archive.task_dir(&contest, &task).join("in/notes.md"), "x").unwrap();

        assert_eq!(archive.load(&contest, &task).unwrap(), samples);
    }

    #[test]
    fn load_should_report_missing_tasks_and_unpaired_files() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = Archive::new(tmp.path());
        let (contest, task) = ids();

        assert!(matches!(
            archive.load(&contest, &task),
            Err(ArchiveError::MissingTask(_))
        ));

        archive
            .write("1\n", 0, &contest, &task, SampleKind::Input)
            .unwrap();
        assert!(matches!(
            archive.load(&contest, &task),
            Err(ArchiveError::Unpaired {
                index: 0,
                missing: "out"
            })
        ));

        archive
            .write("1", 1, &contest, &task, SampleKind::Output)
            .unwrap();
        archive
            .write("1", 0, &contest, &task, SampleKind::Output)
            .unwrap();
        assert!(matches!(
            archive.load(&contest, &task),
            Err(ArchiveError::Unpaired {
                index: 1,
                missing: "in"
            })
        ));
    }
}
