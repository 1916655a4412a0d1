use std::{fs::File, io, path::PathBuf};

use super::{JobFile, ProgressError, ProgressStore, ReverseLines};

/// [`ProgressStore`] backed by a directory of progress files
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    /// Directory watched for progress files
    path: PathBuf,
}

impl DirectoryStore {
    /// Create a new [`DirectoryStore`]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Keep the regular files among the directory entries, sorted by path
    ///
    /// Entries that cannot be read are skipped so the other jobs are still listed.
    fn job_files<I>(&self, entries: I) -> Vec<JobFile>
    where
        I: IntoIterator<Item = io::Result<PathBuf>>,
    {
        let mut jobs = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    log::warn!("Skip unreadable entry of {}: {err}", self.path.display());
                    continue;
                }
            };

            // Symlinks are followed so a linked progress file is still picked up
            if !path.is_file() {
                log::debug!("Skip {}: not a file", path.display());
                continue;
            }

            let Some(file_name) = path.file_name() else {
                continue;
            };
            jobs.push(JobFile::new(&file_name.to_string_lossy(), path.clone()));
        }

        jobs.sort_unstable_by(|a, b| a.path.cmp(&b.path));

        log::trace!("Found progress files: {jobs:#?}");

        jobs
    }
}

impl ProgressStore for DirectoryStore {
    type Lines = ReverseLines<File>;

    fn list_jobs(&self) -> Result<Vec<JobFile>, ProgressError> {
        let entries = std::fs::read_dir(&self.path).map_err(|source| {
            ProgressError::DirectoryUnreadable {
                path: self.path.clone(),
                source,
            }
        })?;

        Ok(self.job_files(entries.map(|entry| entry.map(|entry| entry.path()))))
    }

    fn open_reverse(&self, job: &JobFile) -> Result<Self::Lines, ProgressError> {
        let unreadable = |source| ProgressError::FileUnreadable {
            path: job.path.clone(),
            source,
        };

        let mut lines = File::open(&job.path)
            .and_then(ReverseLines::new)
            .map_err(unreadable)?;

        // ffmpeg is still writing the last line: only complete lines are exposed
        if !lines.is_terminated() {
            if let Some(Err(err)) = lines.next() {
                return Err(unreadable(err));
            }
            log::trace!("Skip partial last line of {}", job.path.display());
        }

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_jobs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.progress"), "progress=continue\n").unwrap();
        std::fs::write(dir.path().join("a.progress"), "").unwrap();
        std::fs::create_dir(dir.path().join("c.progress")).unwrap();

        let store = DirectoryStore::new(dir.path());
        let jobs = store.list_jobs().unwrap();

        assert_eq!(
            jobs,
            [
                JobFile {
                    id: "a".to_owned(),
                    path: dir.path().join("a.progress"),
                },
                JobFile {
                    id: "b".to_owned(),
                    path: dir.path().join("b.progress"),
                },
            ]
        );
    }

    #[test]
    fn unreadable_entry_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.progress"), "").unwrap();
        std::fs::write(dir.path().join("b.progress"), "").unwrap();

        let store = DirectoryStore::new(dir.path());
        let jobs = store.job_files([
            Ok(dir.path().join("b.progress")),
            Err(io::Error::other("stale entry")),
            Ok(dir.path().join("a.progress")),
        ]);

        assert_eq!(
            jobs.iter().map(|job| job.id.as_str()).collect::<Vec<_>>(),
            ["a", "b"]
        );
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path().join("missing"));

        assert!(matches!(
            store.list_jobs(),
            Err(ProgressError::DirectoryUnreadable { .. })
        ));
    }

    #[test]
    fn open_reverse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.progress");
        std::fs::write(&path, "frame=1\nprogress=continue\n").unwrap();

        let store = DirectoryStore::new(dir.path());
        let job = JobFile::new("job.progress", path);
        let lines = store
            .open_reverse(&job)
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap();

        assert_eq!(lines, ["progress=continue", "frame=1"]);

        std::fs::write(&job.path, "frame=120\nprogress=continue\nframe=13").unwrap();
        let lines = store
            .open_reverse(&job)
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap();

        assert_eq!(lines, ["progress=continue", "frame=120"]);

        std::fs::remove_file(&job.path).unwrap();
        assert!(matches!(
            store.open_reverse(&job),
            Err(ProgressError::FileUnreadable { .. })
        ));
    }
}
