use std::{io, path::PathBuf};

pub mod directory;
pub mod reverse;

pub use directory::DirectoryStore;
pub use reverse::ReverseLines;

/// Progress file of a single ffmpeg job
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobFile {
    /// Identifier of the job: file name up to its first `.`
    pub id: String,
    /// Location of the progress file
    pub path: PathBuf,
}

impl JobFile {
    /// Build a [`JobFile`] from the file name, deriving its identifier
    pub fn new(file_name: &str, path: PathBuf) -> Self {
        let id = file_name.split('.').next().unwrap_or_default().to_owned();
        Self { id, path }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("could not list progress directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not read progress file {}: {source}", path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Trait to access the progress files written by ffmpeg
pub trait ProgressStore: std::fmt::Debug + Send + Sync + 'static {
    /// Lines of a progress file, last line first
    type Lines: Iterator<Item = io::Result<String>>;

    /// List the progress files of every known job
    fn list_jobs(&self) -> Result<Vec<JobFile>, ProgressError>;

    /// Open the progress file of a job for reading from its end
    ///
    /// remarks: The underlying handle is released when the iterator is dropped
    fn open_reverse(&self, job: &JobFile) -> Result<Self::Lines, ProgressError>;
}
