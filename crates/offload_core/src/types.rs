use std::fmt;
use std::path::PathBuf;

/// One schema-less item of the dataset.
pub type Record = serde_json::Value;

/// The ordered sequence of records currently held by a session.
pub type Dataset = Vec<Record>;

/// Correlates a worker reply with the request that caused it.
pub type RequestToken = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Parse,
    Filter,
    Sort,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Parse => "parse",
            OperationKind::Filter => "filter",
            OperationKind::Sort => "sort",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file chosen by the user, as handed over by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub source: FileSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Local file, read when the load starts.
    Path(PathBuf),
    /// Raw bytes already in memory.
    Bytes(Vec<u8>),
    /// Text already decoded by the host.
    Text(String),
}

impl FileHandle {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Bytes(bytes),
        }
    }

    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Text(text.into()),
        }
    }
}
