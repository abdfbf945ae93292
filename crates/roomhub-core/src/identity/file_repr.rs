use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Prefix of a local file's canonical key.
const LOCAL_FILE_MARKER: &str = "\0file:";

/// Errors from reading a [`FileRepr`] or decoding its stored form.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReprError {
    #[error("Expected a {expected} but this FileRepr holds a {found}")]
    WrongVariant {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),
}

/// A file picked locally that has not been uploaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Encode the payload as `data:<type>;base64,<payload>`.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            general_purpose::STANDARD.encode(&self.data)
        )
    }

    /// Rebuild a file from a base64 data URL produced by [`LocalFile::to_data_url`].
    pub fn from_data_url(name: impl Into<String>, data_url: &str) -> Result<Self, ReprError> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| ReprError::InvalidDataUrl("missing data: scheme".to_string()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| ReprError::InvalidDataUrl("missing payload separator".to_string()))?;
        let content_type = meta
            .strip_suffix(";base64")
            .ok_or_else(|| ReprError::InvalidDataUrl("only base64 payloads are supported".to_string()))?;
        let data = general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ReprError::InvalidDataUrl(e.to_string()))?;

        Ok(Self::new(
            name,
            if content_type.is_empty() {
                "application/octet-stream"
            } else {
                content_type
            },
            data,
        ))
    }
}

/// Either a freshly picked file or a reference to one already uploaded.
///
/// Identity (`Eq`, `Hash`) is the canonical key: the URI itself for
/// references, the file name behind a NUL-led marker for local files. A URI
/// cannot contain NUL, so the two kinds never collide. Two different files
/// with the same name are the same value.
#[derive(Debug, Clone)]
pub enum FileRepr {
    InMemoryFile(LocalFile),
    RemoteReference(String),
}

impl FileRepr {
    pub fn is_file(&self) -> bool {
        matches!(self, FileRepr::InMemoryFile(_))
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, FileRepr::RemoteReference(_))
    }

    pub fn get_file(&self) -> Result<&LocalFile, ReprError> {
        match self {
            FileRepr::InMemoryFile(file) => Ok(file),
            FileRepr::RemoteReference(_) => Err(self.wrong_variant("file")),
        }
    }

    pub fn get_uri(&self) -> Result<&str, ReprError> {
        match self {
            FileRepr::RemoteReference(uri) => Ok(uri),
            FileRepr::InMemoryFile(_) => Err(self.wrong_variant("uri")),
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            FileRepr::InMemoryFile(_) => "file",
            FileRepr::RemoteReference(_) => "uri",
        }
    }

    fn wrong_variant(&self, expected: &'static str) -> ReprError {
        ReprError::WrongVariant {
            expected,
            found: self.variant_name(),
        }
    }

    /// Identity string; see [`FileRepr`].
    pub fn canonical_key(&self) -> String {
        match self {
            FileRepr::InMemoryFile(file) => format!("{}{}", LOCAL_FILE_MARKER, file.name),
            FileRepr::RemoteReference(uri) => uri.clone(),
        }
    }

    /// Serializable form for embedding in a draft snapshot.
    pub fn to_draft_file(&self) -> DraftFile {
        match self {
            FileRepr::InMemoryFile(file) => DraftFile::File {
                name: file.name.clone(),
                data_url: file.to_data_url(),
            },
            FileRepr::RemoteReference(uri) => DraftFile::Uri { uri: uri.clone() },
        }
    }
}

impl Display for FileRepr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FileRepr::InMemoryFile(file) => write!(f, "[file] {}", file.name),
            FileRepr::RemoteReference(uri) => f.write_str(uri),
        }
    }
}

impl PartialEq for FileRepr {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_key() == other.canonical_key()
    }
}

impl Eq for FileRepr {}

impl std::hash::Hash for FileRepr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical_key().hash(state);
    }
}

impl From<LocalFile> for FileRepr {
    fn from(file: LocalFile) -> Self {
        FileRepr::InMemoryFile(file)
    }
}

impl From<String> for FileRepr {
    fn from(uri: String) -> Self {
        FileRepr::RemoteReference(uri)
    }
}

impl From<&str> for FileRepr {
    fn from(uri: &str) -> Self {
        FileRepr::RemoteReference(uri.to_string())
    }
}

/// Stored shape of a [`FileRepr`] inside a draft payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DraftFile {
    File {
        name: String,
        #[serde(rename = "dataUrl")]
        data_url: String,
    },
    Uri {
        uri: String,
    },
}

impl TryFrom<DraftFile> for FileRepr {
    type Error = ReprError;

    fn try_from(stored: DraftFile) -> Result<Self, Self::Error> {
        match stored {
            DraftFile::File { name, data_url } => {
                Ok(FileRepr::InMemoryFile(LocalFile::from_data_url(name, &data_url)?))
            }
            DraftFile::Uri { uri } => Ok(FileRepr::RemoteReference(uri)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(name: &str, data: &'static [u8]) -> LocalFile {
        LocalFile::new(name, "image/png", Bytes::from_static(data))
    }

    #[test]
    fn variant_accessors() {
        let file = FileRepr::from(photo("a.png", b"abc"));
        assert!(file.is_file());
        assert!(!file.is_uri());
        assert_eq!(file.get_file().unwrap().name, "a.png");

        let uri = FileRepr::from("https://x/a.png");
        assert!(uri.is_uri());
        assert_eq!(uri.get_uri().unwrap(), "https://x/a.png");
    }

    #[test]
    fn reading_wrong_variant_fails() {
        let uri = FileRepr::from("https://x/a.png");
        assert_eq!(
            uri.get_file().unwrap_err(),
            ReprError::WrongVariant {
                expected: "file",
                found: "uri"
            }
        );

        let file = FileRepr::from(photo("a.png", b"abc"));
        assert!(matches!(
            file.get_uri(),
            Err(ReprError::WrongVariant { expected: "uri", .. })
        ));
    }

    #[test]
    fn identity_uses_file_name_not_bytes() {
        let first = FileRepr::from(photo("a.png", b"one"));
        let second = FileRepr::from(photo("a.png", b"two"));
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "[file] a.png");
        assert_eq!(first.canonical_key(), "\0file:a.png");

        let uri = FileRepr::from("a.png");
        assert_ne!(first, uri);
    }

    #[test]
    fn uri_spelled_like_a_file_label_is_distinct() {
        let file = FileRepr::from(photo("a.png", b"one"));
        let lookalike = FileRepr::from("[file] a.png");
        assert_eq!(file.to_string(), lookalike.to_string());
        assert_ne!(file, lookalike);
        assert_ne!(file.canonical_key(), lookalike.canonical_key());
    }

    #[test]
    fn draft_file_restores_local_payload() {
        let original = FileRepr::from(photo("room.png", b"hello"));
        let stored = original.to_draft_file();
        assert_eq!(
            stored,
            DraftFile::File {
                name: "room.png".to_string(),
                data_url: "data:image/png;base64,aGVsbG8=".to_string(),
            }
        );

        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["kind"], "file");
        assert_eq!(json["dataUrl"], "data:image/png;base64,aGVsbG8=");

        let restored = FileRepr::try_from(stored).unwrap();
        assert_eq!(&restored.get_file().unwrap().data[..], b"hello");
    }

    #[test]
    fn draft_file_keeps_uri_as_is() {
        let stored = FileRepr::from("https://x/a.png").to_draft_file();
        let restored = FileRepr::try_from(stored).unwrap();
        assert_eq!(restored.get_uri().unwrap(), "https://x/a.png");
    }

    #[test]
    fn malformed_data_url_rejected() {
        assert!(LocalFile::from_data_url("a", "https://x/a.png").is_err());
        assert!(LocalFile::from_data_url("a", "data:image/png,raw").is_err());
        assert!(LocalFile::from_data_url("a", "data:image/png;base64,@@@").is_err());
    }
}
