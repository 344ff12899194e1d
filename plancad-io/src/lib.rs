use std::fs;
use std::path::{Path, PathBuf};

use plancad_core::derived::BuildOptions;
use plancad_core::document::Document;
use plancad_core::record::{DocumentRecord, RecordError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure in {path:?}: {source}")]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Record(#[from] RecordError),
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

pub trait DocumentSaver {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError>;
}

/// 原生 JSON 文档格式：一个 [`DocumentRecord`]。
#[derive(Debug, Clone, Default)]
pub struct JsonFacade {
    options: BuildOptions,
    pretty: bool,
}

impl JsonFacade {
    pub fn new() -> Self {
        Self::default()
    }

    /// 载入的文档使用这些网格构建参数。
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn parse_str(&self, data: &str) -> Result<Document, IoError> {
        let record: DocumentRecord =
            serde_json::from_str(data).map_err(|source| IoError::InvalidDocument {
                path: PathBuf::new(),
                source,
            })?;
        Ok(Document::from_record(record, self.options.clone())?)
    }

    pub fn to_json(&self, document: &Document) -> Result<String, IoError> {
        let record = document.to_record()?;
        let encoded = if self.pretty {
            serde_json::to_string_pretty(&record)
        } else {
            serde_json::to_string(&record)
        };
        encoded.map_err(|err| IoError::Record(RecordError::Malformed(err)))
    }
}

impl DocumentLoader for JsonFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let record: DocumentRecord =
            serde_json::from_str(&data).map_err(|source| IoError::InvalidDocument {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            path = %path.display(),
            objects = record.objects.len(),
            blocks = record.blocks.len(),
            "document record parsed"
        );
        let document = Document::from_record(record, self.options.clone())?;
        info!(path = %path.display(), objects = document.len(), "document loaded");
        Ok(document)
    }
}

impl DocumentSaver for JsonFacade {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError> {
        let data = self.to_json(document)?;
        fs::write(path, data).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), objects = document.len(), "document saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use plancad_core::geometry::Point2;

    use super::*;

    #[test]
    fn string_round_trip_keeps_counters() {
        let mut document = Document::new();
        document.add_circle(Point2::new(1.0, 2.0), 3.0);
        let facade = JsonFacade::new().pretty(true);
        let text = facade.to_json(&document).expect("encode");
        assert!(text.contains("\"type\": \"circle\""));

        let loaded = facade.parse_str(&text).expect("decode");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.next_object_id(), document.next_object_id());
    }

    #[test]
    fn garbage_is_an_invalid_document() {
        let err = JsonFacade::new().parse_str("{ not json").expect_err("garbage");
        assert!(matches!(err, IoError::InvalidDocument { .. }));
    }

    #[test]
    fn newer_versions_are_rejected() {
        let text = r#"{"version": 99, "next_id": 1, "objects": []}"#;
        let err = JsonFacade::new().parse_str(text).expect_err("version");
        assert!(matches!(
            err,
            IoError::Record(RecordError::UnsupportedVersion { found: 99, .. })
        ));
    }
}
