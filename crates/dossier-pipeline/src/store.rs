//! Text sidecars and JSON artifacts on disk; the pipeline's cache

use crate::artifact::ProcessedFileArtifact;
use crate::error::PipelineError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Two parallel directories keyed by source file stem:
/// `<text_dir>/<stem>.txt` and `<json_dir>/<stem>.json`.
///
/// A file counts as cached only when both exist and the JSON parses.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    text_dir: PathBuf,
    json_dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store over the two output directories
    pub fn new(text_dir: impl Into<PathBuf>, json_dir: impl Into<PathBuf>) -> Self {
        Self {
            text_dir: text_dir.into(),
            json_dir: json_dir.into(),
        }
    }

    /// Create both output directories if needed
    pub fn ensure_dirs(&self) -> Result<(), PipelineError> {
        std::fs::create_dir_all(&self.text_dir)?;
        std::fs::create_dir_all(&self.json_dir)?;
        Ok(())
    }

    /// Sidecar path for a source file
    pub fn text_path(&self, source: &Path) -> Result<PathBuf, PipelineError> {
        Ok(self.text_dir.join(format!("{}.txt", stem_of(source)?)))
    }

    /// Artifact path for a source file
    pub fn json_path(&self, source: &Path) -> Result<PathBuf, PipelineError> {
        Ok(self.json_dir.join(format!("{}.json", stem_of(source)?)))
    }

    /// Previously persisted artifact for `source`, if the cache is intact
    pub fn load_cached(
        &self,
        source: &Path,
    ) -> Result<Option<ProcessedFileArtifact>, PipelineError> {
        let text_path = self.text_path(source)?;
        let json_path = self.json_path(source)?;
        if !text_path.is_file() || !json_path.is_file() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&json_path)?;
        match ProcessedFileArtifact::from_json(&raw) {
            Ok(artifact) => {
                debug!("Cache hit for {:?}", source);
                Ok(Some(artifact))
            }
            Err(e) => {
                warn!("Ignoring unreadable artifact {:?}: {}", json_path, e);
                Ok(None)
            }
        }
    }

    /// Every readable artifact in the JSON directory, ordered by file name.
    ///
    /// Unparsable files are logged and left out.
    pub fn load_all(&self) -> Result<Vec<ProcessedFileArtifact>, PipelineError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.json_dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut artifacts = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = std::fs::read_to_string(&path)?;
            match ProcessedFileArtifact::from_json(&raw) {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => warn!("Ignoring unreadable artifact {:?}: {}", path, e),
            }
        }
        Ok(artifacts)
    }

    /// Persist the sidecar, then the artifact. Each write is atomic.
    pub fn save(
        &self,
        source: &Path,
        text: &str,
        artifact: &ProcessedFileArtifact,
    ) -> Result<(), PipelineError> {
        self.ensure_dirs()?;
        let text_path = self.text_path(source)?;
        let json_path = self.json_path(source)?;

        write_atomic(&text_path, text.as_bytes())?;
        write_atomic(&json_path, artifact.to_json()?.as_bytes())?;
        debug!("Persisted {:?} and {:?}", text_path, json_path);
        Ok(())
    }
}

fn stem_of(source: &Path) -> Result<String, PipelineError> {
    source
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::FileProcessing {
            path: source.to_path_buf(),
            reason: "file name has no usable stem".to_string(),
        })
}

/// Write through a temp file in the target directory, then rename over `path`
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PipelineError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.flush()?;
    file.persist(path).map_err(|e| PipelineError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn artifact() -> ProcessedFileArtifact {
        ProcessedFileArtifact {
            source_file: "in/report.pdf".to_string(),
            sections: Vec::new(),
        }
    }

    fn store(root: &Path) -> ArtifactStore {
        ArtifactStore::new(root.join("text"), root.join("json"))
    }

    #[test]
    fn test_paths_use_stem() {
        let store = ArtifactStore::new("/out/text", "/out/json");
        let source = Path::new("/in/Annual Report.pdf");
        assert_eq!(store.text_path(source).unwrap(), PathBuf::from("/out/text/Annual Report.txt"));
        assert_eq!(store.json_path(source).unwrap(), PathBuf::from("/out/json/Annual Report.json"));
    }

    #[test]
    fn test_save_then_load() {
        let root = tempdir().unwrap();
        let store = store(root.path());
        let source = Path::new("in/report.pdf");

        assert!(store.load_cached(source).unwrap().is_none());
        store.save(source, "raw text", &artifact()).unwrap();

        assert_eq!(std::fs::read_to_string(store.text_path(source).unwrap()).unwrap(), "raw text");
        assert_eq!(store.load_cached(source).unwrap(), Some(artifact()));
    }

    #[test]
    fn test_missing_sidecar_is_a_miss() {
        let root = tempdir().unwrap();
        let store = store(root.path());
        let source = Path::new("in/report.pdf");
        store.save(source, "raw text", &artifact()).unwrap();

        std::fs::remove_file(store.text_path(source).unwrap()).unwrap();
        assert!(store.load_cached(source).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_artifact_is_a_miss() {
        let root = tempdir().unwrap();
        let store = store(root.path());
        let source = Path::new("in/report.pdf");
        store.save(source, "raw text", &artifact()).unwrap();

        std::fs::write(store.json_path(source).unwrap(), "{\"source_file\": ").unwrap();
        assert!(store.load_cached(source).unwrap().is_none());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let root = tempdir().unwrap();
        let store = store(root.path());
        store.save(Path::new("a.txt"), "a", &artifact()).unwrap();

        let names: Vec<_> = std::fs::read_dir(root.path().join("json"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.json")]);
    }

    #[test]
    fn test_load_all_in_name_order_skipping_unreadable() {
        let root = tempdir().unwrap();
        let store = store(root.path());
        for name in ["b.pdf", "a.txt"] {
            let artifact = ProcessedFileArtifact {
                source_file: format!("in/{}", name),
                sections: Vec::new(),
            };
            store.save(Path::new(name), "text", &artifact).unwrap();
        }
        std::fs::write(root.path().join("json/c.json"), "not json").unwrap();
        std::fs::write(root.path().join("json/notes.md"), "# notes").unwrap();

        let sources: Vec<String> = store
            .load_all()
            .unwrap()
            .into_iter()
            .map(|a| a.source_file)
            .collect();
        assert_eq!(sources, vec!["in/a.txt", "in/b.pdf"]);
    }
}
