// SPDX-License-Identifier: AGPL-3.0

//! Destinations for named report artifacts

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writer callback handed to a sink
pub type WriteFn<'a> = dyn FnMut(&mut dyn Write) -> io::Result<()> + 'a;

/// Receives named artifacts from report formats
pub trait AttachmentSink {
    /// Open artifact `name` and let `write` fill it
    fn attach(&mut self, name: &str, write: &mut WriteFn<'_>) -> io::Result<()>;
}

/// A rendered artifact held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Collects artifacts in attachment order
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Vec<Artifact>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts
    }
}

impl AttachmentSink for MemorySink {
    fn attach(&mut self, name: &str, write: &mut WriteFn<'_>) -> io::Result<()> {
        let mut bytes = Vec::new();
        write(&mut bytes)?;
        self.artifacts.push(Artifact {
            name: name.to_string(),
            bytes,
        });
        Ok(())
    }
}

/// Writes each artifact as a file below a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Store an already rendered artifact
    pub fn store(&mut self, artifact: &Artifact) -> io::Result<()> {
        self.attach(&artifact.name, &mut |w| w.write_all(&artifact.bytes))
    }
}

impl AttachmentSink for DirectorySink {
    fn attach(&mut self, name: &str, write: &mut WriteFn<'_>) -> io::Result<()> {
        if name.contains("..") || Path::new(name).is_absolute() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Artifact name {} escapes the output directory", name),
            ));
        }

        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        write(&mut writer)?;
        writer.flush()?;

        tracing::debug!(path = %path.display(), "Wrote artifact");
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.attach("a.txt", &mut |w| w.write_all(b"hello")).unwrap();
        sink.attach("b.txt", &mut |w| writeln!(w, "{}", 42)).unwrap();

        assert_eq!(sink.artifacts().len(), 2);
        assert_eq!(sink.get("a.txt").unwrap().text(), "hello");
        assert_eq!(sink.get("b.txt").unwrap().text(), "42\n");
        assert!(sink.get("c.txt").is_none());
    }

    #[test]
    fn test_memory_sink_propagates_writer_error() {
        let mut sink = MemorySink::new();
        let err = sink
            .attach("x", &mut |_| Err(io::Error::new(io::ErrorKind::Other, "boom")))
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(sink.artifacts().is_empty());
    }

    #[test]
    fn test_directory_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out"));
        sink.attach("nested/r.txt", &mut |w| w.write_all(b"data"))
            .unwrap();

        let path = dir.path().join("out/nested/r.txt");
        assert_eq!(fs::read_to_string(&path).unwrap(), "data");
        assert_eq!(sink.written(), &[path]);
    }

    #[test]
    fn test_directory_sink_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        assert!(sink.attach("../x", &mut |_| Ok(())).is_err());
    }

    #[test]
    fn test_store_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        sink.store(&Artifact {
            name: "c.xml".to_string(),
            bytes: b"<x/>".to_vec(),
        })
        .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("c.xml")).unwrap(),
            "<x/>"
        );
    }
}
