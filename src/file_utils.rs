use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::DiscoveryError;

// @module: File and directory utilities

/// Extensions of files that go through the translation pipeline
pub const DOCUMENT_EXTENSIONS: [&str; 2] = ["md", "mdx"];

// Bytes inspected when sniffing for binary content
const BINARY_SNIFF_LEN: usize = 1024;

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @checks: Markdown document by extension (.md / .mdx)
    pub fn is_document_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                DOCUMENT_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d))
            })
            .unwrap_or(false)
    }

    /// Check whether a file is binary.
    ///
    /// A file counts as text when its first bytes decode as UTF-8. A multi-byte
    /// sequence cut off by the sniff window is not treated as invalid.
    pub fn is_binary_file<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open file: {:?}", path))?;

        let mut head = Vec::with_capacity(BINARY_SNIFF_LEN);
        file.take(BINARY_SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .with_context(|| format!("Failed to read file: {:?}", path))?;

        Ok(match std::str::from_utf8(&head) {
            Ok(_) => false,
            Err(e) => e.error_len().is_some(),
        })
    }

    /// List every file under a directory as sorted paths relative to it
    pub fn list_relative_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, DiscoveryError> {
        let dir = dir.as_ref();
        let scan_error = |message: String| DiscoveryError::Scan {
            path: dir.display().to_string(),
            message,
        };

        if !dir.is_dir() {
            return Err(scan_error("not a directory".to_string()));
        }

        let mut result = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| scan_error(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| scan_error(e.to_string()))?;
            result.push(rel.to_path_buf());
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }

        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        Ok(())
    }
}
