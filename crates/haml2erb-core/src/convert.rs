/*
 * convert.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Conversion façade and the file/directory driver.
//!
//! `convert` is the pure string-to-string pipeline. The driver functions
//! never return `Err`: I/O and syntax failures are recorded on the per-file
//! result so a directory migration keeps going and the caller decides the
//! exit code. Output files are written through a temp file in the target
//! directory and persisted atomically, so a failed conversion never leaves
//! a partial `.erb` behind.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::emitter;
use crate::error::ConvertResult;
use crate::validate::{validate, ValidationReport};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Convert a HAML template to ERB. Warnings go to the ambient `tracing`
/// sink; use [`convert_with_diagnostics`] to receive them as values.
pub fn convert(haml: &str) -> ConvertResult<String> {
    let (erb, diagnostics) = convert_with_diagnostics(haml)?;
    for diagnostic in &diagnostics {
        match diagnostic.line {
            Some(line) => tracing::warn!(line, "{}", diagnostic.message),
            None => tracing::warn!("{}", diagnostic.message),
        }
    }
    Ok(erb)
}

/// Convert a HAML template, returning the warnings alongside the ERB.
pub fn convert_with_diagnostics(haml: &str) -> ConvertResult<(String, Vec<Diagnostic>)> {
    let doc = haml2erb_parser::parse(haml)?;
    let mut diagnostics = Diagnostics::new();
    let erb = emitter::emit_document(&doc, &mut diagnostics)?;
    Ok((erb, diagnostics.into_items()))
}

/// Convert and run the produced ERB through the well-formedness checker.
pub fn convert_and_validate(haml: &str) -> ConvertResult<ValidationReport> {
    let erb = convert(haml)?;
    Ok(validate(&erb))
}

/// Driver options shared by file and directory conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Delete the source `.haml` after a successful write.
    pub delete_original: bool,
    /// Run the checker on the produced ERB and record its findings.
    pub validate: bool,
    /// Convert without touching the filesystem; ERB lands in `content`.
    pub dry_run: bool,
}

/// One recorded problem on a per-file result.
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// The outcome of converting one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileConversion {
    /// The output path (`.haml` suffix replaced with `.erb`).
    pub path: PathBuf,
    pub errors: Vec<FileError>,
    pub warnings: Vec<Diagnostic>,
    /// True when the file could not be read or written at all.
    pub skipped: bool,
    pub dry_run: bool,
    /// The converted text, present on dry runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileConversion {
    fn new(path: PathBuf, dry_run: bool) -> Self {
        Self {
            path,
            errors: Vec::new(),
            warnings: Vec::new(),
            skipped: false,
            dry_run,
            content: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Convert a single template file. Failures are recorded, not raised.
pub fn convert_file(path: &Path, options: &ConvertOptions) -> FileConversion {
    let mut result = FileConversion::new(erb_path(path), options.dry_run);

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            result.errors.push(FileError {
                message: format!("Failed to read {}: {}", path.display(), err),
                line: None,
            });
            result.skipped = true;
            return result;
        }
    };

    let (erb, warnings) = match convert_with_diagnostics(&source) {
        Ok(converted) => converted,
        Err(err) => {
            result.errors.push(FileError {
                line: err.line(),
                message: err.to_string(),
            });
            return result;
        }
    };
    result.warnings = warnings;

    if options.validate {
        for error in validate(&erb).errors {
            result.errors.push(FileError {
                message: format!("Invalid ERB produced: {}", error.message),
                line: error.line,
            });
        }
    }

    if options.dry_run {
        result.content = Some(erb);
        return result;
    }

    if let Err(err) = write_atomically(&result.path, &erb) {
        result.errors.push(FileError {
            message: format!("Failed to write {}: {}", result.path.display(), err),
            line: None,
        });
        result.skipped = true;
        return result;
    }

    if options.delete_original {
        if let Err(err) = fs::remove_file(path) {
            result.errors.push(FileError {
                message: format!(
                    "Converted, but failed to delete original {}: {}",
                    path.display(),
                    err
                ),
                line: None,
            });
        }
    }

    result
}

/// Convert every `*.haml` under `root`, recursively, in sorted order.
pub fn convert_directory(root: &Path, options: &ConvertOptions) -> Vec<FileConversion> {
    find_templates(root)
        .iter()
        .map(|path| convert_file(path, options))
        .collect()
}

/// All `*.haml` files under `root`, sorted.
pub fn find_templates(root: &Path) -> Vec<PathBuf> {
    let pattern = format!("{}/**/*.haml", root.display());
    let mut paths: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(entries) => entries.filter_map(Result::ok).collect(),
        Err(_) => Vec::new(),
    };
    paths.sort();
    paths
}

/// Replace a trailing `.haml` with `.erb`; other names get `.erb` appended.
fn erb_path(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_suffix(".haml") {
        Some(stem) => PathBuf::from(format!("{}.erb", stem)),
        None => PathBuf::from(format!("{}.erb", text)),
    }
}

/// Write through a sibling temp file and persist over the destination, so
/// an interrupted write never leaves a truncated output file.
fn write_atomically(path: &Path, content: &str) -> io::Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let temp = tempfile::Builder::new()
        .prefix(".haml2erb.")
        .suffix(".tmp")
        .tempfile_in(parent.unwrap_or_else(|| Path::new(".")))?;
    fs::write(temp.path(), content)?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erb_path_suffix_replacement() {
        assert_eq!(
            erb_path(Path::new("app/views/show.html.haml")),
            PathBuf::from("app/views/show.html.erb")
        );
        assert_eq!(erb_path(Path::new("plain.haml")), PathBuf::from("plain.erb"));
        assert_eq!(erb_path(Path::new("odd.txt")), PathBuf::from("odd.txt.erb"));
    }
}
