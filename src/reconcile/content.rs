//! `@file` references in property values.

use std::path::PathBuf;

use tracing::info;

use crate::errors::{Error, Result};

/// Return `value` unchanged, or the contents of the file it names when it
/// starts with `@`. Relative paths resolve against the working directory.
pub fn resolve_content(value: &str) -> Result<String> {
    let Some(file) = value.strip_prefix('@') else {
        return Ok(value.to_string());
    };

    let path = PathBuf::from(file);
    info!(path = %path.display(), "Loading content from file");
    std::fs::read_to_string(&path).map_err(|source| Error::ContentFile { path, source })
}
