//! Saved commit message templates, one `<name>.txt` file each.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::TemplateError;

const TEMPLATE_EXTENSION: &str = "txt";

/// Template directory, normally `~/.auto-commit/templates`.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at `<config_dir>/templates`.
    pub fn in_config_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join("templates"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, TemplateError> {
        let valid = !name.trim().is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !valid {
            return Err(TemplateError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.{TEMPLATE_EXTENSION}")))
    }

    /// Contents of template `name`, trimmed.
    pub fn load(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.path_for(name)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(TemplateError::NotFound(name.to_string()))
            }
            Err(source) => Err(TemplateError::Io { path, source }),
        }
    }

    /// Write `text` as template `name`, creating the directory if needed.
    pub fn save(&self, name: &str, text: &str) -> Result<PathBuf, TemplateError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir).map_err(|source| TemplateError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, text).map_err(|source| TemplateError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("Saved template {} to {}", name, path.display());
        Ok(path)
    }

    /// Sorted template names. A missing directory has no templates.
    pub fn list(&self) -> Result<Vec<String>, TemplateError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(TemplateError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXTENSION)
            })
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}
