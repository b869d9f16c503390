// parlor-config/src/loader.rs
// ============================================================================
// Module: Definition Loader
// Description: Fail-closed resolution of game definitions.
// Purpose: Load and validate definitions from inline values or local files.
// Dependencies: crate::options, parlor-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Definitions are untrusted inputs. The loader enforces hard limits before
//! parsing (file size, UTF-8, path shape), parses strictly, and runs full
//! definition validation so a room can fail creation with a descriptive
//! reason instead of misbehaving later.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use parlor_core::DefinitionError;
use parlor_core::GameDefinition;
use serde_json::Value;
use thiserror::Error;

use crate::options::RoomOptions;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Conventional definition filename next to the running process.
const DEFAULT_DEFINITION_NAME: &str = "game.def.json";
/// Default directory for definitions resolved by identifier.
const DEFAULT_DEFINITIONS_DIR: &str = "definitions";
/// Environment variable overriding the definitions directory.
pub const DEFINITIONS_DIR_ENV_VAR: &str = "PARLOR_DEFINITIONS_DIR";
/// Maximum definition file size in bytes.
pub(crate) const MAX_DEFINITION_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Definition loading errors.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// File system access failed.
    #[error("definition io error: {0}")]
    Io(String),
    /// Definition file or inline value violated a hard limit.
    #[error("definition rejected: {0}")]
    Rejected(String),
    /// Definition JSON failed to parse.
    #[error("definition parse error: {0}")]
    Parse(String),
    /// Definition failed cross-reference validation.
    #[error("definition invalid: {0}")]
    Invalid(#[from] DefinitionError),
}

// ============================================================================
// SECTION: Loader
// ============================================================================

/// Fail-closed definition loader.
#[derive(Debug, Clone)]
pub struct DefinitionLoader {
    /// Directory searched for `<definition_id>.json` files.
    definitions_dir: PathBuf,
}

impl Default for DefinitionLoader {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DefinitionLoader {
    /// Creates a loader rooted at an explicit definitions directory.
    #[must_use]
    pub fn new(definitions_dir: impl Into<PathBuf>) -> Self {
        Self {
            definitions_dir: definitions_dir.into(),
        }
    }

    /// Creates a loader honouring the directory environment override.
    #[must_use]
    pub fn from_env() -> Self {
        let dir = env::var(DEFINITIONS_DIR_ENV_VAR)
            .map_or_else(|_| PathBuf::from(DEFAULT_DEFINITIONS_DIR), PathBuf::from);
        Self::new(dir)
    }

    /// Resolves a definition for the given room options.
    ///
    /// Resolution order: inline `definition`, then `definition_id` under the
    /// definitions directory, then the conventional `game.def.json`.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError`] when no source resolves, a limit is violated,
    /// parsing fails, or validation fails.
    pub fn resolve(&self, options: &RoomOptions) -> Result<GameDefinition, LoaderError> {
        if let Some(inline) = &options.definition {
            return Self::from_inline(inline.clone());
        }
        if let Some(definition_id) = &options.definition_id {
            let file_name = format!("{definition_id}.json");
            validate_file_name(&file_name)?;
            return Self::load_file(&self.definitions_dir.join(file_name));
        }
        Self::load_file(Path::new(DEFAULT_DEFINITION_NAME))
    }

    /// Parses and validates an inline definition value.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError`] when parsing or validation fails.
    pub fn from_inline(value: Value) -> Result<GameDefinition, LoaderError> {
        let definition: GameDefinition =
            serde_json::from_value(value).map_err(|err| LoaderError::Parse(err.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Loads and validates a definition file.
    fn load_file(path: &Path) -> Result<GameDefinition, LoaderError> {
        validate_path_shape(path)?;
        let bytes = fs::read(path)
            .map_err(|err| LoaderError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_DEFINITION_FILE_SIZE {
            return Err(LoaderError::Rejected(format!(
                "definition file exceeds size limit: {} bytes",
                bytes.len()
            )));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| LoaderError::Rejected("definition file must be utf-8".to_string()))?;
        let definition: GameDefinition =
            serde_json::from_str(content).map_err(|err| LoaderError::Parse(err.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }
}

// ============================================================================
// SECTION: Path Validation
// ============================================================================

/// Rejects identifier-derived file names that could escape the directory.
fn validate_file_name(file_name: &str) -> Result<(), LoaderError> {
    if file_name.len() > MAX_PATH_COMPONENT_LENGTH {
        return Err(LoaderError::Rejected("definition id is too long".to_string()));
    }
    if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
        return Err(LoaderError::Rejected(format!(
            "definition id contains path separators: {file_name}"
        )));
    }
    Ok(())
}

/// Rejects paths with traversal components or excessive lengths.
fn validate_path_shape(path: &Path) -> Result<(), LoaderError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(LoaderError::Rejected("definition path is too long".to_string()));
    }
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(LoaderError::Rejected(
                    "definition path must not contain parent components".to_string(),
                ));
            }
            Component::Normal(part) if part.len() > MAX_PATH_COMPONENT_LENGTH => {
                return Err(LoaderError::Rejected(
                    "definition path component is too long".to_string(),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}
