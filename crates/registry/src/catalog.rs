use std::fs;
use std::path::{Path, PathBuf};

use slashhook_types::{ApplicationCommand, Command};
use tracing::{debug, warn};

use crate::{CompileError, LoadError, compile};

/// The loaded set of commands, read-only once built.
///
/// Lookup is a linear scan by name; catalogs hold tens of commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    commands: Vec<Command>,
}

impl Catalog {
    /// Builds a catalog from in-memory commands, rejecting duplicate names.
    pub fn from_commands(commands: Vec<Command>) -> Result<Self, LoadError> {
        let mut catalog = Catalog::default();
        for command in commands {
            catalog.push(command)?;
        }
        Ok(catalog)
    }

    /// Loads every `*.json` file directly inside `dir`, one command per file.
    ///
    /// Files are read in sorted file-name order so the registration order is
    /// stable between runs.
    pub fn load_dir(dir: &Path) -> Result<Self, LoadError> {
        let entries = fs::read_dir(dir).map_err(|source| LoadError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LoadError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|extension| extension == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut catalog = Catalog::default();
        for path in paths {
            let content = fs::read_to_string(&path).map_err(|source| LoadError::ReadFile { path: path.clone(), source })?;
            let command: Command = serde_json::from_str(&content).map_err(|source| LoadError::Parse { path: path.clone(), source })?;
            debug!(command = %command.name, path = %path.display(), "loaded command config");
            catalog.push(command)?;
        }
        Ok(catalog)
    }

    fn push(&mut self, command: Command) -> Result<(), LoadError> {
        if self.find_by_name(&command.name).is_some() {
            return Err(LoadError::DuplicateName { name: command.name });
        }
        if command.response_template.is_some() && command.parse_json.is_empty() {
            warn!(
                command = %command.name,
                "response_template is only applied to parse_json output and will be ignored"
            );
        }
        self.commands.push(command);
        Ok(())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|command| command.name == name)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Compiles every command, failing on the first one that cannot be translated.
    ///
    /// Nothing is returned for registration unless the whole catalog compiles.
    pub fn compile_all(&self) -> Result<Vec<ApplicationCommand>, CompileError> {
        self.commands.iter().map(compile).collect()
    }
}
