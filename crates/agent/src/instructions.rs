use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstructionError {
    #[error("could not read instruction file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("instruction file `{path}` is empty")]
    Empty { path: PathBuf },
}

/// Read an agent instruction file at startup.
///
/// A missing or empty instruction file is a startup error: an agent with
/// no instructions would happily answer anything, so the process should
/// refuse to come up instead.
pub fn load(path: &Path) -> Result<String, InstructionError> {
    let instruction = fs::read_to_string(path)
        .map_err(|source| InstructionError::Read { path: path.to_path_buf(), source })?;

    if instruction.trim().is_empty() {
        return Err(InstructionError::Empty { path: path.to_path_buf() });
    }

    Ok(instruction)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{load, InstructionError};

    #[test]
    fn reads_instruction_text_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "You are the boutique concierge.").expect("write");

        let instruction = load(file.path()).expect("load should succeed");
        assert!(instruction.contains("boutique concierge"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = load(std::path::Path::new("/nonexistent/agent-prompt.txt"));
        assert!(matches!(result, Err(InstructionError::Read { .. })));
    }

    #[test]
    fn empty_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "   \n\t").expect("write");

        let result = load(file.path());
        assert!(matches!(result, Err(InstructionError::Empty { .. })));
    }
}
