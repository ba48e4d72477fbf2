// Directory utilities for the scratch/output directory
use crate::error::{BcError, Result};
use std::fs;
use std::path::Path;

/// Refuse to reuse a non-empty output directory unless `force` is set.
pub fn validate_scratch_directory(scratch: &Path, force: bool) -> Result<()> {
    if scratch.exists() && !force && fs::read_dir(scratch)?.next().is_some() {
        return Err(BcError::ScratchExists(scratch.to_path_buf()));
    }
    create_directory_if_not_exists(scratch)
}

pub fn create_directory_if_not_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_scratch_requires_force() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        validate_scratch_directory(&scratch, false).unwrap();
        assert!(scratch.is_dir());
        // empty directories are fine to reuse
        validate_scratch_directory(&scratch, false).unwrap();

        fs::write(scratch.join("policy.json"), "{}").unwrap();
        assert!(matches!(
            validate_scratch_directory(&scratch, false),
            Err(BcError::ScratchExists(_))
        ));
        validate_scratch_directory(&scratch, true).unwrap();
    }
}
