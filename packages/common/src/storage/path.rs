use super::error::StorageError;

/// Validates a relative object path such as `main/1700000000000-ab12cd.jpg`.
///
/// Rejects empty paths, absolute paths, backslashes, `.`/`..` segments,
/// empty segments, and control characters.
pub fn validate_object_path(path: &str) -> Result<&str, StorageError> {
    if path.is_empty() {
        return Err(StorageError::InvalidPath("path is empty".into()));
    }

    if path.chars().any(|c| c.is_ascii_control()) {
        return Err(StorageError::InvalidPath(
            "control characters are not allowed".into(),
        ));
    }

    if path.starts_with('/') || path.contains('\\') {
        return Err(StorageError::InvalidPath(format!(
            "'{path}' must be a relative path using '/' separators"
        )));
    }

    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StorageError::InvalidPath(format!(
                "'{path}' contains an invalid segment"
            )));
        }
    }

    Ok(path)
}
