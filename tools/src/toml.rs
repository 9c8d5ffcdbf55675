use std::{fs, path::Path};

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Reads `path` and deserializes it as TOML.
///
/// Both the I/O and the parse error carry the file path, so a caller can
/// surface them as-is.
///
/// # Errors
/// Returns an `anyhow::Error` if:
/// - The file cannot be read (missing, unreadable, not UTF-8).
/// - The contents are not valid TOML or do not match `T`.
///
/// # Examples
/// ```no_run
/// #[derive(serde::Deserialize)]
/// struct Listener {
///     addr: String,
/// }
///
/// let listener: Listener = tools::toml::parse_file("listener.toml").unwrap();
/// ```
pub fn parse_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Could not open file {:?}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Could not parse TOML in file {:?}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        port: u16,
    }

    fn temp_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tools-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_file_success() {
        let path = temp_file("name = \"checker\"\nport = 3000\n");

        let parsed: Sample = parse_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(
            parsed,
            Sample {
                name: "checker".to_owned(),
                port: 3000
            }
        );
    }

    #[test]
    fn test_parse_file_missing() {
        let result: anyhow::Result<Sample> = parse_file("/definitely/not/here.toml");

        let err = result.unwrap_err().to_string();
        assert!(err.contains("Could not open file"));
    }

    #[test]
    fn test_parse_file_invalid_contents() {
        let path = temp_file("name = \"checker\"\nport = \"not a number\"\n");

        let result: anyhow::Result<Sample> = parse_file(&path);
        fs::remove_file(&path).unwrap();

        assert!(result.unwrap_err().to_string().contains("Could not parse TOML"));
    }
}
