use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of local Windows named pipes.
const LOCAL_PIPE_PREFIX: &str = r"\\.\pipe\";

/// Rooted name of the control endpoint.
///
/// On Unix this is an absolute socket path. On Windows it is a named pipe
/// path of the form `\\<server>\pipe\<name>`, where `<server>` is usually `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct PipeName(String);

impl PipeName {
    /// Wraps a Unix socket path without validation.
    #[must_use]
    pub fn from_unix_path(path: impl Into<Utf8PathBuf>) -> Self {
        Self(path.into().into_string())
    }

    /// Builds a local Windows pipe name from its final component.
    #[must_use]
    pub fn from_windows_pipe(name: &str) -> Self {
        Self(format!("{LOCAL_PIPE_PREFIX}{name}"))
    }

    /// Returns the endpoint name as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name as a filesystem path.
    #[must_use]
    pub fn as_path(&self) -> &Utf8Path {
        Utf8Path::new(&self.0)
    }

    /// Ensures the socket's parent directory exists with restrictive permissions.
    ///
    /// Windows pipe names live in the pipe namespace and need no preparation.
    pub fn prepare_filesystem(&self) -> Result<(), PipePreparationError> {
        if is_windows_pipe(&self.0) {
            return Ok(());
        }
        let path = self.as_path();
        let Some(parent) = path.parent() else {
            return Err(PipePreparationError::MissingParent {
                path: path.to_path_buf(),
            });
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(PipePreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

impl fmt::Display for PipeName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for PipeName {
    type Err = PipeNameError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        #[cfg(unix)]
        {
            validate_unix_path(input)?;
        }
        #[cfg(not(unix))]
        {
            validate_windows_pipe(input)?;
        }
        Ok(Self(input.to_owned()))
    }
}

impl TryFrom<String> for PipeName {
    type Error = PipeNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PipeName> for String {
    fn from(name: PipeName) -> Self {
        name.0
    }
}

fn is_windows_pipe(input: &str) -> bool {
    input.starts_with(r"\\")
}

/// Validates a Unix socket path: absolute, with a file name, without NUL bytes.
pub(crate) fn validate_unix_path(input: &str) -> Result<(), PipeNameError> {
    if input.is_empty() {
        return Err(PipeNameError::Empty);
    }
    if input.contains('\0') {
        return Err(PipeNameError::NulByte(input.to_owned()));
    }
    let path = Utf8Path::new(input);
    if !path.is_absolute() {
        return Err(PipeNameError::NotRooted(input.to_owned()));
    }
    if path.file_name().is_none() {
        return Err(PipeNameError::MissingName(input.to_owned()));
    }
    Ok(())
}

/// Validates a Windows pipe path of the form `\\<server>\pipe\<name>`.
pub(crate) fn validate_windows_pipe(input: &str) -> Result<(), PipeNameError> {
    if input.is_empty() {
        return Err(PipeNameError::Empty);
    }
    let Some(rest) = input.strip_prefix(r"\\") else {
        return Err(PipeNameError::NotRooted(input.to_owned()));
    };
    let mut parts = rest.splitn(3, '\\');
    let server = parts.next().unwrap_or_default();
    let namespace = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or_default();
    if server.is_empty() || !namespace.eq_ignore_ascii_case("pipe") {
        return Err(PipeNameError::NotRooted(input.to_owned()));
    }
    if name.is_empty() {
        return Err(PipeNameError::MissingName(input.to_owned()));
    }
    Ok(())
}

/// Errors encountered while parsing a [`PipeName`].
#[derive(Debug, Error)]
pub enum PipeNameError {
    /// Name was empty.
    #[error("endpoint name is empty")]
    Empty,
    /// Name was not in the platform's rooted form.
    #[error("endpoint name '{0}' is not rooted")]
    NotRooted(String),
    /// Name lacked a final component.
    #[error("endpoint name '{0}' has no final component")]
    MissingName(String),
    /// Name contained a NUL byte.
    #[error("endpoint name '{0}' contains a NUL byte")]
    NulByte(String),
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum PipePreparationError {
    /// Parent directory is missing when creating a Unix socket path.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent { path: Utf8PathBuf },
    /// Failed to create or adjust socket directories.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::absolute("/run/conduit/conduitd.sock")]
    #[case::nested("/tmp/a/b/c.sock")]
    fn accepts_absolute_unix_paths(#[case] input: &str) {
        assert!(validate_unix_path(input).is_ok());
    }

    #[rstest]
    #[case::empty("")]
    #[case::relative("conduitd.sock")]
    #[case::root("/")]
    #[case::nul("/tmp/con\0duit")]
    fn rejects_invalid_unix_paths(#[case] input: &str) {
        assert!(validate_unix_path(input).is_err());
    }

    #[rstest]
    #[case::local(r"\\.\pipe\conduitd")]
    #[case::remote(r"\\server\PIPE\conduit\nested")]
    fn accepts_windows_pipes(#[case] input: &str) {
        assert!(validate_windows_pipe(input).is_ok());
    }

    #[rstest]
    #[case::unc_share(r"\\.\share\conduitd")]
    #[case::missing_server(r"\\\pipe\conduitd")]
    #[case::missing_name(r"\\.\pipe\")]
    #[case::not_rooted(r"pipe\conduitd")]
    fn rejects_invalid_windows_pipes(#[case] input: &str) {
        assert!(validate_windows_pipe(input).is_err());
    }

    #[test]
    fn builds_local_pipe_names() {
        assert_eq!(
            PipeName::from_windows_pipe("conduitd").as_str(),
            r"\\.\pipe\conduitd"
        );
    }

    #[cfg(unix)]
    #[test]
    fn prepares_parent_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested/run/conduitd.sock");
        let name: PipeName = path.to_str().expect("utf8 path").parse().expect("pipe name");
        name.prepare_filesystem().expect("prepare filesystem");
        assert!(path.parent().expect("parent").is_dir());
    }
}
