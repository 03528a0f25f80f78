//! Hand-off between the validation stage and the stages after it.
//!
//! Validation produces a [`ValidationStatus`] value. Inside one process the
//! value is passed straight to the transformation stage; across processes it
//! travels through the status file, a single line whose last
//! whitespace-delimited token is `True` or `False`.

use crate::error::{PipelineError, Result};
use std::path::Path;

/// Message carried by the error raised when the gate is closed.
pub const GATE_CLOSED_MESSAGE: &str = "data scheme is not valid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStatus {
    Passed,
    Failed { reason: String },
}

impl ValidationStatus {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Interpret the content of a status file.
    pub fn parse(content: &str) -> Self {
        match content.split_whitespace().last() {
            Some("True") => Self::Passed,
            Some(token) => Self::failed(format!("status flag is '{token}'")),
            None => Self::failed("status flag is empty"),
        }
    }

    /// Read the status file; an unreadable file counts as a failed gate.
    pub fn read_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => Self::failed(format!("cannot read {}: {e}", path.display())),
        }
    }

    /// The line persisted for later stages.
    pub fn status_line(&self) -> String {
        format!("Validation status: {}", if self.is_passed() { "True" } else { "False" })
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.status_line())?;
        Ok(())
    }

    /// Fail with a validation error unless the gate is open.
    pub fn ensure_passed(&self) -> Result<()> {
        match self {
            Self::Passed => Ok(()),
            Self::Failed { reason } => {
                tracing::error!("Validation gate closed: {reason}");
                Err(PipelineError::Validation(GATE_CLOSED_MESSAGE.to_owned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_last_token() {
        assert_eq!(ValidationStatus::parse("Validation status: True"), ValidationStatus::Passed);
        assert_eq!(ValidationStatus::parse("Validation status: True\n"), ValidationStatus::Passed);
        assert!(!ValidationStatus::parse("Validation status: False").is_passed());
        assert!(!ValidationStatus::parse("Validation status: true").is_passed());
        assert!(!ValidationStatus::parse("").is_passed());
    }

    #[test]
    fn test_unreadable_file_is_failed_gate() {
        let status = ValidationStatus::read_from(Path::new("no/such/status.txt"));
        let err = status.ensure_passed().unwrap_err();
        assert!(matches!(err, PipelineError::Validation(ref msg) if msg == GATE_CLOSED_MESSAGE));
    }

    #[test]
    fn test_write_then_read() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("data_validation").join("status.txt");

        ValidationStatus::Passed.write_to(&path).expect("write");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "Validation status: True"
        );
        assert!(ValidationStatus::read_from(&path).is_passed());

        ValidationStatus::failed("unknown column").write_to(&path).expect("write");
        assert!(!ValidationStatus::read_from(&path).is_passed());
    }
}
