//! Verification helpers for recorded command batches

use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected {expected} batches, found {actual}")]
    BatchCountMismatch { expected: usize, actual: usize },

    #[error("Batch {index} was not sent")]
    BatchNotFound { index: usize },

    #[error("Command '{command}' not found in batch {index}: {batch:?}")]
    CommandNotFound {
        index: usize,
        command: String,
        batch: Vec<String>,
    },

    #[error("Command '{command}' unexpectedly present in batch {index}")]
    UnexpectedCommand { index: usize, command: String },

    #[error("Expected '{first}' before '{second}' in batch {index}")]
    OrderViolation {
        index: usize,
        first: String,
        second: String,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Verifier over the batches a fake switch received
pub struct BatchVerifier {
    batches: Vec<Vec<String>>,
}

impl BatchVerifier {
    pub fn new(batches: Vec<Vec<String>>) -> Self {
        Self { batches }
    }

    fn batch(&self, index: usize) -> VerifyResult<&Vec<String>> {
        self.batches
            .get(index)
            .ok_or(VerificationError::BatchNotFound { index })
    }

    fn position(&self, index: usize, command: &str) -> VerifyResult<usize> {
        let batch = self.batch(index)?;
        batch
            .iter()
            .position(|c| c == command)
            .ok_or_else(|| VerificationError::CommandNotFound {
                index,
                command: command.to_string(),
                batch: batch.clone(),
            })
    }

    /// Verify exactly `expected` batches were sent
    pub fn assert_batch_count(&self, expected: usize) -> VerifyResult<()> {
        if self.batches.len() != expected {
            return Err(VerificationError::BatchCountMismatch {
                expected,
                actual: self.batches.len(),
            });
        }
        Ok(())
    }

    /// Verify batch `index` contains `command` verbatim
    pub fn assert_command_sent(&self, index: usize, command: &str) -> VerifyResult<()> {
        self.position(index, command).map(|_| ())
    }

    /// Verify no command in batch `index` equals `command`
    pub fn assert_command_not_sent(&self, index: usize, command: &str) -> VerifyResult<()> {
        if self.batch(index)?.iter().any(|c| c == command) {
            return Err(VerificationError::UnexpectedCommand {
                index,
                command: command.to_string(),
            });
        }
        Ok(())
    }

    /// Verify `first` appears before `second` in batch `index`
    pub fn assert_order(&self, index: usize, first: &str, second: &str) -> VerifyResult<()> {
        if self.position(index, first)? >= self.position(index, second)? {
            return Err(VerificationError::OrderViolation {
                index,
                first: first.to_string(),
                second: second.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> BatchVerifier {
        BatchVerifier::new(vec![vec![
            "configure terminal".to_string(),
            "interface ethernet 1/20".to_string(),
            "shutdown".to_string(),
        ]])
    }

    #[test]
    fn test_batch_count() {
        assert!(verifier().assert_batch_count(1).is_ok());
        assert!(matches!(
            verifier().assert_batch_count(2),
            Err(VerificationError::BatchCountMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_command_presence() {
        let v = verifier();
        assert!(v.assert_command_sent(0, "shutdown").is_ok());
        assert!(v.assert_command_sent(0, "no shutdown").is_err());
        assert!(v.assert_command_not_sent(0, "no shutdown").is_ok());
        assert!(matches!(
            v.assert_command_sent(1, "shutdown"),
            Err(VerificationError::BatchNotFound { index: 1 })
        ));
    }

    #[test]
    fn test_order() {
        let v = verifier();
        assert!(v.assert_order(0, "configure terminal", "shutdown").is_ok());
        assert!(matches!(
            v.assert_order(0, "shutdown", "configure terminal"),
            Err(VerificationError::OrderViolation { .. })
        ));
    }
}
