use std::fmt;

use thiserror::Error;

const MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureNameError {
    #[error("Capture name cannot be empty")]
    Empty,
    #[error("Capture name too long: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },
    #[error("Capture name contains invalid character: {0:?}")]
    InvalidChar(char),
}

/// Name of a DB Replay workload capture on the source engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaptureName(String);

impl CaptureName {
    pub fn new(name: impl Into<String>) -> Result<Self, CaptureNameError> {
        let name = name.into();
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(CaptureNameError::Empty);
        }

        let char_count = trimmed.chars().count();
        if char_count > MAX_LENGTH {
            return Err(CaptureNameError::TooLong {
                len: char_count,
                max: MAX_LENGTH,
            });
        }

        // Names are spliced into a PL/SQL call as literals
        if let Some(bad) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '\'' | '"' | ';'))
        {
            return Err(CaptureNameError::InvalidChar(bad));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    mod new {
        use super::*;

        #[rstest]
        #[case("CAP1", true)]
        #[case("  nightly_capture  ", true)] // trimmed
        #[case("a", true)]
        #[case("", false)]
        #[case("   ", false)]
        #[case("two words", false)]
        #[case("x';DROP", false)]
        fn validation(#[case] input: &str, #[case] should_succeed: bool) {
            assert_eq!(CaptureName::new(input).is_ok(), should_succeed);
        }

        #[test]
        fn over_max_chars_returns_too_long_error() {
            let name = "a".repeat(129);
            let result = CaptureName::new(&name);
            assert!(matches!(
                result,
                Err(CaptureNameError::TooLong { len: 129, max: 128 })
            ));
        }

        #[test]
        fn quote_is_reported() {
            assert_eq!(
                CaptureName::new("it's"),
                Err(CaptureNameError::InvalidChar('\''))
            );
        }
    }
}
