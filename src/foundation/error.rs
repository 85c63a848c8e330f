/// Crate-wide result alias.
pub type StillframeResult<T> = Result<T, StillframeError>;

/// Error type for all fallible operations in this crate.
#[derive(thiserror::Error, Debug)]
pub enum StillframeError {
    /// A caller supplied a value outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An animated document failed a structural validity check.
    #[error("model error: {0}")]
    Model(String),

    /// Any other error, preserved with its source chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StillframeError {
    /// Build an [`StillframeError::InvalidArgument`] from a message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Build an [`StillframeError::Model`] from a message.
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            StillframeError::invalid_argument("x")
                .to_string()
                .contains("invalid argument:")
        );
        assert!(StillframeError::model("x").to_string().contains("model error:"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = StillframeError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
