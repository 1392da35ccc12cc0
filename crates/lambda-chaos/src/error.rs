use thiserror::Error;

/// Boxed error type used at the handler seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure outcome of a wrapped invocation. Configuration problems never
/// surface here: the loader logs them and degrades to the empty
/// configuration. The NXDOMAIN-shaped denylist outcome reaches callers
/// through the resolution seam as [`crate::inject::denylist::ResolveError`].
#[derive(Error, Debug)]
pub enum ChaosError {
    #[error("{0}")]
    Injected(String),
    #[error("handler error: {0}")]
    Handler(#[source] BoxError),
}

impl ChaosError {
    /// True when the error is an intentionally injected failure rather than
    /// a handler problem.
    pub fn is_injected(&self) -> bool {
        matches!(self, ChaosError::Injected(_))
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for ChaosError {
    fn from(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ChaosError::Handler(error)
    }
}
