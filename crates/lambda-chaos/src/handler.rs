use crate::context::InvocationContext;
use crate::error::BoxError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// The user handler seam. Implemented directly for handler types, or through
/// [`FnHandler`] for plain async closures.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, event: Value, context: InvocationContext) -> Result<Value, BoxError>;
}

/// Adapts an async closure into a [`Handler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Value, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, BoxError>> + Send,
{
    async fn invoke(&self, event: Value, context: InvocationContext) -> Result<Value, BoxError> {
        (self.0)(event, context).await
    }
}
