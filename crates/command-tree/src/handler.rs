//! Command handler trait.

use crate::error::HandlerResult;
use crate::invocation::{Args, ExecContext};
use async_trait::async_trait;

/// Action bound to a leaf, or to a group invoked without a subcommand.
///
/// `Ok(Some(text))` is the final reply, `Ok(None)` means everything was
/// already sent through [`ExecContext::progress`].
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, args: &Args, ctx: &mut ExecContext) -> HandlerResult;
}

/// Adapter for synchronous closures.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&Args, &mut ExecContext) -> HandlerResult + Send + Sync,
{
    async fn call(&self, args: &Args, ctx: &mut ExecContext) -> HandlerResult {
        (self.0)(args, ctx)
    }
}

#[cfg(test)]
pub(crate) fn noop() -> FnHandler<fn(&Args, &mut ExecContext) -> HandlerResult> {
    FnHandler(|_, _| Ok(None))
}
