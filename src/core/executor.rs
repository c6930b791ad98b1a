//! Operation abstraction: the opaque unit of work the scheduler admits.

use std::future::Future;

use async_trait::async_trait;

use super::OperationError;

/// A zero-argument, retryable unit of async work.
///
/// Each call to [`Operation::run`] is one attempt. The scheduler may call it
/// several times for one task, so it should be safe to repeat.
///
/// Any `FnMut() -> Future<Output = Result<T, OperationError>>` closure is an
/// operation:
///
/// ```rust,ignore
/// use prometheus_throttle::core::{OperationError, TaskContext};
///
/// let handle = scheduler.submit(
///     move || {
///         let client = client.clone();
///         let prompt = prompt.clone();
///         async move {
///             let resp = client.post(URL).json(&prompt).send().await
///                 .map_err(|e| OperationError::transient(e.to_string()))?;
///             if !resp.status().is_success() {
///                 return Err(OperationError::from_status(resp.status().as_u16(), "generation failed"));
///             }
///             resp.text().await.map_err(|e| OperationError::transient(e.to_string()))
///         }
///     },
///     TaskContext::new("section: overview"),
/// )?;
/// let text = handle.await?;
/// ```
///
/// Stateful operations can implement the trait directly:
///
/// ```rust,ignore
/// struct Generate { prompt: String }
///
/// #[async_trait]
/// impl Operation<String> for Generate {
///     async fn run(&mut self) -> Result<String, OperationError> {
///         call_endpoint(&self.prompt).await
///     }
/// }
/// ```
#[async_trait]
pub trait Operation<T>: Send {
    /// Perform one attempt.
    async fn run(&mut self) -> Result<T, OperationError>;
}

#[async_trait]
impl<T, F, Fut> Operation<T> for F
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, OperationError>> + Send + 'static,
    T: Send + 'static,
{
    async fn run(&mut self) -> Result<T, OperationError> {
        (self)().await
    }
}

/// Type-erased operation stored in the queue.
pub type BoxedOperation<T> = Box<dyn Operation<T>>;
