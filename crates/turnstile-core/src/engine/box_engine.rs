//! BoxExecutionEngine -- object-safe dynamic dispatch wrapper for ExecutionEngine.
//!
//! Uses the blanket-impl pattern:
//! 1. Define an object-safe `ExecutionEngineDyn` trait with boxed futures
//! 2. Blanket-impl `ExecutionEngineDyn` for all `T: ExecutionEngine`
//! 3. `BoxExecutionEngine` wraps `Box<dyn ExecutionEngineDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use turnstile_types::engine::EngineError;

use super::execution::{EngineStream, ExecutionEngine};

/// Object-safe version of [`ExecutionEngine`] with boxed futures.
pub trait ExecutionEngineDyn: Send + Sync {
    fn name(&self) -> &str;

    fn get_session_boxed<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;

    fn create_session_boxed<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;

    fn run_boxed(&self, session_id: &str, message: &str) -> EngineStream;
}

/// Blanket implementation: any `ExecutionEngine` automatically implements `ExecutionEngineDyn`.
impl<T: ExecutionEngine> ExecutionEngineDyn for T {
    fn name(&self) -> &str {
        ExecutionEngine::name(self)
    }

    fn get_session_boxed<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(self.get_session(session_id))
    }

    fn create_session_boxed<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(self.create_session(session_id))
    }

    fn run_boxed(&self, session_id: &str, message: &str) -> EngineStream {
        self.run(session_id, message)
    }
}

/// Type-erased execution engine.
///
/// Lets the gateway and HTTP state hold the real agent in production and a
/// scripted engine in tests without being generic over either.
pub struct BoxExecutionEngine {
    inner: Box<dyn ExecutionEngineDyn + Send + Sync>,
}

impl BoxExecutionEngine {
    /// Wrap a concrete `ExecutionEngine` in a type-erased box.
    pub fn new<T: ExecutionEngine + 'static>(engine: T) -> Self {
        Self {
            inner: Box::new(engine),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn get_session(&self, session_id: &str) -> Result<(), EngineError> {
        self.inner.get_session_boxed(session_id).await
    }

    pub async fn create_session(&self, session_id: &str) -> Result<(), EngineError> {
        self.inner.create_session_boxed(session_id).await
    }

    pub fn run(&self, session_id: &str, message: &str) -> EngineStream {
        self.inner.run_boxed(session_id, message)
    }
}

impl std::fmt::Debug for BoxExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxExecutionEngine")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use turnstile_types::engine::AgentEvent;

    struct EchoEngine;

    impl ExecutionEngine for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        async fn get_session(&self, session_id: &str) -> Result<(), EngineError> {
            Err(EngineError::NotFound(session_id.to_string()))
        }

        async fn create_session(&self, _session_id: &str) -> Result<(), EngineError> {
            Ok(())
        }

        fn run(&self, _session_id: &str, message: &str) -> EngineStream {
            let text = message.to_string();
            Box::pin(futures_util::stream::iter(vec![Ok(AgentEvent::TextDelta {
                text,
            })]))
        }
    }

    #[tokio::test]
    async fn test_box_engine_delegates() {
        let engine = BoxExecutionEngine::new(EchoEngine);
        assert_eq!(engine.name(), "echo");
        assert!(matches!(
            engine.get_session("s").await,
            Err(EngineError::NotFound(_))
        ));
        assert!(engine.create_session("s").await.is_ok());

        let events: Vec<_> = engine.run("s", "hello").collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Ok(AgentEvent::TextDelta { text }) if text == "hello"));
    }
}
