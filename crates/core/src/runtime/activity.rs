//! Activity registration for the local runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::workflow::ActivityError;

/// A typed unit of work executed outside the workflow.
#[async_trait]
pub trait Activity: Send + Sync + 'static {
    type Params: DeserializeOwned + Send;
    type Output: Serialize + Send;

    /// Stable name workflows address this activity by.
    fn name(&self) -> &str;

    async fn execute(&self, params: Self::Params) -> Result<Self::Output, ActivityError>;
}

/// Type-erased activity operating on JSON payloads.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn handle(&self, input: Value) -> Result<Value, ActivityError>;
}

struct TypedHandler<A>(A);

#[async_trait]
impl<A: Activity> ActivityHandler for TypedHandler<A> {
    async fn handle(&self, input: Value) -> Result<Value, ActivityError> {
        let params: A::Params = serde_json::from_value(input).map_err(ActivityError::payload)?;
        let output = self.0.execute(params).await?;
        serde_json::to_value(output).map_err(ActivityError::payload)
    }
}

/// Activities available to workflow runs, by name.
#[derive(Clone, Default)]
pub struct ActivityRegistry {
    handlers: HashMap<String, Arc<dyn ActivityHandler>>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `activity` under its own name, replacing any previous one.
    pub fn register<A: Activity>(&mut self, activity: A) -> &mut Self {
        let name = activity.name().to_string();
        self.register_handler(name, Arc::new(TypedHandler(activity)))
    }

    pub fn register_handler(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn ActivityHandler>,
    ) -> &mut Self {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::warn!(activity = %name, "Replaced registered activity");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActivityHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ActivityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityRegistry")
            .field("activities", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct EchoParams {
        text: String,
    }

    #[derive(Serialize)]
    struct EchoOutput {
        echoed: String,
    }

    struct Echo;

    #[async_trait]
    impl Activity for Echo {
        type Params = EchoParams;
        type Output = EchoOutput;

        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(&self, params: EchoParams) -> Result<EchoOutput, ActivityError> {
            Ok(EchoOutput {
                echoed: params.text,
            })
        }
    }

    #[tokio::test]
    async fn test_typed_activity_round_trips_json() {
        let mut registry = ActivityRegistry::new();
        registry.register(Echo);

        let handler = registry.get("echo").unwrap();
        let output = handler.handle(json!({"text": "hi"})).await.unwrap();
        assert_eq!(output, json!({"echoed": "hi"}));
    }

    #[tokio::test]
    async fn test_bad_payload_is_payload_error() {
        let mut registry = ActivityRegistry::new();
        registry.register(Echo);

        let err = registry
            .get("echo")
            .unwrap()
            .handle(json!({"wrong": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::Payload { .. }));
    }

    #[test]
    fn test_names_sorted_and_missing_lookup() {
        let mut registry = ActivityRegistry::new();
        registry.register(Echo);
        assert_eq!(registry.names(), vec!["echo".to_string()]);
        assert!(registry.get("missing").is_none());
    }
}
