use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use cogflow::memory::{MemoryError, MemoryNode};
use cogflow::types::Context;

use super::agents::EventLog;

/// Memory node that logs `query:<label>` / `update:<label>` events and
/// fills its store with a recognizable snippet on query. Failure modes are
/// opt-in per phase.
pub struct RecordingMemory {
    label: String,
    log: EventLog,
    store: Mutex<Value>,
    fail_query: bool,
    fail_update: bool,
}

impl RecordingMemory {
    #[allow(dead_code)]
    pub fn new(label: impl Into<String>, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            log,
            store: Mutex::new(Value::Null),
            fail_query: false,
            fail_update: false,
        })
    }

    #[allow(dead_code)]
    pub fn failing_query(label: impl Into<String>, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            log,
            store: Mutex::new(Value::Null),
            fail_query: true,
            fail_update: false,
        })
    }

    #[allow(dead_code)]
    pub fn failing_update(label: impl Into<String>, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            log,
            store: Mutex::new(Value::Null),
            fail_query: false,
            fail_update: true,
        })
    }
}

#[async_trait]
impl MemoryNode for RecordingMemory {
    async fn query_memory(
        &self,
        _keys: Option<&[String]>,
        _ctx: &Context,
    ) -> Result<(), MemoryError> {
        if self.fail_query {
            return Err(MemoryError::Backend("query backend unavailable".into()));
        }
        self.log.lock().unwrap().push(format!("query:{}", self.label));
        *self.store.lock().unwrap() = json!({"snippets": [format!("recall-{}", self.label)]});
        Ok(())
    }

    async fn update_memory(
        &self,
        _keys: Option<&[String]>,
        _ctx: &Context,
    ) -> Result<(), MemoryError> {
        if self.fail_update {
            return Err(MemoryError::Backend("update backend unavailable".into()));
        }
        self.log.lock().unwrap().push(format!("update:{}", self.label));
        Ok(())
    }

    fn store(&self) -> Value {
        self.store.lock().unwrap().clone()
    }
}
