use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use cogflow::agent::{Agent, AgentError};
use cogflow::types::Context;

/// Shared in-order record of hook and execution events across a run.
pub type EventLog = Arc<Mutex<Vec<String>>>;

#[allow(dead_code)]
pub fn new_event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Agent returning the same output on every call.
#[derive(Debug, Clone)]
pub struct FixedAgent {
    output: Value,
}

impl FixedAgent {
    #[allow(dead_code)]
    pub fn new(output: Value) -> Arc<Self> {
        Arc::new(Self { output })
    }
}

#[async_trait]
impl Agent for FixedAgent {
    async fn execute(&self, _ctx: &Context) -> Result<Value, AgentError> {
        Ok(self.output.clone())
    }
}

/// One scripted step for [`ScriptedAgent`].
#[allow(dead_code)]
pub enum Step {
    Ok(Value),
    Err(String),
}

/// Agent playing back a fixed script, counting invocations. Panics when the
/// script is exhausted, which doubles as an over-invocation guard.
pub struct ScriptedAgent {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedAgent {
    #[allow(dead_code)]
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        })
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn execute(&self, _ctx: &Context) -> Result<Value, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted agent invoked more times than scripted");
        match step {
            Step::Ok(value) => Ok(value),
            Step::Err(message) => Err(AgentError::Other(message)),
        }
    }
}

/// Agent that appends `exec:<label>` to a shared log before returning a
/// fixed output; used to assert hook/execution ordering.
pub struct LoggingAgent {
    label: String,
    output: Value,
    log: EventLog,
}

impl LoggingAgent {
    #[allow(dead_code)]
    pub fn new(label: impl Into<String>, output: Value, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            output,
            log,
        })
    }
}

#[async_trait]
impl Agent for LoggingAgent {
    async fn execute(&self, _ctx: &Context) -> Result<Value, AgentError> {
        self.log.lock().unwrap().push(format!("exec:{}", self.label));
        Ok(self.output.clone())
    }
}
