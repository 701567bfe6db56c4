pub mod agents;
pub mod memory;

#[allow(unused_imports)]
pub use agents::*;
#[allow(unused_imports)]
pub use memory::*;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use cogflow::agent::Agent;
use cogflow::config::ConfigError;
use cogflow::memory::MemoryNode;
use cogflow::registry::{AgentRegistry, MemoryRegistry};

/// Registry with a `test` kind that resolves declarations by id against a
/// fixed set of prebuilt agents.
#[allow(dead_code)]
pub fn test_agent_registry(agents: Vec<(&str, Arc<dyn Agent>)>) -> AgentRegistry {
    let map: FxHashMap<String, Arc<dyn Agent>> = agents
        .into_iter()
        .map(|(id, agent)| (id.to_string(), agent))
        .collect();
    AgentRegistry::new().register("test", move |decl| {
        map.get(&decl.id).cloned().ok_or_else(|| ConfigError::Factory {
            id: decl.id.clone(),
            message: "no test agent bound for this id".to_string(),
        })
    })
}

/// Registry with a `recall` kind resolving memory declarations by id.
#[allow(dead_code)]
pub fn test_memory_registry(nodes: Vec<(&str, Arc<dyn MemoryNode>)>) -> MemoryRegistry {
    let map: FxHashMap<String, Arc<dyn MemoryNode>> = nodes
        .into_iter()
        .map(|(id, node)| (id.to_string(), node))
        .collect();
    MemoryRegistry::new().register("recall", move |decl| {
        map.get(&decl.id).cloned().ok_or_else(|| ConfigError::Factory {
            id: decl.id.clone(),
            message: "no test memory node bound for this id".to_string(),
        })
    })
}
