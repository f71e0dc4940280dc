use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::agent::DocumentResearchAgent;

/// Research agents opened in this process, keyed by collection name.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    agents: Arc<RwLock<HashMap<String, Arc<DocumentResearchAgent>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, agent: DocumentResearchAgent) -> Arc<DocumentResearchAgent> {
        let agent = Arc::new(agent);
        self.agents
            .write()
            .await
            .insert(agent.collection().to_string(), agent.clone());
        agent
    }

    pub async fn get(&self, collection: &str) -> Option<Arc<DocumentResearchAgent>> {
        self.agents.read().await.get(collection).cloned()
    }

    pub async fn remove(&self, collection: &str) -> bool {
        self.agents.write().await.remove(collection).is_some()
    }

    pub async fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}
