// Table Binding Port
// Table descriptors receive the plugin's engine once registration finishes

use super::engine::Engine;
use std::sync::{Arc, RwLock};

/// A table descriptor owned by the plugin
pub trait TableBinding: Send + Sync {
    fn table_name(&self) -> &str;

    /// Point this table at `engine`, replacing any previous binding
    fn bind(&self, engine: Arc<dyn Engine>);

    fn engine(&self) -> Option<Arc<dyn Engine>>;
}

/// Stock descriptor: a name plus the engine slot
#[derive(Debug)]
pub struct BoundTable {
    name: String,
    engine: RwLock<Option<Arc<dyn Engine>>>,
}

impl BoundTable {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            engine: RwLock::new(None),
        })
    }
}

impl TableBinding for BoundTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn bind(&self, engine: Arc<dyn Engine>) {
        let mut slot = self.engine.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(engine);
    }

    fn engine(&self) -> Option<Arc<dyn Engine>> {
        self.engine
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::engine::mocks::MockEngine;

    #[test]
    fn test_bind_replaces_engine() {
        let table = BoundTable::new("thing");
        assert!(table.engine().is_none());

        table.bind(Arc::new(MockEngine::new("first")));
        table.bind(Arc::new(MockEngine::new("second")));

        assert_eq!(table.engine().unwrap().database(), "second");
        assert_eq!(table.table_name(), "thing");
    }
}
