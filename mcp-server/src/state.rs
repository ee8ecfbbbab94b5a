//! Component construction and wiring (spec §4.J "Server Core").
//!
//! Everything is instantiated and wired once, at startup — no lazy
//! module-level statics, per spec.md §9's explicit-construction-phase
//! redesign note. The only component that may come up empty is the
//! optional AI tools group.

use mcp_cache::MultiLevelCache;
use mcp_config::Config;
use mcp_core::ConnectionRegistry;
use mcp_firewall::ErrorFirewall;
use mcp_memory::TieredMemory;
use mcp_pool::{PoolController, PoolInstrumentation};
use mcp_pubsub::PubSubBus;
use mcp_stats::ServerStats;
use mcp_storage::{
    CodeAnalyzer, CodeGraphStore, EmbeddingModel, InMemoryCodeGraphStore, InMemoryKvStore, InMemoryRelationalStore,
    InMemoryVectorIndex, KvStore, NoopCodeAnalyzer, NoopEmbeddingModel, RelationalStore, VectorIndex,
};
use mcp_tool::{Dispatcher, ToolRegistry};
use std::sync::Arc;

use crate::pool_handle::SimulatedPool;

/// Every shared component a tool handler, background task, or transport
/// surface might need. Constructed once in [`AppComponents::bootstrap`]
/// and handed around as `Arc<AppComponents>`.
pub struct AppComponents {
    pub config: Config,
    pub relational: Arc<dyn RelationalStore>,
    pub kv: Arc<dyn KvStore>,
    pub vector: Arc<dyn VectorIndex>,
    pub embeddings: Arc<dyn EmbeddingModel>,
    pub code_graph: Arc<dyn CodeGraphStore>,
    pub code_analyzer: Arc<dyn CodeAnalyzer>,
    pub cache: Arc<MultiLevelCache>,
    pub memory: Arc<TieredMemory>,
    pub firewall: Arc<ErrorFirewall>,
    pub bus: Arc<PubSubBus>,
    pub stats: Arc<ServerStats>,
    pub connections: Arc<ConnectionRegistry>,
    pub registry: Arc<ToolRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub pool: Arc<SimulatedPool>,
    pub pool_instrumentation: Arc<PoolInstrumentation>,
    pub pool_controller: Arc<PoolController>,
}

impl AppComponents {
    pub fn bootstrap(config: Config) -> Arc<Self> {
        let bus = PubSubBus::new();
        let stats = ServerStats::new();
        let connections = ConnectionRegistry::new();

        let relational: Arc<dyn RelationalStore> = Arc::new(InMemoryRelationalStore::new());
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let vector: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
        let embeddings: Arc<dyn EmbeddingModel> = Arc::new(NoopEmbeddingModel::new(config.embedding_model.dimensions));
        let code_graph: Arc<dyn CodeGraphStore> = Arc::new(InMemoryCodeGraphStore::new());
        let code_analyzer: Arc<dyn CodeAnalyzer> = Arc::new(NoopCodeAnalyzer::new());

        let cache = Arc::new(MultiLevelCache::new(&config.cache, kv.clone()));
        let memory = Arc::new(TieredMemory::new(relational.clone(), kv.clone(), vector.clone(), embeddings.clone(), bus.clone()));
        let firewall = ErrorFirewall::new(bus.clone());

        let registry = Arc::new(ToolRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(registry.clone()));

        let pool = Arc::new(SimulatedPool::new(config.pool.min));
        let pool_instrumentation = Arc::new(PoolInstrumentation::default());
        let pool_controller = Arc::new(PoolController::new(config.pool.clone(), pool_instrumentation.clone(), bus.clone()));

        let components = Arc::new(Self {
            config,
            relational,
            kv,
            vector,
            embeddings,
            code_graph,
            code_analyzer,
            cache,
            memory,
            firewall,
            bus,
            stats,
            connections,
            registry,
            dispatcher,
            pool,
            pool_instrumentation,
            pool_controller,
        });

        crate::tools::register_all(&components);
        components
    }
}
