//! Code-knowledge tools: analyze, query, find-entity, trace-calls,
//! dependencies, modules, search-pattern (spec §4.H). The analyzer
//! itself is optional (spec §6) — `code_analyze` simply stores whatever
//! the configured [`CodeAnalyzer`] finds, which is nothing for the
//! offline default.

use crate::state::AppComponents;
use async_trait::async_trait;
use mcp_core::{McpError, Principal, ProjectId};
use mcp_storage::{CodeAnalyzer, CodeEntity, CodeGraphStore, CodeRelation, EntityKind, RelationKind};
use mcp_tool::Tool;
use serde_json::{json, Value};
use std::sync::Arc;

fn project_id_arg(arguments: &Value) -> ProjectId {
    ProjectId::from(arguments["project_id"].as_str().unwrap_or_default().to_string())
}

fn entity_kind_arg(arguments: &Value) -> Option<EntityKind> {
    match arguments.get("kind").and_then(Value::as_str) {
        Some("module") => Some(EntityKind::Module),
        Some("function") => Some(EntityKind::Function),
        Some("type") => Some(EntityKind::Type),
        Some("trait") => Some(EntityKind::Trait),
        _ => None,
    }
}

pub struct CodeAnalyzeTool {
    analyzer: Arc<dyn CodeAnalyzer>,
    graph: Arc<dyn CodeGraphStore>,
}

#[async_trait]
impl Tool for CodeAnalyzeTool {
    fn name(&self) -> &str {
        "code_analyze"
    }

    fn description(&self) -> &str {
        "Analyzes a source file and stores the entities/relations it finds into the project's code graph"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["project_id", "file_path", "source"],
            "properties": {
                "project_id": {"type": "string"},
                "file_path": {"type": "string"},
                "source": {"type": "string"},
            },
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let file_path = arguments["file_path"].as_str().unwrap_or_default();
        let source = arguments["source"].as_str().unwrap_or_default();

        let (entities, relations) = self
            .analyzer
            .analyze_file(&project_id, file_path, source)
            .await
            .map_err(|e| McpError::Internal(e.to_string()))?;
        let entity_count = entities.len();
        let relation_count = relations.len();
        self.graph.upsert_entities(entities).await.map_err(|e| McpError::Internal(e.to_string()))?;
        self.graph.upsert_relations(relations).await.map_err(|e| McpError::Internal(e.to_string()))?;

        Ok(json!({ "entities_found": entity_count, "relations_found": relation_count }))
    }
}

/// Accepts pre-computed entities/relations directly, for callers whose
/// own tooling already parsed a repository (the in-process analyzer is
/// an offline no-op by default).
pub struct CodeIngestTool {
    graph: Arc<dyn CodeGraphStore>,
}

#[async_trait]
impl Tool for CodeIngestTool {
    fn name(&self) -> &str {
        "code_ingest"
    }

    fn description(&self) -> &str {
        "Stores externally-computed code entities and relations into the project's code graph"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["project_id"],
            "properties": {
                "project_id": {"type": "string"},
                "entities": {"type": "array"},
                "relations": {"type": "array"},
            },
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);

        let entities: Vec<CodeEntity> = arguments
            .get("entities")
            .cloned()
            .unwrap_or_else(|| json!([]))
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|mut v| {
                v.as_object_mut().map(|o| o.insert("project_id".to_string(), json!(project_id.to_string())));
                serde_json::from_value(v).ok()
            })
            .collect();
        let relations: Vec<CodeRelation> = arguments
            .get("relations")
            .cloned()
            .unwrap_or_else(|| json!([]))
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|mut v| {
                v.as_object_mut().map(|o| o.insert("project_id".to_string(), json!(project_id.to_string())));
                serde_json::from_value(v).ok()
            })
            .collect();

        let entity_count = entities.len();
        let relation_count = relations.len();
        self.graph.upsert_entities(entities).await.map_err(|e| McpError::Internal(e.to_string()))?;
        self.graph.upsert_relations(relations).await.map_err(|e| McpError::Internal(e.to_string()))?;
        Ok(json!({ "entities_stored": entity_count, "relations_stored": relation_count }))
    }
}

pub struct CodeFindEntityTool {
    graph: Arc<dyn CodeGraphStore>,
}

#[async_trait]
impl Tool for CodeFindEntityTool {
    fn name(&self) -> &str {
        "code_find_entity"
    }

    fn description(&self) -> &str {
        "Finds code entities by exact name"
    }

    fn input_schema(&self) -> Value {
        json!({"required": ["project_id", "name"], "properties": {"project_id": {"type": "string"}, "name": {"type": "string"}}})
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let name = arguments["name"].as_str().unwrap_or_default();
        let entities = self.graph.find_entity(&project_id, name).await.map_err(|e| McpError::Internal(e.to_string()))?;
        serde_json::to_value(entities).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub struct CodeQueryTool {
    graph: Arc<dyn CodeGraphStore>,
}

#[async_trait]
impl Tool for CodeQueryTool {
    fn name(&self) -> &str {
        "code_query"
    }

    fn description(&self) -> &str {
        "Lists all code entities in a project, optionally filtered by kind (module/function/type/trait)"
    }

    fn input_schema(&self) -> Value {
        json!({"required": ["project_id"], "properties": {"project_id": {"type": "string"}, "kind": {"type": "string"}}})
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let kind = entity_kind_arg(&arguments);
        let entities = self.graph.list_entities(&project_id, kind).await.map_err(|e| McpError::Internal(e.to_string()))?;
        serde_json::to_value(entities).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub struct CodeModulesTool {
    graph: Arc<dyn CodeGraphStore>,
}

#[async_trait]
impl Tool for CodeModulesTool {
    fn name(&self) -> &str {
        "code_modules"
    }

    fn description(&self) -> &str {
        "Lists every module-kind entity in a project"
    }

    fn input_schema(&self) -> Value {
        json!({"required": ["project_id"], "properties": {"project_id": {"type": "string"}}})
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let entities = self
            .graph
            .list_entities(&project_id, Some(EntityKind::Module))
            .await
            .map_err(|e| McpError::Internal(e.to_string()))?;
        serde_json::to_value(entities).map_err(|e| McpError::Internal(e.to_string()))
    }
}

struct NeighborsTool {
    graph: Arc<dyn CodeGraphStore>,
    tool_name: &'static str,
    description: &'static str,
    relation_kind: RelationKind,
}

#[async_trait]
impl Tool for NeighborsTool {
    fn name(&self) -> &str {
        self.tool_name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["project_id", "entity_id"],
            "properties": {"project_id": {"type": "string"}, "entity_id": {"type": "string"}},
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let entity_id = arguments["entity_id"].as_str().unwrap_or_default();
        let neighbors = self
            .graph
            .neighbors(&project_id, entity_id, Some(self.relation_kind))
            .await
            .map_err(|e| McpError::Internal(e.to_string()))?;
        serde_json::to_value(neighbors).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub struct CodeSearchPatternTool {
    graph: Arc<dyn CodeGraphStore>,
}

#[async_trait]
impl Tool for CodeSearchPatternTool {
    fn name(&self) -> &str {
        "code_search_pattern"
    }

    fn description(&self) -> &str {
        "Searches entity names and signatures for a substring pattern"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["project_id", "pattern"],
            "properties": {"project_id": {"type": "string"}, "pattern": {"type": "string"}},
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let pattern = arguments["pattern"].as_str().unwrap_or_default().to_lowercase();
        let entities =
            self.graph.list_entities(&project_id, None).await.map_err(|e| McpError::Internal(e.to_string()))?;
        let matches: Vec<_> = entities
            .into_iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&pattern)
                    || e.signature.as_deref().unwrap_or_default().to_lowercase().contains(&pattern)
            })
            .collect();
        serde_json::to_value(matches).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub fn build(components: &Arc<AppComponents>) -> Vec<Arc<dyn Tool>> {
    let graph = components.code_graph.clone();
    vec![
        Arc::new(CodeAnalyzeTool { analyzer: components.code_analyzer.clone(), graph: graph.clone() }),
        Arc::new(CodeIngestTool { graph: graph.clone() }),
        Arc::new(CodeFindEntityTool { graph: graph.clone() }),
        Arc::new(CodeQueryTool { graph: graph.clone() }),
        Arc::new(CodeModulesTool { graph: graph.clone() }),
        Arc::new(NeighborsTool {
            graph: graph.clone(),
            tool_name: "code_trace_calls",
            description: "Finds entities that call, or are called by, a given entity",
            relation_kind: RelationKind::Calls,
        }),
        Arc::new(NeighborsTool {
            graph: graph.clone(),
            tool_name: "code_dependencies",
            description: "Finds entities a given entity depends on, or that depend on it",
            relation_kind: RelationKind::DependsOn,
        }),
        Arc::new(NeighborsTool {
            graph: graph.clone(),
            tool_name: "code_implementations",
            description: "Finds the trait/type pairs connected by an implements relation",
            relation_kind: RelationKind::Implements,
        }),
        Arc::new(CodeSearchPatternTool { graph }),
    ]
}
