//! Project-context tools: sessions, TODOs, notes, decisions, statistics
//! (spec §4.H "project-context tools").

use crate::state::AppComponents;
use async_trait::async_trait;
use mcp_core::{McpError, Principal, ProjectId};
use mcp_storage::model::{ContextItemKind, Project, ProjectContextItem};
use mcp_storage::RelationalStore;
use mcp_tool::Tool;
use serde_json::{json, Value};
use std::sync::Arc;

fn project_id_arg(arguments: &Value) -> ProjectId {
    ProjectId::from(arguments["project_id"].as_str().unwrap_or_default().to_string())
}

fn storage_err(e: mcp_storage::StorageError) -> McpError {
    match e {
        mcp_storage::StorageError::UnknownProject(id) => McpError::InvalidParams(format!("unknown project '{id}'")),
        other => McpError::Internal(other.to_string()),
    }
}

pub struct ProjectCreateTool {
    relational: Arc<dyn RelationalStore>,
}

#[async_trait]
impl Tool for ProjectCreateTool {
    fn name(&self) -> &str {
        "project_create"
    }

    fn description(&self) -> &str {
        "Creates (or updates, if already present) a project record"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["project_id", "name", "owner"],
            "properties": {
                "project_id": {"type": "string"},
                "name": {"type": "string"},
                "owner": {"type": "string"},
                "description": {"type": "string"},
            },
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let name = arguments["name"].as_str().unwrap_or_default();
        let owner = arguments["owner"].as_str().unwrap_or_default();
        let mut project = Project::new(project_id, name, owner);
        if let Some(description) = arguments.get("description").and_then(Value::as_str) {
            project.description = description.to_string();
        }
        let stored = self.relational.upsert_project(project).await.map_err(storage_err)?;
        serde_json::to_value(stored).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub struct ProjectGetTool {
    relational: Arc<dyn RelationalStore>,
}

#[async_trait]
impl Tool for ProjectGetTool {
    fn name(&self) -> &str {
        "project_get"
    }

    fn description(&self) -> &str {
        "Fetches a project by id"
    }

    fn input_schema(&self) -> Value {
        json!({"required": ["project_id"], "properties": {"project_id": {"type": "string"}}})
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let project = self.relational.get_project(&project_id).await.map_err(storage_err)?;
        match project {
            Some(project) => serde_json::to_value(project).map_err(|e| McpError::Internal(e.to_string())),
            None => Ok(json!(null)),
        }
    }
}

struct ContextItemAddTool {
    relational: Arc<dyn RelationalStore>,
    tool_name: &'static str,
    description: &'static str,
    kind: ContextItemKind,
}

#[async_trait]
impl Tool for ContextItemAddTool {
    fn name(&self) -> &str {
        self.tool_name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["project_id", "content"],
            "properties": {"project_id": {"type": "string"}, "content": {"type": "string"}},
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let content = arguments["content"].as_str().unwrap_or_default().to_string();
        let item = ProjectContextItem { project_id, kind: self.kind, content, created_at: chrono::Utc::now() };
        self.relational.insert_context_item(item).await.map_err(storage_err)?;
        Ok(json!({ "ok": true }))
    }
}

pub struct ContextListTool {
    relational: Arc<dyn RelationalStore>,
}

#[async_trait]
impl Tool for ContextListTool {
    fn name(&self) -> &str {
        "context_list"
    }

    fn description(&self) -> &str {
        "Lists a project's context items of one kind (note, todo, decision, session)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "required": ["project_id", "kind"],
            "properties": {"project_id": {"type": "string"}, "kind": {"type": "string"}},
        })
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let kind = match arguments["kind"].as_str().unwrap_or_default() {
            "note" => ContextItemKind::Note,
            "todo" => ContextItemKind::Todo,
            "decision" => ContextItemKind::Decision,
            "session" => ContextItemKind::Session,
            other => return Err(McpError::InvalidParams(format!("unknown kind '{other}'"))),
        };
        let items = self.relational.list_context_items(&project_id, kind).await.map_err(storage_err)?;
        serde_json::to_value(items).map_err(|e| McpError::Internal(e.to_string()))
    }
}

pub struct ProjectStatisticsTool {
    relational: Arc<dyn RelationalStore>,
}

#[async_trait]
impl Tool for ProjectStatisticsTool {
    fn name(&self) -> &str {
        "project_statistics"
    }

    fn description(&self) -> &str {
        "Summarizes a project's context item counts and long-tier memory count"
    }

    fn input_schema(&self) -> Value {
        json!({"required": ["project_id"], "properties": {"project_id": {"type": "string"}}})
    }

    async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
        let project_id = project_id_arg(&arguments);
        let notes = self.relational.list_context_items(&project_id, ContextItemKind::Note).await.map_err(storage_err)?;
        let todos = self.relational.list_context_items(&project_id, ContextItemKind::Todo).await.map_err(storage_err)?;
        let decisions =
            self.relational.list_context_items(&project_id, ContextItemKind::Decision).await.map_err(storage_err)?;
        let sessions =
            self.relational.list_context_items(&project_id, ContextItemKind::Session).await.map_err(storage_err)?;
        let long_memories = self.relational.list_long_memories_by_recency(&project_id, usize::MAX).await.map_err(storage_err)?;

        Ok(json!({
            "notes": notes.len(),
            "todos": todos.len(),
            "decisions": decisions.len(),
            "sessions": sessions.len(),
            "long_term_memories": long_memories.len(),
        }))
    }
}

pub fn build(components: &Arc<AppComponents>) -> Vec<Arc<dyn Tool>> {
    let relational = components.relational.clone();
    vec![
        Arc::new(ProjectCreateTool { relational: relational.clone() }),
        Arc::new(ProjectGetTool { relational: relational.clone() }),
        Arc::new(ContextItemAddTool {
            relational: relational.clone(),
            tool_name: "note_add",
            description: "Adds a note to a project's context",
            kind: ContextItemKind::Note,
        }),
        Arc::new(ContextItemAddTool {
            relational: relational.clone(),
            tool_name: "todo_add",
            description: "Adds a TODO to a project's context",
            kind: ContextItemKind::Todo,
        }),
        Arc::new(ContextItemAddTool {
            relational: relational.clone(),
            tool_name: "decision_add",
            description: "Records a design decision in a project's context",
            kind: ContextItemKind::Decision,
        }),
        Arc::new(ContextItemAddTool {
            relational: relational.clone(),
            tool_name: "session_record",
            description: "Records a session summary in a project's context",
            kind: ContextItemKind::Session,
        }),
        Arc::new(ContextListTool { relational: relational.clone() }),
        Arc::new(ProjectStatisticsTool { relational }),
    ]
}
