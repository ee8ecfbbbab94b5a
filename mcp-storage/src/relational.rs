//! `RelationalStore`: project metadata and project-scoped context items
//! (sessions, notes, TODOs, decisions) plus durable long-tier memory
//! inserts (spec §4.B, §4.E).

use crate::error::{Result, StorageError};
use crate::model::{ContextItemKind, LongMemoryRow, Project, ProjectContextItem};
use async_trait::async_trait;
use mcp_core::ProjectId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn get_project(&self, project_id: &ProjectId) -> Result<Option<Project>>;

    async fn upsert_project(&self, project: Project) -> Result<Project>;

    async fn insert_context_item(&self, item: ProjectContextItem) -> Result<()>;

    async fn list_context_items(
        &self,
        project_id: &ProjectId,
        kind: ContextItemKind,
    ) -> Result<Vec<ProjectContextItem>>;

    /// Inserts a long-tier memory row. Returns
    /// [`StorageError::UnknownProject`] if `row.project_id` does not
    /// exist — the data model's foreign-key invariant (spec §3).
    async fn insert_long_memory(&self, row: LongMemoryRow) -> Result<()>;

    /// Returns every long-tier row for `project_id`, ordered by
    /// `importance` descending (spec §4.E recall candidate ordering).
    async fn list_long_memories_by_importance(&self, project_id: &ProjectId) -> Result<Vec<LongMemoryRow>>;

    /// Returns the `limit` most recently created long-tier rows for
    /// `project_id` (spec §4.E's no-keywords fallback).
    async fn list_long_memories_by_recency(
        &self,
        project_id: &ProjectId,
        limit: usize,
    ) -> Result<Vec<LongMemoryRow>>;
}

/// Reference implementation backing tests and offline operation. Not
/// durable across process restarts.
#[derive(Default)]
pub struct InMemoryRelationalStore {
    projects: RwLock<HashMap<ProjectId, Project>>,
    context_items: RwLock<Vec<ProjectContextItem>>,
    long_memories: RwLock<Vec<LongMemoryRow>>,
}

impl InMemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RelationalStore for InMemoryRelationalStore {
    async fn get_project(&self, project_id: &ProjectId) -> Result<Option<Project>> {
        Ok(self.projects.read().get(project_id).cloned())
    }

    async fn upsert_project(&self, mut project: Project) -> Result<Project> {
        let mut projects = self.projects.write();
        if let Some(existing) = projects.get(&project.project_id) {
            project.created_at = existing.created_at;
        }
        projects.insert(project.project_id.clone(), project.clone());
        Ok(project)
    }

    async fn insert_context_item(&self, item: ProjectContextItem) -> Result<()> {
        if !self.projects.read().contains_key(&item.project_id) {
            return Err(StorageError::UnknownProject(item.project_id.to_string()));
        }
        self.context_items.write().push(item);
        Ok(())
    }

    async fn list_context_items(
        &self,
        project_id: &ProjectId,
        kind: ContextItemKind,
    ) -> Result<Vec<ProjectContextItem>> {
        Ok(self
            .context_items
            .read()
            .iter()
            .filter(|item| &item.project_id == project_id && item.kind == kind)
            .cloned()
            .collect())
    }

    async fn insert_long_memory(&self, row: LongMemoryRow) -> Result<()> {
        if !self.projects.read().contains_key(&row.project_id) {
            return Err(StorageError::UnknownProject(row.project_id.to_string()));
        }
        self.long_memories.write().push(row);
        Ok(())
    }

    async fn list_long_memories_by_importance(&self, project_id: &ProjectId) -> Result<Vec<LongMemoryRow>> {
        let mut rows: Vec<LongMemoryRow> =
            self.long_memories.read().iter().filter(|r| &r.project_id == project_id).cloned().collect();
        rows.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal));
        Ok(rows)
    }

    async fn list_long_memories_by_recency(
        &self,
        project_id: &ProjectId,
        limit: usize,
    ) -> Result<Vec<LongMemoryRow>> {
        let mut rows: Vec<LongMemoryRow> =
            self.long_memories.read().iter().filter(|r| &r.project_id == project_id).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }
}

pub type SharedRelationalStore = Arc<dyn RelationalStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = InMemoryRelationalStore::new();
        let project = Project::new(ProjectId::from("proj_a".to_string()), "Alpha", "alice");
        store.upsert_project(project.clone()).await.unwrap();
        let fetched = store.get_project(&project.project_id).await.unwrap();
        assert_eq!(fetched.unwrap().name, "Alpha");
    }

    #[tokio::test]
    async fn long_memory_insert_requires_existing_project() {
        let store = InMemoryRelationalStore::new();
        let project_id = ProjectId::from("proj_b".to_string());
        let row = LongMemoryRow {
            memory_id: mcp_core::MemoryId::generate(),
            project_id,
            content: "note".to_string(),
            category: "general".to_string(),
            importance: 0.8,
            tags: Default::default(),
            creator: "system".to_string(),
            created_at: chrono::Utc::now(),
        };
        let err = store.insert_long_memory(row).await.unwrap_err();
        assert!(matches!(err, StorageError::UnknownProject(_)));
    }

    #[tokio::test]
    async fn long_memories_list_by_importance_descending() {
        let store = InMemoryRelationalStore::new();
        let project_id = ProjectId::from("proj_d".to_string());
        store.upsert_project(Project::new(project_id.clone(), "Delta", "dave")).await.unwrap();
        for (name, importance) in [("low", 0.2), ("high", 0.9), ("mid", 0.5)] {
            store
                .insert_long_memory(LongMemoryRow {
                    memory_id: mcp_core::MemoryId::generate(),
                    project_id: project_id.clone(),
                    content: name.to_string(),
                    category: "general".to_string(),
                    importance,
                    tags: Default::default(),
                    creator: "system".to_string(),
                    created_at: chrono::Utc::now(),
                })
                .await
                .unwrap();
        }
        let rows = store.list_long_memories_by_importance(&project_id).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.content.as_str()).collect::<Vec<_>>(), vec!["high", "mid", "low"]);
    }

    #[tokio::test]
    async fn upsert_preserves_original_created_at() {
        let store = InMemoryRelationalStore::new();
        let mut project = Project::new(ProjectId::from("proj_c".to_string()), "Gamma", "carol");
        let first = store.upsert_project(project.clone()).await.unwrap();
        project.name = "Gamma II".to_string();
        project.created_at = chrono::Utc::now() + chrono::Duration::days(1);
        let second = store.upsert_project(project).await.unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.name, "Gamma II");
    }
}
