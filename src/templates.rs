//! Saved chain templates
//!
//! Templates live in an external store. [`TemplateStore`] is the seam:
//! [`LocalTemplateStore`] keeps them in the local state directory, and the
//! `remote` module talks to a hosted REST table. [`TemplatesGateway`] sits in
//! front of either one and applies the rules the deck cares about: who may
//! write, default values, and ordering.
//!
//! Remote calls can fail on their own. Nothing here rolls back local state
//! when they do.

use crate::catalog::{Catalog, Prompt, PromptId};
use crate::clock::SharedClock;
use crate::error::TemplateError;
use crate::identity::Identity;
use crate::storage::{keys, load_json, save_json, SharedStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_TEMPLATE_CATEGORY: &str = "custom";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub prompt_ids: Vec<PromptId>,
    pub category: String,
    pub is_public: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub use_count: u64,
}

impl ChainTemplate {
    /// Catalog prompts for this template, in order; unknown ids are skipped
    pub fn resolve<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Prompt> {
        self.prompt_ids
            .iter()
            .filter_map(|id| catalog.get(*id))
            .collect()
    }
}

/// Fields supplied when creating a template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTemplate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub prompt_ids: Vec<PromptId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemplatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_ids: Option<Vec<PromptId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_count: Option<u64>,
}

/// Row to insert, with every default already applied
#[derive(Debug, Clone, Serialize)]
pub struct TemplateRow {
    pub name: String,
    pub description: Option<String>,
    pub prompt_ids: Vec<PromptId>,
    pub category: String,
    pub is_public: bool,
    pub created_by: String,
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn list(&self) -> Result<Vec<ChainTemplate>, TemplateError>;

    async fn get(&self, id: &str) -> Result<ChainTemplate, TemplateError>;

    async fn insert(&self, row: &TemplateRow) -> Result<ChainTemplate, TemplateError>;

    async fn update(&self, id: &str, patch: &TemplatePatch) -> Result<(), TemplateError>;

    async fn delete(&self, id: &str) -> Result<(), TemplateError>;
}

/// Templates kept in the local state directory
pub struct LocalTemplateStore {
    store: SharedStore,
    clock: SharedClock,
    // Serialises read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl LocalTemplateStore {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Vec<ChainTemplate> {
        load_json(self.store.as_ref(), keys::TEMPLATES).unwrap_or_default()
    }

    fn write_all(&self, templates: &[ChainTemplate]) {
        save_json(self.store.as_ref(), keys::TEMPLATES, &templates);
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }
}

#[async_trait]
impl TemplateStore for LocalTemplateStore {
    async fn list(&self) -> Result<Vec<ChainTemplate>, TemplateError> {
        Ok(self.read_all())
    }

    async fn get(&self, id: &str) -> Result<ChainTemplate, TemplateError> {
        self.read_all()
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    async fn insert(&self, row: &TemplateRow) -> Result<ChainTemplate, TemplateError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let now = self.now();
        let template = ChainTemplate {
            id: Uuid::new_v4().to_string(),
            name: row.name.clone(),
            description: row.description.clone(),
            prompt_ids: row.prompt_ids.clone(),
            category: row.category.clone(),
            is_public: row.is_public,
            created_by: row.created_by.clone(),
            created_at: now,
            updated_at: now,
            use_count: 0,
        };

        let mut templates = self.read_all();
        templates.push(template.clone());
        self.write_all(&templates);
        Ok(template)
    }

    async fn update(&self, id: &str, patch: &TemplatePatch) -> Result<(), TemplateError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut templates = self.read_all();
        let template = templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;

        if let Some(name) = &patch.name {
            template.name = name.clone();
        }
        if let Some(description) = &patch.description {
            template.description = Some(description.clone());
        }
        if let Some(prompt_ids) = &patch.prompt_ids {
            template.prompt_ids = prompt_ids.clone();
        }
        if let Some(category) = &patch.category {
            template.category = category.clone();
        }
        if let Some(is_public) = patch.is_public {
            template.is_public = is_public;
        }
        if let Some(use_count) = patch.use_count {
            template.use_count = use_count;
        }
        template.updated_at = self.now();

        self.write_all(&templates);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), TemplateError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut templates = self.read_all();
        let before = templates.len();
        templates.retain(|t| t.id != id);
        if templates.len() == before {
            return Err(TemplateError::NotFound(id.to_string()));
        }
        self.write_all(&templates);
        Ok(())
    }
}

/// Access rules and defaults in front of a [`TemplateStore`]
pub struct TemplatesGateway {
    store: Box<dyn TemplateStore>,
}

impl TemplatesGateway {
    pub fn new(store: Box<dyn TemplateStore>) -> Self {
        Self { store }
    }

    /// All visible templates, most used first
    pub async fn list(&self) -> Result<Vec<ChainTemplate>, TemplateError> {
        let mut templates = self.store.list().await?;
        templates.sort_by(|a, b| b.use_count.cmp(&a.use_count));
        Ok(templates)
    }

    pub async fn get(&self, id: &str) -> Result<ChainTemplate, TemplateError> {
        self.store.get(id).await
    }

    /// Save a new template stamped with the caller's identity
    pub async fn create(
        &self,
        identity: Option<&Identity>,
        draft: NewTemplate,
    ) -> Result<ChainTemplate, TemplateError> {
        let identity = identity.ok_or(TemplateError::NotAuthenticated)?;

        let row = TemplateRow {
            name: draft.name,
            description: draft.description.filter(|d| !d.trim().is_empty()),
            prompt_ids: draft.prompt_ids,
            category: draft
                .category
                .unwrap_or_else(|| DEFAULT_TEMPLATE_CATEGORY.to_string()),
            is_public: draft.is_public.unwrap_or(false),
            created_by: identity.id.clone(),
        };

        let template = self.store.insert(&row).await?;
        info!(id = %template.id, name = %template.name, "Template saved");
        Ok(template)
    }

    pub async fn update(
        &self,
        identity: Option<&Identity>,
        id: &str,
        patch: TemplatePatch,
    ) -> Result<(), TemplateError> {
        if identity.is_none() {
            return Err(TemplateError::NotAuthenticated);
        }
        self.store.update(id, &patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), TemplateError> {
        self.store.delete(id).await?;
        info!(id = id, "Template deleted");
        Ok(())
    }

    /// Bump the popularity counter
    ///
    /// Read-modify-write: concurrent increments can lose updates.
    pub async fn increment_use(&self, id: &str) -> Result<u64, TemplateError> {
        let template = self.store.get(id).await?;
        let use_count = template.use_count + 1;
        let patch = TemplatePatch {
            use_count: Some(use_count),
            ..TemplatePatch::default()
        };
        self.store.update(id, &patch).await?;
        debug!(id = id, use_count = use_count, "Template use recorded");
        Ok(use_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{Local, TimeZone};
    use std::sync::Arc;

    fn gateway() -> TemplatesGateway {
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
        ));
        TemplatesGateway::new(Box::new(LocalTemplateStore::new(
            MemoryStore::shared(),
            clock,
        )))
    }

    fn draft(name: &str) -> NewTemplate {
        NewTemplate {
            name: name.to_string(),
            description: None,
            prompt_ids: vec![1, 2],
            category: None,
            is_public: None,
        }
    }

    fn user() -> Identity {
        Identity::new("user-1", "someone@example.com")
    }

    #[tokio::test]
    async fn test_create_requires_identity() {
        let gateway = gateway();
        let result = gateway.create(None, draft("Guest chain")).await;
        assert!(matches!(result, Err(TemplateError::NotAuthenticated)));
        assert!(gateway.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let gateway = gateway();
        let template = gateway.create(Some(&user()), draft("Mine")).await.unwrap();
        assert_eq!(template.category, DEFAULT_TEMPLATE_CATEGORY);
        assert!(!template.is_public);
        assert_eq!(template.created_by, "user-1");
        assert_eq!(template.use_count, 0);
    }

    #[tokio::test]
    async fn test_list_orders_by_use_count() {
        let gateway = gateway();
        let a = gateway.create(Some(&user()), draft("A")).await.unwrap();
        let b = gateway.create(Some(&user()), draft("B")).await.unwrap();

        gateway.increment_use(&b.id).await.unwrap();
        gateway.increment_use(&b.id).await.unwrap();
        assert_eq!(gateway.increment_use(&a.id).await.unwrap(), 1);

        let names: Vec<String> = gateway
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_update_requires_identity() {
        let gateway = gateway();
        let template = gateway.create(Some(&user()), draft("Old")).await.unwrap();
        let patch = TemplatePatch {
            name: Some("New".to_string()),
            ..TemplatePatch::default()
        };

        let denied = gateway.update(None, &template.id, patch.clone()).await;
        assert!(matches!(denied, Err(TemplateError::NotAuthenticated)));

        gateway
            .update(Some(&user()), &template.id, patch)
            .await
            .unwrap();
        assert_eq!(gateway.get(&template.id).await.unwrap().name, "New");
    }

    #[tokio::test]
    async fn test_delete() {
        let gateway = gateway();
        let template = gateway.create(Some(&user()), draft("Gone")).await.unwrap();
        gateway.delete(&template.id).await.unwrap();
        assert!(gateway.list().await.unwrap().is_empty());
        assert!(matches!(
            gateway.delete(&template.id).await,
            Err(TemplateError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_skips_unknown_ids() {
        let catalog = Catalog::builtin().unwrap();
        let template = ChainTemplate {
            id: "t".to_string(),
            name: "T".to_string(),
            description: None,
            prompt_ids: vec![2, 9999, 1],
            category: "custom".to_string(),
            is_public: false,
            created_by: "u".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            use_count: 0,
        };
        let ids: Vec<PromptId> = template.resolve(&catalog).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
