//! Project template service used for template components.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use aiverify_core::{RegistryKey, ScanError, StoreError, TemplateDocument};
use aiverify_store::record::DATA;
use aiverify_store::{BoxFuture, RegistryStore};

/// Persists project template documents created from plugin templates.
///
/// `save` returns the identifier recorded on the template component.
/// Saving the same document twice returns the same identifier.
pub trait ProjectTemplateService: Send + Sync {
    fn save<'a>(&'a self, document: &'a TemplateDocument) -> BoxFuture<'a, Result<String, ScanError>>;

    /// Remove a document. Removing an unknown id is not an error.
    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), ScanError>>;

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<TemplateDocument>, ScanError>>;
}

/// Template service backed by the registry store.
///
/// Documents live under `projectTemplate:{id}` with the template
/// component's gid as id.
pub struct StoreTemplateService {
    store: Arc<dyn RegistryStore>,
}

impl StoreTemplateService {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self { store }
    }
}

impl ProjectTemplateService for StoreTemplateService {
    fn save<'a>(&'a self, document: &'a TemplateDocument) -> BoxFuture<'a, Result<String, ScanError>> {
        Box::pin(async move {
            let id = document.gid.clone();
            let key = RegistryKey::ProjectTemplate(id.clone()).to_string();
            let raw = serde_json::to_string(document).map_err(|e| StoreError::decode(&key, e))?;
            self.store.hash_set(&key, DATA, &raw).await?;
            Ok(id)
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), ScanError>> {
        Box::pin(async move {
            let key = RegistryKey::ProjectTemplate(id.to_string()).to_string();
            self.store.delete(&key).await?;
            Ok(())
        })
    }

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<TemplateDocument>, ScanError>> {
        Box::pin(async move {
            let key = RegistryKey::ProjectTemplate(id.to_string()).to_string();
            let Some(raw) = self.store.hash_get(&key, DATA).await? else {
                return Ok(None);
            };
            let document = serde_json::from_str(&raw).map_err(|e| StoreError::decode(&key, e))?;
            Ok(Some(document))
        })
    }
}

/// In-process template service.
#[derive(Debug, Default)]
pub struct MemoryTemplateService {
    documents: Mutex<BTreeMap<String, TemplateDocument>>,
}

impl MemoryTemplateService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every stored document, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.documents
            .lock()
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_documents<T>(&self, f: impl FnOnce(&mut BTreeMap<String, TemplateDocument>) -> T) -> Result<T, ScanError> {
        let mut docs = self.documents.lock().map_err(|_| ScanError::TemplateService {
            message: "template store poisoned".to_string(),
        })?;
        Ok(f(&mut docs))
    }
}

impl ProjectTemplateService for MemoryTemplateService {
    fn save<'a>(&'a self, document: &'a TemplateDocument) -> BoxFuture<'a, Result<String, ScanError>> {
        Box::pin(async move {
            let id = document.gid.clone();
            self.with_documents(|docs| docs.insert(id.clone(), document.clone()))?;
            Ok(id)
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), ScanError>> {
        Box::pin(async move {
            self.with_documents(|docs| docs.remove(id))?;
            Ok(())
        })
    }

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<TemplateDocument>, ScanError>> {
        Box::pin(async move { self.with_documents(|docs| docs.get(id).cloned()) })
    }
}
