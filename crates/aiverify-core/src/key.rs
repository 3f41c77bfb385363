//! Structured registry keys.
//!
//! Every key written to or read from the registry goes through
//! [`RegistryKey`], so writer and reader cannot drift apart on the
//! string format.

use std::fmt;
use std::str::FromStr;

use crate::component::ComponentKind;
use crate::error::StoreError;

const PLUGIN_INDEX_PREFIX: &str = "plugin:list:";
const LAST_MODIFIED: &str = "plugin:lastModified";
const PROJECT_TEMPLATE_PREFIX: &str = "projectTemplate:";

/// Key of a single component record: `{kind}:{pluginGid}:{cid}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    pub kind: ComponentKind,
    pub plugin_gid: String,
    pub cid: String,
}

impl ComponentKey {
    pub fn new(kind: ComponentKind, plugin_gid: impl Into<String>, cid: impl Into<String>) -> Self {
        Self {
            kind,
            plugin_gid: plugin_gid.into(),
            cid: cid.into(),
        }
    }

    /// Split a composite component gid into a key of the given kind.
    ///
    /// Cids never contain `:`, so the last separator splits plugin from cid.
    pub fn from_gid(kind: ComponentKind, gid: &str) -> Option<Self> {
        let (plugin_gid, cid) = gid.rsplit_once(':')?;
        if plugin_gid.is_empty() || cid.is_empty() {
            return None;
        }
        Some(Self::new(kind, plugin_gid, cid))
    }

    /// Composite component gid.
    pub fn gid(&self) -> String {
        crate::component::component_gid(&self.plugin_gid, &self.cid)
    }
}

/// Any key in the registry store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegistryKey {
    /// `plugin:list:{gid}`: the per-plugin index record.
    PluginIndex(String),
    /// `{kind}:{pluginGid}:{cid}`: a component record.
    Component(ComponentKey),
    /// `plugin:lastModified`: marker set after a full directory sweep.
    LastModified,
    /// `projectTemplate:{id}`: a template document owned by the template service.
    ProjectTemplate(String),
}

impl RegistryKey {
    pub fn plugin_index(gid: impl Into<String>) -> Self {
        Self::PluginIndex(gid.into())
    }

    pub fn component(kind: ComponentKind, plugin_gid: impl Into<String>, cid: impl Into<String>) -> Self {
        Self::Component(ComponentKey::new(kind, plugin_gid, cid))
    }

    /// Pattern matching every plugin index record.
    pub fn plugin_index_pattern() -> String {
        format!("{PLUGIN_INDEX_PREFIX}*")
    }

    /// Patterns covering every key family the registry owns.
    pub fn all_patterns() -> Vec<String> {
        use strum::IntoEnumIterator;

        let mut patterns = vec!["plugin:*".to_string(), format!("{PROJECT_TEMPLATE_PREFIX}*")];
        patterns.extend(ComponentKind::iter().map(ComponentKind::key_pattern));
        patterns
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PluginIndex(gid) => write!(f, "{PLUGIN_INDEX_PREFIX}{gid}"),
            Self::Component(key) => write!(f, "{}:{}:{}", key.kind, key.plugin_gid, key.cid),
            Self::LastModified => f.write_str(LAST_MODIFIED),
            Self::ProjectTemplate(id) => write!(f, "{PROJECT_TEMPLATE_PREFIX}{id}"),
        }
    }
}

impl FromStr for RegistryKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidKey { key: s.to_string() };

        if s == LAST_MODIFIED {
            return Ok(Self::LastModified);
        }
        if let Some(gid) = s.strip_prefix(PLUGIN_INDEX_PREFIX) {
            if gid.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::PluginIndex(gid.to_string()));
        }
        if let Some(id) = s.strip_prefix(PROJECT_TEMPLATE_PREFIX) {
            return Ok(Self::ProjectTemplate(id.to_string()));
        }

        let (prefix, gid) = s.split_once(':').ok_or_else(invalid)?;
        let kind = ComponentKind::from_str(prefix).map_err(|_| invalid())?;
        ComponentKey::from_gid(kind, gid)
            .map(Self::Component)
            .ok_or_else(invalid)
    }
}

impl From<ComponentKey> for RegistryKey {
    fn from(key: ComponentKey) -> Self {
        Self::Component(key)
    }
}
