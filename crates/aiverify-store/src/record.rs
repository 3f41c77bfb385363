//! Encoding of registry records and typed reads over a [`RegistryStore`].
//!
//! Component records hold the serialized component under `data`. Algorithm
//! records additionally carry `requirements`, `inputSchema` and
//! `outputSchema`; template records carry `data2` (the full template
//! document) and `id` (the project template identifier). Plugin index
//! records hold `meta`, one cid list per kind and `installedAt`.

use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use strum::IntoEnumIterator;

use aiverify_core::{
    Component, ComponentIds, ComponentKey, ComponentKind, Plugin, PluginMeta, RegistryKey,
    StoreError, TemplateDocument,
};

use crate::store::{Fields, RegistryStore, StoreResult};

pub const DATA: &str = "data";
pub const REQUIREMENTS: &str = "requirements";
pub const INPUT_SCHEMA: &str = "inputSchema";
pub const OUTPUT_SCHEMA: &str = "outputSchema";
pub const TEMPLATE_DOCUMENT: &str = "data2";
pub const TEMPLATE_ID: &str = "id";
pub const META: &str = "meta";
pub const INSTALLED_AT: &str = "installedAt";
pub const MTIME: &str = "mtime";

fn to_json<T: Serialize + ?Sized>(key: &str, value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|e| StoreError::decode(key, e))
}

fn from_json<T: DeserializeOwned>(key: &str, field: &str, raw: &str) -> StoreResult<T> {
    serde_json::from_str(raw).map_err(|e| StoreError::decode(key, format!("field {field}: {e}")))
}

fn required<'a>(key: &str, fields: &'a Fields, field: &str) -> StoreResult<&'a str> {
    fields
        .get(field)
        .map(String::as_str)
        .ok_or_else(|| StoreError::decode(key, format!("missing field {field}")))
}

/// Encode a component record.
///
/// `template` must be given for template components.
pub fn encode_component(
    component: &Component,
    template: Option<(&str, &TemplateDocument)>,
) -> StoreResult<Fields> {
    let key = component.gid();
    let mut fields = Fields::new();
    fields.insert(DATA.to_string(), to_json(key, component)?);

    match component {
        Component::Algorithm(algo) => {
            fields.insert(REQUIREMENTS.to_string(), to_json(key, &algo.requirements)?);
            fields.insert(INPUT_SCHEMA.to_string(), to_json(key, &algo.input_schema)?);
            fields.insert(OUTPUT_SCHEMA.to_string(), to_json(key, &algo.output_schema)?);
        }
        Component::Template(_) => {
            if let Some((id, document)) = template {
                fields.insert(TEMPLATE_DOCUMENT.to_string(), to_json(key, document)?);
                fields.insert(TEMPLATE_ID.to_string(), id.to_string());
            }
        }
        Component::ReportWidget(_) | Component::InputBlock(_) => {}
    }
    Ok(fields)
}

/// Decode a component record read from `key`.
///
/// The `type` discriminator must match the key's kind; the auxiliary
/// algorithm fields take precedence over the copies embedded in `data`.
pub fn decode_component(key: &ComponentKey, fields: &Fields) -> StoreResult<Component> {
    let raw_key = RegistryKey::from(key.clone()).to_string();
    let mut component: Component = from_json(&raw_key, DATA, required(&raw_key, fields, DATA)?)?;

    if component.kind() != key.kind {
        return Err(StoreError::decode(
            &raw_key,
            format!("record holds a {} component", component.kind().type_name()),
        ));
    }

    if let Component::Algorithm(algo) = &mut component {
        if let Some(raw) = fields.get(REQUIREMENTS) {
            algo.requirements = from_json(&raw_key, REQUIREMENTS, raw)?;
        }
        if let Some(raw) = fields.get(INPUT_SCHEMA) {
            algo.input_schema = from_json(&raw_key, INPUT_SCHEMA, raw)?;
        }
        if let Some(raw) = fields.get(OUTPUT_SCHEMA) {
            algo.output_schema = from_json(&raw_key, OUTPUT_SCHEMA, raw)?;
        }
    }
    Ok(component)
}

/// Project template id recorded on a template component record, if any.
pub fn template_id(fields: &Fields) -> Option<&str> {
    fields.get(TEMPLATE_ID).map(String::as_str)
}

/// Encode a plugin index record.
pub fn encode_index(meta: &PluginMeta, ids: &ComponentIds, installed_at: i64) -> StoreResult<Fields> {
    let key = RegistryKey::plugin_index(&meta.gid).to_string();
    let mut fields = Fields::new();
    fields.insert(META.to_string(), to_json(&key, meta)?);
    for kind in ComponentKind::iter() {
        fields.insert(kind.index_field().to_string(), to_json(&key, ids.get(kind))?);
    }
    fields.insert(INSTALLED_AT.to_string(), installed_at.to_string());
    Ok(fields)
}

/// Decode a plugin index record into an unpopulated [`Plugin`].
///
/// Absent cid lists decode as empty.
pub fn decode_index(gid: &str, fields: &Fields) -> StoreResult<Plugin> {
    let key = RegistryKey::plugin_index(gid).to_string();
    let meta: PluginMeta = from_json(&key, META, required(&key, fields, META)?)?;

    let mut ids = ComponentIds::default();
    for kind in ComponentKind::iter() {
        if let Some(raw) = fields.get(kind.index_field()) {
            *ids.get_mut(kind) = from_json(&key, kind.index_field(), raw)?;
        }
    }

    let installed_at = required(&key, fields, INSTALLED_AT)?
        .parse::<i64>()
        .map_err(|e| StoreError::decode(&key, format!("field {INSTALLED_AT}: {e}")))?;

    Ok(Plugin::new(meta, ids, installed_at))
}

/// Read one component record; `None` when absent.
pub async fn fetch_component(store: &dyn RegistryStore, key: &ComponentKey) -> StoreResult<Option<Component>> {
    let raw_key = RegistryKey::from(key.clone()).to_string();
    let fields = store.hash_get_all(&raw_key).await?;
    if fields.is_empty() {
        return Ok(None);
    }
    decode_component(key, &fields).map(Some)
}

/// Read one plugin index record; `None` when absent.
pub async fn fetch_index(store: &dyn RegistryStore, gid: &str) -> StoreResult<Option<Plugin>> {
    let fields = store
        .hash_get_all(&RegistryKey::plugin_index(gid).to_string())
        .await?;
    if fields.is_empty() {
        return Ok(None);
    }
    decode_index(gid, &fields).map(Some)
}

/// Fill a plugin's component vectors from its cid lists.
///
/// Component records are fetched concurrently. Listed components whose
/// records are missing are skipped.
pub async fn populate(store: &dyn RegistryStore, plugin: &mut Plugin) -> StoreResult<()> {
    let owned_gid = plugin.gid().to_string();
    let gid = owned_gid.as_str();
    let keys: Vec<ComponentKey> = ComponentKind::iter()
        .flat_map(|kind| {
            plugin
                .component_ids
                .get(kind)
                .iter()
                .map(move |cid| ComponentKey::new(kind, gid, cid))
        })
        .collect();
    let components = try_join_all(keys.iter().map(|key| fetch_component(store, key))).await?;

    for (key, component) in keys.into_iter().zip(components) {
        match component {
            Some(Component::ReportWidget(c)) => plugin.report_widgets.push(c),
            Some(Component::InputBlock(c)) => plugin.input_blocks.push(c),
            Some(Component::Algorithm(c)) => plugin.algorithms.push(c),
            Some(Component::Template(c)) => plugin.templates.push(c),
            None => {
                tracing::debug!(target: "aiverify::store", key = %RegistryKey::from(key), "listed component record missing");
            }
        }
    }
    Ok(())
}

/// Find a component by its composite gid, probing each kind's key.
pub async fn find_component(store: &dyn RegistryStore, gid: &str) -> StoreResult<Option<Component>> {
    for kind in ComponentKind::iter() {
        let Some(key) = ComponentKey::from_gid(kind, gid) else {
            return Ok(None);
        };
        if let Some(component) = fetch_component(store, &key).await? {
            return Ok(Some(component));
        }
    }
    Ok(None)
}

/// Gids of every plugin with an index record, sorted.
pub async fn plugin_gids(store: &dyn RegistryStore) -> StoreResult<Vec<String>> {
    let mut gids = Vec::new();
    for raw in store.keys_matching(&RegistryKey::plugin_index_pattern()).await? {
        match raw.parse::<RegistryKey>() {
            Ok(RegistryKey::PluginIndex(gid)) => gids.push(gid),
            _ => tracing::warn!(target: "aiverify::store", key = %raw, "ignoring malformed plugin index key"),
        }
    }
    gids.sort();
    Ok(gids)
}

/// Remove every record of every registry key family.
pub async fn clear_registry(store: &dyn RegistryStore) -> StoreResult<usize> {
    let mut removed = 0;
    for pattern in RegistryKey::all_patterns() {
        for key in store.keys_matching(&pattern).await? {
            store.delete(&key).await?;
            removed += 1;
        }
    }
    Ok(removed)
}
