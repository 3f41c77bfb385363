//! Core types for the AI Verify plugin registry.
//!
//! This crate provides the data model shared by every other crate: plugin
//! and component records, structured registry keys, the error taxonomy,
//! portal configuration, and the dependency-satisfaction rules used when a
//! registry snapshot is assembled.

mod component;
mod config;
mod error;
mod key;
pub mod manifest;
mod plugin;
mod registry;
mod template;

pub use component::{
    component_gid, Algorithm, Component, ComponentBase, ComponentKind, InputBlock, MockData,
    MockDataKind, ReportWidget, TemplateComponent, WidgetDependency, WidgetStatus,
};
pub use config::{CommandSpec, PortalConfig, PortalConfigBuilder};
pub use error::{ConfigError, PluginError, ScanError, StoreError, ValidationError};
pub use key::{ComponentKey, RegistryKey};
pub use manifest::{
    AlgorithmManifest, ComponentRef, InputBlockManifest, MockDataRef, TemplateData,
    TemplateManifest, WidgetManifest,
};
pub use plugin::{ComponentIds, Plugin, PluginMeta};
pub use registry::{resolve_dependencies, satisfies, Registry};
pub use template::{ProjectInfo, TemplateDocument};
