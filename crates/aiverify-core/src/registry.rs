//! Aggregate registry view and dependency satisfaction.

use std::collections::HashMap;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::component::{Algorithm, InputBlock, ReportWidget, TemplateComponent, WidgetStatus};
use crate::plugin::Plugin;

/// Snapshot of every installed plugin and its components.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    /// Plugins sorted ascending by install time.
    pub plugins: Vec<Plugin>,
    pub report_widgets: Vec<ReportWidget>,
    pub input_blocks: Vec<InputBlock>,
    pub algorithms: Vec<Algorithm>,
    pub templates: Vec<TemplateComponent>,
    /// The configured stock-plugin allowlist.
    pub stock_plugins: Vec<String>,
}

impl Registry {
    /// Assemble a registry from freshly read plugins.
    ///
    /// Sorts plugins by install time, recomputes every widget's dependency
    /// flags against this snapshot and flattens the component lists.
    pub fn from_plugins(mut plugins: Vec<Plugin>, stock_plugins: Vec<String>) -> Self {
        plugins.sort_by_key(|p| p.installed_at);
        resolve_dependencies(&mut plugins);

        let mut registry = Self {
            stock_plugins,
            ..Self::default()
        };
        for plugin in &plugins {
            registry.report_widgets.extend(plugin.report_widgets.iter().cloned());
            registry.input_blocks.extend(plugin.input_blocks.iter().cloned());
            registry.algorithms.extend(plugin.algorithms.iter().cloned());
            registry.templates.extend(plugin.templates.iter().cloned());
        }
        registry.plugins = plugins;
        registry
    }

    /// Look up a plugin by gid.
    pub fn plugin(&self, gid: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.gid() == gid)
    }

    /// Look up a report widget by its composite gid.
    pub fn widget(&self, gid: &str) -> Option<&ReportWidget> {
        self.report_widgets.iter().find(|w| w.base.gid == gid)
    }

    /// Total number of components across all plugins.
    pub fn component_count(&self) -> usize {
        self.report_widgets.len() + self.input_blocks.len() + self.algorithms.len() + self.templates.len()
    }
}

/// Recompute `valid` on every widget dependency and each widget's `status`.
///
/// A dependency is valid iff its target gid is among the components of
/// `plugins` and, when a range is given, the target's plugin version
/// satisfies it.
pub fn resolve_dependencies(plugins: &mut [Plugin]) {
    let versions = component_versions(plugins);

    for plugin in plugins.iter_mut() {
        for widget in &mut plugin.report_widgets {
            let mut all_valid = true;
            for dep in &mut widget.dependencies {
                dep.valid = versions
                    .get(dep.gid.as_str())
                    .is_some_and(|version| satisfies(version, dep.version.as_deref()));
                all_valid &= dep.valid;
            }
            widget.status = if all_valid {
                WidgetStatus::Ok
            } else {
                WidgetStatus::MissingDependencies
            };
        }
    }
}

/// Map every component gid to its owning plugin's version.
fn component_versions(plugins: &[Plugin]) -> HashMap<String, String> {
    let mut versions = HashMap::new();
    for plugin in plugins {
        let version = &plugin.meta.version;
        let gids = plugin
            .report_widgets
            .iter()
            .map(|c| &c.base.gid)
            .chain(plugin.input_blocks.iter().map(|c| &c.base.gid))
            .chain(plugin.algorithms.iter().map(|c| &c.base.gid))
            .chain(plugin.templates.iter().map(|c| &c.base.gid));
        for gid in gids {
            versions.insert(gid.clone(), version.clone());
        }
    }
    versions
}

/// Check a version against an optional range.
///
/// Ranges follow npm semantics: `||` separates alternatives, `a - b` is an
/// inclusive hyphen range, a bare version matches exactly, and `x`/`*`
/// wildcards and partial versions (`1.2`) cover everything they leave open.
/// Comparators inside one alternative may be separated by spaces or commas.
/// An unparseable range or version never satisfies.
pub fn satisfies(version: &str, range: Option<&str>) -> bool {
    let Some(range) = range.map(str::trim).filter(|r| !r.is_empty()) else {
        return true;
    };
    let Ok(version) = Version::parse(version.trim().trim_start_matches('v')) else {
        return false;
    };
    range
        .split("||")
        .any(|alternative| parse_comparator_set(alternative).is_some_and(|req| req.matches(&version)))
}

/// Translate one npm comparator set into a [`VersionReq`].
fn parse_comparator_set(set: &str) -> Option<VersionReq> {
    let set = set.trim();
    if set.is_empty() {
        return Some(VersionReq::STAR);
    }
    if let Some((low, high)) = set.split_once(" - ") {
        let req = format!(">={}, <={}", bare(low.trim()), bare(high.trim()));
        return VersionReq::parse(&req).ok();
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();
    for token in set.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()) {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        let comparator = if pending_op.is_empty() {
            comparator(token)
        } else {
            format!("{}{}", std::mem::take(&mut pending_op), bare(token))
        };
        comparators.push(comparator);
    }
    if !pending_op.is_empty() {
        return None;
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

fn comparator(token: &str) -> String {
    let op_len = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .unwrap_or(token.len());
    let (op, rest) = token.split_at(op_len);
    let rest = bare(rest);
    if !op.is_empty() {
        return format!("{op}{rest}");
    }
    if rest.split('.').any(is_wildcard) {
        if rest.split('.').all(is_wildcard) {
            return "*".to_string();
        }
        return rest.to_string();
    }
    // A bare version is exact; a partial one (`1.2`) covers its open parts.
    format!("={rest}")
}

fn bare(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}
