//! engine::load_rules
//!
//! Keep a snapshot view's load rules covering every component a baseline
//! needs.
//!
//! A composite baseline may depend on other baselines, which may themselves
//! be composite. [`required_roots`] walks that graph, collecting the root
//! directory of each rooted component. [`reconcile`] then adds whatever the
//! view is missing. Rules are only ever added.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use tracing::{debug, info, warn};

use super::EngineError;
use crate::cleartool::Cleartool;

/// Root directories of every component reachable from `baseline`.
///
/// Each baseline is visited at most once, so a dependency cycle terminates.
/// Non-rooted components contribute nothing but their dependencies are still
/// followed.
pub fn required_roots(ct: &Cleartool<'_>, baseline: &str) -> Result<BTreeSet<String>, EngineError> {
    let mut roots = BTreeSet::new();
    let mut visited = HashSet::new();
    let mut pending = vec![baseline.to_string()];

    while let Some(current) = pending.pop() {
        if !visited.insert(current.clone()) {
            debug!(baseline = %current, "already visited");
            continue;
        }

        let component = ct.baseline_component(&current)?;
        match ct.component_root(&component)? {
            Some(root) => {
                debug!(baseline = %current, component = %component, root = %root, "component root");
                roots.insert(root);
            }
            None => debug!(baseline = %current, component = %component, "non-rooted component"),
        }

        let mut depends = ct.baseline_depends_on(&current)?;
        // Reverse so the stack visits dependencies in printed order.
        depends.reverse();
        pending.extend(depends);
    }

    Ok(roots)
}

/// Rules in `required` or `extra` that are not yet in `current`.
///
/// Blank rules are dropped. The result is sorted.
pub fn missing_rules(current: &BTreeSet<String>, required: &BTreeSet<String>, extra: &[String]) -> Vec<String> {
    required
        .iter()
        .map(String::as_str)
        .chain(extra.iter().map(String::as_str))
        .map(str::trim)
        .filter(|rule| !rule.is_empty() && !current.contains(*rule))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Add the load rules `baseline` needs to the view `view_tag` at `view_path`.
///
/// Returns the rules that were added.
pub fn reconcile(
    ct: &Cleartool<'_>,
    view_tag: &str,
    view_path: &Path,
    baseline: &str,
    extra: &[String],
) -> Result<Vec<String>, EngineError> {
    let current = ct.current_load_rules(view_tag)?;
    let required = required_roots(ct, baseline)?;
    let missing = missing_rules(&current, &required, extra);

    if missing.is_empty() {
        debug!(view = %view_tag, "load rules up to date");
        return Ok(missing);
    }

    for rule in &missing {
        info!(view = %view_tag, rule = %rule, "adding load rule");
        ct.add_load_rule(view_path, rule)?;
    }
    if current.is_empty() {
        warn!(view = %view_tag, "view had no load rules");
    }

    Ok(missing)
}
