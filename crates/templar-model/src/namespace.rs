//! Local namespace derivation policies
//!
//! A template's local namespace is appended to its set's root namespace.
//! Two policies are available: trimming the template path, or walking the
//! template's ancestors until an explicit namespace hint or the set's common
//! folder depth is reached.

use std::collections::HashMap;

use parking_lot::Mutex;
use templar_items::{Item, ItemId, ItemSetId};
use tracing::trace;

use crate::config::NamespacePolicyConfig;
use crate::database::ContentDatabase;
use crate::naming;

/// Derives the local namespace of a template item
pub trait NamespacePolicy: Send + Sync {
    /// Policy name for logs and diagnostics
    fn name(&self) -> &str;

    /// Local namespace of `template`, dot-joined and sanitized
    fn local_namespace(&self, template: &Item, db: &ContentDatabase) -> String;
}

/// Build the policy selected by configuration
pub fn policy_from_config(
    config: &NamespacePolicyConfig,
    template_marker_id: ItemId,
) -> Box<dyn NamespacePolicy> {
    match config {
        NamespacePolicyConfig::PathTrim { skip_leading } => Box::new(PathTrimPolicy::new(*skip_leading)),
        NamespacePolicyConfig::AncestorHint {
            hint_key,
            strip_prefix,
        } => Box::new(AncestorHintPolicy::new(
            template_marker_id,
            hint_key.clone(),
            strip_prefix.clone(),
        )),
    }
}

/// Namespace from the template path minus N leading and the last segment
#[derive(Debug, Clone)]
pub struct PathTrimPolicy {
    skip_leading: usize,
}

impl PathTrimPolicy {
    /// Create a policy dropping `skip_leading` leading path segments
    pub fn new(skip_leading: usize) -> Self {
        Self { skip_leading }
    }
}

impl NamespacePolicy for PathTrimPolicy {
    fn name(&self) -> &str {
        "path_trim"
    }

    fn local_namespace(&self, template: &Item, _db: &ContentDatabase) -> String {
        let segments = template.path_segments();
        let end = segments.len().saturating_sub(1);
        if self.skip_leading >= end {
            return String::new();
        }
        naming::namespace(&segments[self.skip_leading..end])
    }
}

/// Namespace from ancestor names, anchored by hints or the set's common depth
#[derive(Debug)]
pub struct AncestorHintPolicy {
    template_marker_id: ItemId,
    hint_key: String,
    strip_prefix: String,
    common_depth: Mutex<HashMap<ItemSetId, usize>>,
}

impl AncestorHintPolicy {
    /// Create the policy
    pub fn new(template_marker_id: ItemId, hint_key: String, strip_prefix: String) -> Self {
        Self {
            template_marker_id,
            hint_key,
            strip_prefix,
            common_depth: Mutex::new(HashMap::new()),
        }
    }

    /// Number of leading folder segments shared by every template of a set
    pub fn common_depth(&self, set_id: ItemSetId, db: &ContentDatabase) -> usize {
        if let Some(depth) = self.common_depth.lock().get(&set_id) {
            return *depth;
        }

        let mut folders: Vec<Vec<&str>> = db
            .items_matching(|item| {
                item.set_id == set_id && item.template_id == self.template_marker_id
            })
            .map(|item| {
                let mut segments = item.path_segments();
                segments.pop();
                segments
            })
            .collect();
        folders.sort_by_key(|segments| std::cmp::Reverse(segments.len()));

        let depth = match folders.split_first() {
            None => 0,
            Some((longest, rest)) => longest
                .iter()
                .enumerate()
                .take_while(|(i, segment)| {
                    rest.iter().all(|other| {
                        other
                            .get(*i)
                            .is_some_and(|s| s.eq_ignore_ascii_case(segment))
                    })
                })
                .count(),
        };

        trace!(set = %set_id, depth, "Computed common folder depth");
        *self.common_depth.lock().entry(set_id).or_insert(depth)
    }

    fn strip(&self, hint: &str) -> String {
        let hint = hint.trim();
        if self.strip_prefix.is_empty() {
            return hint.to_string();
        }
        match hint.strip_prefix(self.strip_prefix.as_str()) {
            Some(rest) => rest.trim_start_matches('.').to_string(),
            None => hint.to_string(),
        }
    }
}

impl NamespacePolicy for AncestorHintPolicy {
    fn name(&self) -> &str {
        "ancestor_hint"
    }

    fn local_namespace(&self, template: &Item, db: &ContentDatabase) -> String {
        if let Some(hint) = template.hint(&self.hint_key) {
            return naming::namespace(&[&self.strip(hint)]);
        }

        let common_depth = self.common_depth(template.set_id, db);
        let mut collected: Vec<&str> = Vec::new();
        let mut anchor: Option<String> = None;

        for ancestor in db.ancestors(template) {
            if let Some(hint) = ancestor.hint(&self.hint_key) {
                anchor = Some(self.strip(hint));
                break;
            }
            if ancestor.path_segments().len() <= common_depth {
                break;
            }
            collected.push(&ancestor.name);
        }

        collected.reverse();
        let mut parts: Vec<&str> = Vec::with_capacity(collected.len() + 1);
        if let Some(anchor) = anchor.as_deref() {
            parts.push(anchor);
        }
        parts.extend(collected);
        naming::namespace(&parts)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use templar_items::ItemSet;
    use uuid::Uuid;

    use super::*;
    use crate::config::{ROOT_ITEM_ID, TEMPLATE_MARKER_ID};

    struct Tree {
        set: ItemSet,
        next: u128,
    }

    impl Tree {
        fn new() -> Self {
            Self {
                set: ItemSet::new(Uuid::from_u128(77), "Feature", "Site"),
                next: 1,
            }
        }

        fn add(&mut self, parent: ItemId, parent_path: &str, name: &str, template: bool) -> Arc<Item> {
            self.add_with(parent, parent_path, name, template, HashMap::new())
        }

        fn add_hinted(
            &mut self,
            parent: ItemId,
            parent_path: &str,
            name: &str,
            template: bool,
            hint: &str,
        ) -> Arc<Item> {
            let hints = HashMap::from([("Namespace".to_string(), hint.to_string())]);
            self.add_with(parent, parent_path, name, template, hints)
        }

        fn add_with(
            &mut self,
            parent: ItemId,
            parent_path: &str,
            name: &str,
            template: bool,
            hints: HashMap<String, String>,
        ) -> Arc<Item> {
            let item = Arc::new(Item {
                id: Uuid::from_u128(self.next),
                name: name.to_string(),
                parent_id: parent,
                path: format!("{parent_path}/{name}"),
                origin: PathBuf::from(format!("{name}.item")),
                set_id: self.set.id,
                shared_fields: vec![],
                template_id: if template { TEMPLATE_MARKER_ID } else { Uuid::nil() },
                template_name: String::new(),
                versions: vec![],
                hints,
            });
            self.next += 1;
            self.set.push(item.clone());
            item
        }
    }

    fn policy() -> AncestorHintPolicy {
        AncestorHintPolicy::new(TEMPLATE_MARKER_ID, "namespace".to_string(), "Site.".to_string())
    }

    #[test]
    fn test_path_trim_drops_leading_and_last_segments() {
        let mut tree = Tree::new();
        let t = tree.add(ROOT_ITEM_ID, "/sitecore/templates/Feature/Navigation", "Link Item", true);
        let db = ContentDatabase::build(vec![tree.set]);
        let ns = PathTrimPolicy::new(3).local_namespace(&t, &db);
        assert_eq!(ns, "Navigation");
        assert_eq!(PathTrimPolicy::new(10).local_namespace(&t, &db), "");
    }

    #[test]
    fn test_common_depth_stops_at_divergence() {
        let mut tree = Tree::new();
        let templates = tree.add(ROOT_ITEM_ID, "/sitecore", "templates", false);
        let feature = tree.add(templates.id, "/sitecore/templates", "Feature", false);
        let nav = tree.add(feature.id, "/sitecore/templates/Feature", "Navigation", false);
        let media = tree.add(feature.id, "/sitecore/templates/Feature", "Media", false);
        tree.add(nav.id, "/sitecore/templates/Feature/Navigation", "Link", true);
        tree.add(media.id, "/sitecore/templates/Feature/Media", "Image", true);
        let set_id = tree.set.id;
        let db = ContentDatabase::build(vec![tree.set]);
        assert_eq!(policy().common_depth(set_id, &db), 3);
    }

    #[test]
    fn test_ancestor_walk_collects_below_common_depth() {
        let mut tree = Tree::new();
        let templates = tree.add(ROOT_ITEM_ID, "/sitecore", "templates", false);
        let nav = tree.add(templates.id, "/sitecore/templates", "Navigation", false);
        let menus = tree.add(nav.id, "/sitecore/templates/Navigation", "Menus", false);
        let media = tree.add(templates.id, "/sitecore/templates", "Media", false);
        let link = tree.add(menus.id, "/sitecore/templates/Navigation/Menus", "Link", true);
        tree.add(media.id, "/sitecore/templates/Media", "Image", true);
        let db = ContentDatabase::build(vec![tree.set]);
        assert_eq!(policy().local_namespace(&link, &db), "Navigation.Menus");
    }

    #[test]
    fn test_hint_anchors_namespace_and_strips_prefix() {
        let mut tree = Tree::new();
        let templates = tree.add(ROOT_ITEM_ID, "/sitecore", "templates", false);
        let project = tree.add_hinted(
            templates.id,
            "/sitecore/templates",
            "Project",
            false,
            "Site.Project.Shared",
        );
        let pages = tree.add(project.id, "/sitecore/templates/Project", "Pages", false);
        let page = tree.add(pages.id, "/sitecore/templates/Project/Pages", "Page", true);
        tree.add(templates.id, "/sitecore/templates", "Other", true);
        let db = ContentDatabase::build(vec![tree.set]);
        assert_eq!(policy().local_namespace(&page, &db), "Project.Shared.Pages");
    }

    #[test]
    fn test_own_hint_wins() {
        let mut tree = Tree::new();
        let t = tree.add_hinted(ROOT_ITEM_ID, "/sitecore/templates", "Page", true, "Site.Pages");
        let db = ContentDatabase::build(vec![tree.set]);
        assert_eq!(policy().local_namespace(&t, &db), "Pages");
    }

    #[test]
    fn test_policy_from_config() {
        let policy = policy_from_config(&NamespacePolicyConfig::default(), TEMPLATE_MARKER_ID);
        assert_eq!(policy.name(), "path_trim");
    }
}
