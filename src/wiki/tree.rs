//! Page-tree construction from the flat document list.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use utoipa::ToSchema;

use crate::db::Document;

/// A document in the page tree. Content is left out to keep trees small.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DocumentNode {
    pub id: String,
    pub title: String,
    pub icon: Option<String>,
    pub project_id: Option<String>,
    pub parent_id: Option<String>,
    pub idx: Option<i64>,
    pub updated_at: String,
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    fn leaf(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            icon: doc.icon.clone(),
            project_id: doc.project_id.clone(),
            parent_id: doc.parent_id.clone(),
            idx: doc.idx,
            updated_at: doc.updated_at.clone(),
            children: vec![],
        }
    }
}

/// Sibling order: `idx` ascending with missing last, then title, then id.
fn sibling_order(a: &Document, b: &Document) -> Ordering {
    let by_idx = match (a.idx, b.idx) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_idx
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}

/// Build a forest from a flat list.
///
/// Roots are documents without a parent or whose parent is not in the
/// list. Documents that can only be reached through a parent cycle are
/// promoted to roots, so every input document appears exactly once.
pub fn build_tree(documents: &[Document]) -> Vec<DocumentNode> {
    let by_id: HashMap<&str, &Document> =
        documents.iter().map(|d| (d.id.as_str(), d)).collect();

    let mut children: HashMap<&str, Vec<&Document>> = HashMap::new();
    let mut roots: Vec<&Document> = vec![];
    for doc in documents {
        match doc.parent_id.as_deref() {
            Some(parent) if parent != doc.id && by_id.contains_key(parent) => {
                children.entry(parent).or_default().push(doc);
            }
            _ => roots.push(doc),
        }
    }
    for list in children.values_mut() {
        list.sort_by(|a, b| sibling_order(a, b));
    }
    roots.sort_by(|a, b| sibling_order(a, b));

    let mut placed: HashSet<&str> = HashSet::new();
    let mut forest: Vec<DocumentNode> = roots
        .iter()
        .map(|root| attach(root, &children, &mut placed))
        .collect();

    // Whatever is left hangs off a cycle: break each cycle at its smallest member
    let mut leftovers: Vec<&Document> = documents
        .iter()
        .filter(|d| !placed.contains(d.id.as_str()))
        .collect();
    leftovers.sort_by(|a, b| sibling_order(a, b));
    for doc in leftovers {
        if !placed.contains(doc.id.as_str()) {
            forest.push(attach(doc, &children, &mut placed));
        }
    }

    forest
}

fn attach<'a>(
    doc: &'a Document,
    children: &HashMap<&str, Vec<&'a Document>>,
    placed: &mut HashSet<&'a str>,
) -> DocumentNode {
    placed.insert(doc.id.as_str());
    let mut node = DocumentNode::leaf(doc);
    if let Some(kids) = children.get(doc.id.as_str()) {
        for child in kids {
            if !placed.contains(child.id.as_str()) {
                node.children.push(attach(child, children, placed));
            }
        }
    }
    node
}

/// True when moving `id` under `new_parent` would put it inside its own subtree.
pub fn would_create_cycle(documents: &[Document], id: &str, new_parent: &str) -> bool {
    if id == new_parent {
        return true;
    }

    let parents: HashMap<&str, Option<&str>> = documents
        .iter()
        .map(|d| (d.id.as_str(), d.parent_id.as_deref()))
        .collect();

    // Walk up from the new parent; seeing `id` means it is a descendant
    let mut seen: HashSet<&str> = HashSet::new();
    let mut current = Some(new_parent);
    while let Some(node) = current {
        if node == id {
            return true;
        }
        if !seen.insert(node) {
            // An existing cycle that does not involve `id`
            return false;
        }
        current = parents.get(node).copied().flatten();
    }
    false
}
