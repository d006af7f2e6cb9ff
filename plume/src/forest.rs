use std::collections::{HashMap, HashSet};

use plume_types::{Comment, CommentId, Forest};

/// A single forest edit, for use with [`apply_edits`]
#[derive(Debug, Clone)]
pub enum ForestEdit {
    Insert {
        parent_id: Option<CommentId>,
        node: Comment,
    },
    Remove(CommentId),
}

/// Append `node` under `parent_id`, or at the root when `parent_id` is None.
///
/// The node's `parent_comment_id` is stamped to match where it lands. When no
/// comment with `parent_id` exists the forest is returned unchanged. Branches
/// off the path to the parent keep sharing storage with the input, so
/// `im::Vector::ptr_eq` on a branch tells whether it changed.
pub fn insert_reply(forest: &Forest, parent_id: Option<CommentId>, mut node: Comment) -> Forest {
    node.parent_comment_id = parent_id;
    match parent_id {
        None => {
            let mut next = forest.clone();
            next.push_back(node);
            next
        }
        Some(parent_id) => insert_under(forest, parent_id, node).unwrap_or_else(|| forest.clone()),
    }
}

// Depth-first; None means the parent was not found below this level
fn insert_under(forest: &Forest, parent_id: CommentId, node: Comment) -> Option<Forest> {
    for (index, comment) in forest.iter().enumerate() {
        if comment.id == parent_id {
            let mut parent = comment.clone();
            parent.replies.push_back(node);
            return Some(forest.update(index, parent));
        }
        if let Some(replies) = insert_under(&comment.replies, parent_id, node.clone()) {
            let mut updated = comment.clone();
            updated.replies = replies;
            return Some(forest.update(index, updated));
        }
    }
    None
}

/// Remove every node with `node_id`, wherever it sits, along with its replies
pub fn remove_node(forest: &Forest, node_id: CommentId) -> Forest {
    let ids = HashSet::from([node_id]);
    remove_all(forest, &ids).unwrap_or_else(|| forest.clone())
}

fn remove_all(forest: &Forest, ids: &HashSet<CommentId>) -> Option<Forest> {
    let mut changed = false;
    let mut next = Forest::new();

    for comment in forest.iter() {
        if ids.contains(&comment.id) {
            changed = true;
            continue;
        }
        match remove_all(&comment.replies, ids) {
            Some(replies) => {
                changed = true;
                let mut updated = comment.clone();
                updated.replies = replies;
                next.push_back(updated);
            }
            None => next.push_back(comment.clone()),
        }
    }

    if changed {
        Some(next)
    } else {
        None
    }
}

/// Apply several edits in one walk of the tree.
///
/// Removals win over inserts: a node inserted under a removed parent is
/// dropped. Inserts under the same parent keep their relative order, and an
/// insert may target a node inserted earlier in the same batch.
pub fn apply_edits(forest: &Forest, edits: Vec<ForestEdit>) -> Forest {
    let mut removals = HashSet::new();
    let mut root_inserts = Vec::new();
    let mut child_inserts: HashMap<CommentId, Vec<Comment>> = HashMap::new();

    for edit in edits {
        match edit {
            ForestEdit::Remove(id) => {
                removals.insert(id);
            }
            ForestEdit::Insert {
                parent_id: None,
                mut node,
            } => {
                node.parent_comment_id = None;
                root_inserts.push(node);
            }
            ForestEdit::Insert {
                parent_id: Some(parent_id),
                mut node,
            } => {
                node.parent_comment_id = Some(parent_id);
                child_inserts.entry(parent_id).or_default().push(node);
            }
        }
    }

    let mut batch = Batch {
        removals,
        child_inserts,
    };
    let mut next = batch.walk(forest).unwrap_or_else(|| forest.clone());
    for node in root_inserts {
        if let Some(node) = batch.materialize(node) {
            next.push_back(node);
        }
    }
    next
}

struct Batch {
    removals: HashSet<CommentId>,
    child_inserts: HashMap<CommentId, Vec<Comment>>,
}

impl Batch {
    fn walk(&mut self, forest: &Forest) -> Option<Forest> {
        let mut changed = false;
        let mut next = Forest::new();

        for comment in forest.iter() {
            if self.removals.contains(&comment.id) {
                changed = true;
                continue;
            }
            let mut replies = self.walk(&comment.replies);
            if let Some(pending) = self.child_inserts.remove(&comment.id) {
                let mut extended = replies.unwrap_or_else(|| comment.replies.clone());
                for node in pending {
                    if let Some(node) = self.materialize(node) {
                        extended.push_back(node);
                    }
                }
                replies = Some(extended);
            }
            match replies {
                Some(replies) => {
                    changed = true;
                    let mut updated = comment.clone();
                    updated.replies = replies;
                    next.push_back(updated);
                }
                None => next.push_back(comment.clone()),
            }
        }

        if changed {
            Some(next)
        } else {
            None
        }
    }

    // Newly inserted nodes may themselves be parents of other batch inserts
    fn materialize(&mut self, mut node: Comment) -> Option<Comment> {
        if self.removals.contains(&node.id) {
            return None;
        }
        if let Some(replies) = self.walk(&node.replies) {
            node.replies = replies;
        }
        if let Some(pending) = self.child_inserts.remove(&node.id) {
            for child in pending {
                if let Some(child) = self.materialize(child) {
                    node.replies.push_back(child);
                }
            }
        }
        Some(node)
    }
}

pub fn find(forest: &Forest, node_id: CommentId) -> Option<&Comment> {
    for comment in forest.iter() {
        if comment.id == node_id {
            return Some(comment);
        }
        if let Some(found) = find(&comment.replies, node_id) {
            return Some(found);
        }
    }
    None
}

pub fn contains(forest: &Forest, node_id: CommentId) -> bool {
    find(forest, node_id).is_some()
}

/// Total number of comments at every depth
pub fn count_nodes(forest: &Forest) -> usize {
    forest
        .iter()
        .map(|comment| 1 + count_nodes(&comment.replies))
        .sum()
}

/// Check the structural invariants of a forest.
///
/// Root comments have no parent, every reply names the comment it sits
/// under, and no id appears twice anywhere in the tree.
pub fn is_well_formed(forest: &Forest) -> bool {
    fn check(forest: &Forest, parent: Option<CommentId>, seen: &mut HashSet<CommentId>) -> bool {
        forest.iter().all(|comment| {
            comment.parent_comment_id == parent
                && seen.insert(comment.id)
                && check(&comment.replies, Some(comment.id), seen)
        })
    }

    check(forest, None, &mut HashSet::new())
}
