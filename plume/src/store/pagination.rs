use std::collections::HashSet;

use im::Vector;
use plume_types::{Post, PostId};

/// Append `incoming` after `existing`, skipping ids already known.
///
/// The set of known ids is built once per merge. Prior order is kept and new
/// posts follow in the order the gateway returned them; an id repeated within
/// the page itself is also taken only once.
pub fn merge_page(existing: &Vector<Post>, incoming: Vec<Post>) -> Vector<Post> {
    let mut known: HashSet<PostId> = existing.iter().map(|post| post.id).collect();
    let mut merged = existing.clone();
    merged.extend(incoming.into_iter().filter(|post| known.insert(post.id)));
    merged
}

/// Build a fresh list from a page, keeping the first occurrence of each id
pub fn replace_with_page(incoming: Vec<Post>) -> Vector<Post> {
    merge_page(&Vector::new(), incoming)
}
