use plume_types::{Post, PostId};

use super::state::{FeedSnapshot, ModalKind};
use super::StoreError;

/// Point the selection at `post` if it already targets that id
pub(crate) fn sync_entry(snapshot: &mut FeedSnapshot, post: &Post) {
    if snapshot.selected_post.as_ref().map(|selected| selected.id) == Some(post.id) {
        snapshot.selected_post = Some(post.clone());
    }
}

/// Refresh the selection from the list after a bulk change such as a page load
pub(crate) fn resync_from_list(snapshot: &mut FeedSnapshot) {
    let refreshed = snapshot
        .selected_post
        .as_ref()
        .and_then(|selected| snapshot.post(selected.id))
        .cloned();
    if let Some(post) = refreshed {
        snapshot.selected_post = Some(post);
    }
}

/// Drop the selection and its modal when the selected post is gone
pub(crate) fn clear_if_targets(snapshot: &mut FeedSnapshot, id: PostId) -> bool {
    if snapshot.selected_post.as_ref().map(|selected| selected.id) == Some(id) {
        snapshot.selected_post = None;
        snapshot.open_modal = None;
        true
    } else {
        false
    }
}

/// CLOSED -> OPEN(kind, post), or OPEN(kind, a) -> OPEN(kind, b).
///
/// At most one modal kind is open at a time. The list entry is preferred over
/// the caller's copy so a stale post handed in by a view does not win.
pub(crate) fn open(
    snapshot: &mut FeedSnapshot,
    kind: ModalKind,
    post: Option<Post>,
) -> Result<(), StoreError> {
    if let Some(open) = snapshot.open_modal {
        if open != kind {
            return Err(StoreError::ModalConflict {
                open,
                requested: kind,
            });
        }
    }
    if kind.needs_post() && post.is_none() {
        return Err(StoreError::SelectionRequired(kind));
    }

    let selected = post.map(|post| snapshot.post(post.id).cloned().unwrap_or(post));
    snapshot.open_modal = Some(kind);
    snapshot.selected_post = selected;
    Ok(())
}

/// OPEN(kind, _) -> CLOSED. Closing a kind that is not open changes nothing.
pub(crate) fn close(snapshot: &mut FeedSnapshot, kind: ModalKind) -> bool {
    if snapshot.open_modal != Some(kind) {
        return false;
    }
    snapshot.open_modal = None;
    snapshot.selected_post = None;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use plume_types::{Forest, UserSummary, Visibility};
    use uuid::Uuid;

    fn post(id: u128, content: &str) -> Post {
        Post {
            id: Uuid::from_u128(id),
            author: UserSummary {
                id: Uuid::from_u128(77),
                display_name: "sam".to_string(),
                avatar_url: None,
            },
            content: Some(content.to_string()),
            media: vec![],
            visibility: Visibility::Public,
            created_at: Utc::now(),
            likes_count: 0,
            comments_count: 0,
            liked: false,
            current_reaction: None,
            comments: Forest::new(),
            is_owner: true,
        }
    }

    fn snapshot_with(posts: Vec<Post>) -> FeedSnapshot {
        FeedSnapshot {
            posts: posts.into_iter().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_prefers_list_entry() {
        let mut snapshot = snapshot_with(vec![post(5, "fresh")]);
        open(&mut snapshot, ModalKind::Edit, Some(post(5, "stale"))).unwrap();

        assert_eq!(snapshot.open_modal, Some(ModalKind::Edit));
        assert_eq!(
            snapshot.selected_post.unwrap().content.as_deref(),
            Some("fresh")
        );
    }

    #[test]
    fn test_second_kind_is_rejected_while_open() {
        let mut snapshot = snapshot_with(vec![post(1, "a")]);
        open(&mut snapshot, ModalKind::Comments, Some(post(1, "a"))).unwrap();

        let result = open(&mut snapshot, ModalKind::Delete, Some(post(1, "a")));
        assert!(matches!(
            result,
            Err(StoreError::ModalConflict {
                open: ModalKind::Comments,
                requested: ModalKind::Delete
            })
        ));
        assert_eq!(snapshot.open_modal, Some(ModalKind::Comments));
    }

    #[test]
    fn test_reopening_same_kind_retargets() {
        let mut snapshot = snapshot_with(vec![post(1, "a"), post(2, "b")]);
        open(&mut snapshot, ModalKind::Reactions, Some(post(1, "a"))).unwrap();
        open(&mut snapshot, ModalKind::Reactions, Some(post(2, "b"))).unwrap();

        assert_eq!(snapshot.selected_post.unwrap().id, Uuid::from_u128(2));
    }

    #[test]
    fn test_edit_needs_a_post_but_create_does_not() {
        let mut snapshot = FeedSnapshot::default();
        assert!(matches!(
            open(&mut snapshot, ModalKind::Edit, None),
            Err(StoreError::SelectionRequired(ModalKind::Edit))
        ));
        open(&mut snapshot, ModalKind::Create, None).unwrap();
        assert_eq!(snapshot.open_modal, Some(ModalKind::Create));
        assert!(snapshot.selected_post.is_none());
    }

    #[test]
    fn test_close_other_kind_is_noop() {
        let mut snapshot = snapshot_with(vec![post(1, "a")]);
        open(&mut snapshot, ModalKind::Edit, Some(post(1, "a"))).unwrap();

        assert!(!close(&mut snapshot, ModalKind::Delete));
        assert!(snapshot.selected_post.is_some());
        assert!(close(&mut snapshot, ModalKind::Edit));
        assert!(snapshot.selected_post.is_none());
        assert_eq!(snapshot.open_modal, None);
    }

    #[test]
    fn test_sync_entry_ignores_other_ids() {
        let mut snapshot = snapshot_with(vec![post(1, "a")]);
        open(&mut snapshot, ModalKind::Edit, Some(post(1, "a"))).unwrap();

        sync_entry(&mut snapshot, &post(2, "other"));
        assert_eq!(snapshot.selected_post.as_ref().unwrap().id, Uuid::from_u128(1));

        sync_entry(&mut snapshot, &post(1, "b"));
        assert_eq!(
            snapshot.selected_post.unwrap().content.as_deref(),
            Some("b")
        );
    }

    #[test]
    fn test_resync_keeps_selection_when_entry_left_list() {
        let mut snapshot = snapshot_with(vec![post(1, "a")]);
        open(&mut snapshot, ModalKind::Comments, Some(post(1, "a"))).unwrap();
        snapshot.posts = snapshot_with(vec![post(2, "b")]).posts;

        resync_from_list(&mut snapshot);
        assert_eq!(snapshot.selected_post.unwrap().id, Uuid::from_u128(1));
    }
}
