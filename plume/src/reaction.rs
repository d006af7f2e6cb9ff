use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use plume_types::{Post, PostId, ReactionOutcome, ReactionType};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Apply a confirmed toggle to a post.
///
/// The count moves by at most one and never below zero. The delta is taken
/// against the post as it is now, not as it was when the toggle was issued.
pub fn apply_outcome(post: &Post, outcome: ReactionOutcome) -> Post {
    let mut next = post.clone();
    match (post.liked, outcome.reacted) {
        (false, true) => next.likes_count = post.likes_count.saturating_add(1),
        (true, false) => next.likes_count = post.likes_count.saturating_sub(1),
        // Switching reaction type or a repeated confirmation: count stays
        _ => {}
    }
    next.liked = outcome.reacted;
    next.current_reaction = outcome.reacted.then_some(outcome.reaction_type);
    next
}

/// Stamp the viewer's reaction status onto a freshly fetched post
pub fn decorate(post: &Post, reaction: Option<ReactionType>) -> Post {
    let mut next = post.clone();
    next.liked = reaction.is_some();
    next.current_reaction = reaction;
    next
}

/// Serializes reaction toggles per post id.
///
/// Each post has one slot; a toggle holds it from the gateway call until its
/// result has been applied, and later toggles on that post queue behind it in
/// issue order. Slots for posts with nothing queued are dropped.
#[derive(Default)]
pub struct ReactionSequencer {
    slots: Mutex<HashMap<PostId, Arc<AsyncMutex<()>>>>,
}

impl ReactionSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for this post's slot.
    ///
    /// Dropping the returned future while it waits leaves no slot behind.
    pub async fn acquire(&self, post_id: PostId) -> ToggleTicket<'_> {
        let slot = {
            let mut slots = self.slots();
            slots.entry(post_id).or_default().clone()
        };
        let mut ticket = ToggleTicket {
            sequencer: self,
            post_id,
            guard: None,
        };
        ticket.guard = Some(slot.lock_owned().await);
        ticket
    }

    /// Whether any toggle on this post is running or queued
    pub fn is_busy(&self, post_id: PostId) -> bool {
        self.slots().contains_key(&post_id)
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<PostId, Arc<AsyncMutex<()>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Called after the caller dropped its own reference to the slot
    fn release(&self, post_id: PostId) {
        let mut slots = self.slots();
        let idle = slots
            .get(&post_id)
            .map_or(false, |slot| Arc::strong_count(slot) == 1);
        if idle {
            slots.remove(&post_id);
        }
    }
}

/// Hold on one post's toggle slot; `guard` is None only while still waiting
pub struct ToggleTicket<'a> {
    sequencer: &'a ReactionSequencer,
    post_id: PostId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ToggleTicket<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.sequencer.release(self.post_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use plume_types::{Forest, UserSummary, Visibility};
    use std::time::Duration;
    use uuid::Uuid;

    fn post(likes: u32, liked: bool) -> Post {
        Post {
            id: Uuid::from_u128(1),
            author: UserSummary {
                id: Uuid::from_u128(2),
                display_name: "lin".to_string(),
                avatar_url: None,
            },
            content: None,
            media: vec![],
            visibility: Visibility::Public,
            created_at: Utc::now(),
            likes_count: likes,
            comments_count: 0,
            liked,
            current_reaction: liked.then_some(ReactionType::Like),
            comments: Forest::new(),
            is_owner: false,
        }
    }

    fn outcome(reacted: bool, reaction_type: ReactionType) -> ReactionOutcome {
        ReactionOutcome {
            reacted,
            reaction_type,
        }
    }

    #[test]
    fn test_toggle_round_trip() {
        let start = post(3, false);

        let on = apply_outcome(&start, outcome(true, ReactionType::Like));
        assert_eq!(on.likes_count, 4);
        assert!(on.liked);
        assert_eq!(on.current_reaction, Some(ReactionType::Like));

        let off = apply_outcome(&on, outcome(false, ReactionType::Like));
        assert_eq!(off.likes_count, 3);
        assert!(!off.liked);
        assert_eq!(off.current_reaction, None);
    }

    #[test]
    fn test_switching_reaction_type_keeps_count() {
        let liked = post(10, true);
        let loved = apply_outcome(&liked, outcome(true, ReactionType::Love));

        assert_eq!(loved.likes_count, 10);
        assert_eq!(loved.current_reaction, Some(ReactionType::Love));
    }

    #[test]
    fn test_count_never_goes_negative() {
        let inconsistent = post(0, true);
        let off = apply_outcome(&inconsistent, outcome(false, ReactionType::Like));

        assert_eq!(off.likes_count, 0);
        assert!(!off.liked);
    }

    #[test]
    fn test_decorate_sets_flags_only() {
        let fetched = post(7, false);
        let decorated = decorate(&fetched, Some(ReactionType::Wow));

        assert!(decorated.liked);
        assert_eq!(decorated.current_reaction, Some(ReactionType::Wow));
        assert_eq!(decorated.likes_count, 7);
    }

    #[tokio::test]
    async fn test_sequencer_serializes_same_post() {
        let sequencer = Arc::new(ReactionSequencer::new());
        let post_id = Uuid::from_u128(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = sequencer.acquire(post_id).await;

        let waiter = {
            let sequencer = sequencer.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let _ticket = sequencer.acquire(post_id).await;
                order.lock().unwrap().push("second");
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        order.lock().unwrap().push("first");
        drop(first);

        waiter.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        assert!(!sequencer.is_busy(post_id));
    }

    #[tokio::test]
    async fn test_sequencer_does_not_block_other_posts() {
        let sequencer = ReactionSequencer::new();
        let _a = sequencer.acquire(Uuid::from_u128(1)).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            sequencer.acquire(Uuid::from_u128(2)),
        )
        .await;

        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_abandoned_waiter_leaves_no_slot() {
        let sequencer = ReactionSequencer::new();
        let post_id = Uuid::from_u128(1);
        let holder = sequencer.acquire(post_id).await;

        let waited =
            tokio::time::timeout(Duration::from_millis(20), sequencer.acquire(post_id)).await;
        assert!(waited.is_err());
        assert!(sequencer.is_busy(post_id));

        drop(holder);
        assert!(!sequencer.is_busy(post_id));
    }

    #[tokio::test]
    async fn test_waiter_abandoned_after_holder_released() {
        let sequencer = Arc::new(ReactionSequencer::new());
        let post_id = Uuid::from_u128(1);
        let holder = sequencer.acquire(post_id).await;

        let waiter = {
            let sequencer = sequencer.clone();
            tokio::spawn(async move {
                let _ticket = sequencer.acquire(post_id).await;
                std::future::pending::<()>().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(holder);
        // The waiter took the slot, so it stays tracked until the waiter goes away
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sequencer.is_busy(post_id));

        waiter.abort();
        let _ = waiter.await;
        assert!(!sequencer.is_busy(post_id));
    }
}
