//! Status transitions against the in-memory store.

use std::sync::Arc;

use domains::status::*;
use domains::{ContentStatus, DomainError, PostRepository, StatusRepository};
use integration_tests::World;
use tokio_test::assert_ok;
use uuid::Uuid;

#[tokio::test]
async fn first_publication_date_survives_republishing() {
    let world = World::new().await;
    let author = world.author().await;
    let post = world.published(&author).await;
    let first = post.published_at.expect("stamped on publish");

    let back = assert_ok!(world.publication.transition(post.id, DRAFT, &author).await);
    assert_eq!(back.published_at, Some(first));
    assert!(!world.publication.is_visible(&back));

    let again = assert_ok!(world.publication.publish_now(post.id, &author).await);
    assert_eq!(again.published_at, Some(first));
    assert!(world.publication.is_visible(&again));
}

#[tokio::test]
async fn refused_transition_leaves_post_untouched() {
    let world = World::new().await;
    let author = world.author().await;
    let moderator = world.moderator().await;
    let post = world.draft(&author).await;
    assert_ok!(world.publication.transition(post.id, TRASH, &author).await);

    let err = world.publication.transition(post.id, FEATURED, &moderator).await.unwrap_err();
    assert_eq!(err, DomainError::InvalidTransition { from: TRASH.into(), to: FEATURED.into() });

    let stored = world.posts.get_by_slug(&post.slug, Some(&author)).await.unwrap();
    assert_eq!(world.status_of(&stored), TRASH);
    assert_eq!(stored.published_at, None);
}

#[tokio::test]
async fn archiving_takes_a_moderator() {
    let world = World::new().await;
    let author = world.author().await;
    let moderator = world.moderator().await;
    let post = world.published(&author).await;

    let err = world.publication.transition(post.id, ARCHIVED, &author).await.unwrap_err();
    assert!(matches!(err, DomainError::NotAuthorized(_)));

    let archived = assert_ok!(world.publication.transition(post.id, ARCHIVED, &moderator).await);
    assert_eq!(world.status_of(&archived), ARCHIVED);
    assert!(archived.published_at.is_some());
}

#[tokio::test]
async fn strangers_cannot_move_other_peoples_posts() {
    let world = World::new().await;
    let author = world.author().await;
    let stranger = world.author().await;
    let post = world.draft(&author).await;

    let err = world.publication.publish_now(post.id, &stranger).await.unwrap_err();
    assert!(matches!(err, DomainError::NotAuthorized(_)));
}

#[tokio::test]
async fn bogus_status_is_unknown_and_changes_nothing() {
    let world = World::new().await;
    let author = world.author().await;
    let post = world.draft(&author).await;

    let err = world.publication.transition(post.id, "bogus-status", &author).await.unwrap_err();
    assert_eq!(err, DomainError::UnknownStatus("bogus-status".into()));

    let missing = world.publication.transition(Uuid::now_v7(), DRAFT, &author).await.unwrap_err();
    assert!(matches!(missing, DomainError::NotFound { entity: "post", .. }));
}

#[tokio::test]
async fn deactivated_status_is_refused_after_reload() {
    let world = World::new().await;
    let author = world.author().await;
    let post = world.draft(&author).await;

    let mut scheduled: ContentStatus = world.catalog.snapshot().get(SCHEDULED).cloned().unwrap();
    scheduled.is_active = false;
    world.store.upsert_status(scheduled).await.unwrap();
    assert_eq!(world.publication.reload_catalog().await.unwrap(), 10);

    let err = world.publication.transition(post.id, SCHEDULED, &author).await.unwrap_err();
    assert_eq!(err, DomainError::UnknownStatus(SCHEDULED.into()));
}

#[tokio::test]
async fn concurrent_transitions_have_one_winner() {
    let world = Arc::new(World::new().await);
    let author = world.author().await;
    let post_id = world.draft(&author).await.id;

    // no move exists between review and trash for an author, so only one
    // task can ever succeed: the one that wins the draft compare-and-set
    let targets = [REVIEW, TRASH, REVIEW, TRASH, REVIEW, TRASH];
    let handles: Vec<_> = targets
        .into_iter()
        .map(|target| {
            let world = world.clone();
            tokio::spawn(async move { (target, world.publication.transition(post_id, target, &author).await) })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            (target, Ok(post)) => winners.push((target, post)),
            (_, Err(DomainError::Conflict(_))) | (_, Err(DomainError::InvalidTransition { .. })) => {}
            (_, Err(other)) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners.len(), 1);

    let (target, returned) = &winners[0];
    let stored = world.store.get_post(post_id).await.unwrap().unwrap();
    assert_eq!(world.status_of(&stored), *target);
    assert_eq!(stored.status_id, returned.status_id);
    assert_eq!(stored.published_at, None);
}

#[tokio::test]
async fn racing_publication_always_stamps_published_at() {
    let world = Arc::new(World::new().await);
    let author = world.author().await;

    for _ in 0..10 {
        let post_id = world.draft(&author).await.id;
        let handles: Vec<_> = [PUBLISHED, PRIVATE, PUBLISHED, PRIVATE]
            .into_iter()
            .map(|target| {
                let world = world.clone();
                tokio::spawn(async move { (target, world.publication.transition(post_id, target, &author).await) })
            })
            .collect();

        let mut published_once = false;
        for handle in handles {
            let (target, result) = handle.await.unwrap();
            match result {
                Ok(post) if target == PUBLISHED => {
                    assert!(post.published_at.is_some());
                    published_once = true;
                }
                Ok(_) => {}
                Err(DomainError::Conflict(_)) | Err(DomainError::InvalidTransition { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let stored = world.store.get_post(post_id).await.unwrap().unwrap();
        if world.publication.is_visible(&stored) {
            assert!(stored.published_at.is_some());
        }
        assert_eq!(stored.published_at.is_some(), published_once);
    }
}

#[tokio::test]
async fn store_compare_and_set_admits_one_writer() {
    let world = Arc::new(World::new().await);
    let author = world.author().await;
    let post_id = world.draft(&author).await.id;
    let draft = world.status_id(DRAFT);

    let handles: Vec<_> = [PENDING, PRIVATE, SCHEDULED, TRASH, REVIEW, PUBLISHED]
        .into_iter()
        .map(|target| {
            let world = world.clone();
            let target = world.status_id(target);
            tokio::spawn(async move { world.store.transition_status(post_id, draft, target, None).await })
        })
        .collect();

    let mut applied = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn drafts_list_only_work_in_progress() {
    let world = World::new().await;
    let author = world.author().await;
    let draft = world.draft(&author).await;
    let pending = world.draft(&author).await;
    assert_ok!(world.publication.transition(pending.id, PENDING, &author).await);
    world.published(&author).await;

    let mut ids: Vec<_> = world.publication.drafts_for(author.id, None, None).await.unwrap().into_iter().map(|p| p.id).collect();
    ids.sort();
    let mut expected = vec![draft.id, pending.id];
    expected.sort();
    assert_eq!(ids, expected);
}
