//! Authoring, listing and taxonomy against the in-memory store.

use domains::status::*;
use domains::{Actor, CommentRepository, DomainError, NewComment, NewPost, PostOrdering, PostUpdate};
use integration_tests::World;
use services::{NewCategory, NewTag, PostQuery};
use tokio_test::assert_ok;

async fn taxonomy(world: &World, moderator: &Actor) {
    world
        .taxonomy
        .create_category(moderator, NewCategory { name: "Rust".into(), ..Default::default() })
        .await
        .unwrap();
    for name in ["Async", "Tokio"] {
        world.taxonomy.create_tag(moderator, NewTag { name: name.into(), slug: None }).await.unwrap();
    }
}

#[tokio::test]
async fn new_posts_are_drafts_with_derived_fields() {
    let world = World::new().await;
    let author = world.author().await;
    let input = NewPost {
        title: "Fearless Concurrency, Explained!".into(),
        content: "word ".repeat(450),
        ..Default::default()
    };

    let post = world.posts.create(&author, input).await.unwrap();
    assert_eq!(post.slug, "fearless-concurrency-explained");
    assert_eq!(world.status_of(&post), DRAFT);
    assert_eq!(post.published_at, None);
    assert_eq!(post.reading_time(), 2);
    assert!(post.excerpt.ends_with("..."));
}

#[tokio::test]
async fn drafts_are_invisible_to_everyone_but_owner_and_moderators() {
    let world = World::new().await;
    let author = world.author().await;
    let stranger = world.author().await;
    let moderator = world.moderator().await;
    let post = world.draft(&author).await;

    assert!(matches!(world.posts.get_by_slug(&post.slug, None).await, Err(DomainError::NotFound { .. })));
    assert!(world.posts.get_by_slug(&post.slug, Some(&stranger)).await.is_err());
    assert_ok!(world.posts.get_by_slug(&post.slug, Some(&author)).await);
    assert_ok!(world.posts.get_by_slug(&post.slug, Some(&moderator)).await);

    let public = world.posts.list(PostQuery::default(), None).await.unwrap();
    assert!(public.iter().all(|p| p.id != post.id));
}

#[tokio::test]
async fn listing_filters_by_category_and_tag() {
    let world = World::new().await;
    let author = world.author().await;
    let moderator = world.moderator().await;
    taxonomy(&world, &moderator).await;

    let tagged = world
        .posts
        .create(
            &author,
            NewPost {
                title: "Pinning futures".into(),
                content: "Pin<&mut Self> demystified".into(),
                category: Some("rust".into()),
                tags: vec!["async".into(), "tokio".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    world.publication.publish_now(tagged.id, &author).await.unwrap();
    world.published(&author).await;

    let by_tag = world
        .posts
        .list(PostQuery { tags: Some("tokio,nope".into()), ..Default::default() }, None)
        .await;
    assert!(matches!(by_tag, Err(DomainError::Validation(_))));

    let by_tag = world.posts.list(PostQuery { tags: Some("tokio".into()), ..Default::default() }, None).await.unwrap();
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].id, tagged.id);

    let in_category = world.taxonomy.posts_in_category("rust", None, None).await.unwrap();
    assert_eq!(in_category.len(), 1);
    let with_tag = world.taxonomy.posts_with_tag("async", None, None).await.unwrap();
    assert_eq!(with_tag[0].tags.len(), 2);
}

#[tokio::test]
async fn status_filters_beyond_publishing_need_a_moderator() {
    let world = World::new().await;
    let author = world.author().await;
    let moderator = world.moderator().await;
    let draft = world.draft(&author).await;

    let query = || PostQuery { status: Some(DRAFT.into()), ..Default::default() };
    assert!(matches!(world.posts.list(query(), Some(&author)).await, Err(DomainError::NotAuthorized(_))));
    let drafts = world.posts.list(query(), Some(&moderator)).await.unwrap();
    assert!(drafts.iter().any(|p| p.id == draft.id));

    let bogus = PostQuery { status: Some("bogus".into()), ..Default::default() };
    assert!(matches!(world.posts.list(bogus, Some(&moderator)).await, Err(DomainError::UnknownStatus(_))));
}

#[tokio::test]
async fn search_and_popularity_only_cover_visible_posts() {
    let world = World::new().await;
    let author = world.author().await;
    let moderator = world.moderator().await;

    let mut quiet = world.published(&author).await;
    quiet = world.posts.update(&quiet.slug, &author, PostUpdate { content: Some("borrow checker".into()), ..Default::default() }).await.unwrap();
    let busy = world.published(&author).await;
    let hidden = world.draft(&author).await;
    world.posts.update(&hidden.slug, &author, PostUpdate { content: Some("borrow checker".into()), ..Default::default() }).await.unwrap();

    for _ in 0..2 {
        let c = world.moderation.add_comment(busy.id, &author, NewComment { content: "+1".into(), parent_id: None }).await.unwrap();
        world.moderation.approve(c.id, &moderator, None).await.unwrap();
    }

    let found = world.posts.search("Borrow", None, None).await.unwrap();
    assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![quiet.id]);

    let popular = world.posts.popular(5).await.unwrap();
    assert_eq!(popular[0].id, busy.id);
    assert!(popular.iter().all(|p| p.id != hidden.id));
}

#[tokio::test]
async fn featured_lists_only_featured_posts() {
    let world = World::new().await;
    let author = world.author().await;
    let moderator = world.moderator().await;
    let star = world.published(&author).await;
    world.published(&author).await;

    world.publication.transition(star.id, FEATURED, &moderator).await.unwrap();
    let featured = world.posts.featured(5).await.unwrap();
    assert_eq!(featured.len(), 1);
    assert_eq!(featured[0].id, star.id);
}

#[tokio::test]
async fn slug_is_frozen_after_first_publication() {
    let world = World::new().await;
    let author = world.author().await;
    let draft = world.draft(&author).await;

    let renamed = world
        .posts
        .update(&draft.slug, &author, PostUpdate { slug: Some("renamed-draft".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(renamed.slug, "renamed-draft");

    world.publication.publish_now(renamed.id, &author).await.unwrap();
    world.publication.transition(renamed.id, DRAFT, &author).await.unwrap();
    let err = world
        .posts
        .update("renamed-draft", &author, PostUpdate { slug: Some("again".into()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn update_never_touches_status() {
    let world = World::new().await;
    let author = world.author().await;
    let post = world.published(&author).await;

    let updated = world
        .posts
        .update(&post.slug, &author, PostUpdate { title: Some("New title".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(updated.title, "New title");
    assert_eq!(updated.status_id, post.status_id);
    assert_eq!(updated.published_at, post.published_at);
}

#[tokio::test]
async fn hard_delete_cascades_to_comments() {
    let world = World::new().await;
    let author = world.author().await;
    let stranger = world.author().await;
    let post = world.published(&author).await;
    let comment = world.moderation.add_comment(post.id, &stranger, NewComment { content: "bye".into(), parent_id: None }).await.unwrap();

    assert!(matches!(world.posts.delete(&post.slug, &stranger).await, Err(DomainError::NotAuthorized(_))));
    assert_ok!(world.posts.delete(&post.slug, &author).await);
    assert!(world.store.get_comment(comment.id).await.unwrap().is_none());
    assert!(world.posts.get_by_slug(&post.slug, Some(&author)).await.is_err());
}

#[tokio::test]
async fn my_posts_skip_the_trash() {
    let world = World::new().await;
    let author = world.author().await;
    let kept = world.draft(&author).await;
    let binned = world.draft(&author).await;
    world.publication.transition(binned.id, TRASH, &author).await.unwrap();

    let mine = world.posts.my_posts(&author, None, None).await.unwrap();
    assert_eq!(mine.iter().map(|p| p.id).collect::<Vec<_>>(), vec![kept.id]);
}

#[tokio::test]
async fn own_posts_and_drafts_page_past_the_first_screen() {
    let world = World::new().await;
    let author = world.author().await;
    for _ in 0..5 {
        world.draft(&author).await;
    }

    assert_eq!(world.posts.my_posts(&author, Some(2), None).await.unwrap().len(), 2);
    assert_eq!(world.posts.my_posts(&author, Some(2), Some(4)).await.unwrap().len(), 1);
    assert_eq!(world.publication.drafts_for(author.id, Some(3), Some(3)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn non_latin_titles_still_get_a_slug() {
    let world = World::new().await;
    let author = world.author().await;

    let russian = world.posts.create(&author, NewPost { title: "Привет мир".into(), ..Default::default() }).await.unwrap();
    assert_eq!(russian.slug, "privet-mir");
    let accented = world.posts.create(&author, NewPost { title: "Ünïcode Café".into(), ..Default::default() }).await.unwrap();
    assert_eq!(accented.slug, "unicode-cafe");
    let symbols = world.posts.create(&author, NewPost { title: "???".into(), ..Default::default() }).await.unwrap();
    assert!(symbols.slug.starts_with("post-"));
    let more = world.posts.create(&author, NewPost { title: "!!!".into(), ..Default::default() }).await.unwrap();
    assert_ne!(symbols.slug, more.slug);
}

#[tokio::test]
async fn ordering_by_title() {
    let world = World::new().await;
    let author = world.author().await;
    for title in ["Zebra", "apple", "Mango"] {
        let post = world.posts.create(&author, NewPost { title: title.into(), ..Default::default() }).await.unwrap();
        world.publication.publish_now(post.id, &author).await.unwrap();
    }

    let posts = world.posts.list(PostQuery { ordering: PostOrdering::Title, ..Default::default() }, None).await.unwrap();
    let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["apple", "Mango", "Zebra"]);
}

#[tokio::test]
async fn deleting_a_category_uncategorizes_its_posts() {
    let world = World::new().await;
    let author = world.author().await;
    let moderator = world.moderator().await;
    taxonomy(&world, &moderator).await;
    let post = world
        .posts
        .create(&author, NewPost { title: "Categorized".into(), category: Some("rust".into()), ..Default::default() })
        .await
        .unwrap();
    assert!(post.category_id.is_some());

    assert!(matches!(world.taxonomy.delete_category(&author, "rust").await, Err(DomainError::NotAuthorized(_))));
    world.taxonomy.delete_category(&moderator, "rust").await.unwrap();
    let post = world.posts.get_by_slug(&post.slug, Some(&author)).await.unwrap();
    assert_eq!(post.category_id, None);
}
