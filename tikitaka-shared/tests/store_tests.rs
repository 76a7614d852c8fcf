/// Integration tests for the stores
///
/// Run with: cargo test --test store_tests -- --ignored

mod common;

use futures::future::join_all;
use tikitaka_shared::db::clock;
use tikitaka_shared::error::StoreError;
use tikitaka_shared::models::comment::CommentKind;
use tikitaka_shared::models::question::QuestionKind;
use uuid::Uuid;

// ---- users ----

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_user_lifecycle() {
    let (_, stores) = common::setup().await;

    let data = common::new_user("alice");
    let user = stores.users.create(data.clone()).await.unwrap();
    assert_eq!(user.external_id, data.external_id);
    assert!(!user.is_deleted);

    let duplicate = stores.users.create(data.clone()).await;
    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

    let mut profile = data.profile.clone();
    profile.follower_count = 99;
    let updated = stores.users.update(&data.external_id, profile).await.unwrap();
    assert_eq!(updated.id, user.id);
    assert_eq!(updated.follower_count, 99);

    stores.users.delete(user.id).await.unwrap();

    assert!(matches!(stores.users.get(user.id).await, Err(StoreError::Gone("user"))));
    assert!(matches!(
        stores.users.delete(user.id).await,
        Err(StoreError::AlreadyDeleted("user"))
    ));
    assert!(matches!(
        stores.users.update(&data.external_id, data.profile.clone()).await,
        Err(StoreError::NotFound("user"))
    ));
    assert!(matches!(
        stores.users.get(Uuid::new_v4()).await,
        Err(StoreError::NotFound("user"))
    ));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_link_profile_creates_updates_and_revives() {
    let (_, stores) = common::setup().await;
    let data = common::new_user("bob");

    let created = stores.users.link_profile(data.clone()).await.unwrap();

    let mut relinked = data.clone();
    relinked.profile.username = Some("bobby".to_string());
    let updated = stores.users.link_profile(relinked.clone()).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.username.as_deref(), Some("bobby"));

    stores.users.delete(created.id).await.unwrap();

    let revived = stores.users.link_profile(relinked).await.unwrap();
    assert_eq!(revived.id, created.id);
    assert!(!revived.is_deleted);
    assert!(stores.users.get(created.id).await.is_ok());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_user_delete_cascades_to_questions() {
    let (pool, stores) = common::setup().await;
    let user = common::create_user(&stores, "carol").await;

    let first = stores
        .questions
        .create(user.id, "normal", "text", "First?")
        .await
        .unwrap();
    let second = stores
        .questions
        .create(user.id, "challenge", "audio", "Second?")
        .await
        .unwrap();
    let options = vec!["A".to_string(), "B".to_string()];
    let (vote, _) = stores
        .votes
        .create_vote_question(user.id, "Third?", &options)
        .await
        .unwrap();

    stores.questions.soft_delete(first.id).await.unwrap();
    let first_deleted_at = common::reload(&pool, first.id).await.updated_at;

    let cascaded = stores.users.delete(user.id).await.unwrap();
    assert_eq!(cascaded, 2);

    for id in [first.id, second.id, vote.id] {
        assert!(common::reload(&pool, id).await.is_deleted);
    }
    // already-deleted questions are left as they were
    assert_eq!(common::reload(&pool, first.id).await.updated_at, first_deleted_at);
}

// ---- questions ----

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_question_create_validation() {
    let (_, stores) = common::setup().await;
    let user = common::create_user(&stores, "dave").await;

    assert!(matches!(
        stores.questions.create(user.id, "poll", "text", "Hi?").await,
        Err(StoreError::UnsupportedType(_))
    ));
    assert!(matches!(
        stores.questions.create(user.id, "vote", "text", "Hi?").await,
        Err(StoreError::UnsupportedType(_))
    ));
    assert!(matches!(
        stores.questions.create(user.id, "normal", "video", "Hi?").await,
        Err(StoreError::UnsupportedType(_))
    ));
    assert!(matches!(
        stores.questions.create(user.id, "normal", "text", &"q".repeat(41)).await,
        Err(StoreError::LengthExceeded { limit: 40, .. })
    ));
    assert!(matches!(
        stores.questions.create(Uuid::new_v4(), "normal", "text", "Hi?").await,
        Err(StoreError::NotFound("user"))
    ));

    let ok = stores
        .questions
        .create(user.id, "normal", "either", &"q".repeat(40))
        .await
        .unwrap();
    assert_eq!(ok.kind, QuestionKind::Normal);
    assert!(ok.is_live());

    stores.users.delete(user.id).await.unwrap();
    assert!(matches!(
        stores.questions.create(user.id, "normal", "text", "Hi?").await,
        Err(StoreError::Gone("user"))
    ));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_get_live_expires_after_window() {
    let (pool, stores) = common::setup().await;
    let user = common::create_user(&stores, "erin").await;

    let question = stores
        .questions
        .create(user.id, "normal", "text", "Still here?")
        .await
        .unwrap();
    assert!(stores.questions.get_live(question.id).await.is_ok());

    common::backdate(&pool, question.id, 25).await;
    assert!(!common::reload(&pool, question.id).await.expired);

    assert!(matches!(
        stores.questions.get_live(question.id).await,
        Err(StoreError::Expired)
    ));
    assert!(common::reload(&pool, question.id).await.expired);

    // stays expired
    assert!(matches!(
        stores.questions.get_live(question.id).await,
        Err(StoreError::Expired)
    ));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_question_just_inside_window_is_live() {
    let (pool, stores) = common::setup().await;
    let user = common::create_user(&stores, "frank").await;

    let question = stores
        .questions
        .create(user.id, "challenge", "text", "Close call")
        .await
        .unwrap();
    common::backdate(&pool, question.id, 23).await;

    assert!(stores.questions.get_live(question.id).await.is_ok());
    assert!(!common::reload(&pool, question.id).await.expired);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_window_edge_measured_on_database_clock() {
    let (pool, stores) = common::setup().await;
    let user = common::create_user(&stores, "fern").await;

    let question = stores
        .questions
        .create(user.id, "normal", "either", "Edge?")
        .await
        .unwrap();
    let db_now = clock::now(&pool).await.unwrap();
    assert!(db_now >= question.created_at);

    common::backdate_minutes(&pool, question.id, 24 * 60 - 1).await;
    assert!(stores.questions.get_live(question.id).await.is_ok());
    assert_eq!(stores.questions.list_live_by_user(user.id, false).await.unwrap().len(), 1);

    common::backdate_minutes(&pool, question.id, 24 * 60 + 1).await;
    assert!(stores.questions.list_live_by_user(user.id, false).await.unwrap().is_empty());
    assert!(common::reload(&pool, question.id).await.expired);
    assert!(matches!(
        stores.questions.get_live(question.id).await,
        Err(StoreError::Expired)
    ));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_get_live_on_deleted_and_missing() {
    let (_, stores) = common::setup().await;
    let user = common::create_user(&stores, "gina").await;

    let question = stores
        .questions
        .create(user.id, "normal", "text", "Bye?")
        .await
        .unwrap();
    stores.questions.soft_delete(question.id).await.unwrap();

    assert!(matches!(
        stores.questions.get_live(question.id).await,
        Err(StoreError::Gone("question"))
    ));
    assert!(matches!(
        stores.questions.soft_delete(question.id).await,
        Err(StoreError::AlreadyDeleted("question"))
    ));
    assert!(matches!(
        stores.questions.get_live(Uuid::new_v4()).await,
        Err(StoreError::NotFound("question"))
    ));
    assert!(matches!(
        stores.questions.soft_delete(Uuid::new_v4()).await,
        Err(StoreError::NotFound("question"))
    ));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_live_listing_flips_and_history_does_not() {
    let (pool, stores) = common::setup().await;
    let user = common::create_user(&stores, "hank").await;

    let fresh = stores
        .questions
        .create(user.id, "normal", "text", "Fresh")
        .await
        .unwrap();
    let stale = stores
        .questions
        .create(user.id, "normal", "text", "Stale")
        .await
        .unwrap();
    let history_only = stores
        .questions
        .create(user.id, "challenge", "audio", "Old")
        .await
        .unwrap();
    let options = vec!["Yes".to_string(), "No".to_string()];
    let (vote, _) = stores
        .votes
        .create_vote_question(user.id, "Vote?", &options)
        .await
        .unwrap();

    common::backdate(&pool, history_only.id, 48).await;

    // history reports the stale question without flipping it
    let expired = stores.questions.list_expired_by_user(user.id).await.unwrap();
    assert_eq!(expired.iter().map(|q| q.id).collect::<Vec<_>>(), vec![history_only.id]);
    assert!(!common::reload(&pool, history_only.id).await.expired);

    common::backdate(&pool, stale.id, 25).await;

    let live = stores.questions.list_live_by_user(user.id, false).await.unwrap();
    assert_eq!(live.iter().map(|q| q.id).collect::<Vec<_>>(), vec![fresh.id]);
    assert!(common::reload(&pool, stale.id).await.expired);
    assert!(common::reload(&pool, history_only.id).await.expired);

    let live_votes = stores.questions.list_live_by_user(user.id, true).await.unwrap();
    assert_eq!(live_votes.iter().map(|q| q.id).collect::<Vec<_>>(), vec![vote.id]);

    let all = stores.questions.list_by_user(user.id).await.unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_random_live_only_returns_live_questions_of_kind() {
    let (pool, stores) = common::setup().await;
    let user = common::create_user(&stores, "ivy").await;

    let question = stores
        .questions
        .create(user.id, "challenge", "either", "Random?")
        .await
        .unwrap();

    let picked = stores
        .questions
        .random_live(QuestionKind::Challenge)
        .await
        .unwrap()
        .expect("a live challenge question exists");
    assert_eq!(picked.kind, QuestionKind::Challenge);
    assert!(picked.is_live());

    common::backdate(&pool, question.id, 30).await;
    stores.questions.soft_delete(question.id).await.unwrap();

    if let Some(other) = stores.questions.random_live(QuestionKind::Challenge).await.unwrap() {
        assert_ne!(other.id, question.id);
    }
}

// ---- votes ----

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_vote_flow() {
    let (_, stores) = common::setup().await;
    let user = common::create_user(&stores, "jack").await;

    let options = vec!["Pizza".to_string(), "Sushi".to_string()];
    let (question, created) = stores
        .votes
        .create_vote_question(user.id, "Lunch?", &options)
        .await
        .unwrap();

    assert_eq!(question.kind, QuestionKind::Vote);
    assert_eq!(question.comment_policy, None);
    assert_eq!(created.iter().map(|o| o.position).collect::<Vec<_>>(), vec![1, 2]);
    assert!(created.iter().all(|o| o.tally == 0));

    let pizza = created[0].id;
    let sushi = created[1].id;
    stores.votes.increment(pizza).await.unwrap();
    stores.votes.increment(pizza).await.unwrap();
    let last = stores.votes.increment(sushi).await.unwrap();

    let result = stores.votes.result(question.id).await.unwrap();
    assert_eq!(result.options, vec!["Pizza", "Sushi"]);
    assert_eq!(result.tallies, vec![2, 1]);
    assert_eq!(result.created_at, question.created_at);
    assert_eq!(result.updated_at, last.updated_at);

    let listed = stores.votes.options(question.id).await.unwrap();
    assert_eq!(listed.iter().map(|o| o.tally).collect::<Vec<_>>(), vec![2, 1]);

    let for_user = stores.votes.results_for_user(user.id).await.unwrap();
    assert_eq!(for_user, vec![result]);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_vote_option_count_is_enforced() {
    let (_, stores) = common::setup().await;
    let user = common::create_user(&stores, "kate").await;

    for count in [1usize, 5] {
        let options: Vec<String> = (0..count).map(|i| format!("opt{}", i)).collect();
        let result = stores
            .votes
            .create_vote_question(user.id, "Which?", &options)
            .await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidOptionCount { count: c, .. }) if c == count
        ));
    }

    // nothing was written
    assert!(stores.questions.list_by_user(user.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_concurrent_votes_are_not_lost() {
    let (_, stores) = common::setup().await;
    let user = common::create_user(&stores, "liam").await;

    let options = vec!["Tea".to_string(), "Coffee".to_string()];
    let (question, created) = stores
        .votes
        .create_vote_question(user.id, "Drink?", &options)
        .await
        .unwrap();
    let tea = created[0].id;

    let votes = (0..50).map(|_| {
        let store = stores.votes.clone();
        async move { store.increment(tea).await }
    });
    for result in join_all(votes).await {
        result.unwrap();
    }

    let result = stores.votes.result(question.id).await.unwrap();
    assert_eq!(result.tallies, vec![50, 0]);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_vote_lookups_not_found() {
    let (_, stores) = common::setup().await;
    let user = common::create_user(&stores, "mia").await;

    assert!(matches!(
        stores.votes.increment(Uuid::new_v4()).await,
        Err(StoreError::NotFound("vote option"))
    ));
    assert!(matches!(
        stores.votes.result(Uuid::new_v4()).await,
        Err(StoreError::NotFound("question"))
    ));

    let normal = stores
        .questions
        .create(user.id, "normal", "text", "Not a vote")
        .await
        .unwrap();
    assert!(matches!(
        stores.votes.result(normal.id).await,
        Err(StoreError::NotFound("vote question"))
    ));
}

// ---- comments ----

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_text_comments_follow_policy() {
    let (_, stores) = common::setup().await;
    let user = common::create_user(&stores, "nina").await;

    let audio_only = stores
        .questions
        .create(user.id, "normal", "audio", "Sing it")
        .await
        .unwrap();
    assert!(matches!(
        stores.comments.create_text(audio_only.id, "hello").await,
        Err(StoreError::UnsupportedCommentType(CommentKind::Text))
    ));

    let options = vec!["A".to_string(), "B".to_string()];
    let (vote, _) = stores
        .votes
        .create_vote_question(user.id, "Pick", &options)
        .await
        .unwrap();
    assert!(matches!(
        stores.comments.create_text(vote.id, "hello").await,
        Err(StoreError::UnsupportedCommentType(CommentKind::Text))
    ));

    let text = stores
        .questions
        .create(user.id, "normal", "text", "Say it")
        .await
        .unwrap();
    assert!(matches!(
        stores.comments.create_text(text.id, &"c".repeat(101)).await,
        Err(StoreError::LengthExceeded { limit: 100, .. })
    ));

    let first = stores.comments.create_text(text.id, "one").await.unwrap();
    let second = stores.comments.create_text(text.id, "two").await.unwrap();
    assert_eq!(first.kind, CommentKind::Text);

    let listed = stores.comments.list_by_question(text.id).await.unwrap();
    assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![first.id, second.id]);

    assert!(matches!(
        stores.comments.list_by_question(Uuid::new_v4()).await,
        Err(StoreError::NotFound("question"))
    ));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_text_comment_on_expired_question() {
    let (pool, stores) = common::setup().await;
    let user = common::create_user(&stores, "omar").await;

    let question = stores
        .questions
        .create(user.id, "normal", "either", "Late?")
        .await
        .unwrap();
    common::backdate(&pool, question.id, 25).await;

    assert!(matches!(
        stores.comments.create_text(question.id, "too late").await,
        Err(StoreError::Expired)
    ));
    assert!(common::reload(&pool, question.id).await.expired);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_audio_placeholder_and_finalize() {
    let (_, stores) = common::setup().await;
    let user = common::create_user(&stores, "pia").await;

    let text_only = stores
        .questions
        .create(user.id, "normal", "text", "Text only")
        .await
        .unwrap();
    assert!(matches!(
        stores.comments.create_audio_placeholder(text_only.id).await,
        Err(StoreError::UnsupportedCommentType(CommentKind::Audio))
    ));
    assert!(matches!(
        stores.comments.create_audio_placeholder(Uuid::new_v4()).await,
        Err(StoreError::NotFound("question"))
    ));

    let question = stores
        .questions
        .create(user.id, "normal", "audio", "Voice")
        .await
        .unwrap();
    let placeholder = stores.comments.create_audio_placeholder(question.id).await.unwrap();
    assert!(placeholder.is_placeholder());

    // placeholders are hidden from the per-user inbox until finalized
    let inbox = stores.comments.list_for_user(user.id, CommentKind::Audio).await.unwrap();
    assert!(inbox.is_empty());

    let finalized = stores
        .comments
        .finalize_audio(placeholder.id, "https://bucket.example/first")
        .await
        .unwrap()
        .expect("placeholder exists");
    assert_eq!(finalized.content, "https://bucket.example/first");

    // a finalized comment is never rewritten
    let again = stores
        .comments
        .finalize_audio(placeholder.id, "https://bucket.example/second")
        .await
        .unwrap()
        .expect("comment exists");
    assert_eq!(again.content, "https://bucket.example/first");

    let inbox = stores.comments.list_for_user(user.id, CommentKind::Audio).await.unwrap();
    assert_eq!(inbox.iter().map(|c| c.id).collect::<Vec<_>>(), vec![placeholder.id]);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_finalize_after_delete_is_noop() {
    let (_, stores) = common::setup().await;
    let user = common::create_user(&stores, "quinn").await;

    let question = stores
        .questions
        .create(user.id, "challenge", "either", "Voice?")
        .await
        .unwrap();
    let placeholder = stores.comments.create_audio_placeholder(question.id).await.unwrap();

    stores.comments.delete(placeholder.id).await.unwrap();

    let result = stores
        .comments
        .finalize_audio(placeholder.id, "https://bucket.example/x")
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(stores.comments.get(placeholder.id).await.unwrap().is_none());
    assert!(matches!(
        stores.comments.delete(placeholder.id).await,
        Err(StoreError::NotFound("comment"))
    ));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_comment_inbox_by_kind() {
    let (pool, stores) = common::setup().await;
    let user = common::create_user(&stores, "ruth").await;

    let live = stores
        .questions
        .create(user.id, "normal", "either", "Live")
        .await
        .unwrap();
    let old = stores
        .questions
        .create(user.id, "normal", "either", "Old")
        .await
        .unwrap();

    let text = stores.comments.create_text(live.id, "hi").await.unwrap();
    stores.comments.create_text(old.id, "old hi").await.unwrap();
    let audio = stores.comments.create_audio_placeholder(live.id).await.unwrap();
    stores
        .comments
        .finalize_audio(audio.id, "https://bucket.example/a")
        .await
        .unwrap();

    common::backdate(&pool, old.id, 25).await;

    let texts = stores.comments.list_for_user(user.id, CommentKind::Text).await.unwrap();
    assert_eq!(texts.iter().map(|c| c.id).collect::<Vec<_>>(), vec![text.id]);

    let audios = stores.comments.list_for_user(user.id, CommentKind::Audio).await.unwrap();
    assert_eq!(audios.iter().map(|c| c.id).collect::<Vec<_>>(), vec![audio.id]);
}
