use chrono::Utc;
use pollmaster::models::{Poll, PollOption};
use pollmaster::{Store, StoreError};

fn sample_poll(id: &str, question: &str, options: &[&str]) -> Poll {
    Poll {
        id: id.to_string(),
        question: question.to_string(),
        options: options
            .iter()
            .enumerate()
            .map(|(i, text)| PollOption {
                id: format!("{id}-opt{i}"),
                text: (*text).to_string(),
                votes: 0,
                image_url: None,
            })
            .collect(),
        created_at: Utc::now(),
        votes_count: 0,
        has_voted: false,
    }
}

fn option_sum(poll: &Poll) -> i64 {
    poll.options.iter().map(|opt| opt.votes).sum()
}

#[tokio::test]
async fn create_then_get_round_trip() {
    let store = Store::in_memory();
    store
        .create_poll(&sample_poll("p1", "Tabs or spaces?", &["Tabs", "Spaces"]))
        .await
        .unwrap();

    let poll = store.get_poll("p1", "session-x").await.unwrap();
    assert_eq!(poll.question, "Tabs or spaces?");
    assert_eq!(poll.options.len(), 2);
    assert_eq!(poll.options[0].text, "Tabs");
    assert_eq!(poll.options[1].text, "Spaces");
    assert!(poll.options.iter().all(|opt| opt.votes == 0));
    assert_eq!(poll.votes_count, 0);
    assert!(!poll.has_voted);
}

#[tokio::test]
async fn duplicate_poll_id_rejected_without_overwrite() {
    let store = Store::in_memory();
    store
        .create_poll(&sample_poll("p1", "First", &["A"]))
        .await
        .unwrap();

    let err = store
        .create_poll(&sample_poll("p1", "Second", &["B"]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId));

    let poll = store.get_poll("p1", "session-x").await.unwrap();
    assert_eq!(poll.question, "First");
    assert_eq!(poll.options.len(), 1);
}

#[tokio::test]
async fn vote_updates_counts_and_annotation() {
    let store = Store::in_memory();
    let poll = sample_poll("p1", "Best pet?", &["Cat", "Dog"]);
    store.create_poll(&poll).await.unwrap();

    store.vote("p1", &poll.options[0].id, "session-x").await.unwrap();

    let seen_by_x = store.get_poll("p1", "session-x").await.unwrap();
    assert_eq!(seen_by_x.options[0].votes, 1);
    assert_eq!(seen_by_x.options[1].votes, 0);
    assert_eq!(seen_by_x.votes_count, 1);
    assert!(seen_by_x.has_voted);

    let seen_by_y = store.get_poll("p1", "session-y").await.unwrap();
    assert_eq!(seen_by_y.votes_count, 1);
    assert!(!seen_by_y.has_voted);
}

#[tokio::test]
async fn second_vote_rejected_and_nothing_changes() {
    let store = Store::in_memory();
    let poll = sample_poll("p1", "Best pet?", &["Cat", "Dog"]);
    store.create_poll(&poll).await.unwrap();

    store.vote("p1", &poll.options[0].id, "session-x").await.unwrap();

    // Re-voting with a different option is still a duplicate.
    let err = store
        .vote("p1", &poll.options[1].id, "session-x")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyVoted));

    let after = store.get_poll("p1", "session-x").await.unwrap();
    assert_eq!(after.options[0].votes, 1);
    assert_eq!(after.options[1].votes, 0);
    assert_eq!(after.votes_count, 1);
    assert_eq!(store.votes_for_poll("p1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn vote_with_unknown_option_mutates_nothing() {
    let store = Store::in_memory();
    store
        .create_poll(&sample_poll("p1", "Best pet?", &["Cat", "Dog"]))
        .await
        .unwrap();

    let err = store.vote("p1", "no-such-option", "session-x").await.unwrap_err();
    assert!(matches!(err, StoreError::OptionNotFound));

    let poll = store.get_poll("p1", "session-x").await.unwrap();
    assert_eq!(poll.votes_count, 0);
    assert!(poll.options.iter().all(|opt| opt.votes == 0));
    assert!(!poll.has_voted);
    assert!(store.votes_for_poll("p1").await.unwrap().is_empty());
}

#[tokio::test]
async fn vote_on_unknown_poll_is_not_found() {
    let store = Store::in_memory();
    let err = store.vote("nope", "opt", "session-x").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[tokio::test]
async fn aggregate_count_matches_option_sum() {
    let store = Store::in_memory();
    let poll = sample_poll("p1", "Lunch?", &["Soup", "Salad", "Pizza"]);
    store.create_poll(&poll).await.unwrap();

    store.vote("p1", &poll.options[0].id, "a").await.unwrap();
    store.vote("p1", &poll.options[2].id, "b").await.unwrap();
    store.vote("p1", &poll.options[2].id, "c").await.unwrap();
    assert!(store.vote("p1", &poll.options[1].id, "a").await.is_err());

    let after = store.get_poll("p1", "a").await.unwrap();
    assert_eq!(after.votes_count, 3);
    assert_eq!(option_sum(&after), after.votes_count);
    assert_eq!(after.options[0].votes, 1);
    assert_eq!(after.options[1].votes, 0);
    assert_eq!(after.options[2].votes, 2);
}

#[tokio::test]
async fn vote_records_carry_the_chosen_option() {
    let store = Store::in_memory();
    let poll = sample_poll("p1", "Lunch?", &["Soup", "Salad"]);
    store.create_poll(&poll).await.unwrap();

    store.vote("p1", &poll.options[1].id, "session-x").await.unwrap();

    let votes = store.votes_for_poll("p1").await.unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].poll_id, "p1");
    assert_eq!(votes[0].identity_id, "session-x");
    assert_eq!(votes[0].option_id, poll.options[1].id);
}

#[tokio::test]
async fn delete_cascades_votes_and_poll_disappears() {
    let store = Store::in_memory();
    let poll = sample_poll("p1", "Best pet?", &["Cat", "Dog"]);
    store.create_poll(&poll).await.unwrap();
    store.vote("p1", &poll.options[0].id, "a").await.unwrap();
    store.vote("p1", &poll.options[1].id, "b").await.unwrap();

    assert!(store.delete_poll("p1").await.unwrap());

    assert!(matches!(
        store.get_poll("p1", "a").await.unwrap_err(),
        StoreError::NotFound
    ));
    assert!(store.list_polls("a").await.unwrap().is_empty());
    assert!(store.votes_for_poll("p1").await.unwrap().is_empty());

    // Voting on a deleted poll is NotFound, not AlreadyVoted.
    assert!(matches!(
        store.vote("p1", &poll.options[0].id, "a").await.unwrap_err(),
        StoreError::NotFound
    ));
}

#[tokio::test]
async fn deleting_missing_poll_is_benign() {
    let store = Store::in_memory();
    assert!(!store.delete_poll("never-existed").await.unwrap());
}

#[tokio::test]
async fn list_orders_newest_first_and_annotates_per_identity() {
    let store = Store::in_memory();

    let mut first = sample_poll("p1", "Older", &["A"]);
    first.created_at = Utc::now() - chrono::Duration::minutes(5);
    store.create_poll(&first).await.unwrap();

    let second = sample_poll("p2", "Newer", &["B"]);
    store.create_poll(&second).await.unwrap();

    store.vote("p1", &first.options[0].id, "session-x").await.unwrap();

    let listed = store.list_polls("session-x").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, "p2");
    assert_eq!(listed[1].id, "p1");
    assert!(!listed[0].has_voted);
    assert!(listed[1].has_voted);

    let listed_for_y = store.list_polls("session-y").await.unwrap();
    assert!(listed_for_y.iter().all(|p| !p.has_voted));
}

#[tokio::test]
async fn user_info_defaults_then_reflects_update() {
    let store = Store::in_memory();

    let fresh = store.get_user_info("abcdef-123").await;
    assert_eq!(fresh.id, "abcdef-123");
    assert_eq!(fresh.username, "Anonymous_abcd");

    store.update_username("abcdef-123", "Alice").await.unwrap();
    let renamed = store.get_user_info("abcdef-123").await;
    assert_eq!(renamed.username, "Alice");

    // Renaming again overwrites, not duplicates.
    store.update_username("abcdef-123", "Bob").await.unwrap();
    assert_eq!(store.get_user_info("abcdef-123").await.username, "Bob");
}

#[tokio::test]
async fn concurrent_first_calls_share_one_initialization() {
    let store = Store::in_memory();

    let (a, b, c) = tokio::join!(
        store.list_polls("x"),
        store.list_polls("y"),
        store.delete_poll("nothing"),
    );
    assert!(a.unwrap().is_empty());
    assert!(b.unwrap().is_empty());
    assert!(!c.unwrap());
}

#[tokio::test]
async fn sequential_caller_observes_own_writes() {
    let store = Store::in_memory();
    let poll = sample_poll("p1", "Q", &["A"]);
    store.create_poll(&poll).await.unwrap();

    store.vote("p1", &poll.options[0].id, "session-x").await.unwrap();
    let read = store.get_poll("p1", "session-x").await.unwrap();
    assert!(read.has_voted);
    assert_eq!(read.votes_count, 1);
}
