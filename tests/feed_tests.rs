//! Integration tests for the feed, comments, likes, and the follow graph.

use forkfeed::app::App;
use forkfeed::entities::NewPost;
use forkfeed::sample_data;

fn draft(image: &str, lat: f64, lon: f64) -> NewPost {
    NewPost {
        image_path: image.to_string(),
        description: Some("plate".to_string()),
        recipe: None,
        ingredients: None,
        latitude: lat,
        longitude: lon,
    }
}

fn app_with_user(username: &str) -> (App, i64) {
    let app = App::open_in_memory().unwrap();
    app.auth.register(username, "secret").unwrap();
    app.auth.login(username, "secret").unwrap();
    let uid = app.users.current_user_id().unwrap();
    (app, uid)
}

#[test]
fn commenting_adds_a_row_and_bumps_the_count() {
    let (app, _uid) = app_with_user("alice");
    let post = app.posts.create_post(&draft("a.jpg", 52.5, 13.4)).unwrap();

    let before = app.posts.get_post(post.post_id).unwrap().unwrap();
    app.posts.comment(post.post_id, "nice").unwrap();
    let after = app.posts.get_post(post.post_id).unwrap().unwrap();

    assert_eq!(after.comment_count, before.comment_count + 1);
    let comments = app.posts.comments_for(post.post_id).unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].content, "nice");

    // Sequential per-post comment ids.
    app.posts.comment(post.post_id, "second").unwrap();
    let comments = app.posts.comments_for(post.post_id).unwrap();
    assert_eq!(
        comments.iter().map(|c| c.comment_id).collect::<Vec<_>>(),
        vec![1, 2]
    );

    app.shutdown();
}

#[test]
fn toggle_like_parity_over_a_sequence() {
    let (app, _uid) = app_with_user("alice");
    let post = app.posts.create_post(&draft("a.jpg", 52.5, 13.4)).unwrap();

    // Odd number of sequential toggles ends liked.
    for _ in 0..3 {
        app.posts.toggle_like(post.post_id).unwrap();
    }
    assert!(app.posts.is_liked(post.post_id).unwrap());
    assert_eq!(app.posts.like_count(post.post_id).unwrap(), 1);

    // Even number ends not-liked.
    app.posts.toggle_like(post.post_id).unwrap();
    assert!(!app.posts.is_liked(post.post_id).unwrap());
    assert_eq!(app.posts.like_count(post.post_id).unwrap(), 0);

    app.shutdown();
}

#[test]
fn follow_and_unfollow_maintain_the_counter() {
    let (app, alice) = app_with_user("alice");
    app.auth.register("bob", "secret").unwrap();
    let bob = app.users.get_user_by_name("bob").unwrap().unwrap().uid;

    app.users.follow(bob).unwrap();
    assert!(app.users.is_following(bob).unwrap());
    assert_eq!(app.users.get_user(bob).unwrap().unwrap().followers_count, 1);

    // Following twice is a conflict and leaves the count alone.
    let err = app.users.follow(bob).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(app.users.get_user(bob).unwrap().unwrap().followers_count, 1);

    app.users.unfollow(bob).unwrap();
    assert!(!app.users.is_following(bob).unwrap());
    assert_eq!(app.users.get_user(bob).unwrap().unwrap().followers_count, 0);

    // Unfollowing again: the edge is gone and the count stays clamped at 0.
    assert!(app.users.unfollow(bob).unwrap_err().is_not_found());
    assert_eq!(app.users.get_user(bob).unwrap().unwrap().followers_count, 0);

    // Alice's own follower count never moved.
    assert_eq!(
        app.users.get_user(alice).unwrap().unwrap().followers_count,
        0
    );

    app.shutdown();
}

#[test]
fn self_follow_is_currently_accepted() {
    // Nothing rejects a user following themself; pin the behavior as it is.
    let (app, alice) = app_with_user("alice");
    app.users.follow(alice).unwrap();
    assert!(app.users.is_following(alice).unwrap());
    assert_eq!(
        app.users.get_user(alice).unwrap().unwrap().followers_count,
        1
    );
    app.shutdown();
}

#[test]
fn feed_lists_everyone_newest_first() {
    let (app, alice) = app_with_user("alice");
    app.posts.create_post(&draft("a1.jpg", 52.5, 13.4)).unwrap();
    app.posts.create_post(&draft("a2.jpg", 48.8, 2.35)).unwrap();

    app.auth.register("bob", "secret").unwrap();
    app.auth.login("bob", "secret").unwrap();
    let bob = app.users.current_user_id().unwrap();
    app.posts.create_post(&draft("b1.jpg", 35.68, 139.69)).unwrap();

    let feed = app.posts.all_posts().unwrap();
    assert_eq!(feed.len(), 3);
    // Newest first within the timestamp resolution; every post present.
    let created: Vec<u64> = feed.iter().map(|p| p.created_at).collect();
    let mut sorted = created.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(created, sorted);

    assert_eq!(app.posts.posts_from_user(alice).unwrap().len(), 2);
    assert_eq!(app.posts.posts_from_user(bob).unwrap().len(), 1);

    // Each owner's ids are sequential from 1.
    assert_eq!(
        app.posts
            .posts_from_user(alice)
            .unwrap()
            .iter()
            .map(|p| p.post_id)
            .collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(app.posts.posts_from_user(bob).unwrap()[0].post_id, 1);

    app.shutdown();
}

#[test]
fn coordinates_are_validated_at_the_boundary() {
    let (app, _uid) = app_with_user("alice");

    let bad_lat = draft("a.jpg", 91.0, 13.4);
    assert!(app.posts.create_post(&bad_lat).is_err());
    let bad_lon = draft("a.jpg", 52.5, 181.0);
    assert!(app.posts.create_post(&bad_lon).is_err());
    let no_image = draft("   ", 52.5, 13.4);
    assert!(app.posts.create_post(&no_image).is_err());

    // Nothing slipped into the store.
    assert!(app.posts.all_posts().unwrap().is_empty());

    app.shutdown();
}

#[test]
fn sample_dataset_is_self_consistent() {
    let app = App::open_in_memory().unwrap();
    sample_data::populate(&app).unwrap();

    assert_eq!(app.posts.all_posts().unwrap().len(), 6);

    let u1 = app.users.get_user_by_name("TestUser1").unwrap().unwrap();
    let u2 = app.users.get_user_by_name("TestUser2").unwrap().unwrap();
    let u3 = app.users.get_user_by_name("TestUser3").unwrap().unwrap();
    assert_eq!(u1.followers_count, 2);
    assert_eq!(u2.followers_count, 1);
    assert_eq!(u3.followers_count, 0);
    assert_eq!(u1.posts_count, 2);
    assert_eq!(u2.posts_count, 2);
    assert_eq!(u3.posts_count, 2);

    // The seeded session is TestUser1.
    assert_eq!(app.users.current_user_id(), Some(u1.uid));

    app.shutdown();
}
