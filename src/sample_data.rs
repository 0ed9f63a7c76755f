//! Demo dataset.
//!
//! Seeds a freshly opened [`App`] with a few accounts, recipe posts,
//! comments, likes, and follow edges, so a demo build has something to
//! show.  Leaves the first seeded user logged in.

use crate::app::App;
use crate::entities::NewPost;
use crate::worker::DataError;

const DEMO_IMAGE: &str = "food.png";

fn demo_post(description: &str, recipe: &str, ingredients: &str, lat: f64, lon: f64) -> NewPost {
    NewPost {
        image_path: DEMO_IMAGE.to_string(),
        description: Some(description.to_string()),
        recipe: Some(recipe.to_string()),
        ingredients: Some(ingredients.to_string()),
        latitude: lat,
        longitude: lon,
    }
}

/// Populate the store with the demo users and their posts.
pub fn populate(app: &App) -> Result<(), DataError> {
    let auth = &app.auth;
    let users = &app.users;
    let posts = &app.posts;

    for name in ["TestUser1", "TestUser2", "TestUser3"] {
        auth.register(name, "test")?;
    }
    let u1 = users_id(app, "TestUser1")?;
    let u2 = users_id(app, "TestUser2")?;
    let u3 = users_id(app, "TestUser3")?;

    users.load_current_user(u1)?;
    posts.create_post(&demo_post(
        "Homemade pizza",
        "Pizza:\n1. Roll out the dough\n2. Add toppings\n3. Bake",
        "- flour\n- yeast\n- tomatoes\n- cheese",
        52.4891,
        13.5221,
    ))?;
    posts.create_post(&demo_post(
        "Fresh garden salad",
        "Salad:\n1. Wash\n2. Chop\n3. Arrange",
        "- lettuce\n- tomatoes\n- cucumber",
        52.4892,
        13.5222,
    ))?;
    posts.comment(1, "Looks delicious!")?;
    posts.toggle_like(2)?;

    users.load_current_user(u2)?;
    posts.create_post(&demo_post(
        "Pasta carbonara",
        "Carbonara:\n1. Boil the pasta\n2. Make the sauce\n3. Toss",
        "- spaghetti\n- eggs\n- pancetta",
        52.4893,
        13.5223,
    ))?;
    posts.create_post(&demo_post(
        "Smash burger",
        "Burger:\n1. Shape the patty\n2. Sear\n3. Assemble",
        "- ground beef\n- buns\n- lettuce",
        52.4894,
        13.5224,
    ))?;
    posts.comment(1, "Great recipe, thanks for sharing!")?;
    posts.toggle_like(1)?;

    users.load_current_user(u3)?;
    posts.create_post(&demo_post(
        "Smoothie bowl",
        "Bowl:\n1. Blend the fruit\n2. Add toppings\n3. Decorate",
        "- banana\n- berries\n- yoghurt",
        52.4895,
        13.5225,
    ))?;
    posts.create_post(&demo_post(
        "Salmon sushi",
        "Sushi:\n1. Cook the rice\n2. Roll\n3. Slice",
        "- sushi rice\n- nori\n- salmon",
        52.4896,
        13.5226,
    ))?;
    posts.comment(2, "So healthy!")?;

    // Follow edges: everyone follows TestUser1, TestUser1 follows back once.
    users.load_current_user(u2)?;
    users.follow(u1)?;
    users.load_current_user(u3)?;
    users.follow(u1)?;
    users.load_current_user(u1)?;
    users.follow(u2)?;

    Ok(())
}

fn users_id(app: &App, username: &str) -> Result<i64, DataError> {
    app.users
        .get_user_by_name(username)?
        .map(|u| u.uid)
        .ok_or_else(|| DataError::Invalid(format!("seed user {username} missing")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
