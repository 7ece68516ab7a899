//! Shared setup for the integration tests.
//!
//! Every test gets its own database and media folder. The database lives in
//! memory unless the test asks for a shared file.

use std::sync::Arc;

use foodgram_sdk::{
    actions,
    config::Config,
    connect::connect,
    jwt::SessionData,
    schema::{Id, IngredientAmount, NewIngredient, NewTag, NewUser, RecipeInput, UserRole},
    state::State,
};
use temp_dir::TempDir;

#[allow(dead_code, reason = "not every test uses every pixel")]
pub const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

#[allow(dead_code, reason = "it's used in the other tests")]
pub struct Fixture {
    pub state: Arc<State>,
    pub alice: SessionData,
    pub bob: SessionData,
    pub admin: SessionData,
    /// flour (g), eggs (pcs), milk (ml)
    pub ingredients: Vec<Id>,
    /// breakfast, lunch
    pub tags: Vec<Id>,
    _media: TempDir,
}

async fn register(username: &str, state: &State) -> SessionData {
    let user = actions::register_user(
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: username.to_string(),
            last_name: "Cook".to_string(),
            password: format!("{username}-password"),
        },
        &state.pool,
    )
    .await
    .expect("register user");

    SessionData {
        user_id: user.id,
        username: user.username,
        role: UserRole::User,
        is_admin: false,
    }
}

/// call this at the top of any new test func
#[allow(dead_code, reason = "it's used in the other tests")]
pub async fn setup() -> Fixture {
    setup_with(None).await
}

/// Like [`setup`], but on a database file shared by `connections` connections,
/// so requests really run side by side.
#[allow(dead_code, reason = "it's used in the other tests")]
pub async fn setup_shared(connections: u32) -> Fixture {
    setup_with(Some(connections)).await
}

async fn setup_with(shared: Option<u32>) -> Fixture {
    let media = TempDir::new().expect("create media dir");
    let config = Config {
        media_root: media.path().to_string_lossy().into_owned(),
        ..Config::default()
    };

    let pool = match shared {
        Some(connections) => {
            let url = format!("sqlite://{}", media.path().join("foodgram.sqlite").display());
            connect(&url, connections).await.expect("file database")
        }
        None => connect("sqlite::memory:", 1)
            .await
            .expect("in-memory database"),
    };
    let state = State::with_pool(config, pool);

    let alice = register("alice", &state).await;
    let bob = register("bob", &state).await;
    let mut admin = register("admin", &state).await;

    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(admin.user_id)
        .execute(&state.pool)
        .await
        .expect("promote admin");
    admin.role = UserRole::Admin;
    admin.is_admin = true;

    let mut ingredients = vec![];
    for (name, unit) in [("Flour", "g"), ("Eggs", "pcs"), ("Milk", "ml")] {
        let ingredient = actions::create_ingredient(
            NewIngredient {
                name: name.to_string(),
                measurement_unit: unit.to_string(),
            },
            &state.pool,
        )
        .await
        .expect("create ingredient");
        ingredients.push(ingredient.id);
    }

    let mut tags = vec![];
    for (name, slug) in [("Breakfast", "breakfast"), ("Lunch", "lunch")] {
        let tag = actions::create_tag(
            NewTag {
                name: name.to_string(),
                slug: slug.to_string(),
            },
            &state.pool,
        )
        .await
        .expect("create tag");
        tags.push(tag.id);
    }

    Fixture {
        state,
        alice,
        bob,
        admin,
        ingredients,
        tags,
        _media: media,
    }
}

/// A complete create payload.
#[allow(dead_code, reason = "it's used in the other tests")]
pub fn recipe_input(name: &str, tags: Vec<Id>, ingredients: Vec<(Id, i32)>) -> RecipeInput {
    RecipeInput {
        tags: Some(tags),
        ingredients: Some(
            ingredients
                .into_iter()
                .map(|(id, amount)| IngredientAmount { id, amount })
                .collect(),
        ),
        name: Some(name.to_string()),
        image: Some(PIXEL.to_string()),
        text: Some("Mix everything".to_string()),
        cooking_time: Some(15),
    }
}
