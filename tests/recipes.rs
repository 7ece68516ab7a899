//! Recipe aggregate writes: creation, link replacement, permissions.

mod common;

#[cfg(test)]
mod tests {
    use foodgram_sdk::{
        actions,
        error::{Error, ValidationError},
        pagination::PageRequest,
        schema::{RecipeFilter, RecipeInput},
    };

    use crate::common::{recipe_input, setup};

    #[tokio::test]
    async fn create_composes_the_aggregate() {
        let f = setup().await;
        let (flour, eggs) = (f.ingredients[0], f.ingredients[1]);

        let recipe = actions::create_recipe(
            f.alice.user_id,
            recipe_input("Pancakes", vec![f.tags[0]], vec![(flour, 200), (eggs, 2)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .expect("create recipe");

        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.author.id, f.alice.user_id);
        assert_eq!(recipe.tags.len(), 1);
        assert_eq!(recipe.tags[0].slug, "breakfast");
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0].name, "Flour");
        assert_eq!(recipe.ingredients[0].amount, 200);
        assert!(!recipe.is_favorited);
        assert!(recipe.image.starts_with("/media/recipes/"));

        let path = f.state.media.path_of(&recipe.image).expect("local image");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn update_replaces_every_link() {
        let f = setup().await;
        let (flour, eggs, milk) = (f.ingredients[0], f.ingredients[1], f.ingredients[2]);

        let recipe = actions::create_recipe(
            f.alice.user_id,
            recipe_input("Pancakes", vec![f.tags[0]], vec![(flour, 200), (eggs, 2)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();

        let changes = RecipeInput {
            tags: Some(vec![f.tags[1]]),
            ingredients: Some(vec![foodgram_sdk::schema::IngredientAmount {
                id: milk,
                amount: 300,
            }]),
            ..Default::default()
        };
        let updated = actions::update_recipe(
            recipe.id,
            &f.alice,
            changes,
            &f.state.media,
            &f.state.pool,
        )
        .await
        .expect("update recipe");

        assert_eq!(updated.name, "Pancakes");
        assert_eq!(updated.image, recipe.image);
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tags[0].slug, "lunch");
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.ingredients[0].id, milk);
        assert_eq!(updated.ingredients[0].amount, 300);

        let stored = actions::list_recipe_ingredients(recipe.id, &f.state.pool)
            .await
            .unwrap();
        assert_eq!(stored, updated.ingredients);
    }

    #[tokio::test]
    async fn update_without_link_sets_is_rejected() {
        let f = setup().await;
        let recipe = actions::create_recipe(
            f.alice.user_id,
            recipe_input("Omelette", vec![f.tags[0]], vec![(f.ingredients[1], 3)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();

        let changes = RecipeInput {
            name: Some("Big omelette".to_string()),
            tags: Some(vec![f.tags[0]]),
            ..Default::default()
        };
        let result =
            actions::update_recipe(recipe.id, &f.alice, changes, &f.state.media, &f.state.pool)
                .await;
        assert!(matches!(result, Err(Error::IncompleteUpdate("ingredients"))));

        let unchanged = actions::get_recipe_view(recipe.id, None, &f.state.pool)
            .await
            .unwrap();
        assert_eq!(unchanged.name, "Omelette");
        assert_eq!(unchanged.ingredients.len(), 1);
    }

    #[tokio::test]
    async fn unknown_references_are_listed() {
        let f = setup().await;

        let result = actions::create_recipe(
            f.alice.user_id,
            recipe_input(
                "Mystery",
                vec![f.tags[0]],
                vec![(f.ingredients[0], 1), (12, 1), (7, 1)],
            ),
            &f.state.media,
            &f.state.pool,
        )
        .await;
        match result {
            Err(Error::Validation(ValidationError::UnknownIngredients(ids))) => {
                assert_eq!(ids, vec![7, 12])
            }
            other => panic!("expected unknown ingredients, got {other:?}"),
        }

        let result = actions::create_recipe(
            f.alice.user_id,
            recipe_input("Mystery", vec![99], vec![(f.ingredients[0], 1)]),
            &f.state.media,
            &f.state.pool,
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::UnknownTags(_)))
        ));

        let page = actions::list_recipes(
            &RecipeFilter::default(),
            None,
            PageRequest::new(1, 6),
            &f.state.pool,
        )
        .await
        .unwrap();
        assert_eq!(page.count, 0);
    }

    #[tokio::test]
    async fn duplicate_tags_are_rejected() {
        let f = setup().await;

        let result = actions::create_recipe(
            f.alice.user_id,
            recipe_input(
                "Toast",
                vec![f.tags[0], f.tags[0]],
                vec![(f.ingredients[0], 50)],
            ),
            &f.state.media,
            &f.state.pool,
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::DuplicateTags))
        ));
    }

    #[tokio::test]
    async fn only_the_author_or_an_admin_may_write() {
        let f = setup().await;
        let recipe = actions::create_recipe(
            f.alice.user_id,
            recipe_input("Soup", vec![f.tags[1]], vec![(f.ingredients[2], 500)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();

        let changes = recipe_input("Bob's soup", vec![f.tags[1]], vec![(f.ingredients[2], 1)]);
        let result =
            actions::update_recipe(recipe.id, &f.bob, changes, &f.state.media, &f.state.pool)
                .await;
        assert!(matches!(result, Err(Error::Forbidden)));

        let result =
            actions::delete_recipe(recipe.id, &f.bob, &f.state.media, &f.state.pool).await;
        assert!(matches!(result, Err(Error::Forbidden)));

        let changes = recipe_input("Admin soup", vec![f.tags[1]], vec![(f.ingredients[2], 1)]);
        let updated =
            actions::update_recipe(recipe.id, &f.admin, changes, &f.state.media, &f.state.pool)
                .await
                .expect("admins manage every recipe");
        assert_eq!(updated.name, "Admin soup");
        assert_eq!(updated.author.id, f.alice.user_id);
    }

    #[tokio::test]
    async fn author_cannot_be_reassigned() {
        let f = setup().await;
        let recipe = actions::create_recipe(
            f.alice.user_id,
            recipe_input("Salad", vec![f.tags[1]], vec![(f.ingredients[0], 5)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();

        let result = sqlx::query("UPDATE recipes SET author_id = $1 WHERE id = $2")
            .bind(f.bob.user_id)
            .bind(recipe.id)
            .execute(&f.state.pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn delete_cascades_to_links_and_edges() {
        let f = setup().await;
        let recipe = actions::create_recipe(
            f.alice.user_id,
            recipe_input("Bread", vec![f.tags[0]], vec![(f.ingredients[0], 500)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();
        actions::RecipeList::Favorites
            .add(f.bob.user_id, recipe.id, &f.state.pool)
            .await
            .unwrap();
        actions::RecipeList::ShoppingCart
            .add(f.bob.user_id, recipe.id, &f.state.pool)
            .await
            .unwrap();

        let image = f.state.media.path_of(&recipe.image).unwrap();
        actions::delete_recipe(recipe.id, &f.alice, &f.state.media, &f.state.pool)
            .await
            .expect("delete recipe");
        assert!(!image.exists());

        for table in ["recipe_ingredients", "recipe_tags", "favorites", "shopping_cart"] {
            let count: (i64,) =
                sqlx::query_as(&format!("SELECT COUNT(*) FROM {table} WHERE recipe_id = $1"))
                    .bind(recipe.id)
                    .fetch_one(&f.state.pool)
                    .await
                    .unwrap();
            assert_eq!(count.0, 0, "{table} should be empty");
        }

        let result = actions::get_recipe_view(recipe.id, None, &f.state.pool).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn list_filters_by_tag_author_and_lists() {
        let f = setup().await;
        let (flour, eggs) = (f.ingredients[0], f.ingredients[1]);

        let pancakes = actions::create_recipe(
            f.alice.user_id,
            recipe_input("Pancakes", vec![f.tags[0]], vec![(flour, 200)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();
        let quiche = actions::create_recipe(
            f.bob.user_id,
            recipe_input("Quiche", vec![f.tags[1]], vec![(eggs, 4)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();
        actions::RecipeList::Favorites
            .add(f.alice.user_id, quiche.id, &f.state.pool)
            .await
            .unwrap();

        let list = |filter: RecipeFilter, viewer| {
            let pool = f.state.pool.clone();
            async move {
                actions::list_recipes(&filter, viewer, PageRequest::new(1, 6), &pool)
                    .await
                    .unwrap()
            }
        };

        let page = list(RecipeFilter::default(), None).await;
        assert_eq!(page.count, 2);
        // newest first
        assert_eq!(page.results[0].id, quiche.id);

        let page = list(
            RecipeFilter {
                tags: vec!["breakfast".to_string()],
                ..Default::default()
            },
            None,
        )
        .await;
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, pancakes.id);

        let page = list(
            RecipeFilter {
                author: Some(f.bob.user_id),
                ..Default::default()
            },
            None,
        )
        .await;
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, quiche.id);

        let page = list(
            RecipeFilter {
                is_favorited: Some(true),
                ..Default::default()
            },
            Some(f.alice.user_id),
        )
        .await;
        assert_eq!(page.results.len(), 1);
        assert!(page.results[0].is_favorited);

        let page = list(
            RecipeFilter {
                is_favorited: Some(true),
                ..Default::default()
            },
            None,
        )
        .await;
        assert_eq!(page.count, 0);
    }

    #[tokio::test]
    async fn pages_link_to_their_neighbours() {
        let f = setup().await;
        for i in 0..3 {
            actions::create_recipe(
                f.alice.user_id,
                recipe_input(&format!("Recipe {i}"), vec![f.tags[0]], vec![(f.ingredients[0], 1)]),
                &f.state.media,
                &f.state.pool,
            )
            .await
            .unwrap();
        }

        let page = actions::list_recipes(
            &RecipeFilter::default(),
            None,
            PageRequest::new(2, 2),
            &f.state.pool,
        )
        .await
        .unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(1));

        let page = actions::list_recipes(
            &RecipeFilter::default(),
            None,
            PageRequest::new(5, 2),
            &f.state.pool,
        )
        .await
        .unwrap();
        assert_eq!(page.count, 3);
        assert!(page.results.is_empty());
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(4));

        let page = actions::list_recipes(
            &RecipeFilter {
                author: Some(f.bob.user_id),
                ..Default::default()
            },
            None,
            PageRequest::new(2, 2),
            &f.state.pool,
        )
        .await
        .unwrap();
        assert_eq!(page.count, 0);
        assert_eq!(page.previous, Some(1));
    }
}
