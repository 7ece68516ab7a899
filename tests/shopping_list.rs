//! Shopping list export.

mod common;

#[cfg(test)]
mod tests {
    use foodgram_sdk::actions::{self, RecipeList};

    use crate::common::{recipe_input, setup};

    #[tokio::test]
    async fn amounts_are_summed_per_ingredient() {
        let f = setup().await;
        let (flour, eggs, milk) = (f.ingredients[0], f.ingredients[1], f.ingredients[2]);

        let pancakes = actions::create_recipe(
            f.alice.user_id,
            recipe_input("Pancakes", vec![f.tags[0]], vec![(flour, 200), (eggs, 2), (milk, 300)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();
        let bread = actions::create_recipe(
            f.alice.user_id,
            recipe_input("Bread", vec![f.tags[1]], vec![(flour, 300)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();
        // not in the cart
        actions::create_recipe(
            f.alice.user_id,
            recipe_input("Crepes", vec![f.tags[0]], vec![(flour, 1000)]),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();

        for recipe in [pancakes.id, bread.id] {
            RecipeList::ShoppingCart
                .add(f.bob.user_id, recipe, &f.state.pool)
                .await
                .unwrap();
        }

        let text = actions::export_shopping_list(f.bob.user_id, &f.state.pool)
            .await
            .unwrap();
        assert_eq!(text, "Eggs - 2 (pcs)\nFlour - 500 (g)\nMilk - 300 (ml)");

        // someone else's cart is separate
        let text = actions::export_shopping_list(f.alice.user_id, &f.state.pool)
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn same_name_different_units_stay_apart() {
        let f = setup().await;
        let cups = actions::create_ingredient(
            foodgram_sdk::schema::NewIngredient {
                name: "Flour".to_string(),
                measurement_unit: "cup".to_string(),
            },
            &f.state.pool,
        )
        .await
        .unwrap();

        let recipe = actions::create_recipe(
            f.alice.user_id,
            recipe_input(
                "Cake",
                vec![f.tags[0]],
                vec![(f.ingredients[0], 100), (cups.id, 2)],
            ),
            &f.state.media,
            &f.state.pool,
        )
        .await
        .unwrap();
        RecipeList::ShoppingCart
            .add(f.alice.user_id, recipe.id, &f.state.pool)
            .await
            .unwrap();

        let lines = actions::list_shopping_list(f.alice.user_id, &f.state.pool)
            .await
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].to_string(), "Flour - 2 (cup)");
        assert_eq!(lines[1].to_string(), "Flour - 100 (g)");
    }
}
