use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::marks::RecipeList;
use crate::{
    errors::{Error, Result},
    users::UserFromDB,
};

const FOOTER: &str = "Foodgram project";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Every ingredient needed for the recipes in one user's cart, summed per (name, unit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub owner_name: String,
    pub owner_username: String,
    pub items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    #[tracing::instrument(skip_all, fields(user_id = %user.user_id), err)]
    pub async fn for_user(pool: &PgPool, user: &UserFromDB) -> Result<Self> {
        if RecipeList::ShoppingCart
            .is_empty_for(pool, user.user_id)
            .await?
        {
            return Err(Error::EmptyResult("Your shopping cart is empty".to_string()));
        }

        let items = sqlx::query_as::<_, ShoppingListItem>(
            "
            SELECT
                i.name,
                i.measurement_unit,
                SUM(ri.amount)::BIGINT AS total_amount
            FROM shopping_cart_recipes c
            JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            JOIN ingredients i ON i.ingredient_id = ri.ingredient_id
            WHERE c.user_id = $1
            GROUP BY i.name, i.measurement_unit
            ORDER BY i.name, i.measurement_unit
            ",
        )
        .bind(user.user_id)
        .fetch_all(pool)
        .await?;

        if items.is_empty() {
            return Err(Error::EmptyResult(
                "The recipes in your shopping cart have no ingredients".to_string(),
            ));
        }

        tracing::debug!(items = items.len(), "Shopping list aggregated");

        Ok(Self {
            owner_name: user.display_name(),
            owner_username: user.username.clone(),
            items,
        })
    }

    /// Header, blank line, one `name amount unit` row per item, two blank lines, footer.
    pub fn render_text(&self) -> String {
        let body = self
            .items
            .iter()
            .map(|item| {
                format!(
                    "{} {} {}",
                    item.name, item.total_amount, item.measurement_unit
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Shopping list for {owner}\n\n{body}\n\n\n{FOOTER}",
            owner = self.owner_name
        )
    }

    pub fn filename(&self) -> String {
        format!("{}_shopping_list.txt", self.owner_username)
    }
}
