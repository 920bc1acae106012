pub mod ingredients;
pub mod marks;
pub mod recipe;
pub mod shopping_list;
pub mod tags;
pub mod validation;

pub use ingredients::{Ingredient, IngredientAmount, IngredientLine, RecipeIngredient};
pub use marks::RecipeList;
pub use recipe::{Recipe, RecipeFilter, RecipeSummary, RecipeWithDetails};
pub use shopping_list::{ShoppingList, ShoppingListItem};
pub use tags::{RecipeTag, Tag};
pub use validation::{IngredientAmountDraft, KnownReferences, RecipeDraft, ValidRecipe};
