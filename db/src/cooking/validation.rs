//! Checks a submitted recipe before anything is written.
//!
//! The id lookups happen up front in [`KnownReferences::load`], so the rules in
//! [`RecipeDraft::validate`] never touch the store and run in a fixed order.
//! Every violation is collected rather than stopping at the first one.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ingredients::IngredientAmount, tags::Tag, Ingredient};
use crate::errors::{Result, ValidationErrors};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i32>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub ingredients: Vec<IngredientAmountDraft>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IngredientAmountDraft {
    pub id: Uuid,
    pub amount: i32,
}

/// A recipe that passed every rule. Only [`RecipeDraft::validate`] builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecipe {
    pub(crate) name: String,
    pub(crate) text: String,
    pub(crate) image: Option<String>,
    pub(crate) cooking_time: i32,
    pub(crate) tag_ids: Vec<Uuid>,
    pub(crate) ingredients: Vec<IngredientAmount>,
}

impl ValidRecipe {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn cooking_time(&self) -> i32 {
        self.cooking_time
    }

    pub fn tag_ids(&self) -> &[Uuid] {
        &self.tag_ids
    }

    pub fn ingredients(&self) -> &[IngredientAmount] {
        &self.ingredients
    }
}

/// Which of the draft's tag and ingredient ids resolve in the store.
#[derive(Debug, Clone, Default)]
pub struct KnownReferences {
    pub tags: HashSet<Uuid>,
    pub ingredients: HashSet<Uuid>,
}

impl KnownReferences {
    pub async fn load(pool: &PgPool, draft: &RecipeDraft) -> Result<Self> {
        let mut conn = pool.acquire().await?;

        let tags = Tag::existing_ids(&mut *conn, &draft.tags).await?;
        let ingredient_ids: Vec<Uuid> = draft.ingredients.iter().map(|i| i.id).collect();
        let ingredients = Ingredient::existing_ids(&mut *conn, &ingredient_ids).await?;

        Ok(Self {
            tags: tags.into_iter().collect(),
            ingredients: ingredients.into_iter().collect(),
        })
    }
}

pub const MAX_NAME_LENGTH: usize = 100;

fn required_text(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(ToString::to_string)
}

impl RecipeDraft {
    /// Resolves ids against the store, then runs [`RecipeDraft::validate`].
    #[tracing::instrument(skip_all, err)]
    pub async fn validate_against(self, pool: &PgPool) -> Result<ValidRecipe> {
        let known = KnownReferences::load(pool, &self).await?;

        Ok(self.validate(&known)?)
    }

    pub fn validate(self, known: &KnownReferences) -> Result<ValidRecipe, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required_text(self.name.as_ref());
        match &name {
            None => errors.push("name", "This field is required"),
            Some(name) if name.chars().count() > MAX_NAME_LENGTH => errors.push(
                "name",
                format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters"),
            ),
            Some(_) => {}
        }
        let text = required_text(self.text.as_ref());
        if text.is_none() {
            errors.push("text", "This field is required");
        }
        if self.cooking_time.is_none() {
            errors.push("cooking_time", "This field is required");
        }

        if self.tags.is_empty() {
            errors.push("tags", "At least one tag is required");
        }
        let mut seen_tags = HashSet::new();
        for tag_id in &self.tags {
            if !seen_tags.insert(*tag_id) {
                errors.push("tags", format!("Tag {tag_id} is listed more than once"));
            }
            if !known.tags.contains(tag_id) {
                errors.push("tags", format!("Tag {tag_id} does not exist"));
            }
        }

        if self.ingredients.is_empty() {
            errors.push("ingredients", "At least one ingredient is required");
        }
        for ingredient in &self.ingredients {
            if !known.ingredients.contains(&ingredient.id) {
                errors.push(
                    "ingredients",
                    format!("Ingredient {} does not exist", ingredient.id),
                );
            }
        }

        let mut seen_ingredients = HashSet::new();
        for ingredient in &self.ingredients {
            if !seen_ingredients.insert(ingredient.id) {
                errors.push(
                    "ingredients",
                    format!("Ingredient {} is listed more than once", ingredient.id),
                );
            }
        }

        for ingredient in &self.ingredients {
            if ingredient.amount <= 0 {
                errors.push(
                    "amount",
                    format!(
                        "Amount of ingredient {} must be greater than 0",
                        ingredient.id
                    ),
                );
            }
        }

        if let Some(cooking_time) = self.cooking_time {
            if cooking_time <= 0 {
                errors.push("cooking_time", "Cooking time must be at least 1 minute");
            }
        }

        match (name, text, self.cooking_time) {
            (Some(name), Some(text), Some(cooking_time)) if errors.is_empty() => Ok(ValidRecipe {
                name,
                text,
                image: self.image.filter(|i| !i.trim().is_empty()),
                cooking_time,
                tag_ids: self.tags,
                ingredients: self
                    .ingredients
                    .into_iter()
                    .map(|i| IngredientAmount {
                        ingredient_id: i.id,
                        amount: i.amount,
                    })
                    .collect(),
            }),
            _ => Err(errors),
        }
    }
}
