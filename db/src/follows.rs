use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    errors::{Error, Result, ValidationErrors},
    users::UserFromDB,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Follow {
    pub follower_user_id: Uuid,
    pub followed_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    #[tracing::instrument(skip(pool), err)]
    pub async fn create(
        pool: &PgPool,
        follower_user_id: Uuid,
        followed_user_id: Uuid,
    ) -> Result<Self> {
        if follower_user_id == followed_user_id {
            return Err(ValidationErrors::single("author", "You cannot follow yourself").into());
        }

        UserFromDB::get_existing(pool, followed_user_id).await?;

        let follow = sqlx::query_as::<_, Follow>(
            "
            INSERT INTO follows (follower_user_id, followed_user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            RETURNING *
            ",
        )
        .bind(follower_user_id)
        .bind(followed_user_id)
        .fetch_optional(pool)
        .await?;

        follow.ok_or_else(|| Error::Conflict("You already follow this author".to_string()))
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn delete(
        pool: &PgPool,
        follower_user_id: Uuid,
        followed_user_id: Uuid,
    ) -> Result<()> {
        UserFromDB::get_existing(pool, followed_user_id).await?;

        let result = sqlx::query(
            "DELETE FROM follows WHERE follower_user_id = $1 AND followed_user_id = $2",
        )
        .bind(follower_user_id)
        .bind(followed_user_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::AlreadyRemoved(
                "You do not follow this author".to_string(),
            ));
        }

        Ok(())
    }

    pub async fn exists(
        pool: &PgPool,
        follower_user_id: Uuid,
        followed_user_id: Uuid,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "
            SELECT EXISTS (
                SELECT 1 FROM follows
                WHERE follower_user_id = $1 AND followed_user_id = $2
            )
            ",
        )
        .bind(follower_user_id)
        .bind(followed_user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Authors `follower_user_id` follows, ordered by username.
    pub async fn list_followed(
        pool: &PgPool,
        follower_user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserFromDB>> {
        let users = sqlx::query_as::<_, UserFromDB>(
            "
            SELECT u.*
            FROM follows f
            JOIN users u ON u.user_id = f.followed_user_id
            WHERE f.follower_user_id = $1
            ORDER BY u.username
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(follower_user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn count_followed(pool: &PgPool, follower_user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM follows WHERE follower_user_id = $1",
        )
        .bind(follower_user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_user;

    #[sqlx::test]
    async fn following_yourself_is_a_validation_error(pool: PgPool) {
        let cook = create_user(&pool, "cook").await;

        let err = Follow::create(&pool, cook.user_id, cook.user_id)
            .await
            .unwrap_err();

        match err {
            Error::Validation(errors) => assert!(errors.has_field("author")),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[sqlx::test]
    async fn following_twice_is_a_conflict(pool: PgPool) {
        let cook = create_user(&pool, "cook").await;
        let chef = create_user(&pool, "chef").await;

        Follow::create(&pool, cook.user_id, chef.user_id)
            .await
            .unwrap();
        let err = Follow::create(&pool, cook.user_id, chef.user_id)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Conflict(_)), "got {err:?}");
        assert_eq!(Follow::count_followed(&pool, cook.user_id).await.unwrap(), 1);
    }

    #[sqlx::test]
    async fn following_an_unknown_user_is_not_found(pool: PgPool) {
        let cook = create_user(&pool, "cook").await;

        let err = Follow::create(&pool, cook.user_id, Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
    }

    #[sqlx::test]
    async fn unfollowing_without_a_link_is_already_removed(pool: PgPool) {
        let cook = create_user(&pool, "cook").await;
        let chef = create_user(&pool, "chef").await;

        let err = Follow::delete(&pool, cook.user_id, chef.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRemoved(_)), "got {err:?}");

        Follow::create(&pool, cook.user_id, chef.user_id)
            .await
            .unwrap();
        Follow::delete(&pool, cook.user_id, chef.user_id)
            .await
            .unwrap();
        assert!(!Follow::exists(&pool, cook.user_id, chef.user_id)
            .await
            .unwrap());
    }

    #[sqlx::test]
    async fn followed_authors_are_listed_by_username(pool: PgPool) {
        let cook = create_user(&pool, "cook").await;
        let zed = create_user(&pool, "zed").await;
        let anna = create_user(&pool, "anna").await;

        Follow::create(&pool, cook.user_id, zed.user_id).await.unwrap();
        Follow::create(&pool, cook.user_id, anna.user_id).await.unwrap();

        let followed = Follow::list_followed(&pool, cook.user_id, 10, 0)
            .await
            .unwrap();
        let names: Vec<&str> = followed.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["anna", "zed"]);

        let second_page = Follow::list_followed(&pool, cook.user_id, 1, 1)
            .await
            .unwrap();
        assert_eq!(second_page[0].username, "zed");
    }
}
