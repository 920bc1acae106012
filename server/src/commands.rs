use clap::Subcommand;
use color_eyre::{
    eyre::{bail, WrapErr},
    Result,
};
use db::{
    cooking::{Ingredient, Tag},
    setup_db_pool,
    users::UserFromDB,
    PgPool,
};

use crate::AppConfig;

#[derive(Subcommand, Default)]
pub(crate) enum Command {
    /// Run the HTTP API
    #[default]
    Serve,
    /// Add a tag recipes can be filed under
    CreateTag {
        #[arg(long)]
        name: String,
        /// Hex color, like `#E26C2D`
        #[arg(long)]
        color: String,
        #[arg(long)]
        slug: String,
    },
    /// Add an ingredient to the catalog
    CreateIngredient {
        #[arg(long)]
        name: String,
        #[arg(long)]
        measurement_unit: String,
    },
    /// Let a user edit and delete any recipe
    PromoteStaff {
        #[arg(long)]
        email: String,
        /// Take staff rights away instead
        #[arg(long)]
        revoke: bool,
    },
}

impl Command {
    pub(crate) async fn run(self) -> Result<()> {
        let config = AppConfig::from_env()?;

        match self {
            Command::Serve => crate::http_server::cmd::serve(config).await,
            Command::CreateTag { name, color, slug } => {
                validate_color(&color)?;

                let pool = connect(&config).await?;
                let tag = Tag::create(&pool, name, color.to_uppercase(), slug)
                    .await
                    .wrap_err("Failed to create tag")?;

                println!("Created tag {} ({})", tag.slug, tag.tag_id);
                Ok(())
            }
            Command::CreateIngredient {
                name,
                measurement_unit,
            } => {
                let pool = connect(&config).await?;
                let ingredient = Ingredient::create(&pool, name, measurement_unit)
                    .await
                    .wrap_err("Failed to create ingredient")?;

                println!(
                    "Created ingredient {} ({}) {}",
                    ingredient.name, ingredient.measurement_unit, ingredient.ingredient_id
                );
                Ok(())
            }
            Command::PromoteStaff { email, revoke } => {
                let pool = connect(&config).await?;
                let user = set_staff_by_email(&pool, &email, !revoke).await?;

                println!("{} is_staff={}", user.username, user.is_staff);
                Ok(())
            }
        }
    }
}

async fn connect(config: &AppConfig) -> Result<PgPool> {
    setup_db_pool(config.database.url(), config.database.max_connections).await
}

async fn set_staff_by_email(pool: &PgPool, email: &str, is_staff: bool) -> Result<UserFromDB> {
    let email = email.trim().to_lowercase();
    let Some(user) = UserFromDB::get_by_email(pool, &email).await? else {
        bail!("No user with email {email}");
    };

    UserFromDB::set_staff(pool, user.user_id, is_staff)
        .await
        .wrap_err("Failed to update staff flag")?;
    tracing::info!(user_id = %user.user_id, is_staff, "Staff flag changed");

    Ok(UserFromDB { is_staff, ..user })
}

fn validate_color(color: &str) -> Result<()> {
    let Some(hex) = color.strip_prefix('#') else {
        bail!("Tag color must start with #, got {color}");
    };

    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("Tag color must look like #RRGGBB, got {color}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hex_colors() {
        assert!(validate_color("#E26C2D").is_ok());
        assert!(validate_color("#49b64e").is_ok());
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(validate_color("E26C2D").is_err());
        assert!(validate_color("#E26C2").is_err());
        assert!(validate_color("#GGGGGG").is_err());
    }

    #[test]
    fn promote_staff_defaults_to_granting() {
        use clap::Parser;

        let args =
            crate::CliArgs::try_parse_from(["server", "promote-staff", "--email", "a@b.co"])
                .unwrap();

        assert!(matches!(
            args.command,
            Some(Command::PromoteStaff { ref email, revoke: false }) if email == "a@b.co"
        ));
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn staff_flag_follows_the_email(pool: PgPool) {
        let (cook, _) =
            crate::http_server::test_helpers::create_user_with_token(&pool, "cook").await;

        let promoted = set_staff_by_email(&pool, " COOK@example.com", true).await.unwrap();
        assert!(promoted.is_staff);
        assert!(UserFromDB::get_existing(&pool, cook.user_id).await.unwrap().is_staff);

        let demoted = set_staff_by_email(&pool, "cook@example.com", false).await.unwrap();
        assert!(!demoted.is_staff);

        assert!(set_staff_by_email(&pool, "nobody@example.com", true).await.is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        use clap::Parser;

        let args = crate::CliArgs::try_parse_from([
            "server",
            "create-ingredient",
            "--name",
            "potato",
            "--measurement-unit",
            "g",
        ])
        .unwrap();

        assert!(matches!(
            args.command,
            Some(Command::CreateIngredient { ref name, ref measurement_unit })
                if name == "potato" && measurement_unit == "g"
        ));
    }
}
