//! User lookups.
//!
//! Users are created by the account collaborator; the core only needs to resolve the
//! owner of an order placed "on behalf of" someone else.

use crate::{
    core::active::SoftDelete,
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Creates a user after checking the name is free among active users.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or already taken by an active user
/// - The email does not look like an address
/// - The database insert fails (including a duplicate email)
pub async fn create_user(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    is_staff: bool,
) -> Result<user::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("User name cannot be empty"));
    }
    if !email.contains('@') {
        return Err(Error::validation(format!("'{email}' is not an email address")));
    }
    if get_active_user_by_name(db, name).await?.is_some() {
        return Err(Error::validation(format!("User '{name}' already exists")));
    }

    let user = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.trim().to_lowercase()),
        is_staff: Set(is_staff),
        deletion_date: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created user '{}' (staff: {})", user.name, user.is_staff);
    Ok(user)
}

/// Finds an active user by name.
pub async fn get_active_user_by_name<C>(db: &C, name: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_active()
        .filter(user::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an active user by id.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_active()
        .filter(user::Column::Id.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_user(&db, "   ", "a@example.com", false).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_user(&db, "Ana", "not-an-email", false).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_find_user() -> Result<()> {
        let db = setup_test_db().await?;
        let ana = create_test_user(&db, "ana", true).await?;

        assert!(ana.is_staff);
        let found = get_active_user_by_name(&db, " ana ").await?.unwrap();
        assert_eq!(found.id, ana.id);
        assert_eq!(get_user_by_id(&db, ana.id).await?.unwrap().name, "ana");
        assert!(get_user_by_id(&db, 999).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "ana", false).await?;

        let result = create_user(&db, "ana", "other@example.com", false).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_user_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let ana = create_test_user(&db, "ana", false).await?;

        let mut active: user::ActiveModel = ana.into();
        active.deletion_date = Set(Some(chrono::Utc::now()));
        let ana = active.update(&db).await?;

        assert!(get_active_user_by_name(&db, "ana").await?.is_none());
        assert!(get_user_by_id(&db, ana.id).await?.is_none());

        // The name is free again once the holder is deleted.
        create_user(&db, "ana", "ana2@example.com", false).await?;

        Ok(())
    }
}
