//! Startup seeding of the admin user.

use quorum_auth::storage::{User, UserStorage};
use quorum_auth::AuthResult;
use tracing::info;

use crate::config::BootstrapConfig;

/// Creates the configured admin user unless the username already exists.
///
/// Returns `true` if a user was created.
pub async fn seed_admin_user(users: &dyn UserStorage, config: &BootstrapConfig) -> AuthResult<bool> {
    let Some(admin) = &config.admin_user else {
        return Ok(false);
    };

    if users.find_by_username(&admin.username).await?.is_some() {
        info!(username = %admin.username, "Admin user already exists, skipping bootstrap");
        return Ok(false);
    }

    let email = admin
        .email
        .clone()
        .unwrap_or_else(|| format!("{}@localhost", admin.username));
    let password = admin.password.clone();
    let username = admin.username.clone();

    // Argon2 hashing is CPU-bound.
    let user = tokio::task::spawn_blocking(move || {
        User::builder(username, email)
            .full_name("Administrator")
            .password(password)
            .superuser(true)
            .build()
    })
    .await
    .map_err(|e| quorum_auth::AuthError::internal(format!("admin bootstrap failed: {e}")))??;

    users.create(&user).await?;
    info!(username = %user.username, user_id = %user.id, "Admin user created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdminUserConfig;
    use quorum_auth::storage::InMemoryUserStorage;

    fn config() -> BootstrapConfig {
        BootstrapConfig {
            admin_user: Some(AdminUserConfig {
                username: "admin".into(),
                password: "admin-password".into(),
                email: None,
            }),
        }
    }

    #[tokio::test]
    async fn seeds_admin_once() {
        let users = InMemoryUserStorage::new();

        assert!(seed_admin_user(&users, &config()).await.unwrap());
        assert!(!seed_admin_user(&users, &config()).await.unwrap());

        let admin = users.find_by_username("admin").await.unwrap().unwrap();
        assert!(admin.is_superuser);
        assert!(admin.is_active);
        assert_eq!(admin.email, "admin@localhost");
        assert!(admin.check_password("admin-password"));
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn nothing_configured_is_a_no_op() {
        let users = InMemoryUserStorage::new();
        assert!(!seed_admin_user(&users, &BootstrapConfig::default()).await.unwrap());
        assert!(users.is_empty());
    }
}
