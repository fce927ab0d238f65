//! User persistence
//!
//! Passwords are hashed here; plain text never reaches the database.

use epic_common::api::auth::{generate_salt, hash_password};
use epic_common::db::EpicUser;
use sqlx::SqlitePool;
use tracing::info;

const SELECT_USER: &str =
    "SELECT id, username, organization_id AS organization, is_advisor, is_staff FROM users";

/// Fields written on create/update
#[derive(Debug, Clone)]
pub struct UserRecord<'a> {
    pub username: &'a str,
    pub organization: Option<i64>,
    pub is_advisor: bool,
    pub is_staff: bool,
}

pub async fn list_users(pool: &SqlitePool) -> sqlx::Result<Vec<EpicUser>> {
    sqlx::query_as::<_, EpicUser>(&format!("{} ORDER BY id", SELECT_USER))
        .fetch_all(pool)
        .await
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<EpicUser>> {
    sqlx::query_as::<_, EpicUser>(&format!("{} WHERE id = ?", SELECT_USER))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_user(
    pool: &SqlitePool,
    record: &UserRecord<'_>,
    password: &str,
) -> sqlx::Result<EpicUser> {
    let salt = generate_salt();
    let id = sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, password_salt, organization_id, is_advisor, is_staff)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.username)
    .bind(hash_password(password, &salt))
    .bind(&salt)
    .bind(record.organization)
    .bind(record.is_advisor)
    .bind(record.is_staff)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(EpicUser {
        id,
        username: record.username.to_string(),
        organization: record.organization,
        is_advisor: record.is_advisor,
        is_staff: record.is_staff,
    })
}

/// Update profile fields; the password only changes when one is given
pub async fn update_user(
    pool: &SqlitePool,
    id: i64,
    record: &UserRecord<'_>,
    password: Option<&str>,
) -> sqlx::Result<Option<EpicUser>> {
    let mut tx = pool.begin().await?;

    let affected = sqlx::query(
        "UPDATE users SET username = ?, organization_id = ?, is_advisor = ?, is_staff = ? WHERE id = ?",
    )
    .bind(record.username)
    .bind(record.organization)
    .bind(record.is_advisor)
    .bind(record.is_staff)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if affected == 0 {
        return Ok(None);
    }

    if let Some(password) = password {
        let salt = generate_salt();
        sqlx::query("UPDATE users SET password_hash = ?, password_salt = ? WHERE id = ?")
            .bind(hash_password(password, &salt))
            .bind(&salt)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(Some(EpicUser {
        id,
        username: record.username.to_string(),
        organization: record.organization,
        is_advisor: record.is_advisor,
        is_staff: record.is_staff,
    }))
}

pub async fn delete_user(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let affected = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Create the staff account if missing, or reset its password and staff flag
pub async fn ensure_staff_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> sqlx::Result<EpicUser> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    let record = UserRecord {
        username,
        organization: None,
        is_advisor: false,
        is_staff: true,
    };

    match existing {
        Some(id) => {
            let current = get_user(pool, id).await?;
            let record = UserRecord {
                organization: current.as_ref().and_then(|u| u.organization),
                is_advisor: current.as_ref().map(|u| u.is_advisor).unwrap_or(false),
                ..record
            };
            let user = update_user(pool, id, &record, Some(password))
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            info!("Updated staff account '{}'", username);
            Ok(user)
        }
        None => {
            let user = insert_user(pool, &record, password).await?;
            info!("Created staff account '{}'", username);
            Ok(user)
        }
    }
}
