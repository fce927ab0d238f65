//! Area persistence

use epic_common::db::Area;
use sqlx::SqlitePool;

pub async fn list_areas(pool: &SqlitePool) -> sqlx::Result<Vec<Area>> {
    sqlx::query_as::<_, Area>("SELECT id, name FROM areas ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn get_area(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Area>> {
    sqlx::query_as::<_, Area>("SELECT id, name FROM areas WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_area(pool: &SqlitePool, name: &str) -> sqlx::Result<Area> {
    let id = sqlx::query("INSERT INTO areas (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?
        .last_insert_rowid();

    Ok(Area {
        id,
        name: name.to_string(),
    })
}

/// Returns `None` when no area has this id
pub async fn update_area(pool: &SqlitePool, id: i64, name: &str) -> sqlx::Result<Option<Area>> {
    let affected = sqlx::query("UPDATE areas SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok((affected > 0).then(|| Area {
        id,
        name: name.to_string(),
    }))
}

/// Deletes the area with its groups, programs and questions
pub async fn delete_area(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let affected = sqlx::query("DELETE FROM areas WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_pool;

    #[tokio::test]
    async fn test_area_crud() {
        let pool = seeded_pool().await;

        let created = insert_area(&pool, "Land").await.unwrap();
        assert_eq!(get_area(&pool, created.id).await.unwrap(), Some(created.clone()));

        let updated = update_area(&pool, created.id, "Soil").await.unwrap().unwrap();
        assert_eq!(updated.name, "Soil");
        assert!(update_area(&pool, 999, "None").await.unwrap().is_none());

        assert!(delete_area(&pool, created.id).await.unwrap());
        assert!(!delete_area(&pool, created.id).await.unwrap());
        assert_eq!(list_areas(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_area_names_unique_ignoring_case() {
        let pool = seeded_pool().await;

        let result = insert_area(&pool, "WATER").await;
        assert!(result
            .unwrap_err()
            .as_database_error()
            .map(|e| e.is_unique_violation())
            .unwrap_or(false));
    }
}
