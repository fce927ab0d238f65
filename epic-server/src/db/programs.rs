//! Program persistence

use epic_common::db::Program;
use sqlx::SqlitePool;

const SELECT_PROGRAM: &str = "SELECT id, name, description, group_id AS \"group\" FROM programs";

pub async fn list_programs(pool: &SqlitePool) -> sqlx::Result<Vec<Program>> {
    sqlx::query_as::<_, Program>(&format!("{} ORDER BY id", SELECT_PROGRAM))
        .fetch_all(pool)
        .await
}

/// Programs in report order (name, then id)
pub async fn list_programs_by_name(pool: &SqlitePool) -> sqlx::Result<Vec<Program>> {
    sqlx::query_as::<_, Program>(&format!("{} ORDER BY name, id", SELECT_PROGRAM))
        .fetch_all(pool)
        .await
}

pub async fn get_program(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Program>> {
    sqlx::query_as::<_, Program>(&format!("{} WHERE id = ?", SELECT_PROGRAM))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn program_exists(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM programs WHERE id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Ids from `ids` that do not name a program
pub async fn missing_program_ids(pool: &SqlitePool, ids: &[i64]) -> sqlx::Result<Vec<i64>> {
    let mut missing = Vec::new();
    for &id in ids {
        if !program_exists(pool, id).await? {
            missing.push(id);
        }
    }
    Ok(missing)
}

pub async fn insert_program(
    pool: &SqlitePool,
    name: &str,
    description: &str,
    group: i64,
) -> sqlx::Result<Program> {
    let id = sqlx::query("INSERT INTO programs (name, description, group_id) VALUES (?, ?, ?)")
        .bind(name)
        .bind(description)
        .bind(group)
        .execute(pool)
        .await?
        .last_insert_rowid();

    Ok(Program {
        id,
        name: name.to_string(),
        description: description.to_string(),
        group,
    })
}

pub async fn update_program(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    description: &str,
    group: i64,
) -> sqlx::Result<Option<Program>> {
    let affected =
        sqlx::query("UPDATE programs SET name = ?, description = ?, group_id = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(group)
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();

    Ok((affected > 0).then(|| Program {
        id,
        name: name.to_string(),
        description: description.to_string(),
        group,
    }))
}

pub async fn delete_program(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let affected = sqlx::query("DELETE FROM programs WHERE id = ?")
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
    async fn test_programs_ordered_by_name() {
        let pool = seeded_pool().await;
        insert_program(&pool, "Aardvark", "", 2).await.unwrap();

        let names: Vec<String> = list_programs_by_name(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Aardvark", "Alpha", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn test_missing_program_ids() {
        let pool = seeded_pool().await;

        assert_eq!(missing_program_ids(&pool, &[1, 7, 3, 8]).await.unwrap(), vec![7, 8]);
    }

    #[tokio::test]
    async fn test_update_and_delete_program() {
        let pool = seeded_pool().await;

        let updated = update_program(&pool, 2, "Beta II", "renamed", 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.group, 2);
        assert_eq!(get_program(&pool, 2).await.unwrap().unwrap().name, "Beta II");

        assert!(delete_program(&pool, 2).await.unwrap());
        assert!(get_program(&pool, 2).await.unwrap().is_none());
    }
}
