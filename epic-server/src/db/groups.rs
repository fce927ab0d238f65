//! Group persistence

use epic_common::db::Group;
use sqlx::SqlitePool;

const SELECT_GROUP: &str = "SELECT id, name, area_id AS area FROM program_groups";

pub async fn list_groups(pool: &SqlitePool) -> sqlx::Result<Vec<Group>> {
    sqlx::query_as::<_, Group>(&format!("{} ORDER BY id", SELECT_GROUP))
        .fetch_all(pool)
        .await
}

pub async fn get_group(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Group>> {
    sqlx::query_as::<_, Group>(&format!("{} WHERE id = ?", SELECT_GROUP))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_group(pool: &SqlitePool, name: &str, area: i64) -> sqlx::Result<Group> {
    let id = sqlx::query("INSERT INTO program_groups (name, area_id) VALUES (?, ?)")
        .bind(name)
        .bind(area)
        .execute(pool)
        .await?
        .last_insert_rowid();

    Ok(Group {
        id,
        name: name.to_string(),
        area,
    })
}

pub async fn update_group(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    area: i64,
) -> sqlx::Result<Option<Group>> {
    let affected = sqlx::query("UPDATE program_groups SET name = ?, area_id = ? WHERE id = ?")
        .bind(name)
        .bind(area)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok((affected > 0).then(|| Group {
        id,
        name: name.to_string(),
        area,
    }))
}

pub async fn delete_group(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let affected = sqlx::query("DELETE FROM program_groups WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}
