//! Agency persistence
//!
//! Agencies relate to programs through `agency_programs`.

use epic_common::db::Agency;
use sqlx::{SqliteConnection, SqlitePool};

async fn load_program_ids(conn: &mut SqliteConnection, agency_id: i64) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar(
        "SELECT program_id FROM agency_programs WHERE agency_id = ? ORDER BY program_id",
    )
    .bind(agency_id)
    .fetch_all(&mut *conn)
    .await
}

async fn replace_program_links(
    conn: &mut SqliteConnection,
    agency_id: i64,
    programs: &[i64],
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM agency_programs WHERE agency_id = ?")
        .bind(agency_id)
        .execute(&mut *conn)
        .await?;

    for program_id in programs {
        sqlx::query("INSERT OR IGNORE INTO agency_programs (agency_id, program_id) VALUES (?, ?)")
            .bind(agency_id)
            .bind(program_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub async fn list_agencies(pool: &SqlitePool) -> sqlx::Result<Vec<Agency>> {
    let mut conn = pool.acquire().await?;
    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM agencies ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;

    let mut agencies = Vec::with_capacity(rows.len());
    for (id, name) in rows {
        let programs = load_program_ids(&mut conn, id).await?;
        agencies.push(Agency { id, name, programs });
    }
    Ok(agencies)
}

pub async fn get_agency(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Agency>> {
    let mut conn = pool.acquire().await?;
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM agencies WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match name {
        Some(name) => {
            let programs = load_program_ids(&mut conn, id).await?;
            Ok(Some(Agency { id, name, programs }))
        }
        None => Ok(None),
    }
}

pub async fn insert_agency(pool: &SqlitePool, name: &str, programs: &[i64]) -> sqlx::Result<Agency> {
    let mut tx = pool.begin().await?;

    let id = sqlx::query("INSERT INTO agencies (name) VALUES (?)")
        .bind(name)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
    replace_program_links(&mut tx, id, programs).await?;
    let programs = load_program_ids(&mut tx, id).await?;

    tx.commit().await?;

    Ok(Agency {
        id,
        name: name.to_string(),
        programs,
    })
}

pub async fn update_agency(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    programs: &[i64],
) -> sqlx::Result<Option<Agency>> {
    let mut tx = pool.begin().await?;

    let affected = sqlx::query("UPDATE agencies SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if affected == 0 {
        return Ok(None);
    }

    replace_program_links(&mut tx, id, programs).await?;
    let programs = load_program_ids(&mut tx, id).await?;

    tx.commit().await?;

    Ok(Some(Agency {
        id,
        name: name.to_string(),
        programs,
    }))
}

pub async fn delete_agency(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let affected = sqlx::query("DELETE FROM agencies WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}
