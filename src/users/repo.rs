use sqlx::SqliteConnection;
use thiserror::Error;

use super::repo_types::{PublicUser, User, UserChanges};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("user not found")]
    NotFound,

    #[error("email already in use")]
    EmailTaken,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        let unique = e
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            RepoError::EmailTaken
        } else {
            RepoError::Database(e)
        }
    }
}

pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<PublicUser>, RepoError> {
    let users = sqlx::query_as::<_, PublicUser>(
        r#"
        SELECT id, name, email
        FROM users
        ORDER BY id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(users)
}

pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> Result<PublicUser, RepoError> {
    sqlx::query_as::<_, PublicUser>(
        r#"
        SELECT id, name, email
        FROM users
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepoError::NotFound)
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>, RepoError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash
        FROM users
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

pub async fn find_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>, RepoError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash
        FROM users
        WHERE email = ?1
        "#,
    )
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

/// Insert a user. A duplicate email (any case) yields `EmailTaken`.
pub async fn create(
    conn: &mut SqliteConnection,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<PublicUser, RepoError> {
    let user = sqlx::query_as::<_, PublicUser>(
        r#"
        INSERT INTO users (name, name_folded, email, password_hash)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, name, email
        "#,
    )
    .bind(name)
    .bind(fold(name))
    .bind(email)
    .bind(password_hash)
    .fetch_one(&mut *conn)
    .await?;
    Ok(user)
}

/// Apply name/email changes in a single statement; rows are untouched on conflict.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    changes: UserChanges<'_>,
) -> Result<PublicUser, RepoError> {
    if changes.is_empty() {
        return get_by_id(conn, id).await;
    }

    sqlx::query_as::<_, PublicUser>(
        r#"
        UPDATE users
           SET name        = COALESCE(?1, name),
               name_folded = COALESCE(?2, name_folded),
               email       = COALESCE(?3, email)
         WHERE id = ?4
        RETURNING id, name, email
        "#,
    )
    .bind(changes.name)
    .bind(changes.name.map(fold))
    .bind(changes.email)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepoError::NotFound)
}

pub async fn update_password(
    conn: &mut SqliteConnection,
    id: i64,
    password_hash: &str,
) -> Result<(), RepoError> {
    let res = sqlx::query(
        r#"
        UPDATE users
           SET password_hash = ?1
         WHERE id = ?2
        "#,
    )
    .bind(password_hash)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        return Err(RepoError::NotFound);
    }
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<(), RepoError> {
    let res = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if res.rows_affected() == 0 {
        return Err(RepoError::NotFound);
    }
    Ok(())
}

/// Case-insensitive (Unicode) substring match on `name`. Wildcards in `term` match literally.
pub async fn search_by_name(
    conn: &mut SqliteConnection,
    term: &str,
) -> Result<Vec<PublicUser>, RepoError> {
    let users = sqlx::query_as::<_, PublicUser>(
        r#"
        SELECT id, name, email
        FROM users
        WHERE name_folded LIKE ?1 ESCAPE '\'
        ORDER BY id
        "#,
    )
    .bind(contains_pattern(&fold(term)))
    .fetch_all(&mut *conn)
    .await?;
    Ok(users)
}

pub async fn count(conn: &mut SqliteConnection) -> Result<i64, RepoError> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await?;
    Ok(n)
}

// SQLite's LIKE and lower() only fold ASCII, so folding happens here.
fn fold(s: &str) -> String {
    s.to_lowercase()
}

fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
