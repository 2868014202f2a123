use std::borrow::Cow;

use chrono::{DateTime, Utc};
#[cfg(feature = "postgres")]
use sqlx::any::AnyKind;
use sqlx::AnyPool;

use super::PasteStore;
use crate::models::Paste;

macro_rules! select_paste {
    ($filter:literal) => {
        concat!(
            "SELECT id, fingerprint, title, content, delete_key, expires_at, created_at FROM \
             paste ",
            $filter
        )
    };
}

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to a database by URL and bring its schema up to date.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = AnyPool::connect(url).await?;
        match pool.any_kind() {
            #[cfg(feature = "postgres")]
            AnyKind::Postgres => sqlx::migrate!("migrations/postgres").run(&pool).await?,
            _ => sqlx::migrate!("migrations/sqlite").run(&pool).await?,
        }
        Ok(Self { pool })
    }

    /// Queries are written with `?` placeholders, Postgres wants `$n`.
    fn sql(&self, query: &'static str) -> Cow<'static, str> {
        match self.pool.any_kind() {
            #[cfg(feature = "postgres")]
            AnyKind::Postgres => Cow::Owned(numbered_placeholders(query)),
            _ => Cow::Borrowed(query),
        }
    }
}

impl PasteStore for Database {
    async fn find_by_fingerprint(&self, fingerprint: &str) -> crate::ApiResult<Option<Paste>> {
        let sql = self.sql(select_paste!(
            "WHERE fingerprint = ? ORDER BY created_at, id LIMIT 1"
        ));
        let paste = sqlx::query_as::<_, Paste>(&sql)
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await?;
        Ok(paste)
    }

    async fn find_by_id(&self, id: &str) -> crate::ApiResult<Option<Paste>> {
        let sql = self.sql(select_paste!("WHERE id = ?"));
        let paste = sqlx::query_as::<_, Paste>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(paste)
    }

    async fn insert(&self, paste: &Paste) -> crate::ApiResult<()> {
        let sql = self.sql(
            "INSERT INTO paste (id, fingerprint, title, content, delete_key, expires_at, \
             created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        );
        sqlx::query(&sql)
            .bind(paste.id.as_str())
            .bind(paste.fingerprint.as_str())
            .bind(paste.title.as_str())
            .bind(paste.content.as_str())
            .bind(paste.delete_key.as_str())
            .bind(paste.expires_at)
            .bind(paste.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> crate::ApiResult<()> {
        let sql = self.sql("DELETE FROM paste WHERE id = ?");
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_by_id_and_key(&self, id: &str, delete_key: &str) -> crate::ApiResult<bool> {
        let sql = self.sql("DELETE FROM paste WHERE id = ? AND delete_key = ?");
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(delete_key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> crate::ApiResult<u64> {
        let sql = self.sql("DELETE FROM paste WHERE expires_at IS NOT NULL AND expires_at <= ?");
        let result = sqlx::query(&sql).bind(now).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(feature = "postgres")]
fn numbered_placeholders(query: &str) -> String {
    let mut numbered = String::with_capacity(query.len() + 8);
    let mut n = 0;
    for c in query.chars() {
        if c == '?' {
            n += 1;
            numbered.push_str(&format!("${n}"));
        } else {
            numbered.push(c);
        }
    }
    numbered
}
