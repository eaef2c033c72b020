//! In-memory username lookup in front of the `users` table.
//!
//! A cuckoo filter answers "definitely free" without touching the database,
//! a moka cache answers "taken" for recently active accounts, and anything
//! else falls through to a single indexed query.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

static TAKEN: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86_400))
        .build()
});

#[inline]
pub fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

fn might_exist(username: &String) -> bool {
    FILTER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(username)
}

fn add_all<'a>(usernames: impl IntoIterator<Item = &'a String>) {
    let mut filter = FILTER.write().unwrap_or_else(PoisonError::into_inner);
    for username in usernames {
        filter.add(username);
    }
}

/// Records a freshly registered username in both layers.
pub async fn record(username: &str) {
    let username = normalize(username);
    add_all([&username]);
    TAKEN.insert(username, ()).await;
}

pub async fn is_available(pool: &MySqlPool, username: &str) -> Result<bool, sqlx::Error> {
    let username = normalize(username);

    if !might_exist(&username) {
        return Ok(true);
    }

    if TAKEN.contains_key(&username) {
        return Ok(false);
    }

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(&username)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        TAKEN.insert(username, ()).await;
        return Ok(false);
    }

    Ok(true)
}

/// Streams every username into the filter, and the recently active ones into the cache.
pub async fn warmup(pool: &MySqlPool, recent_days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT username,
               COALESCE(last_login_at >= NOW() - INTERVAL ? DAY, 0) AS recent
        FROM users
        "#,
    )
    .bind(recent_days)
    .fetch(pool);

    let mut batch: Vec<String> = Vec::with_capacity(batch_size);
    let mut recent: Vec<String> = Vec::new();
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username, recent_flag) = row.context("username warmup row fetch failed")?;
        let username = normalize(&username);
        if recent_flag != 0 {
            recent.push(username.clone());
        }
        batch.push(username);
        total += 1;

        if batch.len() >= batch_size {
            add_all(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        add_all(&batch);
    }

    let recent_count = recent.len();
    futures::future::join_all(recent.into_iter().map(|u| TAKEN.insert(u, ()))).await;

    log::info!(
        "Username index warmup complete: {} users, {} active in the last {} days",
        total,
        recent_count,
        recent_days
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize("  Riya.Sen "), "riya.sen");
    }

    #[actix_web::test]
    async fn recorded_usernames_are_known_to_both_layers() {
        record("Index.Test.User").await;
        assert!(might_exist(&normalize("index.test.user")));
        assert!(TAKEN.contains_key(&normalize("INDEX.TEST.USER")));
    }
}
