use std::time::{Duration, Instant};

use sqlx::postgres::PgPool;

/// Round trip to the database. Returns how long the probe query took.
pub async fn health_check(pool: &PgPool) -> anyhow::Result<Duration> {
    let started = Instant::now();
    let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    anyhow::ensure!(one == 1, "unexpected health check result: {one}");
    Ok(started.elapsed())
}
