use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Review, Season, Vote, VoteCategory},
    ports::{CatalogReadPort, MemberReadPort, ReviewReadPort, VoteReadPort, VoteWritePort},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    member_id: Uuid,
    perfume_id: Uuid,
    rating: f32,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            member_id: row.member_id,
            perfume_id: row.perfume_id,
            rating: row.rating,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    id: Uuid,
    member_id: Uuid,
    perfume_id: Uuid,
    category: String,
    value: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = AppError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let category = VoteCategory::from_str(&row.category).map_err(AppError::Internal)?;
        Ok(Vote {
            id: row.id,
            member_id: row.member_id,
            perfume_id: row.perfume_id,
            category,
            value: row.value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Review repository backed by Postgres
#[derive(Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewReadPort for PgReviewRepository {
    async fn positive_reviews(&self, member_id: Uuid, min_rating: f32) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, member_id, perfume_id, rating, created_at
            FROM reviews
            WHERE member_id = $1 AND rating >= $2
            ORDER BY created_at
            "#,
        )
        .bind(member_id)
        .bind(min_rating)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn reviews_by_member(&self, member_id: Uuid) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, member_id, perfume_id, rating, created_at
            FROM reviews
            WHERE member_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }
}

/// Catalog repository backed by Postgres
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogReadPort for PgCatalogRepository {
    async fn notes(&self, perfume_id: Uuid) -> AppResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT n.name
            FROM perfume_notes pn
            JOIN notes n ON n.id = pn.note_id
            WHERE pn.perfume_id = $1
            "#,
        )
        .bind(perfume_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    async fn accords(&self, perfume_id: Uuid) -> AppResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT a.name
            FROM perfume_accords pa
            JOIN accords a ON a.id = pa.accord_id
            WHERE pa.perfume_id = $1
            "#,
        )
        .bind(perfume_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    async fn brand(&self, perfume_id: Uuid) -> AppResult<Option<String>> {
        let name: Option<String> = sqlx::query_scalar(
            r#"
            SELECT b.name
            FROM perfumes p
            JOIN brands b ON b.id = p.brand_id
            WHERE p.id = $1
            "#,
        )
        .bind(perfume_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(name)
    }

    async fn most_reviewed(&self, limit: usize) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT p.id
            FROM perfumes p
            JOIN reviews r ON r.perfume_id = p.id
            WHERE p.approved = true
            GROUP BY p.id
            ORDER BY COUNT(r.id) DESC, p.id
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn by_season(&self, season: Season, limit: usize) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT ps.perfume_id
            FROM perfume_seasons ps
            JOIN perfumes p ON p.id = ps.perfume_id
            WHERE ps.season = $1 AND p.approved = true
            ORDER BY ps.strength DESC, ps.perfume_id
            LIMIT $2
            "#,
        )
        .bind(season.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

/// Member repository backed by Postgres
#[derive(Clone)]
pub struct PgMemberRepository {
    pool: PgPool,
}

impl PgMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberReadPort for PgMemberRepository {
    async fn liked_perfume_ids(&self, member_id: Uuid) -> AppResult<HashSet<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT perfume_id
            FROM perfume_likes
            WHERE member_id = $1
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn member_ids_with_reviews(&self) -> AppResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT member_id
            FROM reviews
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

/// Vote repository backed by Postgres
#[derive(Clone)]
pub struct PgVoteRepository {
    pool: PgPool,
}

impl PgVoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteReadPort for PgVoteRepository {
    async fn find_active(
        &self,
        member_id: Uuid,
        perfume_id: Uuid,
        category: VoteCategory,
    ) -> AppResult<Option<Vote>> {
        let row = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT id, member_id, perfume_id, category, value, created_at, updated_at
            FROM votes
            WHERE member_id = $1 AND perfume_id = $2 AND category = $3
            "#,
        )
        .bind(member_id)
        .bind(perfume_id)
        .bind(category.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Vote::try_from).transpose()
    }

    async fn votes_for_perfume(&self, perfume_id: Uuid) -> AppResult<Vec<Vote>> {
        let rows = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT id, member_id, perfume_id, category, value, created_at, updated_at
            FROM votes
            WHERE perfume_id = $1
            "#,
        )
        .bind(perfume_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Vote::try_from).collect()
    }
}

#[async_trait]
impl VoteWritePort for PgVoteRepository {
    async fn insert(&self, vote: Vote) -> AppResult<Vote> {
        sqlx::query(
            r#"
            INSERT INTO votes (id, member_id, perfume_id, category, value, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(vote.id)
        .bind(vote.member_id)
        .bind(vote.perfume_id)
        .bind(vote.category.to_string())
        .bind(&vote.value)
        .bind(vote.created_at)
        .bind(vote.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(vote)
    }

    async fn update_value(&self, vote_id: Uuid, value: &str) -> AppResult<Vote> {
        let row = sqlx::query_as::<_, VoteRow>(
            r#"
            UPDATE votes
            SET value = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, member_id, perfume_id, category, value, created_at, updated_at
            "#,
        )
        .bind(vote_id)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Vote::try_from(row),
            None => Err(AppError::NotFound(format!("vote {}", vote_id))),
        }
    }

    async fn delete(
        &self,
        member_id: Uuid,
        perfume_id: Uuid,
        category: VoteCategory,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM votes
            WHERE member_id = $1 AND perfume_id = $2 AND category = $3
            "#,
        )
        .bind(member_id)
        .bind(perfume_id)
        .bind(category.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
