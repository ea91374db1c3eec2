// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use curatarr_domain::{AlbumId, AlbumRecord, Artist, ArtistId, OwnershipStatus};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::repositories::{AlbumRepository, ArtistRepository, MatchUpdate};

// ============================================================================
// Artist Repository
// ============================================================================

#[derive(Clone)]
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn create(&self, artist: Artist) -> Result<Artist> {
        debug!(target: "repository", artist_id = %artist.id, "creating artist");
        let q = r#"
            INSERT INTO artists (id, name, foreign_artist_id, folder_link, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(q)
            .bind(artist.id.to_string())
            .bind(&artist.name)
            .bind(&artist.foreign_artist_id)
            .bind(&artist.folder_link)
            .bind(artist.created_at.to_rfc3339())
            .bind(artist.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn get_by_id(&self, id: ArtistId) -> Result<Option<Artist>> {
        debug!(target: "repository", %id, "fetching artist by id");
        let row = sqlx::query("SELECT * FROM artists WHERE id = ? LIMIT 1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_artist(&r)).transpose()
    }

    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<Artist>> {
        debug!(target: "repository", foreign_id, "fetching artist by foreign_id");
        let row = sqlx::query("SELECT * FROM artists WHERE foreign_artist_id = ? LIMIT 1")
            .bind(foreign_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_artist(&r)).transpose()
    }

    async fn set_folder_link(&self, id: ArtistId, folder_link: Option<&str>) -> Result<bool> {
        debug!(target: "repository", %id, ?folder_link, "setting artist folder link");
        let result = sqlx::query("UPDATE artists SET folder_link = ?, updated_at = ? WHERE id = ?")
            .bind(folder_link)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Album Repository
// ============================================================================

#[derive(Clone)]
pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

impl SqliteAlbumRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_by_foreign_id(
        &self,
        artist_id: ArtistId,
        foreign_id: &str,
    ) -> Result<Option<AlbumRecord>> {
        let row = sqlx::query(
            "SELECT * FROM albums WHERE artist_id = ? AND foreign_album_id = ? LIMIT 1",
        )
        .bind(artist_id.to_string())
        .bind(foreign_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_album(&r)).transpose()
    }
}

#[async_trait::async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn upsert(&self, album: AlbumRecord) -> Result<AlbumRecord> {
        debug!(target: "repository", album_id = %album.id, title = %album.title, "upserting album");
        let q = r#"
            INSERT INTO albums (
                id, artist_id, foreign_album_id, title, release_year, ownership_status,
                matched_folder_path, confidence, manual_override, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (artist_id, foreign_album_id) DO UPDATE SET
                title = excluded.title,
                release_year = excluded.release_year,
                updated_at = excluded.updated_at
        "#;

        sqlx::query(q)
            .bind(album.id.to_string())
            .bind(album.artist_id.to_string())
            .bind(&album.foreign_album_id)
            .bind(&album.title)
            .bind(album.release_year)
            .bind(album.ownership_status.to_string())
            .bind(&album.matched_folder_path)
            .bind(album.confidence)
            .bind(album.manual_override)
            .bind(album.created_at.to_rfc3339())
            .bind(album.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        let stored = match album.foreign_album_id.as_deref() {
            Some(foreign_id) => self.fetch_by_foreign_id(album.artist_id, foreign_id).await?,
            None => self.get_by_id(album.id).await?,
        };
        stored.ok_or_else(|| anyhow!("album {} vanished after upsert", album.id))
    }

    async fn get_by_id(&self, id: AlbumId) -> Result<Option<AlbumRecord>> {
        debug!(target: "repository", %id, "fetching album by id");
        let row = sqlx::query("SELECT * FROM albums WHERE id = ? LIMIT 1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_album(&r)).transpose()
    }

    async fn get_by_artist(&self, artist_id: ArtistId) -> Result<Vec<AlbumRecord>> {
        debug!(target: "repository", %artist_id, "listing albums by artist");
        let rows = sqlx::query(
            "SELECT * FROM albums WHERE artist_id = ? ORDER BY release_year, title, id",
        )
        .bind(artist_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(row_to_album(&r)?);
        }
        Ok(out)
    }

    async fn update_match(
        &self,
        id: AlbumId,
        status: OwnershipStatus,
        matched_folder_path: Option<&str>,
        confidence: Option<f64>,
    ) -> Result<MatchUpdate> {
        debug!(target: "repository", %id, %status, "writing album match");
        let q = r#"
            UPDATE albums
            SET ownership_status = ?, matched_folder_path = ?, confidence = ?, updated_at = ?
            WHERE id = ? AND manual_override = 0
        "#;
        let result = sqlx::query(q)
            .bind(status.to_string())
            .bind(matched_folder_path)
            .bind(confidence)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(MatchUpdate::Applied);
        }

        // nothing changed: tell a locked row apart from a missing one
        let manual: Option<bool> =
            sqlx::query_scalar("SELECT manual_override FROM albums WHERE id = ? LIMIT 1")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        Ok(match manual {
            Some(true) => MatchUpdate::ManualOverride,
            Some(false) => MatchUpdate::Applied,
            None => MatchUpdate::NotFound,
        })
    }

    async fn set_manual_ownership(
        &self,
        id: AlbumId,
        status: OwnershipStatus,
        matched_folder_path: Option<&str>,
    ) -> Result<Option<AlbumRecord>> {
        debug!(target: "repository", %id, %status, "setting manual ownership");
        let q = r#"
            UPDATE albums
            SET ownership_status = ?, matched_folder_path = ?, confidence = NULL,
                manual_override = 1, updated_at = ?
            WHERE id = ?
        "#;
        sqlx::query(q)
            .bind(status.to_string())
            .bind(matched_folder_path)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        self.get_by_id(id).await
    }

    async fn clear_manual_override(&self, id: AlbumId) -> Result<Option<AlbumRecord>> {
        debug!(target: "repository", %id, "clearing manual override");
        sqlx::query("UPDATE albums SET manual_override = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        self.get_by_id(id).await
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn parse_dt(s: String) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // SQLite CURRENT_TIMESTAMP default: "YYYY-MM-DD HH:MM:SS"
    let ndt = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

fn row_to_artist(row: &sqlx::sqlite::SqliteRow) -> Result<Artist> {
    let id_str: String = row.try_get("id")?;
    let created_at_s: String = row.try_get("created_at")?;
    let updated_at_s: String = row.try_get("updated_at")?;

    Ok(Artist {
        id: ArtistId::from_uuid(Uuid::parse_str(&id_str)?),
        name: row.try_get("name")?,
        foreign_artist_id: row.try_get("foreign_artist_id")?,
        folder_link: row.try_get("folder_link")?,
        created_at: parse_dt(created_at_s)?,
        updated_at: parse_dt(updated_at_s)?,
    })
}

fn row_to_album(row: &sqlx::sqlite::SqliteRow) -> Result<AlbumRecord> {
    let id_str: String = row.try_get("id")?;
    let artist_id_str: String = row.try_get("artist_id")?;
    let status_str: String = row.try_get("ownership_status")?;
    let created_at_s: String = row.try_get("created_at")?;
    let updated_at_s: String = row.try_get("updated_at")?;

    Ok(AlbumRecord {
        id: AlbumId::from_uuid(Uuid::parse_str(&id_str)?),
        artist_id: ArtistId::from_uuid(Uuid::parse_str(&artist_id_str)?),
        foreign_album_id: row.try_get("foreign_album_id")?,
        title: row.try_get("title")?,
        release_year: row.try_get("release_year")?,
        ownership_status: status_str.parse::<OwnershipStatus>()?,
        matched_folder_path: row.try_get("matched_folder_path")?,
        confidence: row.try_get("confidence")?,
        manual_override: row.try_get("manual_override")?,
        created_at: parse_dt(created_at_s)?,
        updated_at: parse_dt(updated_at_s)?,
    })
}
