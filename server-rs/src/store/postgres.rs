use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool};
use uuid::Uuid;

use super::Store;
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::{
    Match, NewPlayer, NewSignup, Player, PlayerRef, PlayerUpdate, Position, RosterRow, Signup,
    SignupUpdate, Team,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes LIKE metacharacters so the query is matched literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn name_taken(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Validation("Display name is already taken".into())
    } else {
        AppError::Database(err)
    }
}

/// Locks the match row for the rest of the transaction and returns its
/// capacity. Concurrent signups for the same match queue up behind this lock.
async fn lock_match(conn: &mut PgConnection, match_id: Uuid) -> AppResult<i32> {
    sqlx::query_scalar::<_, i32>("SELECT capacity FROM matches WHERE id = $1 FOR UPDATE")
        .bind(match_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Match not found".into()))
}

async fn ensure_room(
    conn: &mut PgConnection,
    match_id: Uuid,
    capacity: i32,
    enforce: bool,
) -> AppResult<()> {
    if !enforce {
        return Ok(());
    }
    let taken: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::bigint FROM signups WHERE match_id = $1")
            .bind(match_id)
            .fetch_one(&mut *conn)
            .await?;
    if taken >= capacity as i64 {
        return Err(AppError::MatchFull);
    }
    Ok(())
}

async fn fetch_player(conn: &mut PgConnection, id: Uuid) -> AppResult<Player> {
    sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Player not found".into()))
}

async fn upsert_player_by_name(conn: &mut PgConnection, name: &str) -> AppResult<Player> {
    // The no-op update makes RETURNING yield the existing row on conflict.
    let player = sqlx::query_as::<_, Player>(
        r#"INSERT INTO players (id, display_name)
        VALUES ($1, $2)
        ON CONFLICT (display_name) DO UPDATE SET display_name = EXCLUDED.display_name
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(player)
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    async fn is_admin(&self, user_id: Uuid) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM admins WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_admin(&self, user_id: Uuid, role: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO admins (user_id, role) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_or_create_player(&self, display_name: &str) -> AppResult<Player> {
        let mut conn = self.pool.acquire().await?;
        upsert_player_by_name(&mut conn, display_name).await
    }

    async fn create_player(&self, new: &NewPlayer) -> AppResult<Player> {
        sqlx::query_as::<_, Player>(
            r#"INSERT INTO players (id, display_name, image_url, preferred_position)
            VALUES ($1, $2, $3, $4)
            RETURNING *"#,
        )
        .bind(new.id)
        .bind(&new.display_name)
        .bind(&new.image_url)
        .bind(new.preferred_position)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Validation("Player or display name already exists".into())
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn get_player(&self, id: Uuid) -> AppResult<Option<Player>> {
        let player = sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(player)
    }

    async fn list_players(&self) -> AppResult<Vec<Player>> {
        let players = sqlx::query_as::<_, Player>(
            "SELECT * FROM players ORDER BY lower(display_name), display_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(players)
    }

    async fn search_players(&self, query: &str, limit: i64) -> AppResult<Vec<Player>> {
        let players = sqlx::query_as::<_, Player>(
            r#"SELECT * FROM players
            WHERE display_name ILIKE $1
            ORDER BY lower(display_name), display_name
            LIMIT $2"#,
        )
        .bind(like_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(players)
    }

    async fn update_player(&self, id: Uuid, update: &PlayerUpdate) -> AppResult<Option<Player>> {
        let mut tx = self.pool.begin().await?;

        let current: Option<Player> =
            sqlx::query_as("SELECT * FROM players WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(mut player) = current else {
            return Ok(None);
        };
        update.apply(&mut player);

        let saved = sqlx::query_as::<_, Player>(
            r#"UPDATE players
            SET display_name = $2, image_url = $3, preferred_position = $4
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(&player.display_name)
        .bind(&player.image_url)
        .bind(player.preferred_position)
        .fetch_one(&mut *tx)
        .await
        .map_err(name_taken)?;

        tx.commit().await?;
        Ok(Some(saved))
    }

    async fn insert_match(&self, m: &Match) -> AppResult<()> {
        sqlx::query(
            r#"INSERT INTO matches (id, starts_at, ends_at, location, capacity, is_private, match_type,
                total_cost, rented_by_player_id, rented_by_name, description, created_by, created_by_label, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"#,
        )
        .bind(m.id)
        .bind(m.starts_at)
        .bind(m.ends_at)
        .bind(&m.location)
        .bind(m.capacity)
        .bind(m.is_private)
        .bind(m.match_type)
        .bind(m.total_cost)
        .bind(m.rented_by_player_id)
        .bind(&m.rented_by_name)
        .bind(&m.description)
        .bind(m.created_by)
        .bind(&m.created_by_label)
        .bind(m.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_match(&self, id: Uuid) -> AppResult<Option<Match>> {
        let m = sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(m)
    }

    async fn list_upcoming(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Match>> {
        let matches = sqlx::query_as::<_, Match>(
            "SELECT * FROM matches WHERE starts_at >= $1 ORDER BY starts_at ASC LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(matches)
    }

    async fn count_upcoming(&self, now: DateTime<Utc>) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*)::bigint FROM matches WHERE starts_at >= $1")
                .bind(now)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn replace_match(&self, m: &Match) -> AppResult<bool> {
        let result = sqlx::query(
            r#"UPDATE matches SET
                starts_at = $2, ends_at = $3, location = $4, capacity = $5, is_private = $6,
                match_type = $7, total_cost = $8, rented_by_player_id = $9, rented_by_name = $10,
                description = $11
            WHERE id = $1"#,
        )
        .bind(m.id)
        .bind(m.starts_at)
        .bind(m.ends_at)
        .bind(&m.location)
        .bind(m.capacity)
        .bind(m.is_private)
        .bind(m.match_type)
        .bind(m.total_cost)
        .bind(m.rented_by_player_id)
        .bind(&m.rented_by_name)
        .bind(&m.description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_match(&self, id: Uuid) -> AppResult<bool> {
        // signups.match_id cascades
        let result = sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_signup(&self, new: &NewSignup) -> AppResult<Signup> {
        let mut tx = self.pool.begin().await?;

        let capacity = lock_match(&mut tx, new.match_id).await?;
        let player = match &new.player {
            PlayerRef::Existing(id) => fetch_player(&mut tx, *id).await?,
            PlayerRef::ByName(name) => upsert_player_by_name(&mut tx, name).await?,
        };

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM signups WHERE match_id = $1 AND player_id = $2)",
        )
        .bind(new.match_id)
        .bind(player.id)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Err(AppError::DuplicateSignup);
        }
        ensure_room(&mut tx, new.match_id, capacity, new.enforce_capacity).await?;

        let signup = sqlx::query_as::<_, Signup>(
            r#"INSERT INTO signups (match_id, player_id, team, position, display_name_snapshot)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (match_id, player_id) DO NOTHING
            RETURNING *"#,
        )
        .bind(new.match_id)
        .bind(player.id)
        .bind(new.team)
        .bind(new.position)
        .bind(&player.display_name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::DuplicateSignup)?;

        tx.commit().await?;
        Ok(signup)
    }

    async fn upsert_signup(
        &self,
        match_id: Uuid,
        player_id: Uuid,
        team: Team,
        position: Option<Position>,
        enforce_capacity: bool,
    ) -> AppResult<Signup> {
        let mut tx = self.pool.begin().await?;

        let capacity = lock_match(&mut tx, match_id).await?;
        let player = fetch_player(&mut tx, player_id).await?;

        let reassigned = sqlx::query_as::<_, Signup>(
            r#"UPDATE signups SET team = $3, position = $4
            WHERE match_id = $1 AND player_id = $2
            RETURNING *"#,
        )
        .bind(match_id)
        .bind(player_id)
        .bind(team)
        .bind(position)
        .fetch_optional(&mut *tx)
        .await?;

        let signup = match reassigned {
            Some(s) => s,
            None => {
                ensure_room(&mut tx, match_id, capacity, enforce_capacity).await?;
                sqlx::query_as::<_, Signup>(
                    r#"INSERT INTO signups (match_id, player_id, team, position, display_name_snapshot)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (match_id, player_id)
                    DO UPDATE SET team = EXCLUDED.team, position = EXCLUDED.position
                    RETURNING *"#,
                )
                .bind(match_id)
                .bind(player_id)
                .bind(team)
                .bind(position)
                .bind(&player.display_name)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(signup)
    }

    async fn update_signup(
        &self,
        match_id: Uuid,
        player_id: Uuid,
        update: &SignupUpdate,
    ) -> AppResult<Option<Signup>> {
        let signup = sqlx::query_as::<_, Signup>(
            r#"UPDATE signups SET
                team = COALESCE($3, team),
                position = CASE WHEN $4 THEN $5 ELSE position END
            WHERE match_id = $1 AND player_id = $2
            RETURNING *"#,
        )
        .bind(match_id)
        .bind(player_id)
        .bind(update.team)
        .bind(update.position.is_some())
        .bind(update.position.flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(signup)
    }

    async fn delete_signup(&self, match_id: Uuid, player_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM signups WHERE match_id = $1 AND player_id = $2")
            .bind(match_id)
            .bind(player_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_roster(&self, match_id: Uuid) -> AppResult<Vec<RosterRow>> {
        let rows = sqlx::query_as::<_, RosterRow>(
            r#"SELECT s.match_id, s.player_id, s.team, s.position, s.display_name_snapshot, s.created_at,
                p.display_name, p.image_url, p.preferred_position
            FROM signups s
            JOIN players p ON p.id = s.player_id
            WHERE s.match_id = $1
            ORDER BY s.created_at ASC"#,
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_signups(&self, match_id: Uuid) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*)::bigint FROM signups WHERE match_id = $1")
                .bind(match_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn count_signups_since(&self, since: DateTime<Utc>) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*)::bigint FROM signups WHERE created_at >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
