// SQLite-backed moderation store.
//
// Member records sit on the hot path (every automod strike reads and writes
// one), so they go through a bounded write-through cache. Configs and
// settings are stored as JSON blobs; the audit log is append-only rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::collections::VecDeque;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use crate::core::moderation::{
    AutomodConfig, GuildSettings, InviteData, MemberRecord, ModLogEntry, ModLogKind,
    ModerationStore, StoreError,
};

/// Upper bound on cached member records before the oldest are evicted.
const MEMBER_CACHE_CAP: usize = 10_000;

pub struct SqliteModStore {
    pool: Pool<Sqlite>,
    member_cache: DashMap<(u64, u64), MemberRecord>,
    cache_order: Mutex<VecDeque<(u64, u64)>>,
    // One entry per guild, so this stays small without an eviction scheme.
    config_cache: DashMap<u64, AutomodConfig>,
}

impl SqliteModStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self {
            pool,
            member_cache: DashMap::new(),
            cache_order: Mutex::new(VecDeque::new()),
            config_cache: DashMap::new(),
        };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS member_records (
                guild_id INTEGER NOT NULL,
                member_id INTEGER NOT NULL,
                strikes INTEGER NOT NULL DEFAULT 0,
                warnings INTEGER NOT NULL DEFAULT 0,
                inviter_id INTEGER,
                invite_code TEXT,
                invites_tracked INTEGER NOT NULL DEFAULT 0,
                invites_fake INTEGER NOT NULL DEFAULT 0,
                invites_left INTEGER NOT NULL DEFAULT 0,
                invites_added INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, member_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS automod_configs (
                guild_id INTEGER PRIMARY KEY,
                config TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id INTEGER PRIMARY KEY,
                settings TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mod_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                target_id INTEGER NOT NULL,
                issuer_id INTEGER NOT NULL,
                issuer_tag TEXT NOT NULL,
                reason TEXT NOT NULL,
                kind TEXT NOT NULL,
                at TEXT NOT NULL,
                channel_id INTEGER,
                deleted_count INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_mod_logs_target ON mod_logs (guild_id, target_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn cache_put(&self, record: MemberRecord) {
        let key = (record.guild_id, record.member_id);
        let fresh = self.member_cache.insert(key, record).is_none();
        if fresh {
            let mut order = match self.cache_order.lock() {
                Ok(order) => order,
                Err(poisoned) => poisoned.into_inner(),
            };
            order.push_back(key);
            while order.len() > MEMBER_CACHE_CAP {
                if let Some(evicted) = order.pop_front() {
                    self.member_cache.remove(&evicted);
                }
            }
        }
    }

    fn row_to_member(row: &sqlx::sqlite::SqliteRow) -> MemberRecord {
        MemberRecord {
            guild_id: row.get::<i64, _>("guild_id") as u64,
            member_id: row.get::<i64, _>("member_id") as u64,
            strikes: row.get::<i64, _>("strikes") as u32,
            warnings: row.get::<i64, _>("warnings") as u32,
            invites: InviteData {
                inviter: row
                    .get::<Option<i64>, _>("inviter_id")
                    .map(|id| id as u64),
                code: row.get::<Option<String>, _>("invite_code"),
                tracked: row.get::<i64, _>("invites_tracked") as u32,
                fake: row.get::<i64, _>("invites_fake") as u32,
                left: row.get::<i64, _>("invites_left") as u32,
                added: row.get::<i64, _>("invites_added") as u32,
            },
        }
    }
}

#[async_trait]
impl ModerationStore for SqliteModStore {
    async fn member_record(
        &self,
        guild_id: u64,
        member_id: u64,
    ) -> Result<MemberRecord, StoreError> {
        if let Some(cached) = self.member_cache.get(&(guild_id, member_id)) {
            return Ok(cached.clone());
        }

        let row = sqlx::query(
            "SELECT * FROM member_records WHERE guild_id = ? AND member_id = ?",
        )
        .bind(guild_id as i64)
        .bind(member_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let record = row
            .map(|r| Self::row_to_member(&r))
            .unwrap_or_else(|| MemberRecord::new(guild_id, member_id));
        self.cache_put(record.clone());
        Ok(record)
    }

    async fn save_member_record(&self, record: &MemberRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO member_records (
                guild_id, member_id, strikes, warnings,
                inviter_id, invite_code,
                invites_tracked, invites_fake, invites_left, invites_added
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(guild_id, member_id) DO UPDATE SET
                strikes = excluded.strikes,
                warnings = excluded.warnings,
                inviter_id = excluded.inviter_id,
                invite_code = excluded.invite_code,
                invites_tracked = excluded.invites_tracked,
                invites_fake = excluded.invites_fake,
                invites_left = excluded.invites_left,
                invites_added = excluded.invites_added
            "#,
        )
        .bind(record.guild_id as i64)
        .bind(record.member_id as i64)
        .bind(record.strikes as i64)
        .bind(record.warnings as i64)
        .bind(record.invites.inviter.map(|id| id as i64))
        .bind(record.invites.code.as_deref())
        .bind(record.invites.tracked as i64)
        .bind(record.invites.fake as i64)
        .bind(record.invites.left as i64)
        .bind(record.invites.added as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        self.cache_put(record.clone());
        Ok(())
    }

    async fn automod_config(&self, guild_id: u64) -> Result<AutomodConfig, StoreError> {
        if let Some(cached) = self.config_cache.get(&guild_id) {
            return Ok(cached.clone());
        }

        let row = sqlx::query("SELECT config FROM automod_configs WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let config = match row {
            Some(row) => serde_json::from_str(&row.get::<String, _>(0))
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            None => AutomodConfig::default(),
        };
        self.config_cache.insert(guild_id, config.clone());
        Ok(config)
    }

    async fn save_automod_config(
        &self,
        guild_id: u64,
        config: &AutomodConfig,
    ) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(config).map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO automod_configs (guild_id, config) VALUES (?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET config = excluded.config
            "#,
        )
        .bind(guild_id as i64)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        self.config_cache.insert(guild_id, config.clone());
        Ok(())
    }

    async fn guild_settings(&self, guild_id: u64) -> Result<GuildSettings, StoreError> {
        let row = sqlx::query("SELECT settings FROM guild_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match row {
            Some(row) => serde_json::from_str(&row.get::<String, _>(0))
                .map_err(|e| StoreError::Backend(e.to_string())),
            None => Ok(GuildSettings::default()),
        }
    }

    async fn save_guild_settings(
        &self,
        guild_id: u64,
        settings: &GuildSettings,
    ) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(settings).map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO guild_settings (guild_id, settings) VALUES (?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET settings = excluded.settings
            "#,
        )
        .bind(guild_id as i64)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn append_mod_log(&self, entry: &ModLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO mod_logs (
                guild_id, target_id, issuer_id, issuer_tag,
                reason, kind, at, channel_id, deleted_count
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.guild_id as i64)
        .bind(entry.target_id as i64)
        .bind(entry.issuer_id as i64)
        .bind(&entry.issuer_tag)
        .bind(&entry.reason)
        .bind(entry.kind.to_string())
        .bind(entry.at.to_rfc3339())
        .bind(entry.channel_id.map(|id| id as i64))
        .bind(entry.deleted_count.map(|n| n as i64))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn mod_logs(
        &self,
        guild_id: u64,
        target_id: u64,
        limit: u32,
    ) -> Result<Vec<ModLogEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT guild_id, target_id, issuer_id, issuer_tag,
                   reason, kind, at, channel_id, deleted_count
            FROM mod_logs
            WHERE guild_id = ? AND target_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(guild_id as i64)
        .bind(target_id as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let kind = ModLogKind::from_str(&row.get::<String, _>("kind"))
                    .map_err(StoreError::Backend)?;
                let at = DateTime::parse_from_rfc3339(&row.get::<String, _>("at"))
                    .map_err(|e| StoreError::Backend(e.to_string()))?
                    .with_timezone(&Utc);
                Ok(ModLogEntry {
                    guild_id: row.get::<i64, _>("guild_id") as u64,
                    target_id: row.get::<i64, _>("target_id") as u64,
                    issuer_id: row.get::<i64, _>("issuer_id") as u64,
                    issuer_tag: row.get::<String, _>("issuer_tag"),
                    reason: row.get::<String, _>("reason"),
                    kind,
                    at,
                    channel_id: row.get::<Option<i64>, _>("channel_id").map(|id| id as u64),
                    deleted_count: row
                        .get::<Option<i64>, _>("deleted_count")
                        .map(|n| n as u64),
                })
            })
            .collect()
    }
}
