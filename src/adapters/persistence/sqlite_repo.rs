//! SQLite-backed repository via libsql. Implements UserRepo, MedicineRepo and EmergencyLogPort.
//!
//! One database file (meditrack.db) in the data directory. Profiles and schedules are
//! stored as JSON columns; dose history lives in its own table keyed by medicine id.
//! Timestamps are RFC 3339 strings, local dose times `YYYY-MM-DDTHH:MM:SS`.

use crate::domain::{
    Coordinates, DomainError, DoseRecord, EmergencyRequest, EmergencyStatus, Medicine, Profile,
    Schedule, User,
};
use crate::ports::{EmergencyLogPort, MedicineRepo, UserRepo};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use libsql::{params, Connection, Database, Row, TransactionBehavior};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

const DB_FILE: &str = "meditrack.db";
/// Applied to every connection so a writer waits for a held lock instead of failing.
const BUSY_TIMEOUT_PRAGMA: &str = "PRAGMA busy_timeout=5000";
const LOCAL_DT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    onboarding_step INTEGER NOT NULL DEFAULT 1,
    onboarding_complete INTEGER NOT NULL DEFAULT 0,
    profile_json TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#;

const MEDICINES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS medicines (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    dosage TEXT NOT NULL,
    time TEXT NOT NULL,
    schedule_json TEXT NOT NULL,
    notes TEXT,
    last_status INTEGER,
    last_taken TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#;
const MEDICINES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_medicines_user ON medicines (user_id, created_at)";

const DOSE_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dose_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    medicine_id TEXT NOT NULL,
    date TEXT NOT NULL,
    taken_at TEXT NOT NULL,
    completed INTEGER NOT NULL
)"#;
const DOSE_HISTORY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_dose_history_medicine ON dose_history (medicine_id, date)";

const EMERGENCY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS emergency_requests (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    transcription TEXT,
    latitude REAL,
    longitude REAL,
    status TEXT NOT NULL
)"#;
const EMERGENCY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_emergency_user ON emergency_requests (user_id, created_at DESC)";

const USER_COLUMNS: &str = "id, email, username, password_hash, first_name, last_name, \
     onboarding_step, onboarding_complete, profile_json, created_at, updated_at";

const MEDICINE_COLUMNS: &str = "id, user_id, name, dosage, time, schedule_json, notes, \
     last_status, last_taken, created_at, updated_at";

fn repo_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Repo(e.to_string())
}

fn parse_utc(s: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::Repo(format!("bad timestamp '{}': {}", s, e)))
}

fn parse_local(s: &str) -> Result<NaiveDateTime, DomainError> {
    NaiveDateTime::parse_from_str(s, LOCAL_DT_FORMAT)
        .map_err(|e| DomainError::Repo(format!("bad local time '{}': {}", s, e)))
}

/// Map a UNIQUE violation on users onto the client-facing conflict message.
fn map_user_write_err(e: libsql::Error) -> DomainError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint failed") {
        if msg.contains("users.email") {
            return DomainError::Conflict("Email already registered".to_string());
        }
        if msg.contains("users.username") {
            return DomainError::Conflict("Username already taken".to_string());
        }
    }
    DomainError::Repo(msg)
}

/// SQLite repository. Safe to share via Arc; each call opens its own connection.
///
/// Writes from this process queue on `write_gate` so concurrent handlers and the
/// reminder loop never race for the SQLite write lock. Other processes are covered
/// by the busy timeout.
pub struct SqliteRepo {
    db: Database,
    db_path: PathBuf,
    write_gate: Mutex<()>,
}

impl SqliteRepo {
    /// Connect to (or create) the database in `base_dir` and ensure the schema exists.
    ///
    /// Sets WAL mode and synchronous=NORMAL so the reminder loop can read while
    /// request handlers write.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(repo_err)?;
        let db_path = base.join(DB_FILE);
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(repo_err)?;
        let conn = db.connect().map_err(repo_err)?;

        // PRAGMA returns a row; use query and drain it (execute fails when rows are returned).
        for pragma in [
            BUSY_TIMEOUT_PRAGMA,
            "PRAGMA journal_mode=WAL",
            "PRAGMA synchronous=NORMAL",
        ] {
            let mut rows = conn
                .query(pragma, ())
                .await
                .map_err(|e| DomainError::Repo(format!("{} failed: {}", pragma, e)))?;
            while rows.next().await.map_err(repo_err)?.is_some() {}
        }

        for ddl in [
            USERS_TABLE,
            MEDICINES_TABLE,
            MEDICINES_INDEX,
            DOSE_HISTORY_TABLE,
            DOSE_HISTORY_INDEX,
            EMERGENCY_TABLE,
            EMERGENCY_INDEX,
        ] {
            conn.execute(ddl, ()).await.map_err(repo_err)?;
        }

        info!(path = %db_path.display(), "SQLite connected with WAL mode");
        Ok(Self {
            db,
            db_path,
            write_gate: Mutex::new(()),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn conn(&self) -> Result<Connection, DomainError> {
        let conn = self.db.connect().map_err(repo_err)?;
        {
            let mut rows = conn
                .query(BUSY_TIMEOUT_PRAGMA, ())
                .await
                .map_err(|e| DomainError::Repo(format!("{} failed: {}", BUSY_TIMEOUT_PRAGMA, e)))?;
            while rows.next().await.map_err(repo_err)?.is_some() {}
        }
        Ok(conn)
    }

    fn row_to_user(row: &Row) -> Result<User, DomainError> {
        let profile_json: String = row.get(8).map_err(repo_err)?;
        let profile: Profile = serde_json::from_str(&profile_json).map_err(repo_err)?;
        let step: i64 = row.get(6).map_err(repo_err)?;
        let complete: i64 = row.get(7).map_err(repo_err)?;
        let created_at: String = row.get(9).map_err(repo_err)?;
        let updated_at: String = row.get(10).map_err(repo_err)?;
        Ok(User {
            id: row.get(0).map_err(repo_err)?,
            email: row.get(1).map_err(repo_err)?,
            username: row.get(2).map_err(repo_err)?,
            password_hash: row.get(3).map_err(repo_err)?,
            first_name: row.get(4).map_err(repo_err)?,
            last_name: row.get(5).map_err(repo_err)?,
            onboarding_step: u8::try_from(step).unwrap_or(1),
            onboarding_complete: complete != 0,
            profile,
            created_at: parse_utc(&created_at)?,
            updated_at: parse_utc(&updated_at)?,
        })
    }

    /// History is attached by the caller.
    fn row_to_medicine(row: &Row) -> Result<Medicine, DomainError> {
        let schedule_json: String = row.get(5).map_err(repo_err)?;
        let schedule: Schedule = serde_json::from_str(&schedule_json).map_err(repo_err)?;
        let last_status: Option<i64> = row.get::<i64>(7).ok();
        let last_taken = match row.get::<String>(8).ok() {
            Some(s) => Some(parse_local(&s)?),
            None => None,
        };
        let created_at: String = row.get(9).map_err(repo_err)?;
        let updated_at: String = row.get(10).map_err(repo_err)?;
        Ok(Medicine {
            id: row.get(0).map_err(repo_err)?,
            user_id: row.get(1).map_err(repo_err)?,
            name: row.get(2).map_err(repo_err)?,
            dosage: row.get(3).map_err(repo_err)?,
            time: row.get(4).map_err(repo_err)?,
            schedule,
            notes: row.get::<String>(6).ok(),
            last_status: last_status.map(|v| v != 0),
            last_taken,
            created_at: parse_utc(&created_at)?,
            updated_at: parse_utc(&updated_at)?,
            history: Vec::new(),
        })
    }

    fn row_to_dose(row: &Row) -> Result<DoseRecord, DomainError> {
        let date: String = row.get(1).map_err(repo_err)?;
        let taken_at: String = row.get(2).map_err(repo_err)?;
        let completed: i64 = row.get(3).map_err(repo_err)?;
        Ok(DoseRecord {
            date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(repo_err)?,
            taken_at: parse_local(&taken_at)?,
            completed: completed != 0,
        })
    }

    fn row_to_emergency(row: &Row) -> Result<EmergencyRequest, DomainError> {
        let created_at: String = row.get(2).map_err(repo_err)?;
        let latitude = row.get::<f64>(4).ok();
        let longitude = row.get::<f64>(5).ok();
        let status: String = row.get(6).map_err(repo_err)?;
        Ok(EmergencyRequest {
            id: row.get(0).map_err(repo_err)?,
            user_id: row.get(1).map_err(repo_err)?,
            created_at: parse_utc(&created_at)?,
            transcription: row.get::<String>(3).ok(),
            coordinates: latitude
                .zip(longitude)
                .map(|(latitude, longitude)| Coordinates {
                    latitude,
                    longitude,
                }),
            status: EmergencyStatus::parse(&status),
        })
    }

    async fn query_one_user(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<User>, DomainError> {
        let conn = self.conn().await?;
        let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
        let mut rows = conn.query(&sql, params![value]).await.map_err(repo_err)?;
        match rows.next().await.map_err(repo_err)? {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn history_for(
        conn: &Connection,
        medicine_id: &str,
    ) -> Result<Vec<DoseRecord>, DomainError> {
        let mut rows = conn
            .query(
                "SELECT medicine_id, date, taken_at, completed FROM dose_history \
                 WHERE medicine_id = ?1 ORDER BY id",
                params![medicine_id],
            )
            .await
            .map_err(repo_err)?;
        let mut history = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            history.push(Self::row_to_dose(&row)?);
        }
        Ok(history)
    }
}

#[async_trait::async_trait]
impl UserRepo for SqliteRepo {
    async fn insert_user(&self, user: &User) -> Result<(), DomainError> {
        let profile_json = serde_json::to_string(&user.profile).map_err(repo_err)?;
        let _write = self.write_gate.lock().await;
        let conn = self.conn().await?;
        conn.execute(
            r#"
            INSERT INTO users (id, email, username, password_hash, first_name, last_name,
                               onboarding_step, onboarding_complete, profile_json, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                user.id.as_str(),
                user.email.as_str(),
                user.username.as_str(),
                user.password_hash.as_str(),
                user.first_name.as_str(),
                user.last_name.as_str(),
                user.onboarding_step as i64,
                user.onboarding_complete as i64,
                profile_json,
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339()
            ],
        )
        .await
        .map_err(map_user_write_err)?;
        debug!(user_id = %user.id, "user row inserted");
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, DomainError> {
        self.query_one_user("id", user_id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.query_one_user("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        self.query_one_user("username", username).await
    }

    async fn save_user(&self, user: &User) -> Result<(), DomainError> {
        let profile_json = serde_json::to_string(&user.profile).map_err(repo_err)?;
        let _write = self.write_gate.lock().await;
        let conn = self.conn().await?;
        let changed = conn
            .execute(
                r#"
                UPDATE users SET email = ?2, username = ?3, password_hash = ?4, first_name = ?5,
                    last_name = ?6, onboarding_step = ?7, onboarding_complete = ?8,
                    profile_json = ?9, updated_at = ?10
                WHERE id = ?1
                "#,
                params![
                    user.id.as_str(),
                    user.email.as_str(),
                    user.username.as_str(),
                    user.password_hash.as_str(),
                    user.first_name.as_str(),
                    user.last_name.as_str(),
                    user.onboarding_step as i64,
                    user.onboarding_complete as i64,
                    profile_json,
                    user.updated_at.to_rfc3339()
                ],
            )
            .await
            .map_err(map_user_write_err)?;
        if changed == 0 {
            return Err(DomainError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn list_user_ids(&self) -> Result<Vec<String>, DomainError> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query("SELECT id FROM users ORDER BY created_at", ())
            .await
            .map_err(repo_err)?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            ids.push(row.get::<String>(0).map_err(repo_err)?);
        }
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl MedicineRepo for SqliteRepo {
    async fn list_medicines(&self, user_id: &str) -> Result<Vec<Medicine>, DomainError> {
        let conn = self.conn().await?;
        let sql = format!(
            "SELECT {} FROM medicines WHERE user_id = ?1 ORDER BY created_at, rowid",
            MEDICINE_COLUMNS
        );
        let mut rows = conn.query(&sql, params![user_id]).await.map_err(repo_err)?;
        let mut medicines = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            medicines.push(Self::row_to_medicine(&row)?);
        }

        // One pass over the user's history instead of a query per medicine.
        let mut rows = conn
            .query(
                r#"
                SELECT h.medicine_id, h.date, h.taken_at, h.completed
                FROM dose_history h JOIN medicines m ON m.id = h.medicine_id
                WHERE m.user_id = ?1
                ORDER BY h.id
                "#,
                params![user_id],
            )
            .await
            .map_err(repo_err)?;
        let mut history: HashMap<String, Vec<DoseRecord>> = HashMap::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let medicine_id: String = row.get(0).map_err(repo_err)?;
            history
                .entry(medicine_id)
                .or_default()
                .push(Self::row_to_dose(&row)?);
        }
        for m in &mut medicines {
            if let Some(h) = history.remove(&m.id) {
                m.history = h;
            }
        }
        Ok(medicines)
    }

    async fn get_medicine(
        &self,
        user_id: &str,
        medicine_id: &str,
    ) -> Result<Option<Medicine>, DomainError> {
        let conn = self.conn().await?;
        let sql = format!(
            "SELECT {} FROM medicines WHERE id = ?1 AND user_id = ?2",
            MEDICINE_COLUMNS
        );
        let mut rows = conn
            .query(&sql, params![medicine_id, user_id])
            .await
            .map_err(repo_err)?;
        let Some(row) = rows.next().await.map_err(repo_err)? else {
            return Ok(None);
        };
        let mut medicine = Self::row_to_medicine(&row)?;
        medicine.history = Self::history_for(&conn, medicine_id).await?;
        Ok(Some(medicine))
    }

    async fn insert_medicine(&self, m: &Medicine) -> Result<(), DomainError> {
        let schedule_json = serde_json::to_string(&m.schedule).map_err(repo_err)?;
        let _write = self.write_gate.lock().await;
        let conn = self.conn().await?;
        conn.execute(
            &format!(
                "INSERT INTO medicines ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                MEDICINE_COLUMNS
            ),
            params![
                m.id.as_str(),
                m.user_id.as_str(),
                m.name.as_str(),
                m.dosage.as_str(),
                m.time.as_str(),
                schedule_json,
                m.notes.clone(),
                m.last_status.map(i64::from),
                m.last_taken.map(|t| t.format(LOCAL_DT_FORMAT).to_string()),
                m.created_at.to_rfc3339(),
                m.updated_at.to_rfc3339()
            ],
        )
        .await
        .map_err(repo_err)?;
        debug!(medicine_id = %m.id, user_id = %m.user_id, "medicine inserted");
        Ok(())
    }

    async fn update_medicine(&self, m: &Medicine) -> Result<(), DomainError> {
        let schedule_json = serde_json::to_string(&m.schedule).map_err(repo_err)?;
        let _write = self.write_gate.lock().await;
        let conn = self.conn().await?;
        let changed = conn
            .execute(
                r#"
                UPDATE medicines SET name = ?3, dosage = ?4, time = ?5, schedule_json = ?6,
                    notes = ?7, updated_at = ?8
                WHERE id = ?1 AND user_id = ?2
                "#,
                params![
                    m.id.as_str(),
                    m.user_id.as_str(),
                    m.name.as_str(),
                    m.dosage.as_str(),
                    m.time.as_str(),
                    schedule_json,
                    m.notes.clone(),
                    m.updated_at.to_rfc3339()
                ],
            )
            .await
            .map_err(repo_err)?;
        if changed == 0 {
            return Err(DomainError::NotFound("Medicine not found".to_string()));
        }
        Ok(())
    }

    async fn delete_medicine(&self, user_id: &str, medicine_id: &str) -> Result<bool, DomainError> {
        let _write = self.write_gate.lock().await;
        let conn = self.conn().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(repo_err)?;
        let deleted = tx
            .execute(
                "DELETE FROM medicines WHERE id = ?1 AND user_id = ?2",
                params![medicine_id, user_id],
            )
            .await
            .map_err(repo_err)?;
        if deleted > 0 {
            tx.execute(
                "DELETE FROM dose_history WHERE medicine_id = ?1",
                params![medicine_id],
            )
            .await
            .map_err(repo_err)?;
        }
        tx.commit().await.map_err(repo_err)?;
        Ok(deleted > 0)
    }

    async fn record_dose(
        &self,
        user_id: &str,
        medicine_id: &str,
        record: &DoseRecord,
    ) -> Result<bool, DomainError> {
        let taken_at = record.taken_at.format(LOCAL_DT_FORMAT).to_string();
        let _write = self.write_gate.lock().await;
        let conn = self.conn().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(repo_err)?;
        let changed = tx
            .execute(
                r#"
                UPDATE medicines SET last_status = ?3,
                    last_taken = CASE WHEN ?3 = 1 THEN ?4 ELSE last_taken END,
                    updated_at = ?5
                WHERE id = ?1 AND user_id = ?2
                "#,
                params![
                    medicine_id,
                    user_id,
                    record.completed as i64,
                    taken_at.as_str(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(repo_err)?;
        if changed == 0 {
            // Dropping the transaction rolls it back.
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO dose_history (medicine_id, date, taken_at, completed) VALUES (?1, ?2, ?3, ?4)",
            params![
                medicine_id,
                record.date.format("%Y-%m-%d").to_string(),
                taken_at.as_str(),
                record.completed as i64
            ],
        )
        .await
        .map_err(repo_err)?;
        tx.commit().await.map_err(repo_err)?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl EmergencyLogPort for SqliteRepo {
    async fn log_emergency(&self, request: &EmergencyRequest) -> Result<(), DomainError> {
        let _write = self.write_gate.lock().await;
        let conn = self.conn().await?;
        conn.execute(
            r#"
            INSERT INTO emergency_requests (id, user_id, created_at, transcription, latitude, longitude, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                request.id.as_str(),
                request.user_id.as_str(),
                request.created_at.to_rfc3339(),
                request.transcription.clone(),
                request.coordinates.map(|c| c.latitude),
                request.coordinates.map(|c| c.longitude),
                request.status.as_str()
            ],
        )
        .await
        .map_err(repo_err)?;
        Ok(())
    }

    async fn set_emergency_status(
        &self,
        request_id: &str,
        status: EmergencyStatus,
    ) -> Result<(), DomainError> {
        let _write = self.write_gate.lock().await;
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE emergency_requests SET status = ?2 WHERE id = ?1",
            params![request_id, status.as_str()],
        )
        .await
        .map_err(repo_err)?;
        Ok(())
    }

    async fn recent_emergencies(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<EmergencyRequest>, DomainError> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query(
                r#"
                SELECT id, user_id, created_at, transcription, latitude, longitude, status
                FROM emergency_requests
                WHERE user_id = ?1
                ORDER BY created_at DESC
                LIMIT ?2
                "#,
                params![user_id, limit as i64],
            )
            .await
            .map_err(repo_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            out.push(Self::row_to_emergency(&row)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime};
    use tempfile::TempDir;

    async fn repo() -> (SqliteRepo, TempDir) {
        let dir = TempDir::new().unwrap();
        let repo = SqliteRepo::connect(dir.path()).await.unwrap();
        (repo, dir)
    }

    fn user(id: &str, email: &str, username: &str) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            onboarding_step: 1,
            onboarding_complete: false,
            profile: Profile::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn medicine(id: &str, user_id: &str) -> Medicine {
        let now = Utc::now();
        Medicine {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: "Aspirin".to_string(),
            dosage: "100mg".to_string(),
            time: "08:00".to_string(),
            schedule: Schedule::Weekly {
                days: vec!["monday".to_string()],
            },
            notes: None,
            last_status: None,
            last_taken: None,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn user_roundtrip_and_uniqueness() {
        let (repo, _dir) = repo().await;
        let mut u = user("u1", "ada@example.com", "ada");
        u.profile.phone_number = Some("+1".to_string());
        repo.insert_user(&u).await.unwrap();

        let loaded = repo.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(loaded.id, "u1");
        assert_eq!(loaded.profile.phone_number.as_deref(), Some("+1"));
        assert!(repo.find_by_username("nobody").await.unwrap().is_none());

        let err = repo
            .insert_user(&user("u2", "ada@example.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ref m) if m == "Email already registered"));
        let err = repo
            .insert_user(&user("u3", "x@example.com", "ada"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ref m) if m == "Username already taken"));

        assert_eq!(repo.list_user_ids().await.unwrap(), vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn save_unknown_user_is_not_found() {
        let (repo, _dir) = repo().await;
        let err = repo.save_user(&user("ghost", "g@example.com", "g")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn medicines_are_scoped_to_owner() {
        let (repo, _dir) = repo().await;
        repo.insert_medicine(&medicine("m1", "u1")).await.unwrap();
        repo.insert_medicine(&medicine("m2", "u2")).await.unwrap();

        assert_eq!(repo.list_medicines("u1").await.unwrap().len(), 1);
        assert!(repo.get_medicine("u2", "m1").await.unwrap().is_none());
        assert!(!repo.delete_medicine("u2", "m1").await.unwrap());
        assert!(repo.delete_medicine("u1", "m1").await.unwrap());
        assert!(repo.list_medicines("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_dose_appends_history_and_sets_last_status() {
        let (repo, _dir) = repo().await;
        repo.insert_medicine(&medicine("m1", "u1")).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let at = day.and_time(NaiveTime::from_hms_opt(8, 5, 0).unwrap());
        let rec = DoseRecord {
            date: day,
            taken_at: at,
            completed: true,
        };
        assert!(repo.record_dose("u1", "m1", &rec).await.unwrap());
        assert!(!repo.record_dose("u2", "m1", &rec).await.unwrap());

        let later = DoseRecord {
            date: day + Duration::days(1),
            taken_at: at + Duration::days(1),
            completed: false,
        };
        assert!(repo.record_dose("u1", "m1", &later).await.unwrap());

        let m = repo.get_medicine("u1", "m1").await.unwrap().unwrap();
        assert_eq!(m.history, vec![rec.clone(), later.clone()]);
        assert_eq!(m.last_status, Some(false));
        // A "not taken" answer keeps the previous intake time.
        assert_eq!(m.last_taken, Some(rec.taken_at));

        let listed = repo.list_medicines("u1").await.unwrap();
        assert_eq!(listed[0].history.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dose_writes_all_land() {
        let (first, dir) = repo().await;
        let first = std::sync::Arc::new(first);
        // A second handle on the same file contends for the lock like another process.
        let second = std::sync::Arc::new(SqliteRepo::connect(dir.path()).await.unwrap());
        for i in 0..16 {
            first
                .insert_medicine(&medicine(&format!("m{i}"), "u1"))
                .await
                .unwrap();
        }

        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let rec = DoseRecord {
            date: day,
            taken_at: day.and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
            completed: true,
        };
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..16 {
            let repo = if i % 2 == 0 { first.clone() } else { second.clone() };
            let rec = rec.clone();
            tasks.spawn(async move { repo.record_dose("u1", &format!("m{i}"), &rec).await });
        }
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap();
            assert!(matches!(outcome, Ok(true)), "dose write failed: {outcome:?}");
        }

        let listed = first.list_medicines("u1").await.unwrap();
        assert_eq!(listed.len(), 16);
        assert!(listed.iter().all(|m| m.history.len() == 1 && m.last_status == Some(true)));
    }

    #[tokio::test]
    async fn emergency_log_newest_first() {
        let (repo, _dir) = repo().await;
        let base = Utc::now();
        for (i, id) in ["e1", "e2"].iter().enumerate() {
            repo.log_emergency(&EmergencyRequest {
                id: id.to_string(),
                user_id: "u1".to_string(),
                created_at: base + Duration::seconds(i as i64),
                transcription: Some("help".to_string()),
                coordinates: Some(Coordinates {
                    latitude: 1.5,
                    longitude: -2.25,
                }),
                status: EmergencyStatus::Pending,
            })
            .await
            .unwrap();
        }
        repo.set_emergency_status("e1", EmergencyStatus::Notified)
            .await
            .unwrap();

        let recent = repo.recent_emergencies("u1", 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "e2");
        assert_eq!(recent[1].status, EmergencyStatus::Notified);
        assert_eq!(recent[1].coordinates.unwrap().longitude, -2.25);
        assert!(repo.recent_emergencies("u2", 10).await.unwrap().is_empty());
    }
}
