//! SQLite-based storage implementation

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use enrolkey_core::{
    Account, AccountDraft, AccountId, AccountProvisioner, AccountStore, CourseId,
    CourseOfferRepository, EnrolmentApplier, Error, GroupId, GroupSecret, GroupSecretRepository,
    MatchedOffer, OfferId, OfferScope, SelfEnrolmentOffer,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    CatalogStore, Course, Enrolment, OfferRecord, OfferSettings, Session, SessionId,
    SessionStore, StoreResult,
};
use crate::crypto::{generate_token, hash_password, verify_password};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

fn db_err(e: rusqlite::Error) -> Error {
    Error::Store(e.to_string())
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_optional_time(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// SQLite-based store implementing every collaborator trait
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(db_err)?;

        // Enable foreign keys
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(db_err)?;

        // Run migrations
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> StoreResult<()> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(db_err)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> StoreResult<i32> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(db_err)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                auth_type TEXT NOT NULL,
                confirmed INTEGER NOT NULL DEFAULT 0,
                secret TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Custom profile fields (one row per field)
            CREATE TABLE IF NOT EXISTS profile_fields (
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (account_id, name)
            );

            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            -- Self-enrolment instances
            CREATE TABLE IF NOT EXISTS offers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                scope TEXT NOT NULL,
                secret TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                enrol_start TEXT,
                enrol_end TEXT,
                max_enrolled INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_offers_secret ON offers(secret);

            CREATE TABLE IF NOT EXISTS course_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                secret TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_groups_secret ON course_groups(secret);

            CREATE TABLE IF NOT EXISTS enrolments (
                offer_id INTEGER NOT NULL REFERENCES offers(id) ON DELETE CASCADE,
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                enrolled_at TEXT NOT NULL,
                PRIMARY KEY (offer_id, account_id)
            );
            CREATE INDEX IF NOT EXISTS idx_enrolments_account ON enrolments(account_id);

            CREATE TABLE IF NOT EXISTS group_members (
                group_id INTEGER NOT NULL REFERENCES course_groups(id) ON DELETE CASCADE,
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                PRIMARY KEY (group_id, account_id)
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                csrf_token TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn load_profile(conn: &Connection, id: AccountId) -> StoreResult<BTreeMap<String, String>> {
        let mut stmt = conn
            .prepare("SELECT name, value FROM profile_fields WHERE account_id = ?1")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![id.0 as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_err)?;
        rows.collect::<Result<BTreeMap<_, _>, _>>().map_err(db_err)
    }

    fn find_account(
        conn: &Connection,
        column: &str,
        value: &dyn rusqlite::ToSql,
    ) -> StoreResult<Option<Account>> {
        let sql = format!(
            "SELECT id, username, email, auth_type, confirmed, secret FROM accounts WHERE {} = ?1",
            column
        );
        let account = conn
            .query_row(&sql, [value], |row| {
                Ok(Account {
                    id: AccountId(row.get::<_, i64>(0)? as u64),
                    username: row.get(1)?,
                    email: row.get(2)?,
                    auth_type: row.get(3)?,
                    confirmed: row.get::<_, i32>(4)? != 0,
                    secret: row.get(5)?,
                    profile: BTreeMap::new(),
                })
            })
            .optional()
            .map_err(db_err)?;

        match account {
            Some(mut account) => {
                account.profile = Self::load_profile(conn, account.id)?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    fn offer_from_row(row: &Row<'_>) -> rusqlite::Result<OfferRecord> {
        let scope: String = row.get(2)?;
        let scope = scope.parse::<OfferScope>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
        })?;
        Ok(OfferRecord {
            id: OfferId(row.get::<_, i64>(0)? as u64),
            settings: OfferSettings {
                course_id: CourseId(row.get::<_, i64>(1)? as u64),
                scope,
                secret: row.get(3)?,
                enabled: row.get::<_, i32>(4)? != 0,
                enrol_start: parse_optional_time(row.get(5)?),
                enrol_end: parse_optional_time(row.get(6)?),
                max_enrolled: row.get::<_, Option<i64>>(7)?.map(|m| m as u32),
            },
        })
    }

    fn load_offer(conn: &Connection, id: OfferId) -> StoreResult<Option<OfferRecord>> {
        conn.query_row(
            "SELECT id, course_id, scope, secret, enabled, enrol_start, enrol_end, max_enrolled
             FROM offers WHERE id = ?1",
            params![id.0 as i64],
            Self::offer_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn enrolled_count(conn: &Connection, id: OfferId) -> StoreResult<usize> {
        conn.query_row(
            "SELECT COUNT(*) FROM enrolments WHERE offer_id = ?1",
            params![id.0 as i64],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n as usize)
        .map_err(db_err)
    }
}

impl AccountProvisioner for SqliteStore {
    fn create_account(&self, draft: AccountDraft) -> StoreResult<AccountId> {
        let password_hash = hash_password(&draft.password)?;
        let email = draft.email.to_lowercase();

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        let username_taken: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = ?1)",
                params![draft.username],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if username_taken {
            return Err(Error::UsernameTaken);
        }

        let email_taken: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)",
                params![email],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if email_taken {
            return Err(Error::EmailTaken);
        }

        tx.execute(
            "INSERT INTO accounts (username, email, password_hash, auth_type, confirmed, secret, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                draft.username,
                email,
                password_hash,
                draft.auth_type,
                draft.confirmed as i32,
                draft.secret,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        let id = AccountId(tx.last_insert_rowid() as u64);

        for (name, value) in &draft.profile {
            tx.execute(
                "INSERT INTO profile_fields (account_id, name, value) VALUES (?1, ?2, ?3)",
                params![id.0 as i64, name, value],
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        Ok(id)
    }
}

impl AccountStore for SqliteStore {
    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        Self::find_account(&conn, "id", &(id.0 as i64))
    }

    fn get_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        Self::find_account(&conn, "username", &username)
    }

    fn set_confirmed(&self, id: AccountId, confirmed: bool) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE accounts SET confirmed = ?1 WHERE id = ?2",
                params![confirmed as i32, id.0 as i64],
            )
            .map_err(db_err)?;
        if updated == 0 {
            return Err(Error::AccountNotFound);
        }
        Ok(())
    }

    fn check_password(&self, id: AccountId, password: &str) -> StoreResult<bool> {
        let hash: String = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT password_hash FROM accounts WHERE id = ?1",
                params![id.0 as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?
            .ok_or(Error::AccountNotFound)?
        };
        verify_password(password, &hash)
    }

    fn set_password(&self, id: AccountId, password: &str) -> StoreResult<()> {
        let password_hash = hash_password(password)?;
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE accounts SET password_hash = ?1 WHERE id = ?2",
                params![password_hash, id.0 as i64],
            )
            .map_err(db_err)?;
        if updated == 0 {
            return Err(Error::AccountNotFound);
        }
        Ok(())
    }
}

impl CourseOfferRepository for SqliteStore {
    fn offers_with_secret(&self, secret: &str) -> StoreResult<Vec<SelfEnrolmentOffer>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, course_id, scope, secret, enabled, enrol_start, enrol_end, max_enrolled
                 FROM offers WHERE scope = 'course' AND secret = ?1 ORDER BY id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![secret], Self::offer_from_row)
            .map_err(db_err)?;

        rows.map(|r| r.map(|record| record.to_offer()).map_err(db_err))
            .collect()
    }
}

impl GroupSecretRepository for SqliteStore {
    fn group_offers_with_secret(
        &self,
        secret: &str,
    ) -> StoreResult<Vec<(SelfEnrolmentOffer, GroupSecret)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT o.id, o.course_id, o.secret, g.id, g.secret
                 FROM course_groups g
                 JOIN offers o ON o.course_id = g.course_id AND o.scope = 'group'
                 WHERE g.secret = ?1
                 ORDER BY g.id, o.id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![secret], |row| {
                let course_id = CourseId(row.get::<_, i64>(1)? as u64);
                Ok((
                    SelfEnrolmentOffer {
                        offer_id: OfferId(row.get::<_, i64>(0)? as u64),
                        course_id,
                        expected_secret: row.get(2)?,
                        scope: OfferScope::Group,
                    },
                    GroupSecret {
                        group_id: GroupId(row.get::<_, i64>(3)? as u64),
                        course_id,
                        secret: row.get(4)?,
                    },
                ))
            })
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }
}

impl EnrolmentApplier for SqliteStore {
    fn can_self_enrol(&self, offer: &MatchedOffer) -> bool {
        let conn = self.conn.lock().unwrap();
        let admitted = Self::load_offer(&conn, offer.offer_id()).and_then(|record| {
            let Some(record) = record else {
                return Ok(false);
            };
            let enrolled = Self::enrolled_count(&conn, record.id)?;
            Ok(record.settings.admits(enrolled, Utc::now()))
        });

        match admitted {
            Ok(admitted) => admitted,
            Err(e) => {
                tracing::warn!(offer = %offer.offer_id(), error = %e, "Admission check failed");
                false
            }
        }
    }

    fn apply_enrolment(&self, offer: &MatchedOffer, account: AccountId) -> StoreResult<()> {
        let offer_id = offer.offer_id();
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        let record = Self::load_offer(&tx, offer_id)?.ok_or(Error::OfferNotFound(offer_id))?;

        let already: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM enrolments WHERE offer_id = ?1 AND account_id = ?2)",
                params![offer_id.0 as i64, account.0 as i64],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        if !already {
            let enrolled = Self::enrolled_count(&tx, offer_id)?;
            if !record.settings.admits(enrolled, Utc::now()) {
                return Err(Error::Enrolment {
                    offer: offer_id,
                    reason: "enrolment closed or full".to_string(),
                });
            }
            tx.execute(
                "INSERT INTO enrolments (offer_id, account_id, enrolled_at) VALUES (?1, ?2, ?3)",
                params![offer_id.0 as i64, account.0 as i64, Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        }

        if let Some(group) = offer.group_id {
            tx.execute(
                "INSERT OR IGNORE INTO group_members (group_id, account_id) VALUES (?1, ?2)",
                params![group.0 as i64, account.0 as i64],
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)
    }
}

impl CatalogStore for SqliteStore {
    fn add_course(&self, name: &str) -> StoreResult<CourseId> {
        let conn = self.conn.lock().unwrap();
        conn.execute("INSERT INTO courses (name) VALUES (?1)", params![name])
            .map_err(db_err)?;
        Ok(CourseId(conn.last_insert_rowid() as u64))
    }

    fn get_course(&self, id: CourseId) -> StoreResult<Option<Course>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name FROM courses WHERE id = ?1",
            params![id.0 as i64],
            |row| {
                Ok(Course {
                    id: CourseId(row.get::<_, i64>(0)? as u64),
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    fn add_offer(&self, settings: OfferSettings) -> StoreResult<OfferId> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO offers (course_id, scope, secret, enabled, enrol_start, enrol_end, max_enrolled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                settings.course_id.0 as i64,
                settings.scope.as_str(),
                settings.secret,
                settings.enabled as i32,
                settings.enrol_start.map(|t| t.to_rfc3339()),
                settings.enrol_end.map(|t| t.to_rfc3339()),
                settings.max_enrolled.map(i64::from),
            ],
        )
        .map_err(db_err)?;
        Ok(OfferId(conn.last_insert_rowid() as u64))
    }

    fn get_offer(&self, id: OfferId) -> StoreResult<Option<OfferRecord>> {
        let conn = self.conn.lock().unwrap();
        Self::load_offer(&conn, id)
    }

    fn add_group(&self, course_id: CourseId, name: &str, secret: &str) -> StoreResult<GroupId> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO course_groups (course_id, name, secret) VALUES (?1, ?2, ?3)",
            params![course_id.0 as i64, name, secret],
        )
        .map_err(db_err)?;
        Ok(GroupId(conn.last_insert_rowid() as u64))
    }

    fn list_enrolments(&self, account: AccountId) -> StoreResult<Vec<Enrolment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT offer_id, account_id, enrolled_at FROM enrolments
                 WHERE account_id = ?1 ORDER BY enrolled_at, offer_id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![account.0 as i64], |row| {
                let enrolled_at: String = row.get(2)?;
                Ok(Enrolment {
                    offer_id: OfferId(row.get::<_, i64>(0)? as u64),
                    account: AccountId(row.get::<_, i64>(1)? as u64),
                    enrolled_at: parse_time(&enrolled_at),
                })
            })
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn group_members(&self, group: GroupId) -> StoreResult<Vec<AccountId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT account_id FROM group_members WHERE group_id = ?1 ORDER BY account_id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![group.0 as i64], |row| {
                Ok(AccountId(row.get::<_, i64>(0)? as u64))
            })
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }
}

impl SessionStore for SqliteStore {
    fn create_session(&self, account: AccountId) -> StoreResult<Session> {
        let conn = self.conn.lock().unwrap();
        let session = Session {
            id: SessionId(generate_token()),
            account,
            csrf_token: generate_token(),
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO sessions (id, account_id, csrf_token, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.0,
                account.0 as i64,
                session.csrf_token,
                session.created_at.to_rfc3339()
            ],
        )
        .map_err(db_err)?;

        Ok(session)
    }

    fn get_session(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, account_id, csrf_token, created_at FROM sessions WHERE id = ?1",
            params![session_id.0],
            |row| {
                let created_at: String = row.get(3)?;
                Ok(Session {
                    id: SessionId(row.get(0)?),
                    account: AccountId(row.get::<_, i64>(1)? as u64),
                    csrf_token: row.get(2)?,
                    created_at: parse_time(&created_at),
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    fn delete_session(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id.0])
            .map_err(db_err)?;
        Ok(())
    }
}
