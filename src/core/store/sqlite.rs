//! SQLite-backed rule store
//!
//! Two tables: `rules` holds one row per fact keyed by its deterministic rule
//! ID, and `grants` holds the ordered grant chain of each rule as `Kind:ID`
//! strings. Upserts keep the row's primary key, so scan order is the order in
//! which facts were first seen.

use super::RuleStore;
use crate::core::acl::{AccessControlRule, Grant, GrantChain};
use crate::core::iam::Principal;
use crate::error::{Result, SnitchError};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use tracing::{debug, info};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS rules (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        rule_id     TEXT NOT NULL UNIQUE,
        principal   TEXT NOT NULL,
        permission  TEXT NOT NULL,
        resource    TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_rules_permission ON rules(permission);
    CREATE INDEX IF NOT EXISTS idx_rules_resource ON rules(resource);

    CREATE TABLE IF NOT EXISTS grants (
        rule_id   TEXT NOT NULL REFERENCES rules(rule_id) ON DELETE CASCADE,
        position  INTEGER NOT NULL,
        value     TEXT NOT NULL,
        PRIMARY KEY (rule_id, position)
    );
";

const UPSERT_RULE: &str = "
    INSERT INTO rules (rule_id, principal, permission, resource, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(rule_id) DO UPDATE SET
        principal = excluded.principal,
        permission = excluded.permission,
        resource = excluded.resource,
        updated_at = excluded.updated_at
";

const SELECT_RULES: &str = "
    SELECT r.rule_id, r.principal, r.permission, r.resource, g.value
    FROM rules r
    JOIN grants g ON g.rule_id = r.rule_id
";

fn persist_err(err: rusqlite::Error) -> SnitchError {
    SnitchError::Persist(err.to_string())
}

fn query_err(err: rusqlite::Error) -> SnitchError {
    SnitchError::Query(err.to_string())
}

/// Rule store on a single SQLite connection
pub struct SqliteRuleStore {
    conn: Connection,
}

impl SqliteRuleStore {
    /// Open (or create) a store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening rule store at {:?}", path.as_ref());
        let conn = Connection::open(path).map_err(persist_err)?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(persist_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(persist_err)?;
        Ok(SqliteRuleStore { conn })
    }

    fn write_rule(conn: &Connection, rule: &AccessControlRule, now: &str) -> rusqlite::Result<()> {
        let rule_id = rule.id();

        conn.execute(
            UPSERT_RULE,
            params![
                rule_id.as_str(),
                rule.principal.to_string(),
                rule.permission,
                rule.resource,
                now
            ],
        )?;

        conn.execute("DELETE FROM grants WHERE rule_id = ?1", params![rule_id.as_str()])?;

        let mut insert =
            conn.prepare_cached("INSERT INTO grants (rule_id, position, value) VALUES (?1, ?2, ?3)")?;
        for (position, grant) in rule.grant_chain.grants().iter().enumerate() {
            insert.execute(params![rule_id.as_str(), position as i64, grant.to_string()])?;
        }
        Ok(())
    }

    /// Run a rule select and fold joined grant rows back into rules
    fn load(&self, sql: &str, args: &[&String]) -> Result<Vec<AccessControlRule>> {
        let mut stmt = self.conn.prepare(sql).map_err(query_err)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(query_err)?;

        // Rows arrive ordered by rule, then grant position
        let mut rules = Vec::new();
        let mut current: Option<(String, Principal, String, String, Vec<Grant>)> = None;

        for row in rows {
            let (rule_id, principal, permission, resource, grant) = row.map_err(query_err)?;
            let grant: Grant = grant
                .parse()
                .map_err(|e: SnitchError| SnitchError::Query(e.to_string()))?;

            if let Some((id, .., grants)) = current.as_mut() {
                if *id == rule_id {
                    grants.push(grant);
                    continue;
                }
            }

            if let Some(done) = current.take() {
                rules.push(Self::assemble(done)?);
            }
            let principal: Principal = principal
                .parse()
                .map_err(|e: SnitchError| SnitchError::Query(e.to_string()))?;
            current = Some((rule_id, principal, permission, resource, vec![grant]));
        }
        if let Some(done) = current.take() {
            rules.push(Self::assemble(done)?);
        }

        Ok(rules)
    }

    fn assemble(
        (_, principal, permission, resource, grants): (String, Principal, String, String, Vec<Grant>),
    ) -> Result<AccessControlRule> {
        let grant_chain =
            GrantChain::from_grants(grants).map_err(|e| SnitchError::Query(e.to_string()))?;
        Ok(AccessControlRule {
            principal,
            permission,
            resource,
            grant_chain,
        })
    }
}

impl RuleStore for SqliteRuleStore {
    fn upsert(&mut self, rule: &AccessControlRule) -> Result<()> {
        self.upsert_all(std::slice::from_ref(rule))
    }

    fn upsert_all(&mut self, rules: &[AccessControlRule]) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let tx = self.conn.transaction().map_err(persist_err)?;
        for rule in rules {
            Self::write_rule(&tx, rule, &now).map_err(persist_err)?;
        }
        tx.commit().map_err(persist_err)?;

        debug!("{} rules upserted", rules.len());
        Ok(())
    }

    fn scan(
        &self,
        resource_patterns: &[String],
        permission_patterns: &[String],
        exact: bool,
    ) -> Result<Vec<AccessControlRule>> {
        if !exact {
            // Wildcard semantics live in the matcher; a full scan is always safe
            let sql = format!("{} ORDER BY r.id, g.position", SELECT_RULES);
            return self.load(&sql, &[]);
        }

        if resource_patterns.is_empty() || permission_patterns.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = |n: usize| vec!["?"; n].join(", ");
        let sql = format!(
            "{} WHERE r.permission IN ({}) AND r.resource IN ({}) ORDER BY r.id, g.position",
            SELECT_RULES,
            placeholders(permission_patterns.len()),
            placeholders(resource_patterns.len())
        );
        let args: Vec<&String> = permission_patterns.iter().chain(resource_patterns).collect();
        self.load(&sql, &args)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM rules", [], |row| row.get(0))
            .map_err(query_err)?;
        Ok(count as usize)
    }
}
