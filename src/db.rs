use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, UpasError};
use crate::models::{AssistanceTypeConfig, BeneficiaryDraft, Campaign, ImportedBeneficiary};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS assistance_types (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    laterality_required INTEGER NOT NULL DEFAULT 0,
    schooling_required INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS campaigns (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    assistance_type_id INTEGER NOT NULL,
    start_date TEXT,
    end_date TEXT,
    participant_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (assistance_type_id) REFERENCES assistance_types(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    campaign_id INTEGER NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    total_rows INTEGER NOT NULL,
    imported_count INTEGER NOT NULL,
    warning_count INTEGER NOT NULL,
    checksum TEXT,
    FOREIGN KEY (campaign_id) REFERENCES campaigns(id)
);

CREATE TABLE IF NOT EXISTS beneficiaries (
    id INTEGER PRIMARY KEY,
    campaign_id INTEGER NOT NULL,
    assistance_type_id INTEGER NOT NULL,
    last_name TEXT NOT NULL,
    first_name TEXT NOT NULL,
    sex TEXT NOT NULL,
    birth_date TEXT,
    phone TEXT NOT NULL,
    email TEXT,
    address TEXT,
    national_id TEXT,
    laterality TEXT,
    schooling INTEGER,
    not_from_campaign INTEGER NOT NULL DEFAULT 0,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    deleted_at TEXT,
    FOREIGN KEY (campaign_id) REFERENCES campaigns(id),
    FOREIGN KEY (assistance_type_id) REFERENCES assistance_types(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_beneficiaries_phone ON beneficiaries(phone);
CREATE INDEX IF NOT EXISTS idx_beneficiaries_identity
    ON beneficiaries(last_name, first_name, birth_date);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_stored_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

// ---------------------------------------------------------------------------
// Beneficiary store
// ---------------------------------------------------------------------------

/// Accepted rows of one file plus the audit details recorded with them.
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub campaign_id: i64,
    pub file_name: String,
    pub checksum: String,
    pub total_rows: usize,
    pub warning_count: usize,
    pub rows: Vec<BeneficiaryDraft>,
}

/// Lookups used by duplicate detection and the atomic commit of a batch.
pub trait BeneficiaryStore {
    fn find_by_phone(&self, phone: &str) -> Result<Option<i64>>;

    fn find_by_identity(
        &self,
        last_name: &str,
        first_name: &str,
        birth_date: NaiveDate,
    ) -> Result<Option<i64>>;

    /// Persist every row or none of them. Returns the new ids in row order.
    fn insert_batch(&mut self, batch: &ImportBatch) -> Result<Vec<i64>>;
}

impl BeneficiaryStore for Connection {
    fn find_by_phone(&self, phone: &str) -> Result<Option<i64>> {
        let mut stmt = self.prepare_cached(
            "SELECT id FROM beneficiaries WHERE phone = ?1 AND deleted_at IS NULL ORDER BY id LIMIT 1",
        )?;
        Ok(stmt.query_row([phone], |row| row.get(0)).optional()?)
    }

    fn find_by_identity(
        &self,
        last_name: &str,
        first_name: &str,
        birth_date: NaiveDate,
    ) -> Result<Option<i64>> {
        let mut stmt = self.prepare_cached(
            "SELECT id FROM beneficiaries \
             WHERE last_name = ?1 AND first_name = ?2 AND birth_date = ?3 AND deleted_at IS NULL \
             ORDER BY id LIMIT 1",
        )?;
        Ok(stmt
            .query_row(
                rusqlite::params![last_name, first_name, fmt_date(birth_date)],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn insert_batch(&mut self, batch: &ImportBatch) -> Result<Vec<i64>> {
        let tx = self.transaction()?;
        tx.execute(
            "INSERT INTO imports (filename, campaign_id, total_rows, imported_count, warning_count, checksum) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                batch.file_name,
                batch.campaign_id,
                batch.total_rows as i64,
                batch.rows.len() as i64,
                batch.warning_count as i64,
                batch.checksum,
            ],
        )?;
        let import_id = tx.last_insert_rowid();

        let mut ids = Vec::with_capacity(batch.rows.len());
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO beneficiaries (campaign_id, assistance_type_id, last_name, first_name, sex, \
                 birth_date, phone, email, address, national_id, laterality, schooling, not_from_campaign, import_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13)",
            )?;
            for row in &batch.rows {
                stmt.execute(rusqlite::params![
                    row.campaign_id,
                    row.assistance_type_id,
                    row.last_name,
                    row.first_name,
                    row.sex.code(),
                    row.birth_date.map(fmt_date),
                    row.phone,
                    row.email,
                    row.address,
                    row.national_id,
                    row.laterality.map(|l| l.label()),
                    row.schooling,
                    import_id,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

pub fn add_assistance_type(
    conn: &Connection,
    name: &str,
    laterality_required: bool,
    schooling_required: bool,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO assistance_types (name, laterality_required, schooling_required) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, laterality_required, schooling_required],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_assistance_types(conn: &Connection) -> Result<Vec<AssistanceTypeConfig>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, laterality_required, schooling_required FROM assistance_types ORDER BY name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AssistanceTypeConfig {
                id: row.get(0)?,
                name: row.get(1)?,
                laterality_required: row.get(2)?,
                schooling_required: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn add_campaign(
    conn: &Connection,
    name: &str,
    assistance_type: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<i64> {
    let type_id: i64 = conn
        .query_row(
            "SELECT id FROM assistance_types WHERE name = ?1",
            [assistance_type],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| UpasError::UnknownAssistanceType(assistance_type.to_string()))?;
    conn.execute(
        "INSERT INTO campaigns (name, assistance_type_id, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, type_id, start_date.map(fmt_date), end_date.map(fmt_date)],
    )?;
    Ok(conn.last_insert_rowid())
}

const CAMPAIGN_SELECT: &str = "SELECT c.id, c.name, c.start_date, c.end_date, \
     t.id, t.name, t.laterality_required, t.schooling_required, c.participant_count \
     FROM campaigns c JOIN assistance_types t ON c.assistance_type_id = t.id";

fn campaign_from_row(row: &rusqlite::Row) -> rusqlite::Result<(Campaign, i64)> {
    Ok((
        Campaign {
            id: row.get(0)?,
            name: row.get(1)?,
            start_date: parse_stored_date(row.get(2)?),
            end_date: parse_stored_date(row.get(3)?),
            assistance: AssistanceTypeConfig {
                id: row.get(4)?,
                name: row.get(5)?,
                laterality_required: row.get(6)?,
                schooling_required: row.get(7)?,
            },
        },
        row.get(8)?,
    ))
}

/// Campaigns with their denormalized participant count.
pub fn list_campaigns(conn: &Connection) -> Result<Vec<(Campaign, i64)>> {
    let mut stmt = conn.prepare(&format!("{CAMPAIGN_SELECT} ORDER BY c.id"))?;
    let rows = stmt
        .query_map([], campaign_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Look a campaign up by name, falling back to a numeric id.
pub fn find_campaign(conn: &Connection, name_or_id: &str) -> Result<Campaign> {
    let by_name = conn
        .query_row(
            &format!("{CAMPAIGN_SELECT} WHERE c.name = ?1"),
            [name_or_id],
            campaign_from_row,
        )
        .optional()?;
    if let Some((campaign, _)) = by_name {
        return Ok(campaign);
    }
    if let Ok(id) = name_or_id.parse::<i64>() {
        let by_id = conn
            .query_row(
                &format!("{CAMPAIGN_SELECT} WHERE c.id = ?1"),
                [id],
                campaign_from_row,
            )
            .optional()?;
        if let Some((campaign, _)) = by_id {
            return Ok(campaign);
        }
    }
    Err(UpasError::UnknownCampaign(name_or_id.to_string()))
}

/// Recompute the campaign's denormalized participant count.
pub fn refresh_participant_count(conn: &Connection, campaign_id: i64) -> Result<i64> {
    conn.execute(
        "UPDATE campaigns SET participant_count = \
         (SELECT count(*) FROM beneficiaries WHERE campaign_id = ?1 AND deleted_at IS NULL) \
         WHERE id = ?1",
        [campaign_id],
    )?;
    let count = conn.query_row(
        "SELECT participant_count FROM campaigns WHERE id = ?1",
        [campaign_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn get_campaign_beneficiaries(
    conn: &Connection,
    campaign_id: i64,
) -> Result<Vec<ImportedBeneficiary>> {
    let mut stmt = conn.prepare(
        "SELECT id, campaign_id, assistance_type_id, last_name, first_name, sex, birth_date, phone, \
         email, address, national_id, laterality, schooling, not_from_campaign, created_at \
         FROM beneficiaries WHERE campaign_id = ?1 AND deleted_at IS NULL ORDER BY id",
    )?;
    let rows = stmt
        .query_map([campaign_id], |row| {
            Ok(ImportedBeneficiary {
                id: row.get(0)?,
                campaign_id: row.get(1)?,
                assistance_type_id: row.get(2)?,
                last_name: row.get(3)?,
                first_name: row.get(4)?,
                sex: row.get(5)?,
                birth_date: row.get(6)?,
                phone: row.get(7)?,
                email: row.get(8)?,
                address: row.get(9)?,
                national_id: row.get(10)?,
                laterality: row.get(11)?,
                schooling: row.get(12)?,
                not_from_campaign: row.get(13)?,
                created_at: row.get(14)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    pub fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    pub fn seed_campaign(conn: &Connection, laterality: bool, schooling: bool) -> Campaign {
        let type_name = format!("Type {laterality}-{schooling}");
        add_assistance_type(conn, &type_name, laterality, schooling).unwrap();
        let name = format!("Campagne {type_name}");
        add_campaign(conn, &name, &type_name, None, None).unwrap();
        find_campaign(conn, &name).unwrap()
    }
}
