use crate::error::ValidationError;
use crate::models::{
    check_single_line, Company, Documents, Ipo, IpoPatch, IpoRecord, NewCompany, NewIpo,
};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, Connection, Row};
use std::path::Path;
use tracing::{debug, info};

// ── Schema ────────────────────────────────────────────────────────────────────

// No foreign keys: an IPO delete clears its documents itself, in one
// transaction, and company existence is checked before writes.
const DDL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS company_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS ipo_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS document_id_seq START 1;

CREATE TABLE IF NOT EXISTS companies (
    id          BIGINT PRIMARY KEY DEFAULT nextval('company_id_seq'),
    name        VARCHAR NOT NULL,
    symbol      VARCHAR UNIQUE,
    logo        VARCHAR,
    created_at  TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS ipos (
    id                    BIGINT PRIMARY KEY DEFAULT nextval('ipo_id_seq'),
    company_id            BIGINT   NOT NULL,
    price_band            VARCHAR  NOT NULL,
    open_date             DATE     NOT NULL,
    close_date            DATE     NOT NULL,
    -- Free text ("₹3,042.51 Cr"), not a number
    issue_size            VARCHAR  NOT NULL,
    issue_type            VARCHAR  NOT NULL,
    listing_date          DATE,
    status                VARCHAR  NOT NULL,
    ipo_price             DOUBLE,
    listing_price         DOUBLE,
    listing_gain          DOUBLE,
    current_market_price  DOUBLE,
    current_return        DOUBLE,
    created_at            TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id          BIGINT PRIMARY KEY DEFAULT nextval('document_id_seq'),
    ipo_id      BIGINT NOT NULL UNIQUE,
    rhp_pdf     VARCHAR,
    drhp_pdf    VARCHAR,
    updated_at  TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

const IPO_COLUMNS: &str = r#"
    i.id, i.company_id, i.price_band, i.open_date, i.close_date,
    i.issue_size, i.issue_type, i.listing_date, i.status,
    i.ipo_price, i.listing_price, i.listing_gain,
    i.current_market_price, i.current_return, i.created_at,
    c.id, c.name, c.symbol, c.logo,
    d.ipo_id, d.rhp_pdf, d.drhp_pdf
"#;

// ── Row mapping ───────────────────────────────────────────────────────────────

/// Joined row as stored. `status` stays text until `into_record` checks it.
struct IpoRow {
    id: i64,
    company_id: i64,
    price_band: String,
    open_date: NaiveDate,
    close_date: NaiveDate,
    issue_size: String,
    issue_type: String,
    listing_date: Option<NaiveDate>,
    status: String,
    ipo_price: Option<f64>,
    listing_price: Option<f64>,
    listing_gain: Option<f64>,
    current_market_price: Option<f64>,
    current_return: Option<f64>,
    created_at: NaiveDateTime,
    company: Company,
    documents: Option<Documents>,
}

impl IpoRow {
    fn from_row(r: &Row<'_>) -> duckdb::Result<Self> {
        let doc_ipo_id: Option<i64> = r.get(19)?;
        Ok(Self {
            id: r.get(0)?,
            company_id: r.get(1)?,
            price_band: r.get(2)?,
            open_date: r.get(3)?,
            close_date: r.get(4)?,
            issue_size: r.get(5)?,
            issue_type: r.get(6)?,
            listing_date: r.get(7)?,
            status: r.get(8)?,
            ipo_price: r.get(9)?,
            listing_price: r.get(10)?,
            listing_gain: r.get(11)?,
            current_market_price: r.get(12)?,
            current_return: r.get(13)?,
            created_at: r.get(14)?,
            company: Company {
                id: r.get(15)?,
                name: r.get(16)?,
                symbol: r.get(17)?,
                logo: r.get(18)?,
            },
            documents: match doc_ipo_id {
                Some(ipo_id) => Some(Documents {
                    ipo_id,
                    rhp_pdf: r.get(20)?,
                    drhp_pdf: r.get(21)?,
                }),
                None => None,
            },
        })
    }

    /// Fails on a status outside the four known values rather than
    /// dropping the row.
    fn into_record(self) -> Result<IpoRecord> {
        let status = self
            .status
            .parse()
            .with_context(|| format!("IPO {} has a corrupt status", self.id))?;
        Ok(IpoRecord {
            ipo: Ipo {
                id: self.id,
                company_id: self.company_id,
                price_band: self.price_band,
                open_date: self.open_date,
                close_date: self.close_date,
                issue_size: self.issue_size,
                issue_type: self.issue_type,
                listing_date: self.listing_date,
                status,
                ipo_price: self.ipo_price,
                listing_price: self.listing_price,
                listing_gain: self.listing_gain,
                current_market_price: self.current_market_price,
                current_return: self.current_return,
                created_at: self.created_at,
            },
            company: self.company,
            documents: self.documents,
        })
    }
}

/// `QueryReturnedNoRows` becomes `None`.
fn optional<T>(res: duckdb::Result<T>) -> duckdb::Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn company_from_row(r: &Row<'_>) -> duckdb::Result<Company> {
    Ok(Company {
        id: r.get(0)?,
        name: r.get(1)?,
        symbol: r.get(2)?,
        logo: r.get(3)?,
    })
}

// ── Repository ────────────────────────────────────────────────────────────────

pub const IN_MEMORY: &str = ":memory:";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    /// Open the database file, creating its directory. `:memory:` gives a
    /// throwaway database.
    pub fn open(path: &Path) -> Result<Self> {
        if path == Path::new(IN_MEMORY) {
            return Self::open_in_memory();
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    // ── Companies ─────────────────────────────────────────────────────────────

    pub fn insert_company(&self, new: &NewCompany) -> Result<Company> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankCompanyName.into());
        }
        check_single_line("name", name)?;
        let symbol = new
            .symbol
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());
        if let Some(s) = &symbol {
            check_single_line("symbol", s)?;
        }
        let logo = new.logo.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let id: i64 = self
            .conn
            .query_row(
                "INSERT INTO companies (name, symbol, logo, created_at)
                 VALUES (?, ?, ?, ?) RETURNING id",
                params![name, symbol, logo, Utc::now().naive_utc()],
                |r| r.get(0),
            )
            .with_context(|| format!("insert company {}", name))?;

        debug!("company {} -> id {}", name, id);
        Ok(Company {
            id,
            name: name.to_string(),
            symbol,
            logo: logo.map(str::to_string),
        })
    }

    pub fn get_company(&self, id: i64) -> Result<Option<Company>> {
        let company = optional(self.conn.query_row(
            "SELECT id, name, symbol, logo FROM companies WHERE id = ?",
            params![id],
            company_from_row,
        ))?;
        Ok(company)
    }

    pub fn list_companies(&self) -> Result<Vec<Company>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, symbol, logo FROM companies ORDER BY name, id")?;
        let companies = stmt
            .query_map([], company_from_row)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(companies)
    }

    pub fn company_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM companies")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    fn ensure_company(&self, id: i64) -> Result<()> {
        if self.get_company(id)?.is_none() {
            return Err(ValidationError::UnknownCompany(id).into());
        }
        Ok(())
    }

    // ── IPOs ──────────────────────────────────────────────────────────────────

    pub fn insert_ipo(&self, new: &NewIpo) -> Result<i64> {
        self.ensure_company(new.company_id)?;

        let id: i64 = self
            .conn
            .query_row(
                r#"INSERT INTO ipos
                       (company_id, price_band, open_date, close_date, issue_size, issue_type,
                        listing_date, status, ipo_price, listing_price, listing_gain,
                        current_market_price, current_return, created_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                   RETURNING id"#,
                params![
                    new.company_id, new.price_band, new.open_date, new.close_date,
                    new.issue_size, new.issue_type, new.listing_date, new.status.as_str(),
                    new.ipo_price, new.listing_price, new.listing_gain,
                    new.current_market_price, new.current_return,
                    Utc::now().naive_utc(),
                ],
                |r| r.get(0),
            )
            .with_context(|| format!("insert IPO for company {}", new.company_id))?;

        debug!("IPO {} created ({})", id, new.status);
        Ok(id)
    }

    pub fn get_ipo(&self, id: i64) -> Result<Option<IpoRecord>> {
        let sql = format!(
            "SELECT {IPO_COLUMNS}
             FROM ipos i
             JOIN companies c ON c.id = i.company_id
             LEFT JOIN documents d ON d.ipo_id = i.id
             WHERE i.id = ?"
        );
        let row = optional(self.conn.query_row(&sql, params![id], IpoRow::from_row))
            .with_context(|| format!("load IPO {}", id))?;
        row.map(IpoRow::into_record).transpose()
    }

    /// Every IPO joined with company and documents, most recently created
    /// first.
    pub fn list_ipos(&self) -> Result<Vec<IpoRecord>> {
        let sql = format!(
            "SELECT {IPO_COLUMNS}
             FROM ipos i
             JOIN companies c ON c.id = i.company_id
             LEFT JOIN documents d ON d.ipo_id = i.id
             ORDER BY i.created_at DESC, i.id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], IpoRow::from_row)?
            .collect::<duckdb::Result<Vec<_>>>()
            .context("list IPOs")?;
        rows.into_iter().map(IpoRow::into_record).collect()
    }

    /// Apply a partial update and return the refreshed record.
    pub fn update_ipo(&self, id: i64, patch: &IpoPatch) -> Result<Option<IpoRecord>> {
        let Some(record) = self.get_ipo(id)? else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(record));
        }

        let mut ipo = record.ipo;
        patch.apply(&mut ipo)?;
        if patch.company_id.is_some() {
            self.ensure_company(ipo.company_id)?;
        }

        self.conn
            .execute(
                r#"UPDATE ipos SET
                       company_id = ?, price_band = ?, open_date = ?, close_date = ?,
                       issue_size = ?, issue_type = ?, listing_date = ?, status = ?,
                       ipo_price = ?, listing_price = ?, listing_gain = ?,
                       current_market_price = ?, current_return = ?
                   WHERE id = ?"#,
                params![
                    ipo.company_id, ipo.price_band, ipo.open_date, ipo.close_date,
                    ipo.issue_size, ipo.issue_type, ipo.listing_date, ipo.status.as_str(),
                    ipo.ipo_price, ipo.listing_price, ipo.listing_gain,
                    ipo.current_market_price, ipo.current_return,
                    id,
                ],
            )
            .with_context(|| format!("update IPO {}", id))?;

        self.get_ipo(id)
    }

    /// Delete an IPO and its documents. Returns false when no such IPO.
    pub fn delete_ipo(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let docs = tx.execute("DELETE FROM documents WHERE ipo_id = ?", params![id])?;
        let ipos = tx
            .execute("DELETE FROM ipos WHERE id = ?", params![id])
            .with_context(|| format!("delete IPO {}", id))?;
        tx.commit()?;

        debug!("IPO {}: {} row(s), {} document row(s) deleted", id, ipos, docs);
        Ok(ipos > 0)
    }

    pub fn ipo_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM ipos")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    // ── Documents ─────────────────────────────────────────────────────────────

    /// Upsert the prospectus slots. `None` keeps whatever is stored.
    pub fn upsert_documents(
        &self,
        ipo_id: i64,
        rhp_pdf: Option<&str>,
        drhp_pdf: Option<&str>,
    ) -> Result<Option<Documents>> {
        let exists: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ipos WHERE id = ?", params![ipo_id], |r| r.get(0))?;
        if exists == 0 {
            return Ok(None);
        }

        let docs = self
            .conn
            .query_row(
                r#"INSERT INTO documents (ipo_id, rhp_pdf, drhp_pdf, updated_at)
                   VALUES (?, ?, ?, ?)
                   ON CONFLICT (ipo_id) DO UPDATE SET
                       rhp_pdf    = COALESCE(excluded.rhp_pdf,  documents.rhp_pdf),
                       drhp_pdf   = COALESCE(excluded.drhp_pdf, documents.drhp_pdf),
                       updated_at = excluded.updated_at
                   RETURNING ipo_id, rhp_pdf, drhp_pdf"#,
                params![ipo_id, rhp_pdf, drhp_pdf, Utc::now().naive_utc()],
                |r| {
                    Ok(Documents {
                        ipo_id: r.get(0)?,
                        rhp_pdf: r.get(1)?,
                        drhp_pdf: r.get(2)?,
                    })
                },
            )
            .with_context(|| format!("save documents for IPO {}", ipo_id))?;
        Ok(Some(docs))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
