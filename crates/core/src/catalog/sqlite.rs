//! SQLite-backed catalog implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use rust_decimal::Decimal;

use super::{
    max_bound_minor, min_bound_minor, price_from_minor, price_to_minor, search_text,
    CandidateQuery, CatalogEntry, CatalogEntryPatch, CatalogError, CatalogStats, CatalogStore,
    Category, NewCatalogEntry, ShopLocation, ShopSnapshot,
};

const ENTRY_COLUMNS: &str = "id, sku, name, description, tags, price_minor, category_id, \
     available, shop_id, shop_name, shop_lat, shop_lng, snapshot_synced_at, created_at, updated_at";

/// SQLite-backed product catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Create a new SQLite catalog, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                slug TEXT NOT NULL UNIQUE
            );

            -- One row per product; shop_* columns are a snapshot of the shop
            CREATE TABLE IF NOT EXISTS catalog_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sku TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '[]',
                search_text TEXT NOT NULL,
                price_minor INTEGER NOT NULL,
                category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                available INTEGER NOT NULL DEFAULT 1,
                shop_id INTEGER NOT NULL,
                shop_name TEXT NOT NULL DEFAULT '',
                shop_lat REAL,
                shop_lng REAL,
                snapshot_synced_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK ((shop_lat IS NULL) = (shop_lng IS NULL))
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_entries_geo
                ON catalog_entries(available, shop_lat, shop_lng);
            CREATE INDEX IF NOT EXISTS idx_catalog_entries_shop ON catalog_entries(shop_id);
            CREATE INDEX IF NOT EXISTS idx_catalog_entries_category ON catalog_entries(category_id);
            CREATE INDEX IF NOT EXISTS idx_catalog_entries_updated ON catalog_entries(updated_at);
            CREATE INDEX IF NOT EXISTS idx_catalog_entries_price ON catalog_entries(price_minor);
            "#,
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Internal("catalog connection lock poisoned".to_string()))
    }

    /// Build the WHERE clause for a candidate query.
    fn build_where_clause(
        query: &CandidateQuery,
    ) -> Result<(String, Vec<Box<dyn rusqlite::ToSql>>), CatalogError> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        let filter = &query.filter;

        if filter.available_only {
            conditions.push("available = 1");
        }

        if let Some(category_id) = filter.category_id {
            conditions.push("category_id = ?");
            params.push(Box::new(category_id));
        }

        if let Some(min) = filter.min_price {
            conditions.push("price_minor >= ?");
            params.push(Box::new(minor_bound(min, min_bound_minor(min))?));
        }

        if let Some(max) = filter.max_price {
            conditions.push("price_minor <= ?");
            params.push(Box::new(minor_bound(max, max_bound_minor(max))?));
        }

        if let Some(ref sku) = filter.sku {
            conditions.push("sku = ?");
            params.push(Box::new(sku.clone()));
        }

        if let Some(ref needle) = query.text {
            conditions.push("instr(search_text, ?) > 0");
            params.push(Box::new(needle.clone()));
        }

        if let Some(bbox) = query.bbox {
            conditions.push("shop_lat IS NOT NULL AND shop_lng IS NOT NULL");
            conditions.push("shop_lat BETWEEN ? AND ?");
            params.push(Box::new(bbox.min_lat));
            params.push(Box::new(bbox.max_lat));

            if bbox.crosses_antimeridian() {
                conditions.push("(shop_lng >= ? OR shop_lng <= ?)");
            } else {
                conditions.push("shop_lng BETWEEN ? AND ?");
            }
            params.push(Box::new(bbox.min_lng));
            params.push(Box::new(bbox.max_lng));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        Ok((where_clause, params))
    }

    fn get_with(conn: &Connection, id: i64) -> Result<CatalogEntry, CatalogError> {
        let sql = format!("SELECT {} FROM catalog_entries WHERE id = ?", ENTRY_COLUMNS);
        conn.query_row(&sql, params![id], Self::row_to_entry)
            .optional()
            .map_err(map_db_error)?
            .ok_or_else(|| CatalogError::NotFound(format!("catalog entry {}", id)))
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<CatalogEntry> {
        let tags_json: String = row.get(4)?;
        let tags: Vec<String> = serde_json::from_str(&tags_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        let synced_at: Option<String> = row.get(12)?;
        let synced_at = synced_at
            .map(|s| parse_timestamp(12, &s))
            .transpose()?;
        let created_at: String = row.get(13)?;
        let updated_at: String = row.get(14)?;

        Ok(CatalogEntry {
            id: row.get(0)?,
            sku: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            tags,
            price: price_from_minor(row.get(5)?),
            category_id: row.get(6)?,
            available: row.get(7)?,
            shop: ShopSnapshot {
                shop_id: row.get(8)?,
                shop_name: row.get(9)?,
                latitude: row.get(10)?,
                longitude: row.get(11)?,
                synced_at,
            },
            created_at: parse_timestamp(13, &created_at)?,
            updated_at: parse_timestamp(14, &updated_at)?,
        })
    }
}

impl CatalogStore for SqliteCatalog {
    fn candidates(&self, query: &CandidateQuery) -> Result<Vec<CatalogEntry>, CatalogError> {
        let (where_clause, params) = Self::build_where_clause(query)?;
        let conn = self.lock()?;

        let sql = format!(
            "SELECT {} FROM catalog_entries {} ORDER BY id ASC",
            ENTRY_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql).map_err(map_db_error)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_entry)
            .map_err(map_db_error)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(map_db_error)?);
        }
        Ok(entries)
    }

    fn get(&self, id: i64) -> Result<CatalogEntry, CatalogError> {
        let conn = self.lock()?;
        Self::get_with(&conn, id)
    }

    fn get_by_sku(&self, sku: &str) -> Result<CatalogEntry, CatalogError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM catalog_entries WHERE sku = ?", ENTRY_COLUMNS);
        conn.query_row(&sql, params![sku], Self::row_to_entry)
            .optional()
            .map_err(map_db_error)?
            .ok_or_else(|| CatalogError::NotFound(format!("sku {}", sku)))
    }

    fn insert(&self, entry: NewCatalogEntry) -> Result<CatalogEntry, CatalogError> {
        if entry.shop.has_partial_coordinate() {
            return Err(CatalogError::InvalidInput(
                "shop snapshot has only one coordinate component".to_string(),
            ));
        }
        let price_minor = price_to_minor(entry.price)?;
        let tags_json = serde_json::to_string(&entry.tags)
            .map_err(|e| CatalogError::Internal(e.to_string()))?;
        let text = search_text(&entry.name, &entry.description, &entry.tags);
        let now = Utc::now();
        let now_str = format_timestamp(&now);
        let synced_str = entry.shop.synced_at.as_ref().map(format_timestamp);

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO catalog_entries
                (sku, name, description, tags, search_text, price_minor, category_id, available,
                 shop_id, shop_name, shop_lat, shop_lng, snapshot_synced_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
            params![
                entry.sku,
                entry.name,
                entry.description,
                tags_json,
                text,
                price_minor,
                entry.category_id,
                entry.available,
                entry.shop.shop_id,
                entry.shop.shop_name,
                entry.shop.latitude,
                entry.shop.longitude,
                synced_str,
                now_str,
            ],
        )
        .map_err(map_db_error)?;

        let id = conn.last_insert_rowid();
        Self::get_with(&conn, id)
    }

    fn update(&self, id: i64, patch: &CatalogEntryPatch) -> Result<CatalogEntry, CatalogError> {
        let conn = self.lock()?;
        let mut entry = Self::get_with(&conn, id)?;
        patch.apply(&mut entry);
        entry.updated_at = Utc::now();

        let price_minor = price_to_minor(entry.price)?;
        let tags_json = serde_json::to_string(&entry.tags)
            .map_err(|e| CatalogError::Internal(e.to_string()))?;
        let text = search_text(&entry.name, &entry.description, &entry.tags);

        conn.execute(
            "UPDATE catalog_entries
             SET name = ?, description = ?, tags = ?, search_text = ?, price_minor = ?,
                 category_id = ?, available = ?, updated_at = ?
             WHERE id = ?",
            params![
                entry.name,
                entry.description,
                tags_json,
                text,
                price_minor,
                entry.category_id,
                entry.available,
                format_timestamp(&entry.updated_at),
                id,
            ],
        )
        .map_err(map_db_error)?;

        Self::get_with(&conn, id)
    }

    fn delete(&self, id: i64) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        let changed = conn
            .execute("DELETE FROM catalog_entries WHERE id = ?", params![id])
            .map_err(map_db_error)?;
        if changed == 0 {
            return Err(CatalogError::NotFound(format!("catalog entry {}", id)));
        }
        Ok(())
    }

    fn apply_shop_snapshot(&self, location: &ShopLocation) -> Result<u64, CatalogError> {
        location.validate()?;
        let observed = format_timestamp(&location.observed_at);

        let conn = self.lock()?;
        // Single statement: readers see either the old or the new pair.
        let changed = conn
            .execute(
                "UPDATE catalog_entries
                 SET shop_name = ?1, shop_lat = ?2, shop_lng = ?3, snapshot_synced_at = ?4
                 WHERE shop_id = ?5
                   AND (snapshot_synced_at IS NULL OR snapshot_synced_at <= ?4)",
                params![
                    location.name,
                    location.latitude,
                    location.longitude,
                    observed,
                    location.shop_id,
                ],
            )
            .map_err(map_db_error)?;

        Ok(changed as u64)
    }

    fn shop_ids(&self) -> Result<Vec<i64>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT shop_id FROM catalog_entries ORDER BY shop_id")
            .map_err(map_db_error)?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(map_db_error)?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(map_db_error)?);
        }
        Ok(ids)
    }

    fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name, slug FROM categories ORDER BY name")
            .map_err(map_db_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    slug: row.get(2)?,
                })
            })
            .map_err(map_db_error)?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row.map_err(map_db_error)?);
        }
        Ok(categories)
    }

    fn insert_category(&self, name: &str, slug: &str) -> Result<Category, CatalogError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO categories (name, slug) VALUES (?, ?)",
            params![name, slug],
        )
        .map_err(map_db_error)?;

        Ok(Category {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let conn = self.lock()?;

        let count = |sql: &str| -> Result<u64, CatalogError> {
            conn.query_row(sql, [], |row| row.get(0))
                .map_err(map_db_error)
        };

        let total_entries = count("SELECT COUNT(*) FROM catalog_entries")?;
        let available_entries = count("SELECT COUNT(*) FROM catalog_entries WHERE available = 1")?;
        let entries_with_coordinates =
            count("SELECT COUNT(*) FROM catalog_entries WHERE shop_lat IS NOT NULL")?;
        let distinct_shops = count("SELECT COUNT(DISTINCT shop_id) FROM catalog_entries")?;
        let never_synced_entries =
            count("SELECT COUNT(*) FROM catalog_entries WHERE snapshot_synced_at IS NULL")?;

        let oldest_snapshot: Option<DateTime<Utc>> = conn
            .query_row(
                "SELECT MIN(snapshot_synced_at) FROM catalog_entries",
                [],
                |row| {
                    let s: Option<String> = row.get(0)?;
                    Ok(s)
                },
            )
            .map_err(map_db_error)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(CatalogStats {
            total_entries,
            available_entries,
            entries_with_coordinates,
            distinct_shops,
            never_synced_entries,
            oldest_snapshot,
        })
    }
}

fn minor_bound(price: Decimal, minor: Option<i64>) -> Result<i64, CatalogError> {
    minor.ok_or_else(|| CatalogError::InvalidInput(format!("price bound out of range: {}", price)))
}

/// Fixed-width UTC timestamps so text comparison matches time order.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn map_db_error(e: rusqlite::Error) -> CatalogError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, ref msg)
            if err.code == ErrorCode::ConstraintViolation =>
        {
            let detail = msg.clone().unwrap_or_else(|| err.to_string());
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                CatalogError::InvalidInput(detail)
            } else {
                CatalogError::Conflict(detail)
            }
        }
        other => CatalogError::Database(other.to_string()),
    }
}
