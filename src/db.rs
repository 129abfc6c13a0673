//! Read-only access to the per-benchmark SQLite databases.
//!
//! Each database lives at `database/<db_id>/<db_id>.sqlite` under the
//! benchmark directory. A [`SqlDatabase`] wraps one connection behind a
//! mutex so it can be shared across async tasks, and exposes the schema
//! introspection the context builder needs. The [`DatabaseRegistry`] opens
//! every database referenced by the dataset exactly once, in the order the
//! examples first mention them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use itertools::Itertools;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags};
use tracing::debug;

use crate::dataset::SpiderExample;
use crate::error::{Result, SqlGenError};

#[derive(Debug)]
pub struct SqlDatabase {
    db_id: String,
    connection: Mutex<Connection>,
}

struct ColumnInfo {
    name: String,
    data_type: String,
    pk_position: i64,
}

struct ForeignKey {
    from_column: String,
    target_table: String,
    target_column: Option<String>,
}

impl SqlDatabase {
    /// Opens the database read-only. The file must already exist; generated
    /// queries must never create or modify benchmark data.
    pub fn open(db_id: &str, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SqlGenError::Dataset(format!(
                "Database file not found: {}",
                path.display()
            )));
        }
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            db_id: db_id.to_string(),
            connection: Mutex::new(connection),
        })
    }

    pub fn db_id(&self) -> &str {
        &self.db_id
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// User table names in `sqlite_master` order, which is creation order.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// One `(table, description)` pair per user table, in creation order.
    /// The description is the text the schema index embeds and the prompt
    /// shows to the model.
    pub fn schema_texts(&self) -> Result<Vec<(String, String)>> {
        let mut texts = Vec::new();
        for table in self.table_names()? {
            let text = self.table_context_text(&table)?;
            texts.push((table, text));
        }
        Ok(texts)
    }

    /// Renders one table's schema as a single line of prose, e.g.
    /// `Table 'singer' has columns: singer_id (INTEGER), name (TEXT).
    /// Primary key: (singer_id). Foreign keys: (country_id) -> country(id).`
    pub fn table_context_text(&self, table: &str) -> Result<String> {
        let columns = self.columns(table)?;
        if columns.is_empty() {
            return Err(SqlGenError::Schema(format!(
                "Table '{}' in database '{}' has no columns",
                table, self.db_id
            )));
        }

        let rendered: Vec<String> = columns
            .iter()
            .map(|c| {
                if c.data_type.is_empty() {
                    c.name.clone()
                } else {
                    format!("{} ({})", c.name, c.data_type)
                }
            })
            .collect();
        let mut parts = vec![format!(
            "Table '{}' has columns: {}.",
            table,
            rendered.join(", ")
        )];

        let mut pk: Vec<&ColumnInfo> = columns.iter().filter(|c| c.pk_position > 0).collect();
        pk.sort_by_key(|c| c.pk_position);
        if !pk.is_empty() {
            let names: Vec<&str> = pk.iter().map(|c| c.name.as_str()).collect();
            parts.push(format!("Primary key: ({}).", names.join(", ")));
        }

        let foreign_keys = self.foreign_keys(table)?;
        if !foreign_keys.is_empty() {
            let rendered: Vec<String> = foreign_keys
                .iter()
                .map(|fk| match &fk.target_column {
                    Some(to) => format!("({}) -> {}({})", fk.from_column, fk.target_table, to),
                    None => format!("({}) -> {}", fk.from_column, fk.target_table),
                })
                .collect();
            parts.push(format!("Foreign keys: {}.", rendered.join(", ")));
        }

        Ok(parts.join(" "))
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name, type, pk FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map(params![table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                    pk_position: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(r#"SELECT "from", "table", "to" FROM pragma_foreign_key_list(?1)"#)?;
        let keys = stmt
            .query_map(params![table], |row| {
                Ok(ForeignKey {
                    from_column: row.get(0)?,
                    target_table: row.get(1)?,
                    target_column: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    /// Executes one SQL statement and returns every row rendered as text.
    /// Errors are left untyped so the caller can attach the statement that
    /// produced them.
    pub fn run_sql(&self, sql: &str) -> rusqlite::Result<Vec<Vec<String>>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(column_count);
            for i in 0..column_count {
                record.push(render_value(&row.get::<_, Value>(i)?));
            }
            out.push(record);
        }
        Ok(out)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} byte blob>", b.len()),
    }
}

/// All databases the dataset references, opened once each. Iteration order
/// is the order the db_ids first appear across the splits.
pub struct DatabaseRegistry {
    order: Vec<String>,
    databases: HashMap<String, Arc<SqlDatabase>>,
}

impl DatabaseRegistry {
    pub fn open<'a>(
        input_dir: &Path,
        examples: impl IntoIterator<Item = &'a SpiderExample>,
    ) -> Result<Self> {
        let mut order = Vec::new();
        let mut databases = HashMap::new();
        for db_id in examples.into_iter().map(|e| e.db_id.as_str()).unique() {
            let path = input_dir
                .join("database")
                .join(db_id)
                .join(format!("{}.sqlite", db_id));
            let database = SqlDatabase::open(db_id, &path)?;
            debug!("Opened database '{}' from {}", db_id, path.display());
            order.push(db_id.to_string());
            databases.insert(db_id.to_string(), Arc::new(database));
        }
        Ok(Self { order, databases })
    }

    pub fn get(&self, db_id: &str) -> Option<&Arc<SqlDatabase>> {
        self.databases.get(db_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SqlDatabase>> {
        self.order.iter().filter_map(move |id| self.databases.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
