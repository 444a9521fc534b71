//! Relational range-query backend over SQLite.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use porter_types::{ExportRecord, FieldValue, LegacyCredential, ObjectType};

use crate::error::{RowError, SourceError, SourceResult};
use crate::traits::{ObjectExporter, RowResult};
use crate::window::{RecordCount, Window};

/// A connection shared by every exporter of one source database.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open a source database read-only.
pub fn open(path: &Path) -> SourceResult<SharedConnection> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| SourceError::Connection(format!("{}: {e}", path.display())))?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Open an empty in-memory database.
pub fn open_in_memory() -> SourceResult<SharedConnection> {
    let conn = Connection::open_in_memory().map_err(|e| SourceError::Connection(e.to_string()))?;
    Ok(Arc::new(Mutex::new(conn)))
}

#[derive(Clone, Debug)]
enum Target {
    Field(String),
    Aux(String),
    /// Comma-separated integer ids.
    IdList(String),
}

#[derive(Clone, Debug)]
struct CredentialColumns {
    scheme: String,
    hash: String,
    salt: Option<String>,
}

/// Exports one table with `BETWEEN` id-range windows and `MAX(id)` counts.
///
/// Column mappings are declared with the builder methods; every mapped
/// column must exist or validation fails.
#[derive(Clone, Debug)]
pub struct SqliteTableExporter {
    conn: SharedConnection,
    object_type: ObjectType,
    table: String,
    id_column: String,
    columns: Vec<(String, Target)>,
    credential: Option<CredentialColumns>,
}

impl SqliteTableExporter {
    pub fn new(
        conn: SharedConnection,
        object_type: ObjectType,
        table: impl Into<String>,
        id_column: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            object_type,
            table: table.into(),
            id_column: id_column.into(),
            columns: Vec::new(),
            credential: None,
        }
    }

    /// Map `column` onto canonical field `field`.
    pub fn field(mut self, column: &str, field: &str) -> Self {
        self.columns
            .push((column.to_string(), Target::Field(field.to_string())));
        self
    }

    /// Map `column` onto auxiliary key `key`.
    pub fn aux(mut self, column: &str, key: &str) -> Self {
        self.columns
            .push((column.to_string(), Target::Aux(key.to_string())));
        self
    }

    /// Map a comma-separated id column onto list field `field`.
    pub fn id_list(mut self, column: &str, field: &str) -> Self {
        self.columns
            .push((column.to_string(), Target::IdList(field.to_string())));
        self
    }

    /// Read a legacy password hash of `scheme` from the given columns.
    pub fn credential(mut self, scheme: &str, hash_column: &str, salt_column: Option<&str>) -> Self {
        self.credential = Some(CredentialColumns {
            scheme: scheme.to_string(),
            hash: hash_column.to_string(),
            salt: salt_column.map(str::to_string),
        });
        self
    }

    fn lock(&self) -> SourceResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SourceError::Connection("connection lock poisoned".into()))
    }

    fn selected_columns(&self) -> Vec<&str> {
        let mut cols = vec![self.id_column.as_str()];
        cols.extend(self.columns.iter().map(|(c, _)| c.as_str()));
        if let Some(cred) = &self.credential {
            cols.push(&cred.hash);
            if let Some(salt) = &cred.salt {
                cols.push(salt);
            }
        }
        cols
    }

    fn select_sql(&self) -> String {
        let cols: Vec<String> = self.selected_columns().into_iter().map(quote).collect();
        let id = quote(&self.id_column);
        format!(
            "SELECT {} FROM {} WHERE {id} BETWEEN ?1 AND ?2 ORDER BY {id}",
            cols.join(", "),
            quote(&self.table),
        )
    }

    fn decode_row(&self, row: &rusqlite::Row<'_>) -> SourceResult<RowResult> {
        let id = match row.get_ref(0)? {
            ValueRef::Integer(id) => id,
            other => {
                return Ok(Err(RowError::new(
                    self.object_type,
                    "?",
                    format!("non-integer id of type {}", other.data_type()),
                )))
            }
        };
        let mut record = if self.object_type.is_relation() {
            ExportRecord::relation()
        } else {
            ExportRecord::new(id)
        };

        let mut index = 1;
        for (column, target) in &self.columns {
            let value = match to_field_value(row.get_ref(index)?) {
                Ok(value) => value,
                Err(reason) => {
                    return Ok(Err(RowError::new(
                        self.object_type,
                        id,
                        format!("column {column}: {reason}"),
                    )))
                }
            };
            index += 1;
            match target {
                Target::Field(name) => {
                    record.fields.insert(name.clone(), value);
                }
                Target::Aux(name) => {
                    record.aux.insert(name.clone(), value);
                }
                Target::IdList(name) => match parse_id_list(&value) {
                    Ok(list) => {
                        record.fields.insert(name.clone(), list);
                    }
                    Err(reason) => {
                        return Ok(Err(RowError::new(
                            self.object_type,
                            id,
                            format!("column {column}: {reason}"),
                        )))
                    }
                },
            }
        }

        if let Some(cred) = &self.credential {
            let hash = to_field_value(row.get_ref(index)?).unwrap_or(FieldValue::Null);
            let salt = match cred.salt {
                Some(_) => to_field_value(row.get_ref(index + 1)?).unwrap_or(FieldValue::Null),
                None => FieldValue::Null,
            };
            let hash = hash.as_str().unwrap_or_default();
            if !hash.is_empty() {
                record.credential = Some(
                    LegacyCredential::new(&cred.scheme, hash).with_salt(salt.as_str().unwrap_or_default()),
                );
            }
        }

        Ok(Ok(record))
    }
}

impl ObjectExporter for SqliteTableExporter {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn validate(&self) -> SourceResult<()> {
        let conn = self.lock()?;
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
                [&self.table],
                |row| row.get(0),
            )
            .optional()?;
        if found.is_none() {
            return Err(SourceError::Schema {
                object: self.table.clone(),
                detail: "table does not exist".into(),
            });
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote(&self.table)))?;
        let existing = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        for column in self.selected_columns() {
            if !existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                return Err(SourceError::Schema {
                    object: self.table.clone(),
                    detail: format!("missing column {column}"),
                });
            }
        }
        debug!(table = %self.table, columns = existing.len(), "table validated");
        Ok(())
    }

    fn count(&self) -> SourceResult<RecordCount> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT MAX({}) FROM {}",
            quote(&self.id_column),
            quote(&self.table)
        );
        let max: Option<i64> = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(RecordCount::upper_bound(max.unwrap_or(0).max(0) as u64))
    }

    fn export(&self, window: Window) -> SourceResult<Vec<RowResult>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&self.select_sql())?;
        let range = window.id_range();
        let mut rows = stmt.query(params![range.start(), range.end()])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(self.decode_row(row)?);
        }
        Ok(out)
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn to_field_value(value: ValueRef<'_>) -> Result<FieldValue, String> {
    Ok(match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(n) => FieldValue::Int(n),
        ValueRef::Real(f) => FieldValue::Int(f as i64),
        ValueRef::Text(bytes) => FieldValue::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| format!("invalid UTF-8: {e}"))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => FieldValue::Text(String::from_utf8_lossy(bytes).into_owned()),
    })
}

fn parse_id_list(value: &FieldValue) -> Result<FieldValue, String> {
    let text = match value {
        FieldValue::Null => return Ok(FieldValue::List(Vec::new())),
        FieldValue::Int(n) => return Ok(FieldValue::List(vec![FieldValue::Int(*n)])),
        FieldValue::Text(s) => s,
        other => return Err(format!("unexpected id list value {other:?}")),
    };
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map(FieldValue::Int)
                .map_err(|_| format!("bad id {s:?} in list"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(FieldValue::List)
}
