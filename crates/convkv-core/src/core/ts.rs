//! Time-series rows.
//!
//! A time-series record maps each field to a column position with a tag of
//! the form `"index,column"`, for example `"0,id"`. Rows are dense: positions
//! no field claims are written as [`TsCell::Null`].
//!
//! | Rust type | Cell |
//! |-----------|------|
//! | `String` | `VARCHAR` |
//! | `i64` | `SINT64` |
//! | `DateTime<Utc>` | `TIMESTAMP` |
//! | `Option<T>` | `T`'s cell, or `NULL` |

use crate::core::error::{DecodeErrorKind, MapperError, Result};
use crate::core::session::{ensure_success, Session};
use chrono::{DateTime, Utc};
use convkv_wire::{TsCell, TsRow};
use tracing::debug;

/// A value stored in one time-series cell.
pub trait TsValue: Sized {
    fn to_cell(&self) -> TsCell;
    fn from_cell(cell: &TsCell) -> Result<Self>;
}

fn cell_mismatch(expected: &'static str, found: &TsCell) -> MapperError {
    MapperError::decode(DecodeErrorKind::CellMismatch {
        expected,
        found: found.data_type(),
    })
}

impl TsValue for String {
    fn to_cell(&self) -> TsCell {
        TsCell::Varchar(self.clone())
    }

    fn from_cell(cell: &TsCell) -> Result<Self> {
        match cell {
            TsCell::Varchar(s) => Ok(s.clone()),
            other => Err(cell_mismatch("VARCHAR", other)),
        }
    }
}

impl TsValue for i64 {
    fn to_cell(&self) -> TsCell {
        TsCell::Sint64(*self)
    }

    fn from_cell(cell: &TsCell) -> Result<Self> {
        match cell {
            TsCell::Sint64(n) => Ok(*n),
            other => Err(cell_mismatch("SINT64", other)),
        }
    }
}

impl TsValue for DateTime<Utc> {
    fn to_cell(&self) -> TsCell {
        TsCell::Timestamp(*self)
    }

    fn from_cell(cell: &TsCell) -> Result<Self> {
        match cell {
            TsCell::Timestamp(t) => Ok(*t),
            other => Err(cell_mismatch("TIMESTAMP", other)),
        }
    }
}

impl<T: TsValue> TsValue for Option<T> {
    fn to_cell(&self) -> TsCell {
        self.as_ref().map_or(TsCell::Null, TsValue::to_cell)
    }

    fn from_cell(cell: &TsCell) -> Result<Self> {
        match cell {
            TsCell::Null => Ok(None),
            other => T::from_cell(other).map(Some),
        }
    }
}

/// Static declaration of one time-series field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TsFieldSpec {
    pub name: &'static str,
    pub tag: &'static str,
}

/// A resolved column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TsColumn {
    pub field: &'static str,
    pub index: usize,
    pub column: String,
}

/// A struct written as one time-series row.
///
/// Usually implemented through [`ts_record!`](crate::ts_record).
pub trait TsRecord: Sized + 'static {
    fn type_name() -> &'static str;

    fn ts_fields() -> Vec<TsFieldSpec>;

    fn cell(&self, field: &str) -> Option<TsCell>;

    fn set_cell(&mut self, field: &str, cell: &TsCell) -> Result<()>;
}

/// Parse the column tags of `T`, ordered by position.
pub fn ts_columns<T: TsRecord>() -> Result<Vec<TsColumn>> {
    let mut columns: Vec<TsColumn> = Vec::new();
    for spec in T::ts_fields() {
        let column = parse_ts_tag(spec).map_err(|e| e.at(spec.name))?;
        if let Some(taken) = columns.iter().find(|c| c.index == column.index) {
            return Err(MapperError::malformed(
                spec.tag,
                format!("position {} is already used by {}", column.index, taken.field),
            )
            .at(spec.name));
        }
        columns.push(column);
    }
    columns.sort_by_key(|c| c.index);
    Ok(columns)
}

fn parse_ts_tag(spec: TsFieldSpec) -> Result<TsColumn> {
    let parts: Vec<&str> = spec.tag.split(',').collect();
    if parts.len() != 2 {
        return Err(MapperError::malformed(spec.tag, "expected exactly two components"));
    }
    let index = parts[0]
        .trim()
        .parse::<usize>()
        .map_err(|_| MapperError::malformed(spec.tag, "position is not a number"))?;
    Ok(TsColumn {
        field: spec.name,
        index,
        column: parts[1].trim().to_string(),
    })
}

/// Build the row for `record`.
pub fn encode_row<T: TsRecord>(record: &T) -> Result<TsRow> {
    let columns = ts_columns::<T>()?;
    let width = columns.last().map_or(0, |c| c.index + 1);
    let mut row = vec![TsCell::Null; width];
    for column in &columns {
        if let Some(cell) = record.cell(column.field) {
            row[column.index] = cell;
        }
    }
    Ok(row)
}

/// Read a record back from a row. Cells past the end of the row are left at
/// their default.
pub fn decode_row<T: TsRecord + Default>(row: &[TsCell]) -> Result<T> {
    let mut record = T::default();
    for column in ts_columns::<T>()? {
        if let Some(cell) = row.get(column.index) {
            record
                .set_cell(column.field, cell)
                .map_err(|e| e.at(column.field))?;
        }
    }
    Ok(record)
}

/// Write `record` as one row of `table`.
pub async fn ts_write<T: TsRecord>(session: &Session, table: &str, record: &T) -> Result<()> {
    let row = encode_row(record)?;
    debug!(table, type_name = T::type_name(), cells = row.len(), "writing time-series row");
    ensure_success(
        session.transport().ts_store_rows(table, vec![row]).await?,
        "time-series write",
    )?;
    Ok(())
}

/// Run a query and return the raw rows.
pub async fn ts_query(session: &Session, query: &str) -> Result<Vec<TsRow>> {
    let result = ensure_success(session.transport().ts_query(query).await?, "time-series query")?;
    Ok(result.rows)
}

/// Run a query and decode every returned row.
pub async fn ts_read<T: TsRecord + Default>(session: &Session, query: &str) -> Result<Vec<T>> {
    ts_query(session, query)
        .await?
        .iter()
        .map(|row| decode_row(row))
        .collect()
}

/// Declare a struct and register it as a time-series record.
///
/// Every field needs a `#[ts("index,column")]` tag.
#[macro_export]
macro_rules! ts_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                #[ts($tag:literal)]
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $fvis $field: $ty, )*
        }

        impl $crate::TsRecord for $name {
            fn type_name() -> &'static str {
                stringify!($name)
            }

            fn ts_fields() -> ::std::vec::Vec<$crate::TsFieldSpec> {
                ::std::vec![
                    $( $crate::TsFieldSpec { name: stringify!($field), tag: $tag }, )*
                ]
            }

            #[allow(unused_variables)]
            fn cell(&self, field: &str) -> ::std::option::Option<$crate::TsCell> {
                $(
                    if field == stringify!($field) {
                        return ::std::option::Option::Some($crate::TsValue::to_cell(&self.$field));
                    }
                )*
                ::std::option::Option::None
            }

            #[allow(unused_variables)]
            fn set_cell(&mut self, field: &str, cell: &$crate::TsCell) -> $crate::Result<()> {
                $(
                    if field == stringify!($field) {
                        self.$field = $crate::TsValue::from_cell(cell)?;
                        return ::std::result::Result::Ok(());
                    }
                )*
                ::std::result::Result::Ok(())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    ts_record! {
        #[derive(Clone, Debug, Default, PartialEq)]
        struct UserLog {
            #[ts("0,id")]
            id: i64,
            #[ts("2,time")]
            time: Option<DateTime<Utc>>,
            #[ts("1,action")]
            action: String,
        }
    }

    ts_record! {
        #[derive(Clone, Debug, Default)]
        struct Sparse {
            #[ts("3,value")]
            value: i64,
        }
    }

    ts_record! {
        #[derive(Clone, Debug, Default)]
        struct BadTag {
            #[ts("id")]
            id: i64,
        }
    }

    ts_record! {
        #[derive(Clone, Debug, Default)]
        struct NotNumeric {
            #[ts("first,id")]
            id: i64,
        }
    }

    #[test]
    fn test_row_ordered_by_position() {
        let time = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let log = UserLog {
            id: 1337,
            time: Some(time),
            action: "yolo".into(),
        };
        let row = encode_row(&log).unwrap();
        assert_eq!(
            row,
            vec![
                TsCell::Sint64(1337),
                TsCell::Varchar("yolo".into()),
                TsCell::Timestamp(time)
            ]
        );
        assert_eq!(decode_row::<UserLog>(&row).unwrap(), log);
    }

    #[test]
    fn test_gaps_are_null() {
        let row = encode_row(&Sparse { value: 4 }).unwrap();
        assert_eq!(row, vec![TsCell::Null, TsCell::Null, TsCell::Null, TsCell::Sint64(4)]);
    }

    #[test]
    fn test_malformed_tags() {
        let err = ts_columns::<BadTag>().unwrap_err();
        assert!(matches!(err, MapperError::MalformedMapping { ref path, .. } if path == "id"));
        let err = ts_columns::<NotNumeric>().unwrap_err();
        assert!(matches!(err, MapperError::MalformedMapping { ref path, .. } if path == "id"));
    }

    #[test]
    fn test_cell_mismatch_names_field() {
        let row = vec![TsCell::Varchar("x".into())];
        let err = decode_row::<UserLog>(&row).unwrap_err();
        assert_eq!(err.path(), Some("id"));
        assert!(err.to_string().contains("CellMismatch (expected SINT64, found VARCHAR)"));
    }
}
