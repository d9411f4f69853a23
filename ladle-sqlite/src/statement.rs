use crate::{
    CBox, error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use ladle_core::{Error, ErrorKind, Parameters, Result, Row, RowNames, Value};
use libsqlite3_sys::*;
use std::{
    ffi::{CString, c_char, c_int, c_void},
    ptr,
    sync::Arc,
};

/// A prepared statement together with the connection it belongs to.
///
/// Fields drop in order: the statement is finalized before the last reference to the
/// connection goes away.
pub(crate) struct Statement {
    statement: CBox<sqlite3_stmt>,
    _connection: Arc<CBox<sqlite3>>,
}

impl Statement {
    /// Compile a single SQL statement. Blocking, call it from `spawn_blocking`.
    pub(crate) fn prepare(connection: Arc<CBox<sqlite3>>, sql: &str) -> Result<Self> {
        let len = c_int::try_from(sql.len())
            .map_err(|_| Error::msg("The query is too long for sqlite"))?;
        let mut statement = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_finalize(p);
        });
        let mut tail: *const c_char = ptr::null();
        let rc = unsafe {
            sqlite3_prepare_v2(
                **connection,
                sql.as_ptr() as *const c_char,
                len,
                &mut *statement,
                &mut tail,
            )
        };
        if rc != SQLITE_OK {
            return Err(Error::msg(error_message_from_ptr(unsafe {
                sqlite3_errmsg(**connection)
            })));
        }
        if statement.is_null() {
            return Err(Error::msg("The query does not contain any statement"));
        }
        if !tail.is_null() {
            let offset = (tail as usize).saturating_sub(sql.as_ptr() as usize);
            let remaining = sql.as_bytes().get(offset..).unwrap_or_default();
            if !remaining.trim_ascii().is_empty() {
                return Err(Error::msg("Cannot run more than one statement at a time"));
            }
        }
        Ok(Self {
            statement,
            _connection: connection,
        })
    }

    pub(crate) fn labels(&self) -> Result<RowNames> {
        let count = unsafe { sqlite3_column_count(*self.statement) };
        (0..count)
            .map(|i| extract_name(*self.statement, i))
            .collect()
    }

    pub(crate) fn bind(&self, parameters: &Parameters) -> Result<()> {
        match parameters {
            Parameters::Positional(values) => {
                for (i, value) in values.iter().enumerate() {
                    self.bind_index(value, i as c_int + 1)?;
                }
            }
            Parameters::Named(values) => {
                for (name, value) in values {
                    self.bind_index(value, self.parameter_index(name)?)?;
                }
            }
        }
        Ok(())
    }

    /// Index of a named parameter, a bare `name` matches `:name`, `@name` or `$name`.
    fn parameter_index(&self, name: &str) -> Result<c_int> {
        let candidates = if name.starts_with([':', '@', '$']) {
            vec![name.to_string()]
        } else {
            [':', '@', '$']
                .iter()
                .map(|prefix| format!("{}{}", prefix, name))
                .collect()
        };
        for candidate in candidates {
            let candidate = CString::new(candidate)?;
            let index = unsafe { sqlite3_bind_parameter_index(*self.statement, candidate.as_ptr()) };
            if index > 0 {
                return Ok(index);
            }
        }
        Err(Error::msg(format!(
            "The query has no parameter named `{}`",
            name
        )))
    }

    fn bind_index(&self, value: &Value, index: c_int) -> Result<()> {
        let statement = *self.statement;
        let rc = unsafe {
            match value {
                Value::Null => sqlite3_bind_null(statement, index),
                Value::Boolean(v) => sqlite3_bind_int(statement, index, *v as c_int),
                Value::Int64(v) => sqlite3_bind_int64(statement, index, *v),
                Value::Float64(v) => sqlite3_bind_double(statement, index, *v),
                Value::Varchar(v) => sqlite3_bind_text(
                    statement,
                    index,
                    v.as_ptr() as *const c_char,
                    bind_len(v.len(), index)?,
                    SQLITE_TRANSIENT(),
                ),
                Value::Blob(v) => sqlite3_bind_blob(
                    statement,
                    index,
                    v.as_ptr() as *const c_void,
                    bind_len(v.len(), index)?,
                    SQLITE_TRANSIENT(),
                ),
            }
        };
        if rc != SQLITE_OK {
            let message =
                error_message_from_ptr(unsafe { sqlite3_errmsg(sqlite3_db_handle(statement)) });
            return Err(Error::msg(message).context(format!("Cannot bind parameter {}", index)));
        }
        Ok(())
    }

    /// Advance by one row. Blocking, call it from `spawn_blocking`.
    pub(crate) fn step(&self, columns: usize) -> Result<Option<Row>> {
        let statement = *self.statement;
        match unsafe { sqlite3_step(statement) } {
            SQLITE_ROW => (0..columns)
                .map(|i| extract_value(statement, i as c_int))
                .collect::<Result<Row>>()
                .map(Some),
            SQLITE_DONE => Ok(None),
            _ => {
                let error = Error::msg(error_message_from_ptr(unsafe {
                    sqlite3_errmsg(sqlite3_db_handle(statement))
                }))
                .context(ErrorKind::StreamFailure);
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }
}

/// Byte length of a text or blob parameter, sqlite takes it as a non negative `c_int`.
fn bind_len(len: usize, index: c_int) -> Result<c_int> {
    c_int::try_from(len).map_err(|_| {
        Error::msg(format!(
            "Cannot bind parameter {}, its value of {} bytes is too large for sqlite",
            index, len
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::bind_len;
    use std::ffi::c_int;

    #[test]
    fn bind_len_limits() {
        assert_eq!(bind_len(0, 1).unwrap(), 0);
        assert_eq!(bind_len(c_int::MAX as usize, 1).unwrap(), c_int::MAX);
        let error = bind_len(c_int::MAX as usize + 1, 3).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Cannot bind parameter 3, its value of 2147483648 bytes is too large for sqlite"
        );
    }
}
