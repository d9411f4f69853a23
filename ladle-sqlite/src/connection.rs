use crate::{CBox, SqliteCursor, SqliteDriver, error_message_from_ptr, statement::Statement};
use ladle_core::{
    Connection, Driver, Error, ErrorContext, Parameters, Result, truncate_long,
};
use libsqlite3_sys::{
    SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX, SQLITE_OPEN_READWRITE, SQLITE_OPEN_URI,
    sqlite3, sqlite3_busy_timeout, sqlite3_errmsg, sqlite3_exec, sqlite3_free,
    sqlite3_open_v2,
};
use std::{
    borrow::Cow,
    ffi::{CString, c_int},
    ptr,
    sync::Arc,
};
use tokio::task::spawn_blocking;

// The prebuilt bundled bindings of libsqlite3-sys omit this declaration; the bundled library exports it.
unsafe extern "C" {
    fn sqlite3_close_v2(arg1: *mut sqlite3) -> c_int;
}

/// Milliseconds a statement waits on a locked database before failing with `SQLITE_BUSY`.
pub const DEFAULT_BUSY_TIMEOUT: c_int = 5000;

pub struct SqliteConnection {
    pub(crate) connection: Arc<CBox<sqlite3>>,
}

impl SqliteConnection {
    /// Open a connection from a URL like `sqlite://path/to/file.sqlite?mode=rwc`.
    ///
    /// The part after the scheme is handed to sqlite as a `file:` URI, so every sqlite URI
    /// parameter (`mode`, `cache`, `immutable`...) works. `busy_timeout=<ms>` is also
    /// accepted, it defaults to [`DEFAULT_BUSY_TIMEOUT`]. Use `sqlite://:memory:` for an
    /// in memory database.
    pub async fn connect(url: Cow<'static, str>) -> Result<SqliteConnection> {
        let context = || format!("While trying to connect to `{}`", url);
        let prefix = format!("{}://", SqliteDriver::NAME);
        let Some(location) = url.strip_prefix(&prefix) else {
            let error = Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                &prefix
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        };
        let (path, query) = location.split_once('?').unwrap_or((location, ""));
        let mut busy_timeout = DEFAULT_BUSY_TIMEOUT;
        let mut parameters = Vec::new();
        for pair in query.split('&').filter(|v| !v.is_empty()) {
            match pair.split_once('=') {
                Some(("busy_timeout", value)) => {
                    busy_timeout = value
                        .parse()
                        .with_context(|| format!("Invalid busy_timeout `{}`", value))
                        .with_context(context)?;
                }
                _ => parameters.push(pair),
            }
        }
        let mut uri = format!("file:{}", path);
        if !parameters.is_empty() {
            uri.push('?');
            uri.push_str(&parameters.join("&"));
        }
        let uri = CString::new(uri).with_context(context)?;
        let connection = spawn_blocking(move || {
            let mut connection = CBox::new(ptr::null_mut(), |p| unsafe {
                sqlite3_close_v2(p);
            });
            let rc = unsafe {
                sqlite3_open_v2(
                    uri.as_ptr(),
                    &mut *connection,
                    SQLITE_OPEN_READWRITE
                        | SQLITE_OPEN_CREATE
                        | SQLITE_OPEN_URI
                        | SQLITE_OPEN_FULLMUTEX,
                    ptr::null(),
                )
            };
            if rc != SQLITE_OK {
                let message = if connection.is_null() {
                    "Could not allocate the connection".to_string()
                } else {
                    error_message_from_ptr(unsafe { sqlite3_errmsg(*connection) })
                };
                return Err(Error::msg(message));
            }
            unsafe {
                sqlite3_busy_timeout(*connection, busy_timeout);
            }
            Ok(connection)
        })
        .await?
        .with_context(context)
        .map_err(|e| {
            log::error!("{:#}", e);
            e
        })?;
        log::debug!("Connected to `{}`", url);
        Ok(Self {
            connection: Arc::new(connection),
        })
    }

    /// Run one or more statements that produce no rows, like a schema script.
    pub async fn execute_batch(&mut self, sql: &str) -> Result<()> {
        let connection = self.connection.clone();
        let context = format!("While executing:\n{}", truncate_long(sql));
        let sql = CString::new(sql).with_context(|| context.clone())?;
        spawn_blocking(move || {
            let mut message = ptr::null_mut();
            let rc = unsafe {
                sqlite3_exec(**connection, sql.as_ptr(), None, ptr::null_mut(), &mut message)
            };
            if rc != SQLITE_OK {
                let error = Error::msg(error_message_from_ptr(message));
                unsafe {
                    sqlite3_free(message as *mut _);
                }
                return Err(error);
            }
            Ok(())
        })
        .await?
        .with_context(|| context.clone())
        .map_err(|e| {
            log::error!("{:#}", e);
            e
        })
    }
}

impl Connection for SqliteConnection {
    type Cursor = SqliteCursor;

    async fn cursor(
        &mut self,
        sql: &str,
        parameters: Option<&Parameters>,
    ) -> Result<SqliteCursor> {
        let connection = self.connection.clone();
        let context = format!("While preparing the query:\n{}", truncate_long(sql));
        let sql = sql.to_owned();
        let parameters = parameters.cloned();
        let (statement, labels) = spawn_blocking(move || {
            let statement = Statement::prepare(connection, &sql)?;
            if let Some(parameters) = &parameters {
                statement.bind(parameters)?;
            }
            let labels = statement.labels()?;
            Ok::<_, Error>((statement, labels))
        })
        .await?
        .map_err(|e| {
            let e = e.context(context);
            log::error!("{:#}", e);
            e
        })?;
        Ok(SqliteCursor::new(statement, labels))
    }
}
