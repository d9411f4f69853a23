//! Lazy row cursors over pooled database connections.
//!
//! A [`CursorProvider`] grabs a connection from a [`Pool`], opens a [`Cursor`] on it and
//! gives the connection back exactly once, whichever way the cursor ends: exhausted,
//! stopped, failed, dropped or closed through [`CursorProvider::close_all`].
//!
//! ```rust,ignore
//! let provider = CursorProvider::new(Context::new(pool));
//! let mut cursor = provider.open("SELECT id FROM book WHERE price > ?", Some(&params![10])).await?;
//! while let Some(row) = cursor.step().await? {
//!     println!("{}", row.get::<i64>("id")?);
//! }
//! ```
pub use ladle_core::*;
