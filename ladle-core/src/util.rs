use std::{
    borrow::Cow,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Locks the mutex, recovering the guard if a previous holder panicked.
///
/// Guards returned from here are never held across an await point.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shortens a query to something reasonable to print in a log line.
pub fn truncate_long(query: &str) -> Cow<'_, str> {
    const MAX: usize = 497;
    let query = query.trim();
    if query.len() <= MAX {
        return Cow::Borrowed(query);
    }
    let mut end = MAX;
    while !query.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}...", query[..end].trim_end()))
}

#[cfg(test)]
mod tests {
    use super::truncate_long;

    #[test]
    fn truncate_short_query() {
        assert_eq!(truncate_long("  SELECT 1;\n"), "SELECT 1;");
    }

    #[test]
    fn truncate_long_query() {
        let query = format!("SELECT '{}'", "é".repeat(400));
        let printable = truncate_long(&query);
        assert!(printable.ends_with("..."));
        assert!(printable.len() <= 500);
    }
}
