#[cfg(test)]
mod tests {
    use indoc::indoc;
    use ladle::{Context, Cursor, CursorProvider, Pool, Result, params};
    use ladle_sqlite::SqliteConnection;
    use ladle_tests::{QueuePool, init_logs, silent_logs};
    use std::path::Path;
    use tokio::fs;

    const DB_PATH: &str = "target/debug/ladle_facade.sqlite";

    async fn first_titles<P: Pool>(provider: &CursorProvider<P>, limit: usize) -> Result<Vec<String>> {
        let mut cursor: Cursor = provider
            .open("SELECT title FROM post ORDER BY id", None)
            .await?;
        let mut titles = Vec::new();
        while let Some(row) = cursor.step().await? {
            titles.push(row.get("title")?);
            if titles.len() == limit {
                cursor.stop().await?;
            }
        }
        Ok(titles)
    }

    #[tokio::test]
    async fn facade() {
        init_logs();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH)
                .await
                .expect(format!("Failed to remove existing test database file {}", DB_PATH).as_str());
        }
        let mut connection = SqliteConnection::connect(format!("sqlite://{}?mode=rwc", DB_PATH).into())
            .await
            .expect("Could not open the database");
        connection
            .execute_batch(indoc! {"
                CREATE TABLE post (id INTEGER PRIMARY KEY, title TEXT NOT NULL);
                INSERT INTO post (title) VALUES ('first'), ('second'), ('third');
            "})
            .await
            .unwrap();
        let provider = CursorProvider::new(Context::new(QueuePool::new([connection])));

        assert_eq!(first_titles(&provider, 2).await.unwrap(), ["first", "second"]);
        assert_eq!(first_titles(&provider, 10).await.unwrap(), ["first", "second", "third"]);

        let result = silent_logs! {
            provider
                .open("SELECT title FROM post WHERE id = ?", Some(&params![f64::NAN]))
                .await
        };
        assert!(result.is_err());
        assert_eq!(provider.context().pool.grabs(), 2);
        assert_eq!(provider.context().pool.releases(), 2);
        provider.close_all().await.unwrap();
    }
}
