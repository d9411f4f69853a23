#[cfg(test)]
mod tests {
    use ladle_core::{
        BasicParameterCheck, Connection, Context, CursorProvider, ErrorFormatter, ErrorKind,
        Parameters, RowLabeled, StreamCursor, Value, params, stream,
    };
    use ladle_tests::{
        Event, QueuePool, Script, TestPool, init_logs, numbered_rows, provider, silent_logs,
    };
    use std::{sync::Arc, time::Duration};
    use tokio::{
        sync::Semaphore,
        time::{sleep, timeout},
    };

    #[tokio::test]
    async fn invalid_parameters_touch_nothing() {
        init_logs();
        let provider = provider(TestPool::new(Script::rows(numbered_rows(1))));
        let parameters = Parameters::Named(vec![
            (":id".into(), Value::Int64(1)),
            ("$id".into(), Value::Int64(2)),
        ]);
        let error = silent_logs! {
            provider
                .open("SELECT * FROM t WHERE id = :id", Some(&parameters))
                .await
                .unwrap_err()
        };
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::InvalidParameters));
        assert_eq!(provider.context().pool.journal().grabs(), 0);
        assert!(provider.is_empty());

        let mut cursor = provider
            .open("SELECT * FROM t WHERE id = ?", Some(&params![1]))
            .await
            .expect("Valid parameters are accepted");
        cursor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn acquisition_failure() {
        init_logs();
        let provider = provider(TestPool::failing("too many clients"));
        let error = silent_logs! {
            provider.open("SELECT 1", None).await.unwrap_err()
        };
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::AcquisitionFailure));
        assert!(format!("{:#}", error).ends_with("too many clients"));
        assert_eq!(provider.context().pool.journal().releases(), 0);
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn cursor_creation_failure_releases_the_connection() {
        init_logs();
        let provider = provider(TestPool::with_capacity(
            Script::failing_open("no such table: t"),
            1,
        ));
        let journal = || provider.context().pool.journal();
        for attempt in 1..=3 {
            let error = silent_logs! {
                provider.open("SELECT * FROM t", None).await.unwrap_err()
            };
            assert_eq!(ErrorKind::of(&error), Some(ErrorKind::CursorCreationFailure));
            assert!(format!("{:#}", error).contains("no such table: t"));
            assert_eq!(journal().releases_of(attempt), 1);
        }
        assert_eq!(journal().outstanding(), 0);
        assert_eq!(provider.context().pool.available(), 1);
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn open_abandoned_while_starting_the_query() {
        init_logs();
        let gate = Arc::new(Semaphore::new(0));
        let provider = provider(TestPool::with_capacity(
            Script::rows(numbered_rows(1)).gated_open(gate.clone()),
            1,
        ));
        let journal = || provider.context().pool.journal();
        let abandoned = timeout(
            Duration::from_millis(20),
            provider.open("SELECT n FROM t", None),
        )
        .await;
        assert!(abandoned.is_err(), "The query never started");
        assert_eq!(journal().grabs(), 1);
        assert_eq!(journal().releases_of(1), 1);
        assert_eq!(provider.context().pool.available(), 1);
        assert!(provider.is_empty());

        gate.add_permits(1);
        let mut cursor = timeout(
            Duration::from_secs(1),
            provider.open("SELECT n FROM t", None),
        )
        .await
        .expect("The connection is back in the pool")
        .unwrap();
        assert!(cursor.step().await.unwrap().is_some());
        cursor.stop().await.unwrap();
        assert_eq!(journal().releases(), 2);
        assert_eq!(journal().outstanding(), 0);
    }

    struct IterConnection;

    type IterCursor = StreamCursor<stream::Iter<std::vec::IntoIter<ladle_core::Result<RowLabeled>>>>;

    impl Connection for IterConnection {
        type Cursor = IterCursor;

        async fn cursor(
            &mut self,
            _sql: &str,
            _parameters: Option<&Parameters>,
        ) -> ladle_core::Result<IterCursor> {
            let rows: Vec<_> = numbered_rows(3).into_iter().map(Ok).collect();
            Ok(StreamCursor::new(stream::iter(rows)))
        }
    }

    #[tokio::test]
    async fn plain_stream_cursors() {
        init_logs();
        let pool = Arc::new(QueuePool::new([IterConnection, IterConnection]));
        let provider = CursorProvider::new(Context::from_shared(pool.clone()));

        let mut cursor = provider.open("SELECT n FROM t", None).await.unwrap();
        let row = cursor.step().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>("n").unwrap(), 1);
        cursor.stop().await.unwrap();
        assert!(cursor.is_closed());
        assert_eq!(pool.releases(), 1);
        cursor.stop().await.unwrap();
        assert_eq!(pool.releases(), 1);

        let mut cursor = provider.open("SELECT n FROM t", None).await.unwrap();
        let mut values = Vec::new();
        while let Some(row) = cursor.step().await.unwrap() {
            values.push(row.get::<i64>("n").unwrap());
        }
        assert_eq!(values, [1, 2, 3]);
        assert_eq!(pool.releases(), 2);
        drop(cursor);
        assert_eq!(pool.releases(), 2);
        assert_eq!(pool.idle(), 2);
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn close_all_releases_everything() {
        init_logs();
        let provider = provider(TestPool::new(Script::rows(numbered_rows(3)).with_cancel()));
        let journal = || provider.context().pool.journal();
        let mut cursors = Vec::new();
        for _ in 0..5 {
            cursors.push(provider.open("SELECT n FROM t", None).await.unwrap());
        }
        cursors[0].step().await.unwrap();
        cursors[1].stop().await.unwrap();
        assert_eq!(provider.len(), 4);

        provider.close_all().await.unwrap();
        assert!(provider.is_empty());
        assert_eq!(journal().releases(), 5);
        for id in 1..=5 {
            assert_eq!(journal().releases_of(id), 1);
            assert_eq!(journal().count(|e| *e == Event::CancelFinished(id)), 1);
        }
        for cursor in &mut cursors {
            assert!(cursor.is_closed());
            assert!(cursor.step().await.unwrap().is_none());
        }
        drop(cursors);
        assert_eq!(journal().releases(), 5);
    }

    #[tokio::test]
    async fn close_all_without_cursors() {
        init_logs();
        let provider = provider(TestPool::new(Script::default()));
        provider.close_all().await.unwrap();
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn close_all_reports_cleanup_errors() {
        init_logs();
        let provider = provider(TestPool::new(
            Script::rows(numbered_rows(2)).with_failing_cancel("connection reset"),
        ));
        let _first = provider.open("SELECT n FROM t", None).await.unwrap();
        let _second = provider.open("SELECT n FROM t", None).await.unwrap();
        let error = provider.close_all().await.unwrap_err();
        assert_eq!(error.to_string(), "connection reset");
        assert!(provider.is_empty());
        assert_eq!(provider.context().pool.journal().releases(), 2);
    }

    #[tokio::test]
    async fn close_all_during_a_step() {
        init_logs();
        let gate = Arc::new(Semaphore::new(0));
        let provider = provider(TestPool::new(
            Script::rows(numbered_rows(2)).with_cancel().gated(gate.clone()),
        ));
        let journal = || provider.context().pool.journal();
        let mut cursor = provider.open("SELECT n FROM t", None).await.unwrap();
        let reader = tokio::spawn(async move {
            let row = cursor.step().await;
            (cursor, row)
        });
        sleep(Duration::from_millis(20)).await;
        provider.close_all().await.unwrap();
        assert!(provider.is_empty());
        assert_eq!(journal().releases_of(1), 1);
        gate.add_permits(1);
        let (cursor, row) = reader.await.unwrap();
        assert!(row.unwrap().is_none(), "The cursor was closed under the step");
        assert!(cursor.is_closed());
        assert!(journal().position(Event::Dropped(1)).is_some());
        drop(cursor);
        assert_eq!(journal().releases(), 1);
    }

    #[tokio::test]
    async fn open_waits_for_a_free_connection() {
        init_logs();
        let provider = Arc::new(provider(TestPool::with_capacity(
            Script::rows(numbered_rows(2)),
            1,
        )));
        let mut first = provider.open("SELECT n FROM t", None).await.unwrap();
        let waiting = tokio::spawn({
            let provider = provider.clone();
            async move { provider.open("SELECT n FROM t", None).await }
        });
        sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished(), "The pool has no connection left");
        assert_eq!(provider.len(), 1);

        while first.step().await.unwrap().is_some() {}
        let mut second = waiting.await.unwrap().unwrap();
        assert_eq!(second.step().await.unwrap().unwrap().get::<i64>("n").unwrap(), 1);
        second.stop().await.unwrap();
        assert_eq!(provider.context().pool.journal().outstanding(), 0);
    }

    #[tokio::test]
    async fn cursors_outlive_their_provider() {
        init_logs();
        let pool = Arc::new(TestPool::new(Script::rows(numbered_rows(1))));
        let provider = CursorProvider::new(Context::from_shared(pool.clone()));
        let mut cursor = provider.open("SELECT n FROM t", None).await.unwrap();
        drop(provider);
        assert!(cursor.step().await.unwrap().is_some());
        assert!(cursor.step().await.unwrap().is_none());
        assert_eq!(pool.journal().releases(), 1);
    }

    struct Tagging;

    impl ErrorFormatter for Tagging {
        fn format(&self, kind: ErrorKind, error: ladle_core::Error) -> ladle_core::Error {
            error.context(kind).context("tagged")
        }
    }

    #[tokio::test]
    async fn custom_formatter() {
        init_logs();
        let provider = CursorProvider::new(
            Context::new(TestPool::failing("refused"))
                .with_check(BasicParameterCheck)
                .with_formatter(Tagging),
        );
        let error = provider.open("SELECT 1", None).await.unwrap_err();
        assert_eq!(format!("{:#}", error), "tagged: Could not acquire a connection from the pool: refused");
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::AcquisitionFailure));
    }
}
