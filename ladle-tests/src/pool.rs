use crate::{ConnectionId, Event, Journal, Script, ScriptedCursor};
use ladle_core::{Connection, Error, Parameters, Pool, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Pool of fake connections, every cursor they open follows the same [`Script`].
pub struct TestPool {
    script: Script,
    permits: Arc<Semaphore>,
    grab_error: Option<String>,
    journal: Arc<Journal>,
}

impl TestPool {
    pub fn new(script: Script) -> Self {
        Self::with_capacity(script, 16)
    }

    /// At most `capacity` connections out at once, `grab` waits for a release after that.
    pub fn with_capacity(script: Script, capacity: usize) -> Self {
        Self {
            script,
            permits: Arc::new(Semaphore::new(capacity)),
            grab_error: None,
            journal: Default::default(),
        }
    }

    /// Every `grab` fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            grab_error: Some(message.into()),
            ..Self::new(Script::default())
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Pool for TestPool {
    type Connection = TestConnection;

    async fn grab(&self) -> Result<TestConnection> {
        if let Some(message) = &self.grab_error {
            return Err(Error::msg(message.clone()));
        }
        let permit = self.permits.clone().acquire_owned().await?;
        let id = self.journal.next_id();
        self.journal.push(Event::Grab(id));
        Ok(TestConnection {
            id,
            script: self.script.clone(),
            journal: self.journal.clone(),
            _permit: permit,
        })
    }

    fn release(&self, connection: TestConnection) {
        self.journal.push(Event::Release(connection.id));
    }
}

pub struct TestConnection {
    id: ConnectionId,
    script: Script,
    journal: Arc<Journal>,
    _permit: OwnedSemaphorePermit,
}

impl TestConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Connection for TestConnection {
    type Cursor = ScriptedCursor;

    async fn cursor(
        &mut self,
        _sql: &str,
        _parameters: Option<&Parameters>,
    ) -> Result<ScriptedCursor> {
        if let Some(gate) = &self.script.open_gate {
            gate.acquire().await?.forget();
        }
        if let Some(message) = &self.script.open_error {
            return Err(Error::msg(message.clone()));
        }
        Ok(ScriptedCursor::new(
            self.id,
            &self.script,
            self.journal.clone(),
        ))
    }
}
