use crate::{BasicParameterCheck, ContextFormatter, ErrorFormatter, ParameterCheck, Pool};
use std::sync::Arc;

/// Collaborators shared by a [`CursorProvider`](crate::CursorProvider): the pool, the
/// parameter check and the error formatter.
pub struct Context<P: Pool> {
    pub pool: Arc<P>,
    pub check: Arc<dyn ParameterCheck>,
    pub formatter: Arc<dyn ErrorFormatter>,
}

impl<P: Pool> Context<P> {
    pub fn new(pool: P) -> Self {
        Self::from_shared(Arc::new(pool))
    }
    pub fn from_shared(pool: Arc<P>) -> Self {
        Self {
            pool,
            check: Arc::new(BasicParameterCheck),
            formatter: Arc::new(ContextFormatter),
        }
    }
    pub fn with_check(mut self, check: impl ParameterCheck + 'static) -> Self {
        self.check = Arc::new(check);
        self
    }
    pub fn with_formatter(mut self, formatter: impl ErrorFormatter + 'static) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }
}

impl<P: Pool> Clone for Context<P> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            check: self.check.clone(),
            formatter: self.formatter.clone(),
        }
    }
}
