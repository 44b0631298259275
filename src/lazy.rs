//! Memoizing asynchronous resolver.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use tokio::sync::OnceCell;

use crate::error::Result;

type Loader<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Defers an expensive load until first use.
///
/// The first [`resolve`](Lazy::resolve) runs the loader; later calls return
/// the cached value. Concurrent callers wait on the same in-flight load. A
/// failed load is not cached, so the next call tries again.
pub struct Lazy<T> {
    cell: OnceCell<T>,
    loader: Loader<T>,
}

impl<T> Lazy<T> {
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            loader: Box::new(move || -> BoxFuture<'static, Result<T>> { Box::pin(loader()) }),
        }
    }

    pub async fn resolve(&self) -> Result<&T> {
        self.cell.get_or_try_init(|| (self.loader)()).await
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy").field("value", &self.cell.get()).finish()
    }
}
