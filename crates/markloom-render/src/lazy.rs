// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lazily constructed, memoized engine handle
//!
//! The first caller of [`LazyEngine::get_or_init`] runs the factory, every
//! concurrent caller awaits that same construction. The handle moves from
//! empty to populated once and is never reset. A failed construction leaves
//! the handle empty, so the next caller tries again.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

use crate::error::Result;

type Factory<E> = Box<dyn Fn() -> BoxFuture<'static, Result<Arc<E>>> + Send + Sync>;

pub struct LazyEngine<E: ?Sized> {
    name: &'static str,
    cell: OnceCell<Arc<E>>,
    factory: Factory<E>,
    inits: AtomicUsize,
}

impl<E: ?Sized + Send + Sync + 'static> LazyEngine<E> {
    /// Handle that builds its engine with `factory` on first use
    pub fn new<F, Fut>(name: &'static str, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<E>>> + Send + 'static,
    {
        Self {
            name,
            cell: OnceCell::new(),
            factory: Box::new(move || factory().boxed()),
            inits: AtomicUsize::new(0),
        }
    }

    /// Return the engine, constructing it if this is the first call
    pub async fn get_or_init(&self) -> Result<Arc<E>> {
        let engine = self
            .cell
            .get_or_try_init(|| async {
                self.inits.fetch_add(1, Ordering::SeqCst);
                let started = Instant::now();
                let result = (self.factory)().await;
                match &result {
                    Ok(_) => tracing::info!(
                        engine = self.name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "engine ready"
                    ),
                    Err(err) => tracing::warn!(engine = self.name, error = %err, "engine initialization failed"),
                }
                result
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    /// The engine if it is already constructed; never waits
    pub fn get(&self) -> Option<Arc<E>> {
        self.cell.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of times the factory has been started
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<E: ?Sized> std::fmt::Debug for LazyEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyEngine")
            .field("name", &self.name)
            .field("ready", &self.cell.initialized())
            .field("inits", &self.inits.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_construction() {
        let lazy = Arc::new(LazyEngine::new("test", || async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(Arc::new(String::from("engine")))
        }));
        assert!(lazy.get().is_none());

        let (a, b) = tokio::join!(lazy.get_or_init(), lazy.get_or_init());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(lazy.init_count(), 1);

        let c = lazy.get_or_init().await.unwrap();
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(lazy.init_count(), 1);
        assert!(lazy.is_ready());
    }

    #[tokio::test]
    async fn test_failed_init_is_retried() {
        let fail = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&fail);
        let lazy: LazyEngine<str> = LazyEngine::new("flaky", move || {
            let fail = flag.load(Ordering::SeqCst);
            async move {
                if fail {
                    Err(RenderError::EngineInit("not yet".to_string()))
                } else {
                    Ok(Arc::from("ok"))
                }
            }
        });

        assert!(lazy.get_or_init().await.is_err());
        assert!(!lazy.is_ready());

        fail.store(false, Ordering::SeqCst);
        assert_eq!(&*lazy.get_or_init().await.unwrap(), "ok");
        assert_eq!(lazy.init_count(), 2);
    }
}
