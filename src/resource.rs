//! A pollable handle over a single asynchronous operation.
//!
//! An [`AsyncResource`] starts its operation once, at construction, and then
//! answers [`read`](AsyncResource::read) synchronously: a value, the stored
//! failure, or [`ReadError::Pending`] when the caller has to come back later.
//! Callers that can suspend use [`settled`](AsyncResource::settled) to wait for
//! completion and read in one step.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace, Instrument};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState<T, E> {
    Pending,
    Resolved(T),
    Rejected(E),
}

impl<T, E> ResourceState<T, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, ResourceState::Pending)
    }

    fn from_outcome(outcome: Result<T, E>) -> Self {
        match outcome {
            Ok(value) => ResourceState::Resolved(value),
            Err(error) => ResourceState::Rejected(error),
        }
    }
}

/// Why a [`read`](AsyncResource::read) did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError<E> {
    /// The operation is still running. Suspend and read again once it settles.
    Pending,
    /// The operation failed. Every later read reports the same error.
    Failed(E),
    /// The operation was dropped before it completed.
    ///
    /// Happens when its runtime shuts down or the task panics.
    Abandoned,
}

impl<E> ReadError<E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, ReadError::Pending)
    }
}

impl<E: fmt::Display> fmt::Display for ReadError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Pending => write!(f, "resource is still pending"),
            ReadError::Failed(error) => write!(f, "resource failed: {}", error),
            ReadError::Abandoned => {
                write!(f, "resource operation was dropped before completing")
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ReadError<E> {}

/// Shared, read-only view of one asynchronous operation.
///
/// Cloning is cheap and yields another handle to the same operation; it never
/// restarts it.
pub struct AsyncResource<T, E> {
    id: ResourceId,
    state: watch::Receiver<ResourceState<T, E>>,
}

impl<T, E> AsyncResource<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Starts `operation` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime. Use [`spawn_on`](Self::spawn_on)
    /// with an explicit handle otherwise.
    pub fn spawn<F>(operation: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::spawn_on(&Handle::current(), operation)
    }

    pub fn spawn_on<F>(handle: &Handle, operation: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let id = ResourceId::next();
        let (tx, rx) = watch::channel(ResourceState::Pending);
        let span = tracing::debug_span!("resource", %id);

        handle.spawn(
            async move {
                trace!("Awaiting resource operation");
                let state = ResourceState::from_outcome(operation.await);
                debug!(
                    rejected = matches!(state, ResourceState::Rejected(_)),
                    "Resource settled"
                );
                // Stored even when every handle is gone already.
                tx.send_replace(state);
            }
            .instrument(span),
        );

        Self { id, state: rx }
    }
}

impl<T, E> AsyncResource<T, E> {
    /// A resource that is resolved from the start.
    pub fn ready(value: T) -> Self {
        Self::settled_with(ResourceState::Resolved(value))
    }

    /// A resource that is rejected from the start.
    pub fn failed(error: E) -> Self {
        Self::settled_with(ResourceState::Rejected(error))
    }

    fn settled_with(state: ResourceState<T, E>) -> Self {
        let (_, rx) = watch::channel(state);
        Self {
            id: ResourceId::next(),
            state: rx,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Whether both handles refer to the same underlying operation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.id == other.id
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().is_pending()
    }
}

impl<T: Clone, E: Clone> AsyncResource<T, E> {
    // Non-blocking read of the current state. Once settled, the same outcome forever.
    // Example:
    // match resource.read() {
    //     Ok(creature) => render(creature),
    //     Err(ReadError::Pending) => { /* suspend, retry after `settled()` */ }
    //     Err(e) => report(e),
    // }
    pub fn read(&self) -> Result<T, ReadError<E>> {
        // A closed channel only means "abandoned" while the state is still pending.
        let closed = self.state.has_changed().is_err();
        match &*self.state.borrow() {
            ResourceState::Resolved(value) => Ok(value.clone()),
            ResourceState::Rejected(error) => Err(ReadError::Failed(error.clone())),
            ResourceState::Pending if closed => Err(ReadError::Abandoned),
            ResourceState::Pending => Err(ReadError::Pending),
        }
    }

    pub fn state(&self) -> ResourceState<T, E> {
        self.state.borrow().clone()
    }

    // Waits for the operation to settle, then reads it.
    // Example:
    // let creature = resource.settled().await?;
    pub async fn settled(&self) -> Result<T, ReadError<E>> {
        let mut rx = self.state.clone();
        // Err means the sender is gone; `read` tells settled and abandoned apart.
        let _ = rx.wait_for(|current| !current.is_pending()).await;
        self.read()
    }
}

impl<T, E> Clone for AsyncResource<T, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: self.state.clone(),
        }
    }
}

impl<T, E> fmt::Debug for AsyncResource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResource")
            .field("id", &self.id)
            .field("pending", &self.is_pending())
            .finish()
    }
}
