//! Fault injection beneath the retry stack, for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opendal::raw::{
    oio, Access, Layer, LayeredAccess, OpList, OpRead, OpWrite, RpDelete, RpList, RpRead, RpWrite,
};
use opendal::services::Memory;
use opendal::{Error, ErrorKind, Operator};

use crate::config::RetryConfig;
use crate::fs::backend::{with_retry, BackendType, Remote};
use crate::fs::memory::MemoryBucketAdmin;

/// Which call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    /// Opening a writer, once per object write.
    Write,
    /// Fetching the next listing entry.
    ListNext,
}

/// Fails `op` with `kind` after `skip` successful calls, `failures` times
/// (`None` for every call from then on).
#[derive(Debug, Clone)]
pub struct FaultLayer {
    op: FaultOp,
    kind: ErrorKind,
    temporary: bool,
    skip: usize,
    failures: Option<usize>,
    calls: Arc<AtomicUsize>,
}

impl FaultLayer {
    pub fn new(op: FaultOp, kind: ErrorKind, temporary: bool) -> Self {
        Self {
            op,
            kind,
            temporary,
            skip: 0,
            failures: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn after(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn times(mut self, failures: usize) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Attempts of `op` seen so far, retries included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: FaultOp) -> opendal::Result<()> {
        if op != self.op {
            return Ok(());
        }

        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = n >= self.skip && self.failures.map_or(true, |f| n < self.skip + f);
        if !failing {
            return Ok(());
        }

        let err = Error::new(self.kind, "injected fault");
        Err(if self.temporary { err.set_temporary() } else { err })
    }
}

impl<A: Access> Layer<A> for FaultLayer {
    type LayeredAccess = FaultAccessor<A>;

    fn layer(&self, inner: A) -> Self::LayeredAccess {
        FaultAccessor {
            inner,
            fault: self.clone(),
        }
    }
}

#[derive(Debug)]
pub struct FaultAccessor<A: Access> {
    inner: A,
    fault: FaultLayer,
}

impl<A: Access> LayeredAccess for FaultAccessor<A> {
    type Inner = A;
    type Reader = A::Reader;
    type Writer = A::Writer;
    type Lister = FaultLister<A::Lister>;
    type Deleter = A::Deleter;

    fn inner(&self) -> &Self::Inner {
        &self.inner
    }

    async fn read(&self, path: &str, args: OpRead) -> opendal::Result<(RpRead, Self::Reader)> {
        self.inner.read(path, args).await
    }

    async fn write(&self, path: &str, args: OpWrite) -> opendal::Result<(RpWrite, Self::Writer)> {
        self.fault.check(FaultOp::Write)?;
        self.inner.write(path, args).await
    }

    async fn delete(&self) -> opendal::Result<(RpDelete, Self::Deleter)> {
        self.inner.delete().await
    }

    async fn list(&self, path: &str, args: OpList) -> opendal::Result<(RpList, Self::Lister)> {
        let fault = self.fault.clone();
        self.inner
            .list(path, args)
            .await
            .map(|(rp, inner)| (rp, FaultLister { inner, fault }))
    }
}

pub struct FaultLister<L> {
    inner: L,
    fault: FaultLayer,
}

impl<L: oio::List> oio::List for FaultLister<L> {
    async fn next(&mut self) -> opendal::Result<Option<oio::Entry>> {
        self.fault.check(FaultOp::ListNext)?;
        self.inner.next().await
    }
}

/// Retry settings with short delays so tests stay fast.
pub fn quick_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        min_delay_ms: 1,
        max_delay_ms: 5,
    }
}

/// Memory remote with `fault` under the same timeout and retry layers the S3
/// operator uses.
pub fn faulty_remote(bucket: &str, fault: FaultLayer, retry: &RetryConfig) -> Remote {
    let operator = Operator::new(Memory::default())
        .expect("memory operator")
        .layer(fault)
        .finish();

    Remote::new(
        with_retry(operator, Duration::from_secs(10), retry),
        bucket,
        Arc::new(MemoryBucketAdmin::with_bucket(bucket)),
        BackendType::Memory {
            bucket: bucket.to_string(),
        },
    )
}
