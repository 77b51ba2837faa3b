//! Initialization driver

use super::InitializationError;
use crate::class::{ClassRecord, InitClaim, RegistryError, StaticStep};
use crate::runtime::Runtime;
use crate::RuntimeResult;
use javelin_types::ClassId;
use std::cell::Cell;
use std::sync::Arc;

thread_local! {
    static INIT_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Tracks nesting of initializations on the current thread
struct DepthGuard {
    level: usize,
}

impl DepthGuard {
    fn enter() -> Self {
        let level = INIT_DEPTH.with(|depth| {
            let level = depth.get() + 1;
            depth.set(level);
            level
        });
        Self { level }
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        INIT_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Owns a claimed initialization until its outcome is published
///
/// Dropping the guard without publishing (a step panicked) marks the class failed so that
/// waiting threads are released.
struct ClaimGuard<'a> {
    record: &'a ClassRecord,
    published: bool,
}

impl<'a> ClaimGuard<'a> {
    fn new(record: &'a ClassRecord) -> Self {
        Self {
            record,
            published: false,
        }
    }

    fn complete(mut self) {
        self.published = true;
        self.record.finish_init(Ok(()));
    }

    fn fail(mut self, cause: Arc<str>) {
        self.published = true;
        self.record.finish_init(Err(cause));
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.published {
            tracing::warn!(class = %self.record.id(), "static initializer panicked");
            self.record
                .finish_init(Err(Arc::from("static initializer panicked")));
        }
    }
}

/// Make sure `class` is initialized, running its static initialization if needed
pub(crate) fn ensure_initialized(
    runtime: &Runtime,
    class: &ClassId,
) -> Result<(), InitializationError> {
    let record = runtime
        .classes()
        .lookup(class)
        .map_err(|_| InitializationError::ClassNotFound(class.clone()))?;
    initialize(runtime, &record)
}

fn initialize(runtime: &Runtime, record: &ClassRecord) -> Result<(), InitializationError> {
    match record.claim_init() {
        InitClaim::Done | InitClaim::Reentrant => return Ok(()),
        InitClaim::Failed(cause) => {
            return Err(InitializationError::PreviouslyFailed {
                class: record.id().clone(),
                cause,
            })
        }
        InitClaim::Claimed => {}
    }

    let claim = ClaimGuard::new(record);
    let depth = DepthGuard::enter();
    let limit = runtime.options().limits.max_init_depth;
    if depth.level > limit {
        let err = InitializationError::DepthExceeded {
            class: record.id().clone(),
            limit,
        };
        tracing::warn!(class = %record.id(), limit, "initialization nesting limit exceeded");
        claim.fail(Arc::from(err.to_string()));
        return Err(err);
    }

    tracing::debug!(class = %record.id(), depth = depth.level, "initializing class");
    match run_steps(runtime, record) {
        Ok(()) => {
            claim.complete();
            tracing::debug!(class = %record.id(), "class initialized");
            Ok(())
        }
        Err(err) => {
            let cause: Arc<str> = Arc::from(err.to_string());
            claim.fail(cause.clone());
            tracing::warn!(class = %record.id(), %cause, "class initialization failed");
            Err(InitializationError::Failed {
                class: record.id().clone(),
                cause,
            })
        }
    }
}

fn run_steps(runtime: &Runtime, record: &ClassRecord) -> RuntimeResult<()> {
    if let Some(superclass) = record.superclass() {
        ensure_initialized(runtime, superclass)?;
    }
    for step in record.steps() {
        match step {
            StaticStep::Constant { slot, value } => {
                if !record.write_static(*slot, *value) {
                    return Err(RegistryError::NoSuchField {
                        class: record.id().clone(),
                        field: format!("static slot {}", slot),
                    }
                    .into());
                }
            }
            StaticStep::Block(block) => block.run(runtime, record.id())?,
        }
    }
    Ok(())
}
