//! # Shutdown hooks.
//!
//! Hooks are registered before a run starts and execute only when the run is stopped by an
//! external cancellation, strictly in registration order, right before the worker is asked to
//! terminate. A worker that exits on its own never triggers them.
//!
//! ## Example
//! ```rust
//! use warden_core::{HookError, HookFn, ShutdownContext, ShutdownHooks};
//!
//! let mut hooks = ShutdownHooks::new();
//! hooks.register(HookFn::arc("log-pid", |ctx: ShutdownContext| async move {
//!     println!("stopping worker {}", ctx.pid());
//!     Ok::<_, HookError>(())
//! }));
//! assert_eq!(hooks.len(), 1);
//! ```

use std::{
    borrow::Cow,
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};

use tokio_util::sync::CancellationToken;

use crate::{admin::AdminEndpoint, error::HookError};

pub type BoxHookFuture = Pin<Box<dyn Future<Output = Result<(), HookError>> + Send + 'static>>;

/// Shared handle to a hook.
pub type HookRef = Arc<dyn ShutdownHook>;

/// What a hook gets to see of the run it is stopping.
#[derive(Clone, Debug)]
pub struct ShutdownContext {
    budget: CancellationToken,
    pid: u32,
    run_dir: PathBuf,
    admin: Arc<AdminEndpoint>,
}

impl ShutdownContext {
    pub fn new(
        budget: CancellationToken,
        pid: u32,
        run_dir: impl Into<PathBuf>,
        admin: Arc<AdminEndpoint>,
    ) -> Self {
        Self {
            budget,
            pid,
            run_dir: run_dir.into(),
            admin,
        }
    }

    /// Cancelled once the shutdown ceiling elapses. Hooks are not interrupted; long-running
    /// hooks may watch this to give up early.
    pub fn budget(&self) -> &CancellationToken {
        &self.budget
    }

    /// Pid of the still-running worker.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn admin(&self) -> &AdminEndpoint {
        &self.admin
    }
}

/// A caller-supplied action executed before the worker is signalled.
pub trait ShutdownHook: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Creates the future performing the hook's work.
    fn call(&self, ctx: ShutdownContext) -> BoxHookFuture;
}

/// Closure-backed hook.
pub struct HookFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HookFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> ShutdownHook for HookFn<F>
where
    F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, ctx: ShutdownContext) -> BoxHookFuture {
        Box::pin((self.f)(ctx))
    }
}

/// Ordered, append-only hook list.
#[derive(Clone, Default)]
pub struct ShutdownHooks {
    hooks: Vec<HookRef>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn register(&mut self, hook: HookRef) {
        self.hooks.push(hook);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HookRef> {
        self.hooks.iter()
    }
}

impl std::fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.hooks.iter().map(|h| h.name())).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn ctx() -> ShutdownContext {
        ShutdownContext::new(
            CancellationToken::new(),
            42,
            "/runs/1",
            Arc::new(AdminEndpoint::new("/runs/1/admin-address.txt")),
        )
    }

    #[tokio::test]
    async fn hooks_keep_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = ShutdownHooks::new();
        for name in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            hooks.register(HookFn::arc(name, move |ctx: ShutdownContext| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().unwrap().push((name, ctx.pid()));
                    Ok::<_, HookError>(())
                }
            }));
        }

        for hook in hooks.iter() {
            hook.call(ctx()).await.unwrap();
        }
        assert_eq!(format!("{hooks:?}"), r#"["first", "second", "third"]"#);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 42), ("second", 42), ("third", 42)]
        );
    }

    #[tokio::test]
    async fn hook_errors_surface_to_caller() {
        let hook = HookFn::arc("boom", |_ctx: ShutdownContext| async {
            Err::<(), _>(HookError::failed("admin not ready"))
        });
        let err = hook.call(ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "admin not ready");
    }

    #[test]
    fn context_exposes_run_dir() {
        let c = ctx();
        assert_eq!(c.run_dir(), Path::new("/runs/1"));
        assert_eq!(c.admin().path(), Path::new("/runs/1/admin-address.txt"));
        assert!(!c.budget().is_cancelled());
    }
}
