//! Panic hook installation

use crate::config::PanicConfig;
use std::{
    panic::PanicHookInfo,
    sync::Arc,
};

type Hook = dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static;

/// The hook that was active before the logging hook replaced it.
///
/// [`restore`](Self::restore) puts it back; backbones shut down in reverse
/// order of installation leave the process with its original hook.
pub(crate) struct PanicHookGuard {
    previous: Arc<Box<Hook>>,
    restored: bool,
}

impl PanicHookGuard {
    pub(crate) fn restore(&mut self) {
        // set_hook must not be called while unwinding
        if self.restored || std::thread::panicking() {
            return;
        }
        self.restored = true;
        let previous = Arc::clone(&self.previous);
        std::panic::set_hook(Box::new(move |panic_info| (**previous)(panic_info)));
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Route panics through the logging pipeline before unwinding.
///
/// Returns `None` when the hook is disabled in `config`.
pub(crate) fn install_panic_hook(config: PanicConfig) -> Option<PanicHookGuard> {
    if !config.install {
        return None;
    }
    let previous: Arc<Box<Hook>> = Arc::new(std::panic::take_hook());
    let chained = Arc::clone(&previous);
    std::panic::set_hook(Box::new(move |panic_info| {
        if config.show_message {
            tracing::error!(target: "regtest::panic", "PANIC: {}", panic_info);
        } else {
            tracing::error!(target: "regtest::panic", "PANIC occurred!");
        }
        if config.show_default_hook {
            (**chained)(panic_info);
        }
    }));
    Some(PanicHookGuard {
        previous,
        restored: false,
    })
}
