//! Two-stage interrupt handling.
//!
//! The first interrupt asks the dispatch loop to stop at the next packet
//! boundary. A second interrupt while that request is pending terminates the
//! process on the spot, without cleanup.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;
use tracing::info;

/// Exit status used when a repeated interrupt kills the process.
pub const FORCED_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownState {
    Running = 0,
    ShutdownRequested = 1,
    ForceKill = 2,
}

impl ShutdownState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ShutdownState::Running,
            1 => ShutdownState::ShutdownRequested,
            _ => ShutdownState::ForceKill,
        }
    }
}

/// Trait for checking shutdown status.
pub trait ShutdownCheck {
    /// Returns true if the loop should stop before the next packet.
    fn should_stop(&self) -> bool;
}

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("failed to install interrupt handler: {0}")]
    Install(#[from] ctrlc::Error),
}

/// Process-wide shutdown state. Only ever moves forward.
#[derive(Debug, Default)]
pub struct ShutdownController {
    state: AtomicU8,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ShutdownState {
        ShutdownState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// True once a graceful stop has been asked for and not yet escalated.
    pub fn is_shutdown_requested(&self) -> bool {
        self.state() == ShutdownState::ShutdownRequested
    }

    /// Advance the state by one interrupt and return the new state.
    ///
    /// Running becomes ShutdownRequested; anything else becomes ForceKill.
    pub fn request_shutdown(&self) -> ShutdownState {
        match self.state.compare_exchange(
            ShutdownState::Running as u8,
            ShutdownState::ShutdownRequested as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => ShutdownState::ShutdownRequested,
            Err(_) => {
                self.state
                    .store(ShutdownState::ForceKill as u8, Ordering::SeqCst);
                ShutdownState::ForceKill
            }
        }
    }
}

impl ShutdownCheck for ShutdownController {
    fn should_stop(&self) -> bool {
        self.state() != ShutdownState::Running
    }
}

/// Shutdown checker that never asks the loop to stop.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverShutdown;

impl ShutdownCheck for NeverShutdown {
    fn should_stop(&self) -> bool {
        false
    }
}

/// Advance `controller` by one interrupt and report it to the user.
///
/// The first interrupt only asks the loop to stop. A repeated one calls
/// `exit` with [`FORCED_EXIT_CODE`] straight away; nothing is cleaned up.
pub fn on_interrupt(controller: &ShutdownController, exit: impl FnOnce(i32)) -> ShutdownState {
    let state = controller.request_shutdown();
    match state {
        ShutdownState::ShutdownRequested => {
            info!("interrupt received, stopping after the current packet");
            eprintln!("\nwill shut down (interrupt again to kill)");
        }
        ShutdownState::Running | ShutdownState::ForceKill => {
            info!("second interrupt received, terminating without cleanup");
            eprintln!("shut down badly");
            exit(FORCED_EXIT_CODE);
        }
    }
    state
}

/// Route SIGINT into `controller`.
///
/// The handler runs on a dedicated thread and hands every interrupt to
/// [`on_interrupt`], exiting the process on the second one.
///
/// # Errors
/// Returns `ShutdownError::Install` when a handler is already registered or
/// the platform refuses one.
pub fn install_interrupt_handler(controller: Arc<ShutdownController>) -> Result<(), ShutdownError> {
    ctrlc::set_handler(move || {
        on_interrupt(&controller, |code| std::process::exit(code));
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        FORCED_EXIT_CODE, NeverShutdown, ShutdownCheck, ShutdownController, ShutdownState,
        on_interrupt,
    };

    #[test]
    fn controller_starts_running() {
        let controller = ShutdownController::new();
        assert_eq!(controller.state(), ShutdownState::Running);
        assert!(!controller.should_stop());
    }

    #[test]
    fn first_request_asks_for_graceful_stop() {
        let controller = ShutdownController::new();
        assert_eq!(
            controller.request_shutdown(),
            ShutdownState::ShutdownRequested
        );
        assert!(controller.is_shutdown_requested());
    }

    #[test]
    fn second_request_escalates_to_force_kill() {
        let controller = ShutdownController::new();
        controller.request_shutdown();
        assert_eq!(controller.request_shutdown(), ShutdownState::ForceKill);
        assert_eq!(controller.state(), ShutdownState::ForceKill);
        assert!(!controller.is_shutdown_requested());
        assert!(controller.should_stop());
    }

    #[test]
    fn first_interrupt_does_not_exit() {
        let controller = ShutdownController::new();
        let mut exited = None;
        let state = on_interrupt(&controller, |code| exited = Some(code));
        assert_eq!(state, ShutdownState::ShutdownRequested);
        assert_eq!(exited, None);
        assert!(controller.should_stop());
    }

    #[test]
    fn second_interrupt_exits_with_forced_code() {
        let controller = ShutdownController::new();
        let mut exits = Vec::new();
        on_interrupt(&controller, |code| exits.push(code));
        let state = on_interrupt(&controller, |code| exits.push(code));
        assert_eq!(state, ShutdownState::ForceKill);
        assert_eq!(exits, [FORCED_EXIT_CODE]);
        assert_eq!(FORCED_EXIT_CODE, 1);
    }

    #[test]
    fn further_interrupts_keep_exiting() {
        let controller = ShutdownController::new();
        let mut exits = 0;
        for _ in 0..4 {
            on_interrupt(&controller, |_| exits += 1);
        }
        assert_eq!(exits, 3);
        assert_eq!(controller.state(), ShutdownState::ForceKill);
    }

    #[test]
    fn shared_controller_sees_requests() {
        let controller = Arc::new(ShutdownController::new());
        let handler_side = Arc::clone(&controller);
        handler_side.request_shutdown();
        assert!(controller.should_stop());
    }

    #[test]
    fn request_from_another_thread_is_visible() {
        let controller = Arc::new(ShutdownController::new());
        let remote = Arc::clone(&controller);
        std::thread::spawn(move || remote.request_shutdown())
            .join()
            .unwrap();
        assert_eq!(controller.state(), ShutdownState::ShutdownRequested);
    }

    #[test]
    fn never_shutdown_never_stops() {
        assert!(!NeverShutdown.should_stop());
    }
}
