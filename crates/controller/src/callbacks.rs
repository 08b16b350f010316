use std::cell::RefCell;

use genjob_core::{JobError, JobResult, JobWarning};

pub(crate) type ProgressFn = Box<dyn FnMut(u8) + Send>;
pub(crate) type CompleteFn = Box<dyn FnMut(&JobResult) + Send>;
pub(crate) type ErrorFn = Box<dyn FnMut(&JobError) + Send>;
pub(crate) type WarningFn = Box<dyn FnMut(&JobWarning) + Send>;

/// Registered subscribers, in registration order.
#[derive(Default)]
pub(crate) struct Callbacks {
    progress: Vec<ProgressFn>,
    complete: Vec<CompleteFn>,
    error: Vec<ErrorFn>,
    warning: Vec<WarningFn>,
}

impl Callbacks {
    pub(crate) fn push_progress(&mut self, callback: ProgressFn) {
        self.progress.push(callback);
    }

    pub(crate) fn push_complete(&mut self, callback: CompleteFn) {
        self.complete.push(callback);
    }

    pub(crate) fn push_error(&mut self, callback: ErrorFn) {
        self.error.push(callback);
    }

    pub(crate) fn push_warning(&mut self, callback: WarningFn) {
        self.warning.push(callback);
    }

    // Slot accessors, passed to `dispatch`.

    pub(crate) fn progress(callbacks: &mut Self) -> &mut Vec<ProgressFn> {
        &mut callbacks.progress
    }

    pub(crate) fn complete(callbacks: &mut Self) -> &mut Vec<CompleteFn> {
        &mut callbacks.complete
    }

    pub(crate) fn error(callbacks: &mut Self) -> &mut Vec<ErrorFn> {
        &mut callbacks.error
    }

    pub(crate) fn warning(callbacks: &mut Self) -> &mut Vec<WarningFn> {
        &mut callbacks.warning
    }
}

/// Invoke every callback in `slot`, stopping once `live` returns `false`.
///
/// The slot is moved out of the cell while the callbacks run, so a callback
/// may re-enter the controller (register, cancel, restart). Callbacks
/// registered meanwhile are appended after the existing ones.
pub(crate) fn dispatch<C>(
    cell: &RefCell<Callbacks>,
    slot: fn(&mut Callbacks) -> &mut Vec<C>,
    live: impl Fn() -> bool,
    mut invoke: impl FnMut(&mut C),
) {
    let mut running = {
        let mut callbacks = cell.borrow_mut();
        std::mem::take(slot(&mut callbacks))
    };
    for callback in running.iter_mut() {
        if !live() {
            break;
        }
        invoke(callback);
    }
    let mut callbacks = cell.borrow_mut();
    let added = std::mem::replace(slot(&mut callbacks), running);
    slot(&mut callbacks).extend(added);
}
