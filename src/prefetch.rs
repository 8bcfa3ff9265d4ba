//! Prefetch hints and the prefetch-and-suspend primitive.

use crate::scheduler::{Context, Step};

/// Issue a non-blocking read prefetch for the cache line holding `ptr`.
///
/// Null is accepted and ignored.
#[inline(always)]
pub fn prefetch_read<T>(ptr: *const T) {
    if ptr.is_null() {
        return;
    }

    #[cfg(all(target_arch = "x86_64", target_feature = "sse"))]
    // SAFETY: prefetch is a hint; it never faults, even on invalid addresses.
    unsafe {
        use core::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        _mm_prefetch(ptr as *const i8, _MM_HINT_T0);
    }

    #[cfg(target_arch = "aarch64")]
    // SAFETY: `prfm` is a hint with no architectural side effects.
    unsafe {
        core::arch::asm!(
            "prfm pldl1keep, [{addr}]",
            addr = in(reg) ptr,
            options(nostack, preserves_flags),
        );
    }
}

/// Prefetch `target`, park the running task on the ready queue and suspend.
///
/// The caller stores `target` (or the handle it was derived from) in its
/// saved state before returning the `Step`, and reads it back on the next
/// resume, by which time the line is likely cache resident. `None` still
/// yields, it just skips the hint.
#[inline]
pub fn prefetch_and_schedule_on<T, O>(target: Option<&T>, cx: &mut Context<'_>) -> Step<O> {
    if let Some(target) = target {
        prefetch_read(target as *const T);
    }
    cx.reschedule();
    Step::Suspended
}
