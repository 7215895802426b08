//! Preemption controller contract
//!
//! The scheduler core only needs a narrow surface from whatever source
//! delivers quantum expiries: arm a repeating notification, mask and
//! unmask that one notification class, ask whether an occurrence is
//! pending while masked, consume it, and raise one on demand.

use core::time::Duration;
use crate::error::SchedResult;

/// Source of quantum-expiry notifications
pub trait QuantumTimer {
    /// Start (or restart) the repeating notification with this period
    fn arm(&self, quantum: Duration) -> SchedResult<()>;

    /// Stop delivering notifications
    fn disarm(&self) -> SchedResult<()>;

    /// Hold back notifications for the current thread of control
    fn mask(&self) -> SchedResult<()>;

    /// Let notifications through again; a pending one is delivered now
    fn unmask(&self) -> SchedResult<()>;

    /// Whether a notification arrived while masked
    fn is_pending(&self) -> SchedResult<bool>;

    /// Consume one pending notification without delivering it
    ///
    /// Must only be called when `is_pending` returned true.
    fn take_pending(&self) -> SchedResult<()>;

    /// Generate a notification right now
    ///
    /// While masked this only marks it pending.
    fn raise_now(&self) -> SchedResult<()>;
}
