//! Unix interval-timer preemption

use crate::config::TimerClock;
use core::time::Duration;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use uthread_core::constants::MICROS_PER_SEC;
use uthread_core::{QuantumTimer, SchedError, SchedResult};

/// Quantum handler signature
pub type QuantumHandler = extern "C" fn(libc::c_int);

/// Interval timer plus the signal it delivers
pub struct SignalTimer {
    clock: TimerClock,
}

impl SignalTimer {
    pub const fn new(clock: TimerClock) -> Self {
        Self { clock }
    }

    /// Signal delivered at each quantum expiry
    #[inline]
    pub fn signal(&self) -> Signal {
        match self.clock {
            TimerClock::Virtual => Signal::SIGVTALRM,
            TimerClock::Real => Signal::SIGALRM,
        }
    }

    fn which(&self) -> libc::c_int {
        match self.clock {
            TimerClock::Virtual => libc::ITIMER_VIRTUAL,
            TimerClock::Real => libc::ITIMER_REAL,
        }
    }

    /// Set containing only the quantum signal
    pub fn sigset(&self) -> SigSet {
        let mut set = SigSet::empty();
        set.add(self.signal());
        set
    }

    /// Route the quantum signal to `handler`
    ///
    /// The signal stays blocked while the handler runs. Interrupted system
    /// calls are restarted.
    pub fn install(&self, handler: QuantumHandler) -> SchedResult<()> {
        let action = SigAction::new(
            SigHandler::Handler(handler),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        unsafe { signal::sigaction(self.signal(), &action) }
            .map(|_| ())
            .map_err(signal_errno)
    }

    fn set_timer(&self, period: Duration) -> SchedResult<()> {
        let tv = to_timeval(period);
        let value = libc::itimerval {
            it_interval: tv,
            it_value: tv,
        };
        let ret = unsafe { libc::setitimer(self.which(), &value, core::ptr::null_mut()) };
        if ret != 0 {
            return Err(SchedError::TimerSetup(last_errno()));
        }
        Ok(())
    }
}

impl QuantumTimer for SignalTimer {
    fn arm(&self, quantum: Duration) -> SchedResult<()> {
        // A zero timeval would disarm instead
        self.set_timer(quantum.max(Duration::from_micros(1)))
    }

    fn disarm(&self) -> SchedResult<()> {
        self.set_timer(Duration::ZERO)
    }

    fn mask(&self) -> SchedResult<()> {
        self.sigset().thread_block().map_err(signal_errno)
    }

    fn unmask(&self) -> SchedResult<()> {
        self.sigset().thread_unblock().map_err(signal_errno)
    }

    fn is_pending(&self) -> SchedResult<bool> {
        let mut pending = core::mem::MaybeUninit::<libc::sigset_t>::uninit();
        unsafe {
            if libc::sigpending(pending.as_mut_ptr()) != 0 {
                return Err(SchedError::SignalSetup(last_errno()));
            }
            Ok(libc::sigismember(pending.as_ptr(), self.signal() as libc::c_int) == 1)
        }
    }

    fn take_pending(&self) -> SchedResult<()> {
        self.sigset().wait().map(|_| ()).map_err(signal_errno)
    }

    fn raise_now(&self) -> SchedResult<()> {
        signal::raise(self.signal()).map_err(signal_errno)
    }
}

fn to_timeval(d: Duration) -> libc::timeval {
    let micros = d.as_micros();
    let per_sec = MICROS_PER_SEC as u128;
    libc::timeval {
        tv_sec: (micros / per_sec) as libc::time_t,
        tv_usec: (micros % per_sec) as libc::suseconds_t,
    }
}

fn signal_errno(e: nix::Error) -> SchedError {
    SchedError::SignalSetup(e as i32)
}

fn last_errno() -> i32 {
    nix::errno::Errno::last() as i32
}
