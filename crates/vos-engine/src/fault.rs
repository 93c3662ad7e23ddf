//! Fault injection.
//!
//! A process-global, deterministic failure controller consulted only at
//! enumerated injection points (checksum path, NVMe submit path, KBTR
//! allocate path — §7). Injection must leave the engine in the same
//! consistent post-abort state as an organic failure, which falls out for
//! free here since every injection site returns a normal `Result` error that
//! the caller's `scoped_tx` aborts on exactly as it would any other failure.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use vos_types::error::VosError;
use vos_types::Result;

/// A named site the engine consults before performing a fallible operation
/// that would otherwise always succeed in a test environment.
pub type InjectionPoint = &'static str;

pub const CHECKSUM_PATH: InjectionPoint = "checksum_path";
pub const NVME_SUBMIT_PATH: InjectionPoint = "nvme_submit_path";
pub const KBTR_ALLOCATE_PATH: InjectionPoint = "kbtr_allocate_path";

/// How a configured injection should fire.
#[derive(Debug, Clone, Copy)]
enum Mode {
    Once,
    Always,
    Some(u32),
}

static CONTROLLER: Lazy<Mutex<HashMap<InjectionPoint, Mode>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Arms `point` to fail exactly once.
pub fn arm_once(point: InjectionPoint) {
    CONTROLLER.lock().insert(point, Mode::Once);
}

/// Arms `point` to fail on every consultation until disarmed.
pub fn arm_always(point: InjectionPoint) {
    CONTROLLER.lock().insert(point, Mode::Always);
}

/// Arms `point` to fail on the next `n` consultations.
pub fn arm_some(point: InjectionPoint, n: u32) {
    CONTROLLER.lock().insert(point, Mode::Some(n));
}

/// Clears any armed fault at `point`.
pub fn disarm(point: InjectionPoint) {
    CONTROLLER.lock().remove(point);
}

/// Clears every armed fault. Intended for test teardown between cases that
/// share the process-global controller.
pub fn reset() {
    CONTROLLER.lock().clear();
}

/// Consults the controller for `point`, returning `Err` if it should fire.
/// Call sites pass the error their organic failure path would have produced
/// so injected and organic failures are indistinguishable to the caller.
pub fn check(point: InjectionPoint, err: VosError) -> Result<()> {
    let mut guard = CONTROLLER.lock();
    match guard.get_mut(point) {
        None => Ok(()),
        Some(Mode::Once) => {
            guard.remove(point);
            Err(err)
        }
        Some(Mode::Always) => Err(err),
        Some(Mode::Some(remaining)) => {
            if *remaining == 0 {
                guard.remove(point);
                return Ok(());
            }
            *remaining -= 1;
            let hit = Err(err);
            if *remaining == 0 {
                guard.remove(point);
            }
            hit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn once_fires_exactly_once() {
        reset();
        arm_once(CHECKSUM_PATH);
        assert!(check(CHECKSUM_PATH, VosError::Io("boom".into())).is_err());
        assert!(check(CHECKSUM_PATH, VosError::Io("boom".into())).is_ok());
    }

    #[test]
    fn always_keeps_firing_until_disarmed() {
        reset();
        arm_always(NVME_SUBMIT_PATH);
        assert!(check(NVME_SUBMIT_PATH, VosError::Io("boom".into())).is_err());
        assert!(check(NVME_SUBMIT_PATH, VosError::Io("boom".into())).is_err());
        disarm(NVME_SUBMIT_PATH);
        assert!(check(NVME_SUBMIT_PATH, VosError::Io("boom".into())).is_ok());
    }

    #[test]
    fn some_fires_n_times_then_stops() {
        reset();
        arm_some(KBTR_ALLOCATE_PATH, 2);
        assert!(check(KBTR_ALLOCATE_PATH, VosError::NoMemory).is_err());
        assert!(check(KBTR_ALLOCATE_PATH, VosError::NoMemory).is_err());
        assert!(check(KBTR_ALLOCATE_PATH, VosError::NoMemory).is_ok());
    }
}
