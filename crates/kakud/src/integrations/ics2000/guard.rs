//! Admission control for device commands.
//!
//! Every live worker holds a [`Claim`] on an [`ActionKey`]. A request for a
//! device is admitted only when none of the device's exclusive action classes
//! is claimed; conflicting requests are dropped, never queued.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use strum::Display;
use strum::EnumIter;
use strum::IntoEnumIterator;
use tracing::debug;

use super::hub::DeviceId;

/// Unit of mutual exclusion per device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ActionClass {
    On,
    Dim,
    Off,
    ChangeTemperature,
    Open,
    Close,
    Stop,
}

impl ActionClass {
    /// Whether a live worker of this class makes the whole device busy.
    ///
    /// Color temperature changes are tracked but never block other requests.
    pub fn is_exclusive(self) -> bool {
        !matches!(self, ActionClass::ChangeTemperature)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub device: DeviceId,
    pub class: ActionClass,
}

impl ActionKey {
    pub fn new(device: DeviceId, class: ActionClass) -> Self {
        Self { device, class }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class, self.device)
    }
}

type LiveKeys = Arc<Mutex<HashSet<ActionKey>>>;

/// Tracks which `(device, action)` pairs have a live worker.
///
/// Cloning is cheap and clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGuard {
    live: LiveKeys,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any exclusive action class is live for `device`
    pub fn is_busy(&self, device: DeviceId) -> bool {
        Self::busy(&self.lock(), device)
    }

    /// Atomically check that `device` is not busy and claim one key per class.
    ///
    /// Returns `None` when the device is busy, in which case nothing is
    /// claimed. A non-exclusive class that is already live is left out of the
    /// admission; the remaining classes are still claimed.
    pub fn try_admit(&self, device: DeviceId, classes: &[ActionClass]) -> Option<Admission> {
        let mut live = self.lock();

        if Self::busy(&live, device) {
            let running: Vec<String> = live
                .iter()
                .filter(|k| k.device == device)
                .map(|k| k.to_string())
                .collect();
            debug!("Running workers for device {}: {}", device, running.join(","));
            return None;
        }

        let mut claims = Vec::with_capacity(classes.len());
        for &class in classes {
            let key = ActionKey::new(device, class);
            if live.insert(key) {
                claims.push(Claim {
                    key,
                    live: Arc::clone(&self.live),
                });
            } else {
                debug!("Worker {} already live, skipping", key);
            }
        }

        Some(Admission { claims })
    }

    /// Snapshot of the keys with a live worker
    pub fn live_keys(&self) -> Vec<ActionKey> {
        self.lock().iter().copied().collect()
    }

    fn busy(live: &HashSet<ActionKey>, device: DeviceId) -> bool {
        ActionClass::iter()
            .filter(|class| class.is_exclusive())
            .any(|class| live.contains(&ActionKey::new(device, class)))
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ActionKey>> {
        // The set stays consistent even if a holder panicked
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Claims granted to one admitted request
#[derive(Debug)]
pub struct Admission {
    claims: Vec<Claim>,
}

impl Admission {
    /// Take the claim for `class`, if it was granted
    pub fn take(&mut self, class: ActionClass) -> Option<Claim> {
        let index = self.claims.iter().position(|c| c.key.class == class)?;
        Some(self.claims.swap_remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// Exclusive hold on an [`ActionKey`], released on drop.
#[derive(Debug)]
pub struct Claim {
    key: ActionKey,
    live: LiveKeys,
}

impl Claim {
    pub fn key(&self) -> ActionKey {
        self.key
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        live.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAMP: DeviceId = DeviceId(1);
    const OTHER: DeviceId = DeviceId(2);

    #[test]
    fn test_idle_device_is_not_busy() {
        let guard = ConcurrencyGuard::new();
        assert!(!guard.is_busy(LAMP));
    }

    #[test]
    fn test_each_exclusive_class_blocks_the_device() {
        for class in [ActionClass::On, ActionClass::Dim, ActionClass::Off] {
            let guard = ConcurrencyGuard::new();
            let _admission = guard.try_admit(LAMP, &[class]).unwrap();

            assert!(guard.is_busy(LAMP), "{} should make the device busy", class);
            assert!(guard.try_admit(LAMP, &[ActionClass::Off]).is_none());
            assert!(guard.try_admit(LAMP, &[ActionClass::On]).is_none());
        }
    }

    #[test]
    fn test_busy_is_per_device() {
        let guard = ConcurrencyGuard::new();
        let _admission = guard.try_admit(LAMP, &[ActionClass::On]).unwrap();

        assert!(!guard.is_busy(OTHER));
        assert!(guard.try_admit(OTHER, &[ActionClass::On]).is_some());
    }

    #[test]
    fn test_dropping_claim_releases_key() {
        let guard = ConcurrencyGuard::new();
        let mut admission = guard.try_admit(LAMP, &[ActionClass::Dim]).unwrap();
        let claim = admission.take(ActionClass::Dim).unwrap();
        assert_eq!(claim.key(), ActionKey::new(LAMP, ActionClass::Dim));
        assert!(guard.is_busy(LAMP));

        drop(claim);
        assert!(!guard.is_busy(LAMP));
        assert!(guard.live_keys().is_empty());
    }

    #[test]
    fn test_untaken_claims_release_with_admission() {
        let guard = ConcurrencyGuard::new();
        let admission = guard
            .try_admit(LAMP, &[ActionClass::On, ActionClass::Dim])
            .unwrap();
        assert_eq!(guard.live_keys().len(), 2);

        drop(admission);
        assert!(guard.live_keys().is_empty());
    }

    #[test]
    fn test_color_temperature_does_not_make_device_busy() {
        let guard = ConcurrencyGuard::new();
        let _admission = guard
            .try_admit(LAMP, &[ActionClass::ChangeTemperature])
            .unwrap();

        assert!(!guard.is_busy(LAMP));
        assert!(guard.try_admit(LAMP, &[ActionClass::Off]).is_some());
    }

    #[test]
    fn test_live_color_temperature_is_skipped_not_duplicated() {
        let guard = ConcurrencyGuard::new();
        let _first = guard
            .try_admit(LAMP, &[ActionClass::ChangeTemperature])
            .unwrap();

        let mut second = guard
            .try_admit(LAMP, &[ActionClass::Dim, ActionClass::ChangeTemperature])
            .unwrap();
        assert!(second.take(ActionClass::ChangeTemperature).is_none());
        assert!(second.take(ActionClass::Dim).is_some());
    }

    #[test]
    fn test_refused_admission_claims_nothing() {
        let guard = ConcurrencyGuard::new();
        let _busy = guard.try_admit(LAMP, &[ActionClass::On]).unwrap();

        assert!(guard
            .try_admit(LAMP, &[ActionClass::ChangeTemperature])
            .is_none());
        assert_eq!(guard.live_keys(), vec![ActionKey::new(LAMP, ActionClass::On)]);
    }

    #[test]
    fn test_key_display() {
        let key = ActionKey::new(DeviceId(42), ActionClass::ChangeTemperature);
        assert_eq!(key.to_string(), "change_temperature:42");
    }

    #[test]
    fn test_concurrent_admission_grants_exactly_one() {
        const THREADS: usize = 12;
        let classes = [ActionClass::On, ActionClass::Dim, ActionClass::Off];

        for _ in 0..50 {
            let guard = ConcurrencyGuard::new();
            let barrier = std::sync::Barrier::new(THREADS);

            let admissions: Vec<Option<Admission>> = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..THREADS)
                    .map(|i| {
                        let guard = &guard;
                        let barrier = &barrier;
                        let class = classes[i % classes.len()];
                        scope.spawn(move || {
                            barrier.wait();
                            guard.try_admit(LAMP, &[class])
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            assert_eq!(admissions.iter().filter(|a| a.is_some()).count(), 1);
            assert_eq!(guard.live_keys().len(), 1);
        }
    }
}
