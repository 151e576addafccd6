/// Layer: the on/off state machine of one map layer.
///
/// ## States
///
///   - `Online` / `Offline`: `online` flag, stable.
///   - `PendingToggle`: `toggle_requested_at` is set. The flag flips
///     once more than [`TOGGLE_DELAY_MS`] has passed since the request.
///
/// Only one toggle can be pending; further requests are ignored until
/// the flip happens. Layers with a [`ToggleSchedule`] request their own
/// toggles: after `online_ms` while online, after `offline_ms` while offline.
///
/// Time is wall-clock milliseconds (`f64`) supplied by the caller.

use rand::Rng;

use crate::domain::tile::LayerRole;

/// Lag between a toggle request and the actual flip.
pub const TOGGLE_DELAY_MS: f64 = 1200.0;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ToggleSchedule {
    pub online_ms: f64,
    pub offline_ms: f64,
}

impl ToggleSchedule {
    /// Both durations must be finite and positive; anything else means
    /// "never auto-toggle" (e.g. infinite online time, zero offline time).
    pub fn new(online_ms: f64, offline_ms: f64) -> Option<Self> {
        let valid = |d: f64| d.is_finite() && d > 0.0;
        (valid(online_ms) && valid(offline_ms)).then_some(ToggleSchedule { online_ms, offline_ms })
    }
}

#[derive(Clone, Debug)]
struct AutoToggle {
    schedule: ToggleSchedule,
    last_toggle: f64,
    wait: f64,
}

#[derive(Clone, Debug)]
pub struct Layer {
    role: LayerRole,
    online: bool,
    toggle_requested_at: Option<f64>,
    auto: Option<AutoToggle>,
}

impl Layer {
    /// Layers start online. A scheduled layer waits its online time first.
    pub fn new(role: LayerRole, schedule: Option<ToggleSchedule>, now: f64) -> Self {
        Layer {
            role,
            online: true,
            toggle_requested_at: None,
            auto: schedule.map(|schedule| AutoToggle {
                schedule,
                last_toggle: now,
                wait: schedule.online_ms,
            }),
        }
    }

    pub fn role(&self) -> LayerRole {
        self.role
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn is_pending(&self) -> bool {
        self.toggle_requested_at.is_some()
    }

    #[allow(dead_code)]
    pub fn schedule(&self) -> Option<ToggleSchedule> {
        self.auto.as_ref().map(|a| a.schedule)
    }

    pub fn request_toggle(&mut self, now: f64) {
        if self.toggle_requested_at.is_none() {
            self.toggle_requested_at = Some(now);
        }
    }

    /// Whether to draw the layer this frame. Flickers at random while a
    /// toggle is pending. Visual only; collision reads `is_online`.
    pub fn is_visible<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if self.is_pending() {
            rng.random_bool(0.5)
        } else {
            self.online
        }
    }

    /// Advance timers. Returns `true` if the layer flipped this tick.
    pub fn tick(&mut self, now: f64) -> bool {
        if let Some(auto) = self.auto.as_mut() {
            if now - auto.last_toggle > auto.wait {
                self.toggle_requested_at.get_or_insert(now);
                auto.last_toggle = now;
                auto.wait = if self.online {
                    auto.schedule.offline_ms
                } else {
                    auto.schedule.online_ms
                };
            }
        }

        match self.toggle_requested_at {
            Some(at) if now - at > TOGGLE_DELAY_MS => {
                self.online = !self.online;
                self.toggle_requested_at = None;
                log::debug!("{:?} layer is now {}", self.role, if self.online { "online" } else { "offline" });
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn scheduled(online: f64, offline: f64) -> Layer {
        Layer::new(LayerRole::Blockers, ToggleSchedule::new(online, offline), 0.0)
    }

    /// Drive the layer in 1ms steps and record request / flip timestamps.
    fn trace(layer: &mut Layer, until: f64) -> (Vec<f64>, Vec<f64>) {
        let mut requests = vec![];
        let mut flips = vec![];
        let mut t = 0.0;
        while t <= until {
            let was_pending = layer.is_pending();
            if layer.tick(t) {
                flips.push(t);
            }
            if !was_pending && layer.is_pending() {
                requests.push(t);
            }
            t += 1.0;
        }
        (requests, flips)
    }

    #[test]
    fn unscheduled_layer_stays_online() {
        let mut layer = Layer::new(LayerRole::Solid, None, 0.0);
        for t in 0..100_000 {
            assert!(!layer.tick(t as f64));
        }
        assert!(layer.is_online());
    }

    #[test]
    fn degenerate_schedules_are_rejected() {
        assert!(ToggleSchedule::new(f64::INFINITY, 0.0).is_none());
        assert!(ToggleSchedule::new(6000.0, 0.0).is_none());
        assert!(ToggleSchedule::new(6000.0, 3000.0).is_some());
    }

    #[test]
    fn auto_requests_alternate_durations() {
        let mut layer = scheduled(6000.0, 3000.0);
        let (requests, flips) = trace(&mut layer, 30_000.0);

        assert_eq!(requests[0], 6001.0);
        // Leaving online waits the offline time, leaving offline the online time.
        assert_eq!(requests[1] - requests[0], 3001.0);
        assert_eq!(requests[2] - requests[1], 6001.0);
        assert_eq!(requests[3] - requests[2], 3001.0);

        for (req, flip) in requests.iter().zip(&flips) {
            assert_eq!(flip - req, TOGGLE_DELAY_MS + 1.0);
        }
    }

    #[test]
    fn flip_lags_request_by_toggle_delay() {
        let mut layer = Layer::new(LayerRole::Blockers, None, 0.0);
        layer.request_toggle(100.0);
        assert!(!layer.tick(1300.0));
        assert!(layer.is_online());
        assert!(layer.tick(1300.5));
        assert!(!layer.is_online());
        assert!(!layer.is_pending());
    }

    #[test]
    fn repeated_requests_are_idempotent() {
        let mut layer = Layer::new(LayerRole::Blockers, None, 0.0);
        layer.request_toggle(100.0);
        layer.request_toggle(900.0);
        layer.tick(1000.0);
        layer.request_toggle(1200.0);
        assert!(layer.tick(1301.0));
        assert!(!layer.is_online());
    }

    #[test]
    fn visibility_flickers_only_while_pending() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut layer = Layer::new(LayerRole::Blockers, None, 0.0);
        assert!((0..50).all(|_| layer.is_visible(&mut rng)));

        layer.request_toggle(0.0);
        let shown = (0..1000).filter(|_| layer.is_visible(&mut rng)).count();
        assert!(shown > 300 && shown < 700, "shown {shown}");

        layer.tick(1201.0);
        assert!((0..50).all(|_| !layer.is_visible(&mut rng)));
    }
}
