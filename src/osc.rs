//! Per-channel oscillator state.

/// A channel's carrier oscillator: base frequency, cumulative frequency
/// shift, and phase offset. Phase is kept in cycles (not radians) and is
/// never wrapped, so long schedules do not alias through repeated
/// normalization.
///
/// `OscState` is a value type: every instruction produces a new state
/// rather than mutating one in place, so callers (and tests) can compare
/// before/after states trivially.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscState {
    pub base_freq: f64,
    pub delta_freq: f64,
    pub phase: f64,
}

impl OscState {
    /// Construct a state with no accumulated shift or phase.
    pub fn new(base_freq: f64) -> Self {
        Self {
            base_freq,
            delta_freq: 0.0,
            phase: 0.0,
        }
    }

    /// `base_freq + delta_freq`.
    #[inline]
    pub fn total_freq(&self) -> f64 {
        self.base_freq + self.delta_freq
    }

    /// Instantaneous phase (in cycles) at time `t`: `total_freq * t + phase`.
    #[inline]
    pub fn phase_at(&self, t: f64) -> f64 {
        self.total_freq() * t + self.phase
    }

    /// Advance the state by `dt` seconds, keeping the carrier continuous:
    /// `phase <- phase + total_freq * dt`.
    #[inline]
    pub fn with_time_shift(&self, dt: f64) -> Self {
        Self {
            phase: self.phase + self.total_freq() * dt,
            ..*self
        }
    }

    /// `ShiftPhase(delta)`.
    #[inline]
    pub fn shift_phase(&self, delta: f64) -> Self {
        Self {
            phase: self.phase + delta,
            ..*self
        }
    }

    /// `SetPhase(target)` at time `t`: solve for the phase offset such that
    /// `phase_at(t) == target`.
    #[inline]
    pub fn set_phase(&self, t: f64, target: f64) -> Self {
        Self {
            phase: target - self.total_freq() * t,
            ..*self
        }
    }

    /// `ShiftFreq(delta)` at time `t`: add `delta` to the cumulative
    /// frequency shift while holding `phase_at(t)` fixed, guaranteeing phase
    /// continuity across the jump.
    #[inline]
    pub fn shift_freq(&self, t: f64, delta: f64) -> Self {
        let p = self.phase_at(t);
        let new = Self {
            delta_freq: self.delta_freq + delta,
            ..*self
        };
        Self {
            phase: p - new.total_freq() * t,
            ..new
        }
    }

    /// `SetFreq(target)` at time `t`: set the cumulative frequency shift so
    /// that `total_freq == target`, again holding `phase_at(t)` fixed.
    #[inline]
    pub fn set_freq(&self, t: f64, target: f64) -> Self {
        let p = self.phase_at(t);
        let new = Self {
            delta_freq: target - self.base_freq,
            ..*self
        };
        Self {
            phase: p - new.total_freq() * t,
            ..new
        }
    }

    /// `SwapPhase`: given this state and `other` at the same time `t`,
    /// return the pair of states after their instantaneous phases are
    /// exchanged. `total_freq` on each channel is unchanged.
    #[inline]
    pub fn swap_phase(&self, other: &Self, t: f64) -> (Self, Self) {
        let p_self = self.phase_at(t);
        let p_other = other.phase_at(t);
        let new_self = self.set_phase(t, p_other);
        let new_other = other.set_phase(t, p_self);
        (new_self, new_other)
    }
}
