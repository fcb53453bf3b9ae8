//! Position PID for the tick loop.
//!
//! `u = Kp·e + I + Kd·D`, where `I` integrates `Ki·e` with backward Euler
//! and is pulled back by `(sat(u) − u) / Tt` while the output saturates,
//! and `D` is the error slope passed through a first-order low-pass with
//! time constant `Tf`. A zero `Ki`/`Kd`/`Tf`/`Tt` switches that part off.

use motion_common::control::PidParameters;

use super::FeedbackController;

/// Memory carried between ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    integral: f32,
    last_error: f32,
    slope: f32,
    /// Unclamped output of the previous step.
    last_unclamped: f32,
}

impl PidState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// One control step. Returns the unclamped output; `0.0` for a non-positive `dt`.
    pub fn step(&mut self, gains: &PidGains, error: f32, dt: f32) -> f32 {
        if dt <= 0.0 {
            return 0.0;
        }

        let i_term = self.integrate(gains, error, dt);
        let d_term = self.differentiate(gains, error, dt);
        let output = gains.kp * error + i_term + d_term;

        self.last_error = error;
        self.last_unclamped = output;
        output
    }

    fn integrate(&mut self, gains: &PidGains, error: f32, dt: f32) -> f32 {
        if gains.ki == 0.0 {
            self.integral = 0.0;
            return 0.0;
        }
        let back_calc = if gains.tt > 0.0 && gains.out_max > 0.0 {
            let excess = gains.clamp(self.last_unclamped) - self.last_unclamped;
            excess / gains.tt
        } else {
            0.0
        };
        self.integral += (gains.ki * error + back_calc) * dt;
        self.integral
    }

    fn differentiate(&mut self, gains: &PidGains, error: f32, dt: f32) -> f32 {
        if gains.kd == 0.0 {
            self.slope = 0.0;
            return 0.0;
        }
        let raw = (error - self.last_error) / dt;
        self.slope = if gains.tf > 0.0 {
            self.slope + dt / (gains.tf + dt) * (raw - self.slope)
        } else {
            raw
        };
        gains.kd * self.slope
    }
}

/// Coefficients installed through `configure` / `set_coefficients`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Derivative filter time constant [s].
    pub tf: f32,
    /// Back-calculation time constant [s].
    pub tt: f32,
    /// Symmetric output limit.
    pub out_max: f32,
}

impl PidGains {
    #[inline]
    fn clamp(&self, u: f32) -> f32 {
        if self.out_max > 0.0 {
            u.clamp(-self.out_max, self.out_max)
        } else {
            u
        }
    }
}

impl From<PidParameters> for PidGains {
    fn from(p: PidParameters) -> Self {
        Self {
            kp: p.kp,
            ki: p.ki,
            kd: p.kd,
            tf: p.tf,
            tt: p.tt,
            out_max: p.out_max,
        }
    }
}

impl From<&PidParameters> for PidGains {
    fn from(p: &PidParameters) -> Self {
        Self::from(*p)
    }
}

// ─── Controller ─────────────────────────────────────────────────────

/// PID with a fixed step, clamped to `±out_max`.
#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,
    state: PidState,
    dt: f32,
}

impl Pid {
    /// Controller stepping every `dt` seconds, all gains zero until configured.
    pub fn new(dt: f32) -> Self {
        Self::with_gains(dt, PidGains::from(PidParameters::default()))
    }

    pub fn with_gains(dt: f32, gains: PidGains) -> Self {
        Self {
            gains,
            state: PidState::default(),
            dt,
        }
    }

    #[inline]
    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    #[inline]
    pub fn state(&self) -> &PidState {
        &self.state
    }
}

impl FeedbackController for Pid {
    type Gains = PidGains;

    fn configure(&mut self, gains: &PidGains) {
        self.gains = *gains;
    }

    fn update(&mut self, target: f32, measured: f32) -> f32 {
        let u = self.state.step(&self.gains, target - measured, self.dt);
        self.gains.clamp(u)
    }

    fn reset(&mut self) {
        self.state.reset();
    }
}
