//! Frame-driven pixelation animator.
//!
//! Ramps the pixel-width fraction of a pixelate filter from 0 to a maximum
//! and back in fixed steps, one step per display refresh. Each run stops on
//! its own at an endpoint and arms the opposite direction for the next start.

mod clock;

use std::time::Instant;

use gallery::AnimationConfig;

pub use clock::{FrameClock, IntervalClock, ManualClock};

#[derive(Debug, thiserror::Error)]
pub enum AnimatorError {
    #[error("invalid animation settings: {0}")]
    InvalidSettings(String),
}

/// Filter parameter the animator drives. Implemented by the filter graph.
pub trait PixelateTarget {
    type Error;

    fn pixel_width_fraction(&self) -> f32;
    fn set_pixel_width_fraction(&mut self, value: f32);
    fn render(&mut self) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatorSettings {
    pub step: f32,
    pub max: f32,
    pub stop_threshold: f32,
}

impl Default for AnimatorSettings {
    fn default() -> Self {
        Self {
            step: gallery::DEFAULT_STEP,
            max: gallery::DEFAULT_MAX,
            stop_threshold: gallery::DEFAULT_STOP_THRESHOLD,
        }
    }
}

impl AnimatorSettings {
    pub fn from_config(config: &AnimationConfig) -> Result<Self, AnimatorError> {
        let settings = Self {
            step: config.step,
            max: config.max,
            stop_threshold: config.stop_threshold,
        };
        settings.validate()?;
        if config.refresh_interval.is_zero() {
            return Err(AnimatorError::InvalidSettings(
                "refresh_interval must be greater than zero".into(),
            ));
        }
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AnimatorError> {
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(AnimatorError::InvalidSettings(format!(
                "step must be positive (got {})",
                self.step
            )));
        }
        if !self.max.is_finite() || self.max <= 0.0 || self.max > 1.0 {
            return Err(AnimatorError::InvalidSettings(format!(
                "max must be in (0, 1] (got {})",
                self.max
            )));
        }
        if !self.stop_threshold.is_finite()
            || self.stop_threshold < 0.0
            || self.stop_threshold >= self.max
        {
            return Err(AnimatorError::InvalidSettings(format!(
                "stop_threshold must be in [0, max) (got {})",
                self.stop_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    Increasing,
    Decreasing,
}

impl AnimationPhase {
    fn flipped(self) -> Self {
        match self {
            Self::Increasing => Self::Decreasing,
            Self::Decreasing => Self::Increasing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorState {
    Idle,
    RunningIncreasing,
    RunningDecreasing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not running; nothing was applied.
    Idle,
    /// A step was applied and the run continues.
    Stepped { value: f32 },
    /// The endpoint was reached; the clock is stopped and `next_phase` is
    /// remembered for the next start.
    Finished {
        value: f32,
        next_phase: AnimationPhase,
    },
}

pub struct PixelationAnimator<C> {
    settings: AnimatorSettings,
    phase: AnimationPhase,
    running: bool,
    clock: C,
}

impl<C: FrameClock> PixelationAnimator<C> {
    pub fn new(settings: AnimatorSettings, clock: C) -> Self {
        Self {
            settings,
            phase: AnimationPhase::Increasing,
            running: false,
            clock,
        }
    }

    pub fn settings(&self) -> &AnimatorSettings {
        &self.settings
    }

    /// Direction of the current run, or of the next one when idle.
    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> AnimatorState {
        match (self.running, self.phase) {
            (false, _) => AnimatorState::Idle,
            (true, AnimationPhase::Increasing) => AnimatorState::RunningIncreasing,
            (true, AnimationPhase::Decreasing) => AnimatorState::RunningDecreasing,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        if self.running {
            self.clock.next_deadline()
        } else {
            None
        }
    }

    /// Begins a run in the remembered direction. Returns `false` and leaves
    /// the clock alone when a run is already in progress.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.clock.start(now);
        tracing::debug!(phase = ?self.phase, "pixelation animation started");
        true
    }

    /// Cancels a run without flipping the remembered direction.
    pub fn stop(&mut self) {
        self.clock.invalidate();
        self.running = false;
    }

    /// Ticks once if the clock reports an elapsed refresh interval.
    pub fn on_frame<T: PixelateTarget>(
        &mut self,
        now: Instant,
        target: &mut T,
    ) -> Result<Option<TickOutcome>, T::Error> {
        if !self.running || !self.clock.poll(now) {
            return Ok(None);
        }
        self.tick(target).map(Some)
    }

    /// Applies one step to `target` and renders it.
    ///
    /// Endpoint transitions happen even when the render fails; the render
    /// error is returned afterwards.
    pub fn tick<T: PixelateTarget>(&mut self, target: &mut T) -> Result<TickOutcome, T::Error> {
        if !self.running {
            return Ok(TickOutcome::Idle);
        }

        let current = target.pixel_width_fraction();
        let AnimatorSettings {
            step,
            max,
            stop_threshold,
        } = self.settings;
        let (value, finished) = match self.phase {
            AnimationPhase::Increasing => {
                let value = (current + step).min(max);
                (value, value == max)
            }
            AnimationPhase::Decreasing => {
                let value = (current - step).max(0.0);
                if value <= stop_threshold {
                    (0.0, true)
                } else {
                    (value, false)
                }
            }
        };

        target.set_pixel_width_fraction(value);
        let rendered = target.render();

        let outcome = if finished {
            self.phase = self.phase.flipped();
            self.stop();
            tracing::debug!(value, next_phase = ?self.phase, "pixelation animation finished");
            TickOutcome::Finished {
                value,
                next_phase: self.phase,
            }
        } else {
            TickOutcome::Stepped { value }
        };

        rendered.map(|()| outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingTarget {
        value: f32,
        applied: Vec<f32>,
        renders: usize,
        fail_renders: bool,
    }

    impl PixelateTarget for RecordingTarget {
        type Error = &'static str;

        fn pixel_width_fraction(&self) -> f32 {
            self.value
        }

        fn set_pixel_width_fraction(&mut self, value: f32) {
            self.value = value;
            self.applied.push(value);
        }

        fn render(&mut self) -> Result<(), Self::Error> {
            self.renders += 1;
            if self.fail_renders {
                Err("render failed")
            } else {
                Ok(())
            }
        }
    }

    fn animator() -> PixelationAnimator<ManualClock> {
        PixelationAnimator::new(AnimatorSettings::default(), ManualClock::new())
    }

    fn run_to_idle(
        animator: &mut PixelationAnimator<ManualClock>,
        target: &mut RecordingTarget,
    ) -> usize {
        let now = Instant::now();
        let mut ticks = 0;
        while animator.is_running() {
            animator.on_frame(now, target).unwrap();
            ticks += 1;
            assert!(ticks < 10_000, "animation never finished");
        }
        ticks
    }

    #[test]
    fn starts_idle_remembering_increase() {
        let animator = animator();
        assert_eq!(animator.state(), AnimatorState::Idle);
        assert_eq!(animator.phase(), AnimationPhase::Increasing);
        assert_eq!(animator.next_deadline(), None);
    }

    #[test]
    fn ramp_up_is_clamped_and_monotonic() {
        let settings = AnimatorSettings::default();
        let mut animator = animator();
        let mut target = RecordingTarget::default();
        assert!(animator.start(Instant::now()));
        assert_eq!(animator.state(), AnimatorState::RunningIncreasing);

        let ticks = run_to_idle(&mut animator, &mut target);

        assert!((100..=101).contains(&ticks), "took {ticks} ticks");
        assert_eq!(target.renders, ticks);
        let last = *target.applied.last().unwrap();
        assert_eq!(last, settings.max);
        let mut previous = 0.0;
        for (index, value) in target.applied.iter().enumerate() {
            assert!(*value >= previous);
            if index + 1 < target.applied.len() {
                assert!(((value - previous) - settings.step).abs() < 1e-5);
            }
            previous = *value;
        }
        assert_eq!(animator.state(), AnimatorState::Idle);
        assert_eq!(animator.phase(), AnimationPhase::Decreasing);
    }

    #[test]
    fn ramp_down_snaps_to_zero() {
        let settings = AnimatorSettings::default();
        let mut animator = animator();
        let mut target = RecordingTarget::default();
        animator.start(Instant::now());
        run_to_idle(&mut animator, &mut target);
        target.applied.clear();
        target.renders = 0;

        assert!(animator.start(Instant::now()));
        assert_eq!(animator.state(), AnimatorState::RunningDecreasing);
        let ticks = run_to_idle(&mut animator, &mut target);

        assert_eq!(ticks, 100);
        assert_eq!(target.value, 0.0);
        assert_eq!(*target.applied.last().unwrap(), 0.0);
        let mut previous = settings.max;
        for value in &target.applied[..target.applied.len() - 1] {
            assert!(*value < previous);
            assert!(((previous - value) - settings.step).abs() < 1e-5);
            assert!(*value > settings.stop_threshold);
            previous = *value;
        }
        assert_eq!(animator.state(), AnimatorState::Idle);
        assert_eq!(animator.phase(), AnimationPhase::Increasing);
    }

    #[test]
    fn residual_below_threshold_is_not_left_behind() {
        let mut animator = animator();
        let mut target = RecordingTarget {
            value: 0.0011,
            ..Default::default()
        };
        animator.phase = AnimationPhase::Decreasing;
        animator.start(Instant::now());

        assert_eq!(
            animator.tick(&mut target).unwrap(),
            TickOutcome::Finished {
                value: 0.0,
                next_phase: AnimationPhase::Increasing
            }
        );
        assert_eq!(target.value, 0.0);
    }

    #[test]
    fn start_while_running_is_ignored() {
        let mut animator = animator();
        let mut target = RecordingTarget::default();
        let now = Instant::now();
        assert!(animator.start(now));
        assert!(!animator.start(now));
        assert!(!animator.start(now));
        assert_eq!(animator.clock().arm_count(), 1);

        animator.on_frame(now, &mut target).unwrap();
        assert_eq!(target.renders, 1);
        assert_eq!(animator.clock().fired(), 1);
    }

    #[test]
    fn every_run_rearms_the_opposite_direction() {
        let mut animator = animator();
        let mut target = RecordingTarget::default();
        for expected in [
            AnimationPhase::Decreasing,
            AnimationPhase::Increasing,
            AnimationPhase::Decreasing,
        ] {
            animator.start(Instant::now());
            run_to_idle(&mut animator, &mut target);
            assert_eq!(animator.phase(), expected);
        }
        assert_eq!(animator.clock().arm_count(), 3);
    }

    #[test]
    fn idle_frames_do_nothing() {
        let mut animator = animator();
        let mut target = RecordingTarget::default();
        assert_eq!(animator.on_frame(Instant::now(), &mut target).unwrap(), None);
        assert_eq!(animator.tick(&mut target).unwrap(), TickOutcome::Idle);
        assert_eq!(target.renders, 0);
    }

    #[test]
    fn render_failure_still_finishes_the_run() {
        let mut animator = animator();
        let mut target = RecordingTarget {
            value: 0.0795,
            fail_renders: true,
            ..Default::default()
        };
        animator.start(Instant::now());
        assert_eq!(animator.tick(&mut target), Err("render failed"));
        assert!(!animator.is_running());
        assert_eq!(animator.phase(), AnimationPhase::Decreasing);
    }

    #[test]
    fn stop_keeps_remembered_phase() {
        let mut animator = animator();
        let mut target = RecordingTarget::default();
        let now = Instant::now();
        animator.start(now);
        animator.on_frame(now, &mut target).unwrap();
        animator.stop();
        animator.stop();
        assert_eq!(animator.state(), AnimatorState::Idle);
        assert_eq!(animator.phase(), AnimationPhase::Increasing);
        assert!(!animator.clock().is_running());
    }

    #[test]
    fn interval_clock_paces_ticks() {
        use std::time::Duration;

        let interval = Duration::from_millis(16);
        let mut animator =
            PixelationAnimator::new(AnimatorSettings::default(), IntervalClock::new(interval));
        let mut target = RecordingTarget::default();
        let start = Instant::now();
        animator.start(start);
        assert_eq!(animator.on_frame(start, &mut target).unwrap(), None);
        assert!(matches!(
            animator.on_frame(start + interval, &mut target).unwrap(),
            Some(TickOutcome::Stepped { .. })
        ));
        assert_eq!(animator.next_deadline(), Some(start + interval * 2));
    }

    #[test]
    fn settings_validation() {
        assert!(AnimatorSettings::default().validate().is_ok());
        let bad_step = AnimatorSettings {
            step: 0.0,
            ..Default::default()
        };
        assert!(bad_step.validate().is_err());
        let bad_threshold = AnimatorSettings {
            stop_threshold: 0.08,
            ..Default::default()
        };
        assert!(bad_threshold.validate().is_err());

        let mut config = AnimationConfig::default();
        assert!(AnimatorSettings::from_config(&config).is_ok());
        config.refresh_interval = std::time::Duration::ZERO;
        assert!(AnimatorSettings::from_config(&config).is_err());
    }
}
