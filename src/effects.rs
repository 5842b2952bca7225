// Copyright (c) 2026 rezky_nightky

use std::time::{Duration, Instant};

use crate::session::{ConsoleDisplay, PendingEffect, Scrollback};

/// Intensity of each glitch step, applied in order.
const GLITCH_STEPS: [f32; 8] = [0.9, 0.35, 0.75, 0.15, 0.6, 0.95, 0.3, 0.5];
const STEP_INTERVAL: Duration = Duration::from_millis(90);
const HARD_TIMEOUT: Duration = Duration::from_millis(1200);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlitchPhase {
    Running { steps_done: usize },
    Finalized,
}

/// Staged console glitch. Steps fire on an interval; a hard timeout forces the
/// end regardless of progress. Both paths meet in one `Finalized` state.
#[derive(Clone, Debug)]
pub struct GlitchSequence {
    phase: GlitchPhase,
    next_step: Instant,
    deadline: Instant,
    interval: Duration,
}

impl GlitchSequence {
    pub fn new(now: Instant) -> Self {
        Self::with_timing(now, STEP_INTERVAL, HARD_TIMEOUT)
    }

    pub fn with_timing(now: Instant, interval: Duration, timeout: Duration) -> Self {
        Self {
            phase: GlitchPhase::Running { steps_done: 0 },
            next_step: now + interval,
            deadline: now + timeout,
            interval,
        }
    }

    pub fn phase(&self) -> GlitchPhase {
        self.phase
    }

    fn finalize(&mut self, display: &mut ConsoleDisplay, out: &mut Scrollback) {
        if self.phase == GlitchPhase::Finalized {
            return;
        }
        self.phase = GlitchPhase::Finalized;
        display.glitch = 0.0;
        out.push_class("signal restored.", "hint");
    }
}

impl PendingEffect for GlitchSequence {
    fn poll(&mut self, now: Instant, display: &mut ConsoleDisplay, out: &mut Scrollback) -> bool {
        let GlitchPhase::Running { mut steps_done } = self.phase else {
            return true;
        };
        if now >= self.deadline {
            self.finalize(display, out);
            return true;
        }
        while now >= self.next_step && steps_done < GLITCH_STEPS.len() {
            display.glitch = GLITCH_STEPS[steps_done];
            steps_done += 1;
            self.next_step += self.interval;
        }
        self.phase = GlitchPhase::Running { steps_done };
        if steps_done >= GLITCH_STEPS.len() {
            self.finalize(display, out);
            return true;
        }
        false
    }
}
