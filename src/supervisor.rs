// Safety watchdog over the two liveness lines
//
// Each line has its own "last seen active" timestamp. A line whose timestamp is
// older than the stale threshold raises an alert, and the timestamp is re-armed to
// `now` so the alert fires once per missed window instead of on every tick.
// Note: the supervisor only decides; the caller stops the car and sounds the horn.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::hardware::{SensorLine, SensorLines};

/// Last-observed-active time for each safety line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessTimestamps {
    pub last_control_signal: Instant,
    pub last_operator_present: Instant,
}

impl LivenessTimestamps {
    pub fn new(now: Instant) -> Self {
        Self {
            last_control_signal: now,
            last_operator_present: now,
        }
    }

    pub fn get(&self, line: SensorLine) -> Instant {
        match line {
            SensorLine::ControlSignal => self.last_control_signal,
            SensorLine::OperatorPresent => self.last_operator_present,
        }
    }

    fn slot(&mut self, line: SensorLine) -> &mut Instant {
        match line {
            SensorLine::ControlSignal => &mut self.last_control_signal,
            SensorLine::OperatorPresent => &mut self.last_operator_present,
        }
    }
}

/// Lines that went stale on one check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Alerts {
    pub control_lost: bool,
    pub operator_absent: bool,
}

impl Alerts {
    pub fn any(&self) -> bool {
        self.control_lost || self.operator_absent
    }

    pub fn count(&self) -> usize {
        usize::from(self.control_lost) + usize::from(self.operator_absent)
    }

    /// Fired lines in check order (control first)
    pub fn lines(&self) -> impl Iterator<Item = SensorLine> + use<> {
        let fired = [
            (SensorLine::ControlSignal, self.control_lost),
            (SensorLine::OperatorPresent, self.operator_absent),
        ];
        fired.into_iter().filter(|(_, f)| *f).map(|(line, _)| line)
    }
}

pub struct SafetySupervisor {
    timestamps: LivenessTimestamps,
    stale_threshold: Duration,
}

impl SafetySupervisor {
    /// Both timestamps start at `now`, giving a full window before the first alert
    pub fn new(now: Instant, stale_threshold: Duration) -> Self {
        Self {
            timestamps: LivenessTimestamps::new(now),
            stale_threshold,
        }
    }

    pub fn timestamps(&self) -> LivenessTimestamps {
        self.timestamps
    }

    /// Overwrite a timestamp
    pub fn set_timestamp(&mut self, line: SensorLine, at: Instant) {
        *self.timestamps.slot(line) = at;
    }

    /// Refresh a line's timestamp if it reads active
    pub fn observe(&mut self, line: SensorLine, active: bool, now: Instant) {
        if active {
            *self.timestamps.slot(line) = now;
        }
    }

    /// Sample both lines and refresh the active ones
    ///
    /// A failed read counts as "no update" for that line.
    pub fn sample<S: SensorLines + ?Sized>(&mut self, sensors: &mut S, now: Instant) {
        for line in [SensorLine::ControlSignal, SensorLine::OperatorPresent] {
            match sensors.read(line) {
                Ok(active) => self.observe(line, active, now),
                Err(e) => debug!("Sensor read skipped: {}", e),
            }
        }
    }

    /// Check both timestamps against the stale threshold, re-arming the stale ones
    pub fn check(&mut self, now: Instant) -> Alerts {
        Alerts {
            control_lost: self.check_line(SensorLine::ControlSignal, now),
            operator_absent: self.check_line(SensorLine::OperatorPresent, now),
        }
    }

    /// One supervisor tick: sample, then check
    pub fn tick<S: SensorLines + ?Sized>(&mut self, sensors: &mut S, now: Instant) -> Alerts {
        self.sample(sensors, now);
        self.check(now)
    }

    fn check_line(&mut self, line: SensorLine, now: Instant) -> bool {
        let age = now.saturating_duration_since(self.timestamps.get(line));
        if age <= self.stale_threshold {
            return false;
        }
        match line {
            SensorLine::ControlSignal => warn!("RF control signal lost ({:?} since last seen)", age),
            SensorLine::OperatorPresent => warn!("Operator not present ({:?} since last seen)", age),
        }
        *self.timestamps.slot(line) = now;
        true
    }
}
