//! Keystroke scheduler - turns a script into timed keyboard reports.
//!
//! Time is counted in ticks. Tick 1 is the first call to
//! [`Scheduler::on_tick`]. A payload with delay `d` and `L` characters
//! owns ticks `d+1 ..= d+2L`:
//!
//! ```text
//! tick:    d   d+1   d+2   d+3   d+4  ...  d+2L-1  d+2L  d+2L+1
//! report:  -   c0    0     c1    0    ...  cL-1    0     -
//! ```
//!
//! Every character is pressed on one tick and released on the next, so
//! the host sees discrete keystrokes even for repeated letters. Outside
//! every window nothing is sent.
//!
//! Windows of different payloads may overlap if the delays are too close
//! together. Payloads are then evaluated in script order and a later
//! key press replaces whatever an earlier payload put in the report.

use crate::error::ScriptError;
use crate::fmt::{debug, info};
use crate::hid::{encode_ascii, KeyboardReport};
use heapless::Vec;

/// One piece of text, typed after `delay` ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Payload {
    delay: u32,
    text: &'static str,
}

/// What a single payload contributes on a given tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stroke {
    Outside,
    Press(KeyboardReport),
    Release,
}

impl Payload {
    pub const fn new(delay: u32, text: &'static str) -> Self {
        Self { delay, text }
    }

    /// Activation delay in ticks.
    pub fn delay(&self) -> u32 {
        self.delay
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    /// Last tick of this payload's window.
    pub fn window_end(&self) -> u32 {
        let strokes = (self.text.len() as u32).saturating_mul(2);
        self.delay.saturating_add(strokes)
    }

    fn stroke_at(&self, tick: u32) -> Stroke {
        if tick <= self.delay || tick > self.window_end() {
            return Stroke::Outside;
        }
        let offset = tick - self.delay;
        if offset % 2 == 1 {
            let index = ((offset - 1) / 2) as usize;
            Stroke::Press(encode_ascii(self.text.as_bytes()[index]))
        } else {
            Stroke::Release
        }
    }
}

/// An ordered, validated table of payloads.
#[derive(Clone, Debug)]
pub struct Script<const N: usize> {
    payloads: Vec<Payload, N>,
}

impl<const N: usize> Script<N> {
    /// Build a script. Delays must be strictly increasing.
    pub fn new(payloads: &[Payload]) -> Result<Self, ScriptError> {
        let mut table: Vec<Payload, N> = Vec::new();
        for (index, payload) in payloads.iter().enumerate() {
            if let Some(prev) = table.last() {
                if payload.delay <= prev.delay {
                    return Err(ScriptError::DelayNotIncreasing { index });
                }
            }
            table
                .push(*payload)
                .map_err(|_| ScriptError::TooManyPayloads)?;
        }
        Ok(Self { payloads: table })
    }

    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    /// Last tick on which any payload is active (0 for an empty script).
    pub fn end(&self) -> u32 {
        self.payloads
            .iter()
            .map(Payload::window_end)
            .max()
            .unwrap_or(0)
    }
}

/// Owns the script and the tick cursor.
#[derive(Clone, Debug)]
pub struct Scheduler<const N: usize> {
    script: Script<N>,
    tick: u32,
}

impl<const N: usize> Scheduler<N> {
    pub fn new(script: Script<N>) -> Self {
        Self { script, tick: 0 }
    }

    /// Number of ticks seen so far.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn script(&self) -> &Script<N> {
        &self.script
    }

    /// Advance one tick and return the report to send, if any.
    pub fn on_tick(&mut self) -> Option<KeyboardReport> {
        self.tick = self.tick.saturating_add(1);
        let tick = self.tick;

        for (index, payload) in self.script.payloads.iter().enumerate() {
            if payload.delay.checked_add(1) == Some(tick) {
                debug!("payload {} starts at tick {}", index, tick);
            }
        }
        if tick == self.script.end() {
            info!("script finished at tick {}", tick);
        }

        self.report_at(tick)
    }

    /// Report for an arbitrary tick, without moving the cursor.
    pub fn report_at(&self, tick: u32) -> Option<KeyboardReport> {
        let mut report = KeyboardReport::empty();
        let mut active = false;

        for payload in &self.script.payloads {
            match payload.stroke_at(tick) {
                Stroke::Outside => {}
                Stroke::Release => active = true,
                Stroke::Press(key) => {
                    active = true;
                    report = key;
                }
            }
        }

        active.then_some(report)
    }

    /// `true` once every window has closed; nothing is ever sent again.
    pub fn is_finished(&self) -> bool {
        self.tick >= self.script.end()
    }
}
