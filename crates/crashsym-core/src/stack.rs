//! Stack usage and overflow analysis across the frames of one backtrace.

use std::fmt;

use crate::types::Address;

/// Slack for the innermost frame, whose real extent is unknown.
pub const STACK_SAFETY_MARGIN: u64 = 8 * 1024;

/// How close a backtrace came to exhausting its stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowSeverity
{
    /// Usage reached the stack size.
    Overflowed,
    /// Usage is within [`STACK_SAFETY_MARGIN`] of the stack size.
    PotentiallyOverflowed,
}

impl fmt::Display for OverflowSeverity
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            OverflowSeverity::Overflowed => f.write_str("Overflowed stack"),
            OverflowSeverity::PotentiallyOverflowed => f.write_str("Potentially overflowed stack"),
        }
    }
}

/// Overflow report for one backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackReport
{
    /// Severity of the finding.
    pub severity: OverflowSeverity,
    /// Sum of all recorded deltas.
    pub total: i64,
    /// Stack size the usage was compared against.
    pub limit: u64,
    /// `(frame number, bytes)` in recording order.
    pub frames: Vec<(u32, i64)>,
}

impl StackReport
{
    /// Output lines: a headline, then one line per frame.
    pub fn lines(&self) -> Vec<String>
    {
        let mut out = vec![format!(
            "{} ({} bytes used, {} byte stack)",
            self.severity, self.total, self.limit
        )];
        out.extend(
            self.frames
                .iter()
                .map(|(frame, bytes)| format!("#{frame:02}: {bytes} bytes")),
        );
        out
    }
}

/// Accumulates stack-pointer deltas between consecutive frames.
///
/// Frames arrive innermost first, so the stack pointer grows from one frame
/// to the next. The growth is the stack used by the *previous* frame.
///
/// ## Example
///
/// ```rust
/// use crashsym_core::stack::StackUsageTracker;
/// use crashsym_core::types::Address;
///
/// let mut tracker = StackUsageTracker::new();
/// tracker.record(0, Address::new(0x1000));
/// tracker.record(1, Address::new(0x1010));
/// tracker.record(2, Address::new(0x1030));
/// assert_eq!(tracker.deltas(), &[(0, 16), (1, 32)]);
/// assert_eq!(tracker.total(), 48);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StackUsageTracker
{
    previous: Option<(u32, Address)>,
    deltas: Vec<(u32, i64)>,
    total: i64,
}

impl StackUsageTracker
{
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Record the stack pointer of frame `frame`.
    pub fn record(&mut self, frame: u32, sp: Address)
    {
        if let Some((previous_frame, previous_sp)) = self.previous {
            #[allow(clippy::cast_possible_wrap)]
            let delta = sp.value().wrapping_sub(previous_sp.value()) as i64;
            self.deltas.push((previous_frame, delta));
            self.total = self.total.saturating_add(delta);
        }
        self.previous = Some((frame, sp));
    }

    /// Recorded `(frame number, bytes)` pairs.
    pub fn deltas(&self) -> &[(u32, i64)]
    {
        &self.deltas
    }

    /// Total bytes used by the recorded frames.
    pub fn total(&self) -> i64
    {
        self.total
    }

    /// Compare usage against `limit`.
    ///
    /// Returns `None` when nothing was recorded or usage stays below
    /// `limit - STACK_SAFETY_MARGIN`.
    pub fn check(&self, limit: u64) -> Option<StackReport>
    {
        if self.deltas.is_empty() {
            return None;
        }

        let total = i128::from(self.total);
        let severity = if total >= i128::from(limit) {
            OverflowSeverity::Overflowed
        } else if total > i128::from(limit.saturating_sub(STACK_SAFETY_MARGIN)) {
            OverflowSeverity::PotentiallyOverflowed
        } else {
            return None;
        };

        Some(StackReport {
            severity,
            total: self.total,
            limit,
            frames: self.deltas.clone(),
        })
    }
}
