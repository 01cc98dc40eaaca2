//! Log formatting keyed on the simulated clock.

use std::cell::Cell;
use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::types::Tick;

thread_local! {
    static SIM_TICK: Cell<Tick> = const { Cell::new(0) };
}

/// The clock value of the simulation running on this thread.
///
/// Used by [`SimFormat`] to stamp log lines with simulated time.
pub fn sim_tick() -> Tick {
    SIM_TICK.with(|c| c.get())
}

/// Publish the current clock value. Called whenever the clock moves.
pub(crate) fn set_sim_tick(tick: Tick) {
    SIM_TICK.with(|c| c.set(tick));
}

/// Event formatter that stamps each line with the simulated tick and the
/// emitting subsystem instead of wall-clock time.
///
/// ```text
/// [tick    12]  INFO state: process arrived pid=3
/// ```
pub struct SimFormat;

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

/// `sched_sim::policy::rr` -> `policy::rr`. Targets outside the crate are
/// shown as is.
fn subsystem(target: &str) -> &str {
    target
        .strip_prefix(concat!(env!("CARGO_CRATE_NAME"), "::"))
        .unwrap_or(target)
}

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let level = *meta.level();
        let (on, off) = if writer.has_ansi_escapes() {
            (level_color(level), "\x1b[0m")
        } else {
            ("", "")
        };
        write!(
            writer,
            "[tick {:>5}] {on}{level:>5}{off} {}: ",
            sim_tick(),
            subsystem(meta.target())
        )?;

        let mut fields = FieldCollector::default();
        event.record(&mut fields);
        write!(writer, "{}", fields.message)?;
        for (key, value) in &fields.fields {
            write!(writer, " {key}={value}")?;
        }
        writeln!(writer)
    }
}

/// Collects the message and key=value fields of one event.
#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl FieldCollector {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name(), value));
        }
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.to_string());
    }
}
