//! Elapsed-time strings in the `ps -o etime` grammar: `[[D-]HH:]MM:SS`.
//!
//! Responders report elapsed time as a rendered string, so anything that orders or compares
//! pipelines by age has to go through [`parse_etime`] first.

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Parses an etime string into seconds. Returns `None` when the text does not follow the
/// grammar. Surrounding whitespace (as printed by `ps`) is ignored.
pub fn parse_etime(text: &str) -> Option<u64> {
    let text = text.trim();

    let (days, clock) = match text.split_once('-') {
        Some((days, clock)) => (Some(parse_component(days)?), clock),
        None => (None, text),
    };

    let parts = clock
        .split(':')
        .map(parse_component)
        .collect::<Option<Vec<_>>>()?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] if days.is_none() => (None, *minutes, *seconds),
        [hours, minutes, seconds] => (Some(*hours), *minutes, *seconds),
        _ => return None,
    };

    if seconds >= SECS_PER_MINUTE {
        return None;
    }
    if hours.is_some() && minutes >= 60 {
        return None;
    }
    if days.is_some() && hours.is_some_and(|h| h >= 24) {
        return None;
    }

    // a well-formed but absurd day or minute count must not wrap around
    days.unwrap_or(0)
        .checked_mul(SECS_PER_DAY)?
        .checked_add(hours.unwrap_or(0).checked_mul(SECS_PER_HOUR)?)?
        .checked_add(minutes.checked_mul(SECS_PER_MINUTE)?)?
        .checked_add(seconds)
}

/// Renders seconds the way `ps` does: `MM:SS`, `HH:MM:SS` or `D-HH:MM:SS`.
pub fn format_etime(total_secs: u64) -> String {
    let days = total_secs / SECS_PER_DAY;
    let hours = (total_secs % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total_secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total_secs % SECS_PER_MINUTE;

    if days > 0 {
        format!("{}-{:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

fn parse_component(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
