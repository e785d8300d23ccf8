use crate::model::{DAY_MS, MINUTE_MS, Ms};

/// Step used when scanning for feasible windows.
pub const QUANTUM_MS: Ms = 10 * MINUTE_MS;

/// Changeover buffer applied to overlap detection only, never to demand accounting.
pub const OVERLAP_MARGIN_MS: Ms = 15 * MINUTE_MS;

pub const MAX_EVENT_DURATION_MS: Ms = 7 * DAY_MS;

/// How far past the requested start automatic rescheduling may look.
pub const RESCHEDULE_HORIZON_MS: Ms = 7 * DAY_MS;

/// A request may start at most this far in the past.
pub const PAST_TOLERANCE_MS: Ms = 5 * MINUTE_MS;

pub const MIN_YEAR: i32 = 2000;
/// Latest accepted year is the current year plus this.
pub const MAX_YEARS_AHEAD: i32 = 10;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 5;

pub const MAX_HORIZON_DAYS: u32 = 366;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 4096;
pub const MAX_ALLOCATION_UNITS: u32 = 1024;
