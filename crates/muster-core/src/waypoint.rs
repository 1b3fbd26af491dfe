//! Waypoint normalization and sequence editing
//!
//! Every waypoint-producing event (manual edit, map click, backend route
//! payload, survey grid) is normalized here into the canonical [`Waypoint`]
//! shape before it touches the shared sequence. Editing primitives return a
//! new sequence; the store decides through the merge policy whether the
//! result is written.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::fleet::{GeoPoint, Waypoint, WaypointDraft, DEFAULT_ALTITUDE_M};

/// Altitude assigned to generated survey passes, in meters
pub const SURVEY_ALTITUDE_M: f64 = 50.0;

const MIN_GRID_DIM: u32 = 2;
const MAX_GRID_DIM: u32 = 20;
const MIN_SPACING_M: f64 = 5.0;
const MAX_SPACING_M: f64 = 100.0;
const METERS_PER_DEG_LAT: f64 = 111_000.0;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Mint a fresh waypoint id from the wall clock plus a process-wide monotonic
/// counter, so ids minted in the same instant stay distinct
pub fn next_waypoint_id() -> String {
    let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("wp-{}-{}", chrono::Utc::now().timestamp_millis(), seq)
}

fn fill(draft: WaypointDraft, id: String, position: usize) -> Waypoint {
    Waypoint {
        id,
        lat: draft.lat,
        lon: draft.lon,
        alt: draft.alt.unwrap_or(DEFAULT_ALTITUDE_M),
        name: draft
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Waypoint {}", position + 1)),
    }
}

/// Append a draft to the sequence under a freshly minted id
pub fn add(seq: &[Waypoint], draft: WaypointDraft) -> Vec<Waypoint> {
    let mut next = seq.to_vec();
    let wp = fill(draft, next_waypoint_id(), next.len());
    next.push(wp);
    next
}

/// Replace the element whose id matches; no match leaves the sequence
/// unchanged (no implicit insert)
pub fn update(seq: &[Waypoint], wp: &Waypoint) -> Vec<Waypoint> {
    seq.iter()
        .map(|cur| if cur.id == wp.id { wp.clone() } else { cur.clone() })
        .collect()
}

/// Remove the element whose id matches; a missing id is a no-op
pub fn delete(seq: &[Waypoint], id: &str) -> Vec<Waypoint> {
    seq.iter().filter(|wp| wp.id != id).cloned().collect()
}

/// Normalize a full batch of drafts into a canonical sequence
///
/// Supplied ids are preserved so identity stays stable across round trips;
/// missing, empty or duplicated ids get a fresh mint.
pub fn normalize_batch(drafts: Vec<WaypointDraft>) -> Vec<Waypoint> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(drafts.len());
    for (position, mut draft) in drafts.into_iter().enumerate() {
        let id = match draft
            .id
            .take()
            .filter(|id| !id.is_empty() && !seen.contains(id))
        {
            Some(id) => id,
            None => next_waypoint_id(),
        };
        seen.insert(id.clone());
        out.push(fill(draft, id, position));
    }
    out
}

/// Give unnamed waypoints their positional label; already-named entries are
/// untouched, so the pass is idempotent
pub fn fill_positional_names(seq: &mut [Waypoint]) {
    for (position, wp) in seq.iter_mut().enumerate() {
        if wp.name.is_empty() {
            wp.name = format!("Waypoint {}", position + 1);
        }
    }
}

/// Generate a serpentine survey grid of drafts centered on `center`
///
/// `rows`/`cols` clamp to `2..=20`, `spacing_m` to `5..=100` meters. Passes
/// alternate direction so the flight path never jumps back across the grid.
pub fn survey_grid(center: GeoPoint, rows: u32, cols: u32, spacing_m: f64) -> Vec<WaypointDraft> {
    let rows = rows.clamp(MIN_GRID_DIM, MAX_GRID_DIM) as i64;
    let cols = cols.clamp(MIN_GRID_DIM, MAX_GRID_DIM) as i64;
    let spacing = spacing_m.clamp(MIN_SPACING_M, MAX_SPACING_M);

    let lat_step = spacing / METERS_PER_DEG_LAT;
    let meters_per_deg_lon = METERS_PER_DEG_LAT * center.lat.to_radians().cos().max(0.01);
    let lon_step = spacing / meters_per_deg_lon;

    let origin_lat = center.lat - lat_step * (rows - 1) as f64 / 2.0;
    let origin_lon = center.lon - lon_step * (cols - 1) as f64 / 2.0;

    let mut drafts = Vec::with_capacity((rows * cols) as usize);
    for row in 0..rows {
        let lat = origin_lat + lat_step * row as f64;
        let mut columns: Vec<i64> = (0..cols).collect();
        if row % 2 == 1 {
            columns.reverse();
        }
        for col in columns {
            let draft = WaypointDraft::at(lat, origin_lon + lon_step * col as f64)
                .with_alt(SURVEY_ALTITUDE_M)
                .with_name(format!("Survey {}", drafts.len() + 1));
            drafts.push(draft);
        }
    }
    drafts
}
