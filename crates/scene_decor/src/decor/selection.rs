//! Weighted prefab choice.
use crate::decor::rule::PrefabEntry;

/// Picks an entry index proportionally to its weight using `roll` in `[0, 1)`.
///
/// Negative and non-finite weights count as zero. When every weight is zero the first entry is
/// returned; an empty slice yields `None`.
pub fn pick_weighted(entries: &[PrefabEntry], roll: f32) -> Option<usize> {
    if entries.is_empty() {
        return None;
    }

    let weight = |e: &PrefabEntry| {
        if e.weight.is_finite() && e.weight > 0.0 {
            e.weight
        } else {
            0.0
        }
    };
    let total: f32 = entries.iter().map(weight).sum();
    if total <= 0.0 {
        return Some(0);
    }

    let mut remaining = roll.clamp(0.0, 1.0) * total;
    for (i, e) in entries.iter().enumerate() {
        let w = weight(e);
        if w <= 0.0 {
            continue;
        }
        remaining -= w;
        if remaining < 0.0 {
            return Some(i);
        }
    }

    // Rounding left a sliver; fall back to the last weighted entry.
    entries.iter().rposition(|e| weight(e) > 0.0)
}
