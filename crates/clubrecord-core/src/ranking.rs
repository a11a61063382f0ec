// Standard competition ("1224") ranking shared by every leaderboard.

use std::cmp::Ordering;

use serde::Serialize;

/// One ranked row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry<K, V = f64> {
    pub id: K,
    pub value: V,
    pub rank: usize,
}

/// How much of a ranking to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cutoff {
    #[default]
    Unbounded,
    /// Keep every entry whose rank is at most `n`. Tie groups are never split,
    /// so the result may hold more than `n` rows.
    Top(usize),
}

/// Rank `(id, value)` pairs.
///
/// Entries whose value is not strictly positive are dropped. The rest are
/// sorted by value descending, with the id as an ascending tiebreak so the row
/// order is deterministic. Equal values share a rank; the next distinct value
/// resumes at `previous_rank + tie_group_size`. The cutoff is applied to the
/// finished ranking, never before it.
pub fn rank_entries<K, V, I>(entries: I, cutoff: Cutoff) -> Vec<RankedEntry<K, V>>
where
    K: Ord,
    V: Copy + PartialOrd + Default,
    I: IntoIterator<Item = (K, V)>,
{
    let zero = V::default();
    let mut kept: Vec<(K, V)> = entries.into_iter().filter(|(_, v)| *v > zero).collect();
    kept.sort_by(|(id_a, a), (id_b, b)| {
        b.partial_cmp(a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });

    let mut ranked: Vec<RankedEntry<K, V>> = Vec::with_capacity(kept.len());
    let mut current_rank = 1;
    let mut at_current_value = 0;
    let mut current_value: Option<V> = None;

    for (id, value) in kept {
        match current_value {
            Some(prev) if prev == value => at_current_value += 1,
            _ => {
                current_rank += at_current_value;
                current_value = Some(value);
                at_current_value = 1;
            }
        }
        ranked.push(RankedEntry {
            id,
            value,
            rank: current_rank,
        });
    }

    if let Cutoff::Top(n) = cutoff {
        // Ranks are non-decreasing, so everything past the first rank > n goes.
        let end = ranked.partition_point(|e| e.rank <= n);
        ranked.truncate(end);
    }
    ranked
}

/// Rank of `id` within `ranked`, if present.
pub fn rank_of<K, V, Q>(ranked: &[RankedEntry<K, V>], id: &Q) -> Option<usize>
where
    K: PartialEq<Q>,
    Q: ?Sized,
{
    ranked.iter().find(|e| e.id == *id).map(|e| e.rank)
}
