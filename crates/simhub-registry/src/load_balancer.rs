//! Least-loaded selection.
//!
//! Picks the worker hosting the fewest sessions. Ties go to the first
//! worker encountered, so with workers iterated in registration order
//! the oldest worker wins.

use simhub_proto::WorkerId;

/// Select the worker with the smallest load from `(id, session_count)` pairs.
///
/// Returns `None` if there are no workers.
pub fn least_loaded<I>(loads: I) -> Option<WorkerId>
where
    I: IntoIterator<Item = (WorkerId, usize)>,
{
    let mut best: Option<(WorkerId, usize)> = None;
    for (id, load) in loads {
        match best {
            // Strict `<` keeps the earliest worker on ties.
            Some((_, best_load)) if load >= best_load => {}
            _ => best = Some((id, load)),
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loads(counts: &[usize]) -> Vec<(WorkerId, usize)> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &c)| (WorkerId(i as u64 + 1), c))
            .collect()
    }

    #[test]
    fn picks_minimum() {
        assert_eq!(least_loaded(loads(&[3, 1, 2])), Some(WorkerId(2)));
    }

    #[test]
    fn ties_go_to_first_worker() {
        assert_eq!(least_loaded(loads(&[0, 0])), Some(WorkerId(1)));
        assert_eq!(least_loaded(loads(&[2, 1, 1])), Some(WorkerId(2)));
    }

    #[test]
    fn empty_returns_none() {
        assert_eq!(least_loaded(loads(&[])), None);
    }

    #[test]
    fn single_worker() {
        assert_eq!(least_loaded(loads(&[42])), Some(WorkerId(1)));
    }

    #[test]
    fn minimum_at_end() {
        assert_eq!(least_loaded(loads(&[5, 4, 3, 0])), Some(WorkerId(4)));
    }
}
