//! Column grouping for difference-quotient Jacobians of banded functions.
//! See Curtis, Powell & Reid (1974) for the band case of column coloring.
//!
//! Two columns of a band matrix with half-bandwidths `mu`, `ml` share a row iff their
//! indices differ by at most `mu + ml`. Columns `g, g + w, g + 2w, …` with
//! `w = mu + ml + 1` are therefore structurally orthogonal and can be perturbed together.

/// Number of perturbation groups needed for a band of width `width` on `n` columns.
pub fn group_count(n: usize, width: usize) -> usize {
    width.min(n)
}

/// Columns belonging to group `g`.
pub fn group_members(n: usize, width: usize, g: usize) -> impl Iterator<Item = usize> {
    (g..n).step_by(width.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Row adjacency of band columns: adj[j] = { k ≠ j | columns j and k share a row }.
    fn band_column_adjacency(n: usize, mu: usize, ml: usize) -> Vec<Vec<usize>> {
        let reach = mu + ml;
        (0..n)
            .map(|j| {
                let lo = j.saturating_sub(reach);
                let hi = (j + reach).min(n.saturating_sub(1));
                (lo..=hi).filter(|&k| k != j).collect()
            })
            .collect()
    }

    /// Greedy coloring of band columns in natural order. Returns colors[j].
    fn greedy_band_coloring(n: usize, mu: usize, ml: usize) -> Vec<usize> {
        let adj = band_column_adjacency(n, mu, ml);
        let mut color_of: Vec<Option<usize>> = vec![None; n];
        for j in 0..n {
            let banned: HashSet<usize> = adj[j].iter().filter_map(|&k| color_of[k]).collect();
            color_of[j] = (0..).find(|c| !banned.contains(c));
        }
        color_of.into_iter().map(|c| c.unwrap_or(0)).collect()
    }

    /// True when no two columns of any group share a row of the band.
    fn groups_are_orthogonal(n: usize, mu: usize, ml: usize, groups: &[Vec<usize>]) -> bool {
        let adj = band_column_adjacency(n, mu, ml);
        groups.iter().all(|group| {
            let members: HashSet<usize> = group.iter().copied().collect();
            group.iter().all(|&j| adj[j].iter().all(|k| !members.contains(k)))
        })
    }

    fn groups(n: usize, width: usize) -> Vec<Vec<usize>> {
        (0..group_count(n, width))
            .map(|g| group_members(n, width, g).collect())
            .collect()
    }

    #[test]
    fn groups_partition_the_columns() {
        let gs = groups(10, 5);
        assert_eq!(gs.len(), 5);
        assert_eq!(gs[0], vec![0, 5]);
        assert_eq!(gs[4], vec![4, 9]);
        let mut all: Vec<usize> = gs.into_iter().flatten().collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn narrow_partition_gets_one_column_per_group() {
        assert_eq!(group_count(3, 7), 3);
        assert_eq!(groups(3, 7), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn modulo_groups_equal_greedy_coloring() {
        for &(n, mu, ml) in &[(10, 2, 2), (13, 0, 3), (8, 1, 0), (5, 4, 4)] {
            let width = mu + ml + 1;
            let colors = greedy_band_coloring(n, mu, ml);
            for (j, &c) in colors.iter().enumerate() {
                assert_eq!(c, j % width);
            }
            assert!(groups_are_orthogonal(n, mu, ml, &groups(n, width)));
        }
    }

    #[test]
    fn contiguous_groups_are_not_orthogonal() {
        let contiguous = vec![(0..5).collect::<Vec<_>>(), (5..10).collect()];
        assert!(!groups_are_orthogonal(10, 2, 2, &contiguous));
    }
}
