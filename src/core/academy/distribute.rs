//! Distribution of players into games.
//!
//! Players arrive in groups that must play together (`alice=bob`). Groups are packed
//! into as few games as possible without exceeding the seats of a game, and among
//! those packings the one with the smallest difference between the fullest and the
//! emptiest game wins. This is a generalisation of multi-way number partitioning, so
//! the exhaustive search runs against a deadline.

use crate::errors::{Error, Result};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Seats in one game, and therefore the largest group that can play together.
pub const MAX_GAME_SIZE: usize = 6;
/// Time the search may take before giving up.
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a partition could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionError {
    /// An item does not fit into a bucket at all.
    ItemTooLarge,
    /// The deadline passed before the search finished.
    TimedOut,
}

/// Splits `sizes` into buckets whose sums do not exceed `max_size`.
///
/// Minimises the bucket count first and the spread between the largest and the
/// smallest bucket sum second. Returns the sizes placed in each bucket.
pub fn partition(
    sizes: &[usize],
    max_size: usize,
    deadline: Option<Instant>,
) -> std::result::Result<Vec<Vec<usize>>, PartitionError> {
    if sizes.is_empty() {
        return Ok(Vec::new());
    }
    if sizes.iter().any(|&size| size > max_size) {
        return Err(PartitionError::ItemTooLarge);
    }

    let total: usize = sizes.iter().sum();
    let mut search = Search {
        sizes,
        max_size,
        deadline,
        best_key: (sizes.len() + 1, 0),
        best_assignment: Vec::new(),
        lower_bound: (total.div_ceil(max_size), usize::from(total % max_size > 0)),
        timed_out: false,
    };
    search.run(0, &mut Vec::new(), &mut Vec::new());

    if search.timed_out {
        return Err(PartitionError::TimedOut);
    }

    let (bucket_count, _) = search.best_key;
    let mut buckets = vec![Vec::new(); bucket_count];
    for (item, &bucket) in search.best_assignment.iter().enumerate() {
        buckets[bucket].push(sizes[item]);
    }
    Ok(buckets)
}

struct Search<'a> {
    sizes: &'a [usize],
    max_size: usize,
    deadline: Option<Instant>,
    /// (bucket count, spread) of the best complete assignment so far
    best_key: (usize, usize),
    best_assignment: Vec<usize>,
    /// No assignment can beat this key
    lower_bound: (usize, usize),
    timed_out: bool,
}

impl Search<'_> {
    fn run(&mut self, item: usize, space_left: &mut Vec<usize>, assignment: &mut Vec<usize>) {
        if self.timed_out {
            return;
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            self.timed_out = true;
            return;
        }

        if item == self.sizes.len() {
            let most = space_left.iter().max().copied().unwrap_or(0);
            let least = space_left.iter().min().copied().unwrap_or(0);
            let key = (space_left.len(), most - least);
            if key < self.best_key {
                self.best_key = key;
                self.best_assignment.clone_from(assignment);
            }
            return;
        }

        if self.best_key == self.lower_bound {
            return;
        }
        if (space_left.len(), 0) >= self.best_key {
            return;
        }

        // Try every open bucket, then one new bucket.
        let size = self.sizes[item];
        for bucket in 0..=space_left.len() {
            if bucket == space_left.len() {
                space_left.push(self.max_size);
            }
            if space_left[bucket] >= size {
                space_left[bucket] -= size;
                assignment.push(bucket);
                self.run(item + 1, space_left, assignment);
                assignment.pop();
                space_left[bucket] += size;
            }
        }
        space_left.pop();
    }
}

/// Parses `alice=bob carol` style arguments into player groups.
pub fn parse_groups(args: &[&str]) -> Vec<Vec<String>> {
    args.iter()
        .map(|arg| {
            arg.split('=')
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// Distributes player groups into games; each returned game lists its players.
///
/// Groups of the same size are shuffled before they are dealt into the games picked
/// by [`partition`], so repeated calls give different line-ups.
#[instrument]
pub fn distribute(groups: Vec<Vec<String>>, timeout: Duration) -> Result<Vec<Vec<String>>> {
    if groups.is_empty() {
        return Err(Error::Distribution {
            message: "You have to give at least one player to distribute".to_string(),
        });
    }
    if groups.iter().any(|group| group.len() > MAX_GAME_SIZE) {
        return Err(Error::Distribution {
            message: format!("Groups can't have size over {MAX_GAME_SIZE}"),
        });
    }

    let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
    let game_sizes = partition(&sizes, MAX_GAME_SIZE, Some(Instant::now() + timeout)).map_err(
        |e| match e {
            PartitionError::TimedOut => Error::Distribution {
                message: format!(
                    "Timed out trying to find optimal solution after {} seconds",
                    timeout.as_secs()
                ),
            },
            PartitionError::ItemTooLarge => Error::Distribution {
                message: format!("Groups can't have size over {MAX_GAME_SIZE}"),
            },
        },
    )?;
    debug!("Game group sizes: {game_sizes:?}");

    let mut by_size: BTreeMap<usize, Vec<Vec<String>>> = BTreeMap::new();
    for group in groups {
        by_size.entry(group.len()).or_default().push(group);
    }
    let mut rng = rand::rng();
    for pool in by_size.values_mut() {
        pool.shuffle(&mut rng);
    }

    let mut games = Vec::with_capacity(game_sizes.len());
    for sizes in game_sizes {
        let mut players = Vec::new();
        for size in sizes {
            let group = by_size
                .get_mut(&size)
                .and_then(Vec::pop)
                .ok_or_else(|| Error::Distribution {
                    message: "Ran out of groups while dealing games".to_string(),
                })?;
            players.extend(group);
        }
        games.push(players);
    }
    Ok(games)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn sorted(mut buckets: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
        for bucket in &mut buckets {
            bucket.sort_unstable();
        }
        buckets.sort();
        buckets
    }

    #[test]
    fn test_partition_small() {
        let buckets = partition(&[1, 2, 3], 3, None).unwrap();
        assert_eq!(sorted(buckets), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_partition_balances_buckets() {
        let sizes = [5, 5, 5, 4, 4, 4, 4, 4];
        let buckets = partition(&sizes, 18, None).unwrap();
        assert_eq!(sorted(buckets), vec![vec![4, 4, 4, 5], vec![4, 4, 5, 5]]);
    }

    #[test]
    fn test_partition_single_players() {
        let sizes = [1; 8];
        let buckets = partition(&sizes, MAX_GAME_SIZE, None).unwrap();
        assert_eq!(sorted(buckets), vec![vec![1; 4], vec![1; 4]]);
    }

    #[test]
    fn test_partition_rejects_oversized() {
        assert_eq!(
            partition(&[7], MAX_GAME_SIZE, None),
            Err(PartitionError::ItemTooLarge)
        );
    }

    #[test]
    fn test_partition_respects_deadline() {
        let sizes = [1; 40];
        let result = partition(&sizes, 5, Some(Instant::now()));
        assert_eq!(result, Err(PartitionError::TimedOut));
    }

    #[test]
    fn test_parse_groups() {
        let groups = parse_groups(&["alice=bob", "carol", "=", "dave="]);
        assert_eq!(
            groups,
            vec![
                vec!["alice".to_string(), "bob".to_string()],
                vec!["carol".to_string()],
                vec!["dave".to_string()],
            ]
        );
    }

    #[test]
    fn test_distribute_keeps_groups_together() {
        let groups = parse_groups(&["a=b=c", "d=e", "f", "g", "h=i=j=k"]);
        let games = distribute(groups, SEARCH_TIMEOUT).unwrap();

        assert_eq!(games.len(), 2);
        let mut everyone: Vec<&String> = games.iter().flatten().collect();
        everyone.sort();
        assert_eq!(everyone.len(), 11);
        assert!(games.iter().all(|game| game.len() <= MAX_GAME_SIZE));

        let game_of = |name: &str| games.iter().position(|g| g.iter().any(|p| p == name));
        assert_eq!(game_of("a"), game_of("c"));
        assert_eq!(game_of("h"), game_of("k"));
        assert_eq!(game_of("d"), game_of("e"));
    }

    #[test]
    fn test_distribute_rejects_large_group() {
        let groups = parse_groups(&["a=b=c=d=e=f=g"]);
        let result = distribute(groups, SEARCH_TIMEOUT);
        assert!(matches!(
            result,
            Err(Error::Distribution { ref message }) if message.contains("size over 6")
        ));
    }

    #[test]
    fn test_distribute_requires_players() {
        assert!(matches!(
            distribute(Vec::new(), SEARCH_TIMEOUT),
            Err(Error::Distribution { .. })
        ));
    }
}
