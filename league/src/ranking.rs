//! Power rankings and the plain standings table.
//!
//! [`compute_rankings`] orders teams by wins, breaking ties on wins with the
//! directional head-to-head table and then on point differential:
//!
//! 1. More wins ranks first.
//! 2. Tied on wins: if A has ever beaten B, A ranks first; otherwise if B has
//!    ever beaten A, B ranks first. Only presence of a win counts, not how
//!    often either side won.
//! 3. Otherwise the larger point differential ranks first.
//!
//! Rule 2 is not transitive. With three teams tied on wins that beat each
//! other in a cycle, or a pair with wins in both directions, no order
//! satisfies every comparison. Teams are therefore fed in owner-key order,
//! grouped into win tiers, and each tier is ordered by a stable insertion
//! sort with the comparator. The result is one deterministic ordering for a
//! given input, not a canonical one.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::model::{HeadToHead, OwnerKey, Standing, Team};

/// A team with its position in a ranking. `rank` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedTeam {
    pub rank: usize,
    pub team: Team,
    pub standing: Standing,
}

impl RankedTeam {
    pub fn owner(&self) -> &OwnerKey {
        &self.team.owner_id
    }
}

/// Compare two teams for the power rankings. `Less` means `a` ranks above `b`.
pub fn compare_teams(
    a: &OwnerKey,
    a_standing: &Standing,
    b: &OwnerKey,
    b_standing: &Standing,
    head_to_head: &HeadToHead,
) -> Ordering {
    b_standing
        .wins
        .cmp(&a_standing.wins)
        .then_with(|| head_to_head_order(a, b, head_to_head))
        .then_with(|| {
            b_standing
                .point_differential()
                .cmp(&a_standing.point_differential())
        })
}

fn head_to_head_order(a: &OwnerKey, b: &OwnerKey, head_to_head: &HeadToHead) -> Ordering {
    if head_to_head.has_beaten(a, b) {
        Ordering::Less
    } else if head_to_head.has_beaten(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Rank every team that has a standing. Standings without a team are ignored.
pub fn compute_rankings(
    teams: &BTreeMap<OwnerKey, Team>,
    standings: &BTreeMap<OwnerKey, Standing>,
    head_to_head: &HeadToHead,
) -> Vec<RankedTeam> {
    let mut candidates = candidates(teams, standings);
    candidates.sort_by(|a, b| b.1.wins.cmp(&a.1.wins));

    let mut ordered = Vec::with_capacity(candidates.len());
    for tier in candidates.chunk_by(|a, b| a.1.wins == b.1.wins) {
        let mut tier = tier.to_vec();
        insertion_sort_by(&mut tier, |x, y| {
            compare_teams(&x.0.owner_id, &x.1, &y.0.owner_id, &y.1, head_to_head) == Ordering::Less
        });
        ordered.extend(tier);
    }

    number(ordered)
}

/// The standings table: wins, then point differential, then owner key.
pub fn compute_standings(
    teams: &BTreeMap<OwnerKey, Team>,
    standings: &BTreeMap<OwnerKey, Standing>,
) -> Vec<RankedTeam> {
    let mut candidates = candidates(teams, standings);
    candidates.sort_by(|a, b| {
        b.1.wins
            .cmp(&a.1.wins)
            .then_with(|| b.1.point_differential().cmp(&a.1.point_differential()))
            .then_with(|| a.0.owner_id.cmp(&b.0.owner_id))
    });
    number(candidates)
}

fn candidates<'a>(
    teams: &'a BTreeMap<OwnerKey, Team>,
    standings: &BTreeMap<OwnerKey, Standing>,
) -> Vec<(&'a Team, Standing)> {
    teams
        .iter()
        .filter_map(|(owner, team)| standings.get(owner).map(|s| (team, *s)))
        .collect()
}

fn number(ordered: Vec<(&Team, Standing)>) -> Vec<RankedTeam> {
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, (team, standing))| RankedTeam {
            rank: i + 1,
            team: team.clone(),
            standing,
        })
        .collect()
}

/// Move each element left past every predecessor it should precede.
/// Never panics on an inconsistent comparator.
fn insertion_sort_by<T>(items: &mut [T], mut precedes: impl FnMut(&T, &T) -> bool) {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && precedes(&items[j], &items[j - 1]) {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
}
