use std::{cmp::Ordering, collections::HashMap};

use serde::Serialize;

use crate::policy::{FusionMode, FusionPolicy, TieBreakKey};
use rankfuse_domain::RankedList;

/// One source's list for the query being fused.
#[derive(Clone, Copy, Debug)]
pub struct SourceInput<'a> {
	/// Position of the source in the run; drives first-seen order.
	pub index: usize,
	pub weight: f64,
	pub list: &'a RankedList,
	/// Maximum number of items this source may contribute.
	pub limit: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FusedItem {
	pub item_id: String,
	pub score: f64,
	pub source_count: u32,
	pub best_rank: u32,
	pub rank_sum: u64,
	#[serde(skip)]
	first_seen: (usize, u32),
}

/// Voting contribution of one appearance.
pub fn voting_score(weight: f64) -> f64 {
	weight
}

/// Reciprocal rank fusion contribution of one appearance at a 1-based `rank`.
pub fn rrf_score(weight: f64, rrf_k: u32, rank: u32) -> f64 {
	if rank == 0 {
		return 0.0;
	}

	weight / (f64::from(rrf_k) + f64::from(rank))
}

/// Scores every item across `sources` and returns them best first, without truncation.
pub fn fuse_lists(policy: &FusionPolicy, sources: &[SourceInput<'_>]) -> Vec<FusedItem> {
	let mut by_item: HashMap<&str, FusedItem> = HashMap::new();

	for source in sources {
		if source.weight <= 0.0 {
			continue;
		}

		let eligible = source
			.list
			.candidates()
			.iter()
			.filter(|candidate| policy.depth.is_none_or(|depth| candidate.rank <= depth))
			.take(source.limit.unwrap_or(usize::MAX));

		for candidate in eligible {
			let contribution = match policy.mode {
				FusionMode::Voting => voting_score(source.weight),
				FusionMode::Rrf => rrf_score(source.weight, policy.rrf_k, candidate.rank),
			};
			let entry = by_item.entry(candidate.item_id.as_str()).or_insert_with(|| FusedItem {
				item_id: candidate.item_id.clone(),
				score: 0.0,
				source_count: 0,
				best_rank: u32::MAX,
				rank_sum: 0,
				first_seen: (source.index, candidate.rank),
			});

			entry.score += contribution;
			entry.source_count += 1;
			entry.best_rank = entry.best_rank.min(candidate.rank);
			entry.rank_sum += u64::from(candidate.rank);
			entry.first_seen = entry.first_seen.min((source.index, candidate.rank));
		}
	}

	let mut fused: Vec<FusedItem> = by_item.into_values().collect();

	fused.sort_by(|left, right| cmp_fused(policy, left, right));

	fused
}

pub fn cmp_fused(policy: &FusionPolicy, left: &FusedItem, right: &FusedItem) -> Ordering {
	let mut ord = cmp_f64_desc(left.score, right.score);

	for key in &policy.tie_break {
		if ord != Ordering::Equal {
			return ord;
		}

		ord = cmp_tie_break(*key, left, right);
	}

	ord.then_with(|| cmp_tie_break(TieBreakKey::FirstSeen, left, right))
}

fn cmp_tie_break(key: TieBreakKey, left: &FusedItem, right: &FusedItem) -> Ordering {
	match key {
		TieBreakKey::BestRank => left.best_rank.cmp(&right.best_rank),
		TieBreakKey::SourceCount => right.source_count.cmp(&left.source_count),
		TieBreakKey::RankSum => left.rank_sum.cmp(&right.rank_sum),
		TieBreakKey::FirstSeen => left.first_seen.cmp(&right.first_seen),
	}
}

pub fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
