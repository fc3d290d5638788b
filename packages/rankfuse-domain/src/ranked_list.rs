use serde::{Deserialize, Serialize};

/// Naming scheme of the item columns in a ranked-list file.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
	#[default]
	ArticleId,
	ImageId,
}
impl ColumnKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ArticleId => "article_id",
			Self::ImageId => "image_id",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"article_id" => Some(Self::ArticleId),
			"image_id" => Some(Self::ImageId),
			_ => None,
		}
	}

	/// Header of the item column at 1-based `position`.
	pub fn header(self, position: usize) -> String {
		format!("{}_{position}", self.as_str())
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Candidate {
	pub item_id: String,
	/// 1-based rank within the source list.
	pub rank: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub score: Option<f32>,
}
impl Candidate {
	pub fn new(item_id: impl Into<String>, rank: u32) -> Self {
		Self { item_id: item_id.into(), rank, score: None }
	}

	pub fn with_score(mut self, score: f32) -> Self {
		self.score = Some(score);

		self
	}
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum RankedListError {
	#[error("Query id must be non-empty.")]
	EmptyQueryId,
	#[error("Candidate at position {position} has an empty item id.")]
	EmptyItemId { position: usize },
	#[error("Rank must be 1 or greater; item {item_id} has rank 0.")]
	ZeroRank { item_id: String },
	#[error("Ranks must be strictly increasing; rank {rank} follows rank {previous}.")]
	RankOrder { previous: u32, rank: u32 },
	#[error("Item {item_id} appears more than once.")]
	DuplicateItem { item_id: String },
}

/// Candidates for one query from one source, ordered by rank.
///
/// Ranks are 1-based and strictly increasing but may have gaps where the source had an empty
/// slot. Item ids are unique within the list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedList {
	query_id: String,
	candidates: Vec<Candidate>,
}
impl RankedList {
	pub fn new(
		query_id: impl Into<String>,
		candidates: Vec<Candidate>,
	) -> Result<Self, RankedListError> {
		let query_id = query_id.into();

		if query_id.trim().is_empty() {
			return Err(RankedListError::EmptyQueryId);
		}

		let mut previous = 0_u32;
		let mut seen = std::collections::HashSet::with_capacity(candidates.len());

		for (position, candidate) in candidates.iter().enumerate() {
			if candidate.item_id.trim().is_empty() {
				return Err(RankedListError::EmptyItemId { position: position + 1 });
			}
			if candidate.rank == 0 {
				return Err(RankedListError::ZeroRank { item_id: candidate.item_id.clone() });
			}
			if candidate.rank <= previous {
				return Err(RankedListError::RankOrder { previous, rank: candidate.rank });
			}
			if !seen.insert(candidate.item_id.as_str()) {
				return Err(RankedListError::DuplicateItem { item_id: candidate.item_id.clone() });
			}

			previous = candidate.rank;
		}

		Ok(Self { query_id, candidates })
	}

	/// Builds a gap-free list where the n-th item gets rank n.
	pub fn from_items<I, S>(query_id: impl Into<String>, items: I) -> Result<Self, RankedListError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let candidates = items
			.into_iter()
			.enumerate()
			.map(|(idx, item)| Candidate::new(item, idx as u32 + 1))
			.collect();

		Self::new(query_id, candidates)
	}

	pub fn query_id(&self) -> &str {
		&self.query_id
	}

	pub fn candidates(&self) -> &[Candidate] {
		&self.candidates
	}

	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}

	/// Number of candidates filling ranks 1..=n without a gap.
	pub fn leading_len(&self) -> usize {
		self.candidates
			.iter()
			.enumerate()
			.take_while(|(idx, candidate)| candidate.rank as usize == idx + 1)
			.count()
	}

	pub fn item_ids(&self) -> impl Iterator<Item = &str> {
		self.candidates.iter().map(|candidate| candidate.item_id.as_str())
	}
}
