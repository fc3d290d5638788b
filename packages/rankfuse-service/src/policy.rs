use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMode {
	Voting,
	Rrf,
}
impl FusionMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Voting => "voting",
			Self::Rrf => "rrf",
		}
	}
}

/// Which queries get fused, given how many sources cover them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gating {
	/// Fuse whatever sources have the query.
	Any,
	/// Skip queries missing or empty in any source.
	All,
	/// Like `All`, then cap each source at twice the shortest source's run of items.
	Adaptive,
}
impl Gating {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Any => "any",
			Self::All => "all",
			Self::Adaptive => "adaptive",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakKey {
	/// Lowest rank seen in any source.
	BestRank,
	/// More sources first.
	SourceCount,
	/// Lowest sum of ranks across sources.
	RankSum,
	/// Earliest (source index, rank) at which the item was first seen.
	FirstSeen,
}
impl TieBreakKey {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"best_rank" => Some(Self::BestRank),
			"source_count" => Some(Self::SourceCount),
			"rank_sum" => Some(Self::RankSum),
			"first_seen" => Some(Self::FirstSeen),
			_ => None,
		}
	}
}

/// Immutable fusion settings for one run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FusionPolicy {
	pub mode: FusionMode,
	pub top_k: u32,
	pub rrf_k: u32,
	pub gating: Gating,
	pub depth: Option<u32>,
	/// Always ends with [`TieBreakKey::FirstSeen`].
	pub tie_break: Vec<TieBreakKey>,
	pub source_weights: BTreeMap<String, f32>,
}
impl FusionPolicy {
	pub fn from_config(cfg: &rankfuse_config::Fusion) -> Result<Self> {
		let mode = match cfg.mode.as_str() {
			"voting" => FusionMode::Voting,
			"rrf" => FusionMode::Rrf,
			other => {
				return Err(Error::Configuration {
					message: format!("Unknown fusion mode {other:?}."),
				});
			},
		};
		let gating = match cfg.gating.as_str() {
			"any" => Gating::Any,
			"all" => Gating::All,
			"adaptive" => Gating::Adaptive,
			other => {
				return Err(Error::Configuration {
					message: format!("Unknown gating mode {other:?}."),
				});
			},
		};

		if cfg.top_k == 0 {
			return Err(Error::Configuration {
				message: "fusion.top_k must be greater than zero.".to_string(),
			});
		}
		if cfg.rrf_k == 0 {
			return Err(Error::Configuration {
				message: "fusion.rrf_k must be greater than zero.".to_string(),
			});
		}

		let mut tie_break = Vec::with_capacity(cfg.tie_break.len() + 1);

		for raw in &cfg.tie_break {
			let key = TieBreakKey::parse(raw).ok_or_else(|| Error::Configuration {
				message: format!("Unknown tie-break key {raw:?}."),
			})?;

			if !tie_break.contains(&key) {
				tie_break.push(key);
			}
		}

		if let Some(position) = tie_break.iter().position(|key| *key == TieBreakKey::FirstSeen) {
			// Keys after first_seen can never decide anything.
			tie_break.truncate(position + 1);
		} else {
			tie_break.push(TieBreakKey::FirstSeen);
		}

		for (name, weight) in &cfg.source_weights {
			if !weight.is_finite() || *weight < 0.0 {
				return Err(Error::Configuration {
					message: format!(
						"fusion.source_weights.{name} must be a finite number of zero or greater."
					),
				});
			}
		}

		Ok(Self {
			mode,
			top_k: cfg.top_k,
			rrf_k: cfg.rrf_k,
			gating,
			depth: cfg.depth.filter(|depth| *depth > 0),
			tie_break,
			source_weights: cfg.source_weights.iter().map(|(k, v)| (k.clone(), *v)).collect(),
		})
	}

	/// Weight of the named source; unnamed sources weigh 1.0.
	pub fn source_weight(&self, name: &str) -> f32 {
		self.source_weights.get(name).copied().unwrap_or(1.0)
	}

	pub fn snapshot(&self) -> Value {
		serde_json::json!({
			"mode": self.mode,
			"top_k": self.top_k,
			"rrf_k": self.rrf_k,
			"gating": self.gating,
			"depth": self.depth,
			"tie_break": self.tie_break,
			"source_weights": self.source_weights,
		})
	}

	/// Stable identifier of the policy; equal policies share an id.
	pub fn policy_id(&self) -> Result<String> {
		hash_policy_snapshot(&self.snapshot())
	}
}

pub fn hash_policy_snapshot(payload: &Value) -> Result<String> {
	let raw = serde_json::to_vec(payload).map_err(|err| Error::Report {
		message: format!("Failed to encode policy snapshot: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn fusion(mode: &str, tie_break: &[&str]) -> rankfuse_config::Fusion {
		rankfuse_config::Fusion {
			mode: mode.to_string(),
			top_k: 10,
			rrf_k: 60,
			gating: "any".to_string(),
			depth: None,
			tie_break: tie_break.iter().map(|key| key.to_string()).collect(),
			source_weights: Default::default(),
		}
	}

	#[test]
	fn appends_first_seen_when_missing() {
		let policy = FusionPolicy::from_config(&fusion("voting", &["rank_sum"]))
			.expect("Policy must resolve.");

		assert_eq!(policy.tie_break, vec![TieBreakKey::RankSum, TieBreakKey::FirstSeen]);
	}

	#[test]
	fn drops_keys_after_first_seen() {
		let policy = FusionPolicy::from_config(&fusion("rrf", &["first_seen", "best_rank"]))
			.expect("Policy must resolve.");

		assert_eq!(policy.tie_break, vec![TieBreakKey::FirstSeen]);
	}

	#[test]
	fn unknown_mode_is_a_configuration_error() {
		let err = FusionPolicy::from_config(&fusion("borda", &[])).expect_err("Must fail.");

		assert!(matches!(err, Error::Configuration { .. }), "Unexpected error: {err}");
	}

	#[test]
	fn policy_id_is_stable_and_sensitive_to_settings() {
		let a = FusionPolicy::from_config(&fusion("rrf", &["best_rank"])).expect("Policy.");
		let b = FusionPolicy::from_config(&fusion("rrf", &["best_rank"])).expect("Policy.");
		let c = FusionPolicy::from_config(&fusion("voting", &["best_rank"])).expect("Policy.");
		let id_a = a.policy_id().expect("Hash.");

		assert_eq!(id_a, b.policy_id().expect("Hash."));
		assert_ne!(id_a, c.policy_id().expect("Hash."));
		assert_eq!(id_a.len(), 64);
	}
}
