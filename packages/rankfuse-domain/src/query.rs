use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Entity {
	pub label: String,
	pub text: String,
}

/// A retrieval query as produced by the upstream extraction step.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Query {
	pub id: String,
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub summary: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub concise: Option<String>,
	#[serde(default)]
	pub entities: Vec<Entity>,
}
impl Query {
	/// Entities with non-blank text, trimmed.
	pub fn usable_entities(&self) -> impl Iterator<Item = Entity> + '_ {
		self.entities.iter().filter_map(|entity| {
			let text = entity.text.trim();

			if text.is_empty() {
				return None;
			}

			Some(Entity { label: entity.label.trim().to_string(), text: text.to_string() })
		})
	}
}
