mod error;

pub use error::{Error, Result};

use std::{
	collections::BTreeMap,
	env, fs,
	path::{Path, PathBuf},
};

use uuid::Uuid;

use rankfuse_domain::RankedList;

/// A uniquely named scratch directory removed on drop.
pub struct TestDir {
	path: PathBuf,
	cleaned: bool,
}
impl TestDir {
	pub fn new() -> Result<Self> {
		let path = env::temp_dir().join(format!("rankfuse_test_{}", Uuid::new_v4().simple()));

		fs::create_dir_all(&path).map_err(|err| {
			Error::Message(format!("Failed to create test directory {}: {err}.", path.display()))
		})?;

		Ok(Self { path, cleaned: false })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn join(&self, name: &str) -> PathBuf {
		self.path.join(name)
	}

	/// Writes `contents` to `name` inside the directory and returns the full path.
	pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
		let path = self.join(name);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}

		fs::write(&path, contents)?;

		Ok(path)
	}

	pub fn read(&self, name: &str) -> Result<String> {
		Ok(fs::read_to_string(self.join(name))?)
	}

	pub fn cleanup(mut self) -> Result<()> {
		self.cleaned = true;

		fs::remove_dir_all(&self.path)?;

		Ok(())
	}
}
impl Drop for TestDir {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let _ = fs::remove_dir_all(&self.path);
	}
}

/// Builds gap-free ranked lists keyed by query id.
pub fn ranked_lists(rows: &[(&str, &[&str])]) -> Result<BTreeMap<String, RankedList>> {
	let mut out = BTreeMap::new();

	for (query_id, items) in rows {
		let list = RankedList::from_items(*query_id, items.iter().copied())?;

		if out.insert(query_id.to_string(), list).is_some() {
			return Err(Error::Message(format!("Query {query_id} listed twice.")));
		}
	}

	Ok(out)
}

/// Renders a ranked-list CSV with `width` item columns of `kind`, padding with empty cells.
pub fn csv_fixture(kind: &str, width: usize, rows: &[(&str, &[&str])]) -> String {
	let mut out = String::from("query_id");

	for position in 1..=width {
		out.push_str(&format!(",{kind}_{position}"));
	}

	out.push('\n');

	for (query_id, items) in rows {
		out.push_str(query_id);

		for position in 0..width {
			out.push(',');
			out.push_str(items.get(position).copied().unwrap_or(""));
		}

		out.push('\n');
	}

	out
}
