use std::{
	collections::HashMap,
	fs::{self, File},
	io::{BufReader, BufWriter, Write},
	path::Path,
};

use serde::Serialize;

use crate::{Error, Result};
use rankfuse_domain::Query;

/// Writes `value` as pretty JSON, creating parent directories as needed.
pub fn write_json<T>(path: &Path, value: &T) -> Result<()>
where
	T: Serialize,
{
	if let Some(parent) = path.parent()
		&& !parent.as_os_str().is_empty()
	{
		fs::create_dir_all(parent)
			.map_err(|err| Error::Io { path: parent.to_path_buf(), source: err })?;
	}

	let file =
		File::create(path).map_err(|err| Error::Io { path: path.to_path_buf(), source: err })?;
	let mut writer = BufWriter::new(file);

	serde_json::to_writer_pretty(&mut writer, value)?;

	writer.flush().map_err(|err| Error::Io { path: path.to_path_buf(), source: err })?;

	Ok(())
}

/// Reads a JSON array of queries with trimmed ids. Duplicate ids keep the first occurrence.
pub fn read_queries(path: &Path) -> Result<Vec<Query>> {
	let file =
		File::open(path).map_err(|err| Error::Io { path: path.to_path_buf(), source: err })?;
	let queries: Vec<Query> = serde_json::from_reader(BufReader::new(file))?;
	let mut seen = std::collections::HashSet::new();
	let mut out = Vec::with_capacity(queries.len());

	for mut query in queries {
		query.id = query.id.trim().to_string();

		if query.id.is_empty() {
			tracing::warn!(text = %query.text, "Skipped query without id.");

			continue;
		}
		if !seen.insert(query.id.clone()) {
			tracing::warn!(query_id = %query.id, "Skipped duplicate query id.");

			continue;
		}

		out.push(query);
	}

	Ok(out)
}

/// Reads a JSON object of article id to image ids. Ids are trimmed; blank ids are dropped.
pub fn read_article_map(path: &Path) -> Result<HashMap<String, Vec<String>>> {
	let file =
		File::open(path).map_err(|err| Error::Io { path: path.to_path_buf(), source: err })?;
	let raw: HashMap<String, Vec<String>> = serde_json::from_reader(BufReader::new(file))?;
	let mut out = HashMap::with_capacity(raw.len());

	for (article_id, images) in raw {
		let article_id = article_id.trim();

		if article_id.is_empty() {
			continue;
		}

		let images: Vec<String> = images
			.iter()
			.map(|image_id| image_id.trim())
			.filter(|image_id| !image_id.is_empty())
			.map(str::to_string)
			.collect();

		out.entry(article_id.to_string()).or_insert_with(Vec::new).extend(images);
	}

	tracing::info!(path = %path.display(), articles = out.len(), "Loaded article image map.");

	Ok(out)
}
