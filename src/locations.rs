//! Location list loading
//!
//! The location file holds one booking page URL per line, for example
//! `https://www.doctolib.fr/centre-de-sante/paris/centre-de-vaccination-paris?pid=1`.
//! Only the trailing slug is kept.

use std::path::Path;

use crate::models::Location;
use crate::utils::error::LocationError;

const URL_PREFIXES: &[&str] = &["https://", "http://", "www.doctolib.fr/", "doctolib.fr/"];

/// Extract the location slug from one line of the location file
///
/// Accepts `<specialty>/<city>/<slug>` (optionally as a full URL) or a bare
/// slug. Returns `None` for blank or unrecognized lines.
///
/// ```
/// use chronodose::locations::parse_location_line;
///
/// let location = parse_location_line("https://doctolib.fr/centre-de-sante/lyon/centre-a?pid=4");
/// assert_eq!(location.unwrap().as_str(), "centre-a");
/// ```
pub fn parse_location_line(line: &str) -> Option<Location> {
    let mut rest = line.trim();
    for prefix in URL_PREFIXES {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
        }
    }

    let path = rest.split(['?', '#']).next().unwrap_or_default();
    let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();

    match parts.as_slice() {
        [_, _, slug] | [slug] if !slug.contains(char::is_whitespace) => Location::new(*slug).ok(),
        _ => None,
    }
}

/// Load every location listed in `path`, in file order
pub async fn load_locations(path: &Path) -> Result<Vec<Location>, LocationError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LocationError::Io {
            path: path.display().to_string(),
            source,
        })?;

    let mut locations = Vec::new();
    for (number, line) in content.lines().enumerate() {
        match parse_location_line(line) {
            Some(location) => locations.push(location),
            None if line.trim().is_empty() => {}
            None => {
                tracing::warn!(line = number + 1, content = line, "Skipping unrecognized location line");
            }
        }
    }

    if locations.is_empty() {
        return Err(LocationError::Empty {
            path: path.display().to_string(),
        });
    }

    tracing::info!(count = locations.len(), path = %path.display(), "Loaded locations");
    Ok(locations)
}
