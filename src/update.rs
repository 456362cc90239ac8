//! Startup check against the project's release listing. Strictly
//! informational: a newer tag produces one notice, every failure is
//! debug-logged and otherwise ignored.

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

const RELEASES_URL: &str = "https://api.github.com/repos/plugdepth/plugdepth/releases";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// A user-visible notice when a newer release is listed, `None` otherwise.
pub fn check_for_update() -> Option<String> {
    match fetch_latest_tag() {
        Ok(Some(tag)) if is_newer(&tag) => Some(format!(
            "A new version is available: {tag} (installed: v{}).",
            env!("CARGO_PKG_VERSION")
        )),
        Ok(_) => None,
        Err(err) => {
            log::debug!("update check failed: {err:#}");
            None
        }
    }
}

fn is_newer(tag: &str) -> bool {
    let current = env!("CARGO_PKG_VERSION");
    tag != current && tag.trim_start_matches('v') != current
}

fn fetch_latest_tag() -> Result<Option<String>> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("plugdepth/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(5))
        .build()?;

    let response = client.get(RELEASES_URL).send()?;
    if !response.status().is_success() {
        return Ok(None);
    }

    let releases: Vec<Release> = serde_json::from_str(&response.text()?)?;
    Ok(releases.into_iter().next().map(|r| r.tag_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_version_is_not_newer() {
        assert!(!is_newer(env!("CARGO_PKG_VERSION")));
        assert!(!is_newer(concat!("v", env!("CARGO_PKG_VERSION"))));
    }

    #[test]
    fn different_tag_is_newer() {
        assert!(is_newer("v99.0.0"));
    }
}
