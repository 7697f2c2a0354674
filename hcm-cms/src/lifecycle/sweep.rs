//! Orphan sweep
//!
//! Operator-invoked reconciliation between the asset root and the rows.
//! Never runs on its own.
//!
//! A stored file is live if an asset slot holds its reference or if its
//! file name appears in a rich-text body (inline editor images). Stored names
//! carry no HTML-special characters, so the only other spelling an editor can
//! save is the percent-encoded one for non-ASCII letters.

use super::Coordinator;
use crate::assets::StoredFile;
use hcm_common::Result;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

/// Files younger than this may belong to a mutation still in flight
pub const DEFAULT_SWEEP_MIN_AGE: Duration = Duration::from_secs(60 * 60);

impl Coordinator {
    /// Stored files that nothing references
    pub async fn find_orphans(&self) -> Result<Vec<StoredFile>> {
        let referenced = self.repo.referenced_assets().await?;
        let bodies = self.repo.rich_text_bodies().await?;
        let stored = self.assets.list_stored().await?;

        Ok(stored
            .into_iter()
            .filter(|file| !referenced.contains(&file.reference))
            .filter(|file| !embedded_in(&bodies, &file.file_name))
            .collect())
    }

    /// Delete orphans last modified at least `min_age` ago; returns their references
    pub async fn sweep_orphans(&self, min_age: Duration) -> Result<Vec<String>> {
        let now = SystemTime::now();
        let mut removed = Vec::new();

        for file in self.find_orphans().await? {
            let age = now.duration_since(file.modified).unwrap_or_default();
            if age < min_age {
                continue;
            }
            match self.assets.delete(&file.reference).await {
                Ok(()) => removed.push(file.reference),
                Err(e) => warn!("Failed to sweep {}: {}", file.reference, e),
            }
        }

        info!("Orphan sweep removed {} asset(s)", removed.len());
        Ok(removed)
    }
}

fn embedded_in(bodies: &[String], file_name: &str) -> bool {
    let mut spellings = vec![file_name.to_string()];
    if !file_name.is_ascii() {
        spellings.push(percent_encode(file_name, false));
        spellings.push(percent_encode(file_name, true));
    }

    bodies
        .iter()
        .any(|body| spellings.iter().any(|name| body.contains(name.as_str())))
}

/// Percent-encode the non-ASCII bytes of a name
fn percent_encode(name: &str, lower: bool) -> String {
    let mut encoded = String::with_capacity(name.len() * 3);
    for c in name.chars() {
        if c.is_ascii() {
            encoded.push(c);
            continue;
        }
        let mut buf = [0u8; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            if lower {
                encoded.push_str(&format!("%{:02x}", byte));
            } else {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_encode_non_ascii_only() {
        assert_eq!(percent_encode("1-ả.png", false), "1-%E1%BA%A3.png");
        assert_eq!(percent_encode("1-ả.png", true), "1-%e1%ba%a3.png");
        assert_eq!(percent_encode("1-a.png", false), "1-a.png");
    }

    #[test]
    fn test_embedded_in_matches_raw_and_encoded_names() {
        let bodies = vec![
            r#"<img src="/public/uploads/1-h%C3%ACnh.png">"#.to_string(),
            r#"<p><img src="/public/uploads/2-plain.png"></p>"#.to_string(),
        ];
        assert!(embedded_in(&bodies, "1-hình.png"));
        assert!(embedded_in(&bodies, "2-plain.png"));
        assert!(!embedded_in(&bodies, "3-gone.png"));
    }
}
