//! Best-release selection
//!
//! Candidates arrive from the indexer layer pre-sorted by score
//! descending; selection is the first candidate passing every per-item
//! check.

use crate::models::{MediaType, QualityProfile, Release, SearchableItem};

/// Pick the best acceptable release for `item`, or `None`.
pub fn select_best_release<'a>(
    releases: &'a [Release],
    profile: &QualityProfile,
    item: &SearchableItem,
) -> Option<&'a Release> {
    releases.iter().find(|release| accepts(release, profile, item))
}

fn accepts(release: &Release, profile: &QualityProfile, item: &SearchableItem) -> bool {
    match item.media_type {
        MediaType::Movie => {}
        MediaType::Episode => {
            if !release.covers_season(item.season_number) {
                return false;
            }
            if release.episode_number != Some(item.episode_number) {
                return false;
            }
        }
        MediaType::Season | MediaType::Series => {
            // must parse as a pack, not a specials or single episode
            if !release.is_season_pack() {
                return false;
            }
            if !release.covers_season(item.season_number) {
                return false;
            }
        }
    }

    if !profile.is_acceptable(release.quality_id) {
        return false;
    }
    if item.has_file && !profile.is_upgrade(item.current_quality_id, release.quality_id) {
        return false;
    }
    true
}
