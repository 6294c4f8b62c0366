//! Search criteria construction
//!
//! Pure mapping from a searchable item onto indexer criteria. The
//! category sets follow the Newznab numbering indexers agree on.

use crate::models::{MediaType, SearchCriteria, SearchType, SearchableItem};

pub const MOVIE_CATEGORIES: &[i32] = &[2000, 2010, 2040, 2045, 2050, 2060];
pub const TV_CATEGORIES: &[i32] = &[5000, 5010, 5020, 5030, 5040, 5045];

/// Default result-page size requested from the indexer layer.
const SEARCH_LIMIT: i32 = 100;

pub fn build_search_criteria(item: &SearchableItem) -> SearchCriteria {
    match item.media_type {
        MediaType::Movie => movie_criteria(item),
        MediaType::Episode => episode_criteria(item),
        MediaType::Season | MediaType::Series => season_pack_criteria(item),
    }
}

fn movie_criteria(item: &SearchableItem) -> SearchCriteria {
    SearchCriteria {
        query: item.title.clone(),
        search_type: SearchType::Movie,
        categories: MOVIE_CATEGORIES.to_vec(),
        imdb_id: optional_str(&item.imdb_id),
        tmdb_id: optional_id(item.tmdb_id),
        tvdb_id: None,
        year: optional_id(item.year),
        season: None,
        episode: None,
        limit: Some(SEARCH_LIMIT),
    }
}

fn episode_criteria(item: &SearchableItem) -> SearchCriteria {
    SearchCriteria {
        query: item.title.clone(),
        search_type: SearchType::TvSearch,
        categories: TV_CATEGORIES.to_vec(),
        imdb_id: None,
        tmdb_id: None,
        tvdb_id: optional_id(item.tvdb_id),
        year: None,
        season: Some(item.season_number),
        episode: Some(item.episode_number),
        limit: Some(SEARCH_LIMIT),
    }
}

/// Season packs search without a category filter (indexers categorize
/// packs inconsistently) and without a season parameter (server-side
/// season filtering would exclude multi-season boxsets; the selector's
/// client-side filtering is authoritative).
fn season_pack_criteria(item: &SearchableItem) -> SearchCriteria {
    SearchCriteria {
        query: item.title.clone(),
        search_type: SearchType::TvSearch,
        categories: Vec::new(),
        imdb_id: None,
        tmdb_id: None,
        tvdb_id: optional_id(item.tvdb_id),
        year: None,
        season: None,
        episode: None,
        limit: Some(SEARCH_LIMIT),
    }
}

fn optional_id(id: i32) -> Option<i32> {
    (id != 0).then_some(id)
}

fn optional_str(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
