use anyhow::Result;
use std::cmp::Ordering;

use crate::models::{MediaKind, WorkItem};
use crate::tmdb::{TitleRow, TmdbApi};

/// Which popularity lists a discover request merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoverTarget {
    #[default]
    Multi,
    Single(MediaKind),
}

impl DiscoverTarget {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "multi" => Some(DiscoverTarget::Multi),
            "movie" => Some(DiscoverTarget::Single(MediaKind::Movie)),
            "series" => Some(DiscoverTarget::Single(MediaKind::Series)),
            _ => None,
        }
    }
}

/// Fetches the requested popularity lists in parallel and merges them into
/// one descending ranking. The page number is applied per upstream list
/// before merging, so a combined page is not a slice of one global ranking.
pub async fn browse(
    tmdb: &dyn TmdbApi,
    target: DiscoverTarget,
    page: u32,
    genre: Option<u32>,
) -> Result<Vec<WorkItem>> {
    let merged = match target {
        DiscoverTarget::Single(kind) => tag(tmdb.discover(kind, page, genre).await?, kind),
        DiscoverTarget::Multi => {
            let (movies, series) = tokio::try_join!(
                tmdb.discover(MediaKind::Movie, page, genre),
                tmdb.discover(MediaKind::Series, page, genre),
            )?;
            let mut all = tag(movies, MediaKind::Movie);
            all.extend(tag(series, MediaKind::Series));
            all
        }
    };
    Ok(ranked(merged))
}

fn tag(rows: Vec<TitleRow>, kind: MediaKind) -> Vec<WorkItem> {
    rows.into_iter()
        .map(|row| row.into_work_item(kind))
        .collect()
}

fn ranked(mut items: Vec<WorkItem>) -> Vec<WorkItem> {
    items.sort_by(|a, b| {
        b.popularity
            .partial_cmp(&a.popularity)
            .unwrap_or(Ordering::Equal)
    });
    items
}
