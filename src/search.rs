use anyhow::Result;
use futures::future::try_join_all;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::info;

use crate::models::{MediaKind, WorkItem};
use crate::tmdb::{Person, PersonCredits, TmdbApi};

pub const PAGE_SIZE: usize = 20;

// Credits are pulled for at most this many person matches per query.
const MAX_PEOPLE: usize = 5;

// Obscure credits below this vote count are noise, not filmography.
const VOTE_FLOOR: u64 = 5;

/// How a search request is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchTarget {
    #[default]
    Multi,
    Typed(MediaKind),
    Person,
}

impl SearchTarget {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "multi" => Some(SearchTarget::Multi),
            "movie" => Some(SearchTarget::Typed(MediaKind::Movie)),
            "series" => Some(SearchTarget::Typed(MediaKind::Series)),
            "person" => Some(SearchTarget::Person),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum SearchOutcome {
    Titles(Vec<WorkItem>),
    Person {
        results: Vec<WorkItem>,
        matched_names: Option<String>,
    },
}

/// Routes one already-normalized search query. Person queries go through the
/// credit aggregation pipeline; everything else is a single upstream search.
pub async fn dispatch(
    tmdb: &dyn TmdbApi,
    query: &str,
    page: u32,
    target: SearchTarget,
) -> Result<SearchOutcome> {
    match target {
        SearchTarget::Person => {
            let (results, matched_names) = person_credits(tmdb, query, page).await?;
            Ok(SearchOutcome::Person {
                results,
                matched_names,
            })
        }
        SearchTarget::Typed(kind) => {
            let rows = tmdb.search_titles(kind, query, page).await?;
            let results = rows
                .into_iter()
                .map(|row| {
                    let tagged = row.tagged_kind().unwrap_or(kind);
                    row.into_work_item(tagged)
                })
                .collect();
            Ok(SearchOutcome::Titles(results))
        }
        SearchTarget::Multi => {
            let rows = tmdb.search_multi(query, page).await?;
            let results = rows
                .into_iter()
                .filter_map(|row| {
                    let kind = row.tagged_kind()?;
                    row.date()?;
                    Some(row.into_work_item(kind))
                })
                .collect();
            Ok(SearchOutcome::Titles(results))
        }
    }
}

/// Builds one merged, ranked filmography page for the best person matches.
///
/// Returns the page plus the distinct matched names, or `(vec![], None)`
/// when nobody matched the query.
async fn person_credits(
    tmdb: &dyn TmdbApi,
    query: &str,
    page: u32,
) -> Result<(Vec<WorkItem>, Option<String>)> {
    let people = tmdb.search_people(query).await?;
    if people.is_empty() {
        return Ok((Vec::new(), None));
    }

    let candidates: Vec<Person> = people.into_iter().take(MAX_PEOPLE).collect();
    let label = distinct_names(&candidates);
    info!(
        "Merging credits for {} person match(es) on '{}'",
        candidates.len(),
        query
    );

    let credit_sets =
        try_join_all(candidates.iter().map(|p| tmdb.combined_credits(p.id))).await?;

    let pool = credit_pool(credit_sets);
    let ranked = rank_by_popularity(apply_vote_floor(dedupe_by_id(pool)));
    Ok((page_slice(ranked, page), Some(label)))
}

/// Cast credits plus director-only crew credits, in candidate order.
fn credit_pool(credit_sets: Vec<PersonCredits>) -> Vec<WorkItem> {
    let mut pool = Vec::new();
    for credits in credit_sets {
        for credit in credits.cast {
            if let Some(kind) = credit.row.tagged_kind() {
                pool.push(credit.row.into_work_item(kind));
            }
        }
        for credit in credits.crew {
            if credit.job.as_deref() != Some("Director") {
                continue;
            }
            if let Some(kind) = credit.row.tagged_kind() {
                pool.push(credit.row.into_work_item(kind));
            }
        }
    }
    pool
}

/// First occurrence wins, so shared credits stay with the earlier candidate.
fn dedupe_by_id(pool: Vec<WorkItem>) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    pool.into_iter()
        .filter(|item| seen.insert(item.id))
        .collect()
}

fn apply_vote_floor(pool: Vec<WorkItem>) -> Vec<WorkItem> {
    pool.into_iter()
        .filter(|item| item.vote_count > VOTE_FLOOR)
        .collect()
}

/// Stable sort; ties keep their merge order.
fn rank_by_popularity(mut pool: Vec<WorkItem>) -> Vec<WorkItem> {
    pool.sort_by(|a, b| {
        b.popularity
            .partial_cmp(&a.popularity)
            .unwrap_or(Ordering::Equal)
    });
    pool
}

fn page_slice(pool: Vec<WorkItem>, page: u32) -> Vec<WorkItem> {
    let start = (page.max(1) as usize - 1) * PAGE_SIZE;
    pool.into_iter().skip(start).take(PAGE_SIZE).collect()
}

fn distinct_names(people: &[Person]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for person in people {
        if !names.contains(&person.name.as_str()) {
            names.push(&person.name);
        }
    }
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmdb::{CreditRow, TitleRow};

    fn item(id: u64, popularity: f64, vote_count: u64) -> WorkItem {
        WorkItem {
            id,
            kind: MediaKind::Movie,
            title: format!("work-{id}"),
            popularity,
            vote_count,
            release_date: None,
            poster_path: None,
        }
    }

    fn credit(id: u64, media_type: &str, job: Option<&str>) -> CreditRow {
        CreditRow {
            row: TitleRow {
                id,
                media_type: Some(media_type.to_string()),
                title: Some(format!("work-{id}")),
                name: None,
                popularity: 1.0,
                vote_count: 100,
                release_date: None,
                first_air_date: None,
                poster_path: None,
            },
            job: job.map(str::to_string),
        }
    }

    #[test]
    fn parses_known_targets_only() {
        assert_eq!(SearchTarget::parse("multi"), Some(SearchTarget::Multi));
        assert_eq!(
            SearchTarget::parse("movie"),
            Some(SearchTarget::Typed(MediaKind::Movie))
        );
        assert_eq!(
            SearchTarget::parse("series"),
            Some(SearchTarget::Typed(MediaKind::Series))
        );
        assert_eq!(SearchTarget::parse("person"), Some(SearchTarget::Person));
        assert_eq!(SearchTarget::parse("tv"), None);
        assert_eq!(SearchTarget::parse("Movie"), None);
    }

    #[test]
    fn pool_keeps_cast_and_directed_crew_only() {
        let credits = PersonCredits {
            cast: vec![credit(1, "movie", None), credit(2, "tv", None)],
            crew: vec![
                credit(3, "movie", Some("Director")),
                credit(4, "movie", Some("Producer")),
                credit(5, "movie", None),
            ],
        };
        let pool = credit_pool(vec![credits]);
        let ids: Vec<u64> = pool.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(pool[1].kind, MediaKind::Series);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let pool = vec![item(1, 10.0, 50), item(2, 5.0, 50), item(1, 99.0, 50)];
        let deduped = dedupe_by_id(pool);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, 1);
        assert_eq!(deduped[0].popularity, 10.0);
        assert_eq!(deduped[1].id, 2);
    }

    #[test]
    fn vote_floor_is_exclusive() {
        let pool = vec![item(1, 1.0, 5), item(2, 1.0, 6), item(3, 1.0, 0)];
        let kept = apply_vote_floor(pool);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 2);
    }

    #[test]
    fn ranking_is_descending_and_stable_on_ties() {
        let pool = vec![
            item(1, 3.0, 50),
            item(2, 9.0, 50),
            item(3, 3.0, 50),
            item(4, 7.0, 50),
        ];
        let ranked = rank_by_popularity(pool);
        let ids: Vec<u64> = ranked.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn pages_are_twenty_wide_slices() {
        let pool: Vec<WorkItem> = (0..45).map(|i| item(i, 0.0, 50)).collect();
        let first = page_slice(pool.clone(), 1);
        assert_eq!(first.len(), 20);
        assert_eq!(first[0].id, 0);
        let second = page_slice(pool.clone(), 2);
        assert_eq!(second.len(), 20);
        assert_eq!(second[0].id, 20);
        let third = page_slice(pool.clone(), 3);
        assert_eq!(third.len(), 5);
        assert!(page_slice(pool, 4).is_empty());
    }

    #[test]
    fn name_label_skips_repeats_in_order() {
        let people = vec![
            Person {
                id: 1,
                name: "Ridley Scott".into(),
                popularity: 30.0,
            },
            Person {
                id: 2,
                name: "Tony Scott".into(),
                popularity: 20.0,
            },
            Person {
                id: 3,
                name: "Ridley Scott".into(),
                popularity: 1.0,
            },
        ];
        assert_eq!(distinct_names(&people), "Ridley Scott, Tony Scott");
    }
}
