use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::limiter::RequestGate;
use crate::models::{MediaKind, WorkItem};

const TMDB_BASE: &str = "https://api.themoviedb.org/3";

// TMDB allows roughly 50 requests per second per key; ten in flight with
// 21ms between dispatches keeps every caller under that together.
const MAX_IN_FLIGHT: usize = 10;
const MIN_SPACING: Duration = Duration::from_millis(21);

#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub api_key: String,
    pub base_url: String,
}

impl TmdbConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
        Ok(Self {
            api_key,
            base_url: TMDB_BASE.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    gate: RequestGate,
    api_key: String,
    base_url: String,
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn search_multi(&self, query: &str, page: u32) -> Result<Vec<TitleRow>>;
    async fn search_titles(&self, kind: MediaKind, query: &str, page: u32)
        -> Result<Vec<TitleRow>>;
    async fn search_people(&self, query: &str) -> Result<Vec<Person>>;
    async fn combined_credits(&self, person_id: u64) -> Result<PersonCredits>;
    async fn discover(&self, kind: MediaKind, page: u32, genre: Option<u32>)
        -> Result<Vec<TitleRow>>;
    async fn details(&self, kind: MediaKind, id: u64) -> Result<serde_json::Value>;
}

/// Raw list-endpoint row. Movies carry `title`/`release_date`, series carry
/// `name`/`first_air_date`; `media_type` is only present on multi search and
/// combined credits.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleRow {
    pub id: u64,
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_count: u64,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
}

impl TitleRow {
    pub fn tagged_kind(&self) -> Option<MediaKind> {
        self.media_type.as_deref().and_then(MediaKind::from_tmdb)
    }

    /// Release or first-air date; TMDB sends empty strings for unknown dates.
    pub fn date(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .filter(|d| !d.is_empty())
            .or_else(|| self.first_air_date.as_deref().filter(|d| !d.is_empty()))
    }

    pub fn into_work_item(self, kind: MediaKind) -> WorkItem {
        let release_date = self.date().map(str::to_string);
        WorkItem {
            id: self.id,
            kind,
            title: self.title.or(self.name).unwrap_or_default(),
            popularity: self.popularity,
            vote_count: self.vote_count,
            release_date,
            poster_path: self.poster_path,
        }
    }
}

/// Combined-credits row: a title row plus the crew job when present.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditRow {
    #[serde(flatten)]
    pub row: TitleRow,
    pub job: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonCredits {
    #[serde(default)]
    pub cast: Vec<CreditRow>,
    #[serde(default)]
    pub crew: Vec<CreditRow>,
}

/// Person-search row; upstream orders these by popularity already.
#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub popularity: f64,
}

#[derive(Debug, Deserialize)]
struct ResultsEnvelope<T> {
    // Path form keeps serde from requiring `T: Default` for the list default.
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

impl TmdbClient {
    pub fn new(config: TmdbConfig) -> Result<Self> {
        let user_agent = format!("cinegate/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            gate: RequestGate::new(MAX_IN_FLIGHT, MIN_SPACING),
            api_key: config.api_key,
            base_url: config.base_url,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(TmdbConfig::from_env()?)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let _pass = self.gate.admit().await?;
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("TMDB returned {}: {}", status, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_multi(&self, query: &str, page: u32) -> Result<Vec<TitleRow>> {
        let url = format!(
            "{}/search/multi?api_key={}&query={}&language=en-US&include_adult=false&page={}",
            self.base_url,
            self.api_key,
            urlencoding::encode(query),
            page
        );
        let data: ResultsEnvelope<TitleRow> = self.get_json(&url).await?;
        Ok(data.results)
    }

    async fn search_titles(
        &self,
        kind: MediaKind,
        query: &str,
        page: u32,
    ) -> Result<Vec<TitleRow>> {
        let url = format!(
            "{}/search/{}?api_key={}&query={}&language=en-US&include_adult=false&page={}",
            self.base_url,
            kind.tmdb_path(),
            self.api_key,
            urlencoding::encode(query),
            page
        );
        let data: ResultsEnvelope<TitleRow> = self.get_json(&url).await?;
        Ok(data.results)
    }

    async fn search_people(&self, query: &str) -> Result<Vec<Person>> {
        let url = format!(
            "{}/search/person?api_key={}&query={}&language=en-US&include_adult=false",
            self.base_url,
            self.api_key,
            urlencoding::encode(query)
        );
        let data: ResultsEnvelope<Person> = self.get_json(&url).await?;
        Ok(data.results)
    }

    async fn combined_credits(&self, person_id: u64) -> Result<PersonCredits> {
        let url = format!(
            "{}/person/{}/combined_credits?api_key={}&language=en-US",
            self.base_url, person_id, self.api_key
        );
        self.get_json(&url).await
    }

    async fn discover(
        &self,
        kind: MediaKind,
        page: u32,
        genre: Option<u32>,
    ) -> Result<Vec<TitleRow>> {
        let mut url = format!(
            "{}/discover/{}?api_key={}&language=en-US&sort_by=popularity.desc&include_adult=false&page={}",
            self.base_url,
            kind.tmdb_path(),
            self.api_key,
            page
        );
        if let Some(genre) = genre {
            url.push_str(&format!("&with_genres={}", genre));
        }
        let data: ResultsEnvelope<TitleRow> = self.get_json(&url).await?;
        Ok(data.results)
    }

    async fn details(&self, kind: MediaKind, id: u64) -> Result<serde_json::Value> {
        let append = match kind {
            MediaKind::Movie => "credits,release_dates,videos,images",
            MediaKind::Series => "credits,content_ratings,videos,images",
        };
        let url = format!(
            "{}/{}/{}?api_key={}&language=en-US&append_to_response={}&include_image_language=en,null",
            self.base_url,
            kind.tmdb_path(),
            id,
            self.api_key,
            append
        );
        self.get_json(&url).await
    }
}
