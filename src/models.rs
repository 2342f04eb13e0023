use serde::Serialize;

/// Media kind as served to the front-end. TMDB spells `Series` as `tv`;
/// the client translates at that boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(MediaKind::Movie),
            "series" => Some(MediaKind::Series),
            _ => None,
        }
    }

    pub fn from_tmdb(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(MediaKind::Movie),
            "tv" => Some(MediaKind::Series),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }

    /// Path segment for TMDB endpoints (`/search/tv`, `/discover/tv`, ...).
    pub fn tmdb_path(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkItem {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub popularity: f64,
    pub vote_count: u64,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultPage {
    pub results: Vec<WorkItem>,
}

/// Person searches additionally report which name(s) the results belong to;
/// `personName` is `null` when the query matched nobody.
#[derive(Debug, Serialize)]
pub struct PersonResultPage {
    pub results: Vec<WorkItem>,
    #[serde(rename = "personName")]
    pub person_name: Option<String>,
}
