//! Reddit request and response types.
//!
//! Raw types (`Raw*`, `Listing`, `Thing`) mirror just enough of Reddit's JSON
//! to deserialize it; every field is defaulted so a missing attribute never
//! fails a whole listing. The shaped types are the records handlers hand to
//! the formatter, and their field names are a stable contract.

use serde::{Deserialize, Serialize};

// ─── Query Types ─────────────────────────────────────────────────────────────

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    #[default]
    Hot,
    New,
    Top,
    Controversial,
    Rising,
}

impl Sort {
    /// Parse a sort name; anything unrecognised falls back to `Hot`.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("new") => Sort::New,
            Some("top") => Sort::Top,
            Some("controversial") => Sort::Controversial,
            Some("rising") => Sort::Rising,
            _ => Sort::Hot,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sort::Hot => "hot",
            Sort::New => "new",
            Sort::Top => "top",
            Sort::Controversial => "controversial",
            Sort::Rising => "rising",
        }
    }
}

/// Page selection shared by listing-style endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub sort: Sort,
    pub limit: u32,
    /// Fullname of the item to continue after.
    pub after: Option<String>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            sort: Sort::Hot,
            limit: 10,
            after: None,
        }
    }
}

/// Self-post submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub subreddit: String,
    pub title: String,
    pub text: String,
    pub nsfw: bool,
    pub spoiler: bool,
}

/// Vote direction accepted by `/api/vote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Clear,
    Down,
}

impl VoteDirection {
    /// Accepts `1`/`0`/`-1` and `up`/`none`/`down` spellings.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "up" | "upvote" => Some(VoteDirection::Up),
            "0" | "none" | "clear" | "unvote" => Some(VoteDirection::Clear),
            "-1" | "down" | "downvote" => Some(VoteDirection::Down),
            _ => None,
        }
    }

    pub fn as_dir(self) -> &'static str {
        match self {
            VoteDirection::Up => "1",
            VoteDirection::Clear => "0",
            VoteDirection::Down => "-1",
        }
    }
}

// ─── Raw Wire Types ──────────────────────────────────────────────────────────

/// `POST /api/v1/access_token` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Generic listing envelope: `{"kind":"Listing","data":{"children":[…]}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<Thing<T>>,
    #[serde(default)]
    pub after: Option<String>,
}

/// A `{kind, data}` pair. `kind` is the type prefix (`t1`, `t3`, `t5`, …).
#[derive(Debug, Clone, Deserialize)]
pub struct Thing<T> {
    #[serde(default)]
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPost {
    pub id: String,
    pub name: String,
    pub title: String,
    pub author: String,
    pub subreddit: String,
    pub subreddit_name_prefixed: String,
    pub url: String,
    pub thumbnail: String,
    pub num_comments: u64,
    pub score: i64,
    pub ups: i64,
    pub upvote_ratio: f64,
    pub created_utc: f64,
    pub permalink: String,
    pub selftext: String,
    pub is_self: bool,
    pub is_video: bool,
    pub is_gallery: bool,
    pub link_flair_text: Option<String>,
    pub over_18: bool,
    pub spoiler: bool,
    pub locked: bool,
    pub secure_media: Option<RawSecureMedia>,
    pub preview: Option<RawPreview>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSecureMedia {
    pub reddit_video: Option<RawVideo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawVideo {
    pub duration: u64,
    pub fallback_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPreview {
    pub images: Vec<RawPreviewImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPreviewImage {
    pub source: Option<RawImageSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawImageSource {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawComment {
    pub id: String,
    pub name: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub created_utc: f64,
    pub permalink: String,
    pub subreddit_name_prefixed: String,
    pub link_title: String,
    pub link_permalink: String,
    /// `false`, or the edit timestamp.
    pub edited: serde_json::Value,
}

/// `GET /api/v1/me`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawIdentity {
    pub name: String,
    pub id: String,
    pub total_karma: i64,
    pub link_karma: i64,
    pub comment_karma: i64,
    pub created_utc: f64,
    pub has_verified_email: bool,
    pub is_mod: bool,
    pub icon_img: String,
    pub subreddit: Option<RawProfileSubreddit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawProfileSubreddit {
    pub display_name: String,
    pub subscribers: u64,
    pub url: String,
    pub user_is_moderator: bool,
}

/// `GET /api/v1/me/karma`: `{"kind":"KarmaList","data":[…]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawKarmaList {
    #[serde(default)]
    pub data: Vec<RawKarma>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawKarma {
    pub sr: String,
    pub link_karma: i64,
    pub comment_karma: i64,
}

/// `GET /api/v1/me/trophies`: `{"kind":"TrophyList","data":{"trophies":[…]}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrophyList {
    pub data: RawTrophyListData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTrophyListData {
    pub trophies: Vec<Thing<RawTrophy>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTrophy {
    pub name: String,
    pub description: Option<String>,
    pub award_id: Option<String>,
    pub icon_70: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSubreddit {
    pub display_name: String,
    pub name: String,
    pub title: String,
    pub subscribers: u64,
    pub public_description: String,
    pub created_utc: f64,
    pub submission_type: String,
    pub user_is_subscriber: bool,
}

/// `api_type=json` envelope used by `/api/submit` and `/api/comment`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJsonEnvelope {
    pub json: RawJsonBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawJsonBody {
    /// `[[code, message, field], …]`
    pub errors: Vec<Vec<serde_json::Value>>,
    pub data: Option<RawJsonData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawJsonData {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    /// Present on comment replies.
    pub things: Vec<Thing<RawComment>>,
}

// ─── Shaped Types ────────────────────────────────────────────────────────────

/// One post from a subreddit listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub title: String,
    pub author: String,
    pub subreddit: String,
    pub url: String,
    pub thumbnail: String,
    pub num_comments: u64,
    pub score: i64,
    pub created_utc: f64,
    pub permalink: String,
    pub selftext: String,
    pub is_self: bool,
    pub is_video: bool,
    pub is_gallery: bool,
    pub thing_id: String,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub subreddit: String,
    pub author: String,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: u64,
    pub flair: String,
    pub url: String,
    pub permalink: String,
    pub created_utc: f64,
    pub media: Option<VideoMedia>,
    pub thumbnail: Option<Thumbnail>,
    pub thing_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMedia {
    pub r#type: &'static str,
    pub duration: u64,
    pub video_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// One of the authenticated user's own submissions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPost {
    pub title: String,
    pub subreddit: String,
    pub post_id: String,
    pub permalink: String,
    pub score: i64,
    pub upvotes: i64,
    pub upvote_ratio: f64,
    pub num_comments: u64,
    pub flair: String,
    pub nsfw: bool,
    pub spoiler: bool,
    pub locked: bool,
    pub created_utc: String,
}

/// One of the authenticated user's own comments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserComment {
    pub comment_id: String,
    pub body: String,
    pub subreddit: String,
    pub score: i64,
    pub permalink: String,
    pub post_title: String,
    pub post_permalink: String,
    pub created_utc: String,
    pub edited: bool,
}

/// Profile of the authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInfo {
    pub username: String,
    pub user_id: String,
    pub total_karma: i64,
    pub link_karma: i64,
    pub comment_karma: i64,
    pub created_utc: String,
    pub has_verified_email: bool,
    pub is_mod: bool,
    pub profile_icon: String,
    pub profile: Option<ProfileSubreddit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSubreddit {
    pub name: String,
    pub subscribers: u64,
    pub url: String,
    pub is_moderator: bool,
}

/// Karma earned in one subreddit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KarmaEntry {
    pub subreddit: String,
    pub link_karma: i64,
    pub comment_karma: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trophy {
    pub name: String,
    pub description: Option<String>,
    pub award_id: Option<String>,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscribedSubreddit {
    pub name: String,
    pub thing_id: String,
    pub title: String,
    pub subscribers: u64,
    pub description: String,
    pub created: String,
    pub submission_type: String,
    pub user_is_subscriber: bool,
}

/// One top-level comment under a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostComment {
    pub author: String,
    pub body: String,
    pub score: i64,
    pub created_utc: f64,
    pub thing_id: String,
    pub permalink: String,
}

/// Outcome of a write (submit, comment, vote).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub success: bool,
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub errors: Vec<String>,
}

// ─── Shaping ─────────────────────────────────────────────────────────────────

const WEB_BASE: &str = "https://www.reddit.com";

fn absolute(permalink: &str) -> String {
    if permalink.is_empty() || permalink.starts_with("http") {
        permalink.to_string()
    } else {
        format!("{WEB_BASE}{permalink}")
    }
}

fn fullname(kind: &str, id: &str) -> String {
    if kind.is_empty() {
        id.to_string()
    } else {
        format!("{kind}_{id}")
    }
}

/// RFC 3339 rendering of a Reddit epoch-seconds float.
pub fn utc_rfc3339(secs: f64) -> String {
    chrono::DateTime::from_timestamp(secs as i64, 0)
        .map(|d| d.to_rfc3339())
        .unwrap_or_default()
}

pub fn shape_subreddit_posts(listing: Listing<RawPost>) -> Vec<PostSummary> {
    listing
        .data
        .children
        .into_iter()
        .map(|Thing { kind, data: p }| PostSummary {
            thing_id: fullname(&kind, &p.id),
            title: p.title,
            author: p.author,
            subreddit: p.subreddit_name_prefixed,
            url: p.url,
            thumbnail: p.thumbnail,
            num_comments: p.num_comments,
            score: p.score,
            created_utc: p.created_utc,
            permalink: absolute(&p.permalink),
            selftext: p.selftext,
            is_self: p.is_self,
            is_video: p.is_video,
            is_gallery: p.is_gallery,
        })
        .collect()
}

pub fn shape_search_results(listing: Listing<RawPost>) -> Vec<SearchResult> {
    listing
        .data
        .children
        .into_iter()
        .map(|Thing { kind, data: p }| {
            let media = p
                .secure_media
                .as_ref()
                .and_then(|m| m.reddit_video.as_ref())
                .map(|v| VideoMedia {
                    r#type: "video",
                    duration: v.duration,
                    video_url: v.fallback_url.clone(),
                });
            let thumbnail = p
                .preview
                .as_ref()
                .and_then(|pv| pv.images.first())
                .and_then(|img| img.source.as_ref())
                .map(|src| Thumbnail {
                    url: src.url.replace("&amp;", "&"),
                    width: p.thumbnail_width.unwrap_or(0),
                    height: p.thumbnail_height.unwrap_or(0),
                });
            SearchResult {
                thing_id: fullname(&kind, &p.id),
                title: p.title,
                subreddit: p.subreddit,
                author: p.author,
                score: p.score,
                upvote_ratio: p.upvote_ratio,
                num_comments: p.num_comments,
                flair: p.link_flair_text.unwrap_or_default(),
                url: p.url,
                permalink: absolute(&p.permalink),
                created_utc: p.created_utc,
                media,
                thumbnail,
            }
        })
        .collect()
}

pub fn shape_user_posts(listing: Listing<RawPost>) -> Vec<UserPost> {
    listing
        .data
        .children
        .into_iter()
        .map(|Thing { data: p, .. }| UserPost {
            title: p.title,
            subreddit: p.subreddit_name_prefixed,
            post_id: p.name,
            permalink: absolute(&p.permalink),
            score: p.score,
            upvotes: p.ups,
            upvote_ratio: p.upvote_ratio,
            num_comments: p.num_comments,
            flair: p.link_flair_text.unwrap_or_else(|| "None".into()),
            nsfw: p.over_18,
            spoiler: p.spoiler,
            locked: p.locked,
            created_utc: utc_rfc3339(p.created_utc),
        })
        .collect()
}

pub fn shape_user_comments(listing: Listing<RawComment>) -> Vec<UserComment> {
    listing
        .data
        .children
        .into_iter()
        .map(|Thing { data: c, .. }| UserComment {
            comment_id: c.name,
            body: c.body,
            subreddit: c.subreddit_name_prefixed,
            score: c.score,
            permalink: absolute(&c.permalink),
            post_title: c.link_title,
            post_permalink: absolute(&c.link_permalink),
            created_utc: utc_rfc3339(c.created_utc),
            edited: !matches!(c.edited, serde_json::Value::Bool(false) | serde_json::Value::Null),
        })
        .collect()
}

pub fn shape_user_info(me: RawIdentity) -> UserInfo {
    UserInfo {
        created_utc: utc_rfc3339(me.created_utc),
        profile: me.subreddit.map(|s| ProfileSubreddit {
            name: s.display_name,
            subscribers: s.subscribers,
            url: absolute(&s.url),
            is_moderator: s.user_is_moderator,
        }),
        username: me.name,
        user_id: me.id,
        total_karma: me.total_karma,
        link_karma: me.link_karma,
        comment_karma: me.comment_karma,
        has_verified_email: me.has_verified_email,
        is_mod: me.is_mod,
        profile_icon: me.icon_img,
    }
}

pub fn shape_karma(list: RawKarmaList) -> Vec<KarmaEntry> {
    list.data
        .into_iter()
        .map(|k| KarmaEntry {
            subreddit: k.sr,
            link_karma: k.link_karma,
            comment_karma: k.comment_karma,
        })
        .collect()
}

pub fn shape_trophies(list: RawTrophyList) -> Vec<Trophy> {
    list.data
        .trophies
        .into_iter()
        .map(|Thing { data: t, .. }| Trophy {
            name: t.name,
            description: t.description,
            award_id: t.award_id,
            icon: t.icon_70,
        })
        .collect()
}

pub fn shape_subscribed(listing: Listing<RawSubreddit>) -> Vec<SubscribedSubreddit> {
    listing
        .data
        .children
        .into_iter()
        .map(|Thing { data: s, .. }| SubscribedSubreddit {
            name: s.display_name,
            thing_id: s.name,
            title: s.title,
            subscribers: s.subscribers,
            description: s.public_description,
            created: utc_rfc3339(s.created_utc),
            submission_type: s.submission_type,
            user_is_subscriber: s.user_is_subscriber,
        })
        .collect()
}

/// Shape the comment tree of `GET /r/{sub}/comments/{id}`.
///
/// The endpoint returns `[post_listing, comment_listing]`; only top-level
/// `t1` children of the second listing are kept (the trailing `more`
/// placeholder is dropped).
pub fn shape_post_comments(listings: Vec<Listing<RawComment>>) -> Vec<PostComment> {
    listings
        .into_iter()
        .nth(1)
        .map(|l| l.data.children)
        .unwrap_or_default()
        .into_iter()
        .filter(|t| t.kind == "t1")
        .map(|Thing { kind, data: c }| PostComment {
            thing_id: fullname(&kind, &c.id),
            author: c.author,
            body: c.body,
            score: c.score,
            created_utc: c.created_utc,
            permalink: absolute(&c.permalink),
        })
        .collect()
}

/// Shape an `api_type=json` write response.
pub fn shape_submission(envelope: RawJsonEnvelope) -> SubmissionResult {
    let errors: Vec<String> = envelope
        .json
        .errors
        .iter()
        .map(|e| {
            e.iter()
                .filter_map(|part| part.as_str())
                .collect::<Vec<_>>()
                .join(": ")
        })
        .collect();

    let data = envelope.json.data.unwrap_or_default();
    let comment = data.things.into_iter().next().map(|t| t.data);

    SubmissionResult {
        success: errors.is_empty(),
        id: data.id.or_else(|| comment.as_ref().map(|c| c.id.clone())),
        name: data.name.or_else(|| comment.as_ref().map(|c| c.name.clone())),
        url: data
            .url
            .or_else(|| comment.as_ref().map(|c| absolute(&c.permalink))),
        errors,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
