//! Filtering and calendar bucketing over post listings.
//!
//! Calendar days are UTC days.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use shared_http::api::{Platform, Post, PostStatus};
use std::collections::{BTreeMap, HashMap};

/// The instant a post sits at on the calendar.
///
/// Published posts use their publish time, everything else its scheduled
/// time, falling back to creation.
pub fn calendar_date(post: &Post) -> Option<DateTime<Utc>> {
    let published = match post.status {
        PostStatus::Published => post.published_at,
        _ => None,
    };
    published.or(post.scheduled_date).or(post.created_at)
}

/// Narrowing applied to a post listing. The default filter matches every post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    pub statuses: Vec<PostStatus>,
    pub platforms: Vec<Platform>,
    pub hashtag: Option<String>,
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl PostFilter {
    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platforms.push(platform);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_hashtag(mut self, tag: impl Into<String>) -> Self {
        self.hashtag = Some(tag.into());
        self
    }

    /// Inclusive range on [`calendar_date`]; either end may be open.
    pub fn between(mut self, from: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.until = until;
        self
    }

    pub fn matches(&self, post: &Post) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&post.status) {
            return false;
        }

        // posts that target no platform are never filtered out by platform
        if !self.platforms.is_empty()
            && !post.platforms.is_empty()
            && !post.platforms.iter().any(|p| self.platforms.contains(p))
        {
            return false;
        }

        if let Some(tag) = non_blank(&self.hashtag) {
            if !post.hashtags.iter().any(|h| contains_ignore_case(h, tag)) {
                return false;
            }
        }

        if let Some(term) = non_blank(&self.search) {
            let in_content = contains_ignore_case(&post.content, term);
            if !in_content && !post.hashtags.iter().any(|h| contains_ignore_case(h, term)) {
                return false;
            }
        }

        if self.from.is_some() || self.until.is_some() {
            let Some(date) = calendar_date(post) else {
                return false;
            };
            if self.from.is_some_and(|from| date < from) || self.until.is_some_and(|until| date > until) {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(&self, posts: &'a [Post]) -> Vec<&'a Post> {
        posts.iter().filter(|p| self.matches(p)).collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Posts matching `filter` that fall on `day`.
pub fn posts_for_date<'a>(posts: &'a [Post], day: NaiveDate, filter: &PostFilter) -> Vec<&'a Post> {
    posts
        .iter()
        .filter(|p| filter.matches(p))
        .filter(|p| calendar_date(p).is_some_and(|d| d.date_naive() == day))
        .collect()
}

/// Group matching posts by calendar day. Undated posts are left out.
pub fn bucket_by_day<'a>(posts: &'a [Post], filter: &PostFilter) -> BTreeMap<NaiveDate, Vec<&'a Post>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<&'a Post>> = BTreeMap::new();
    for post in posts.iter().filter(|p| filter.matches(p)) {
        if let Some(date) = calendar_date(post) {
            buckets.entry(date.date_naive()).or_default().push(post);
        }
    }
    buckets
}

/// Sunday-first weeks covering the month that contains `day`.
pub fn month_grid(day: NaiveDate) -> Vec<[NaiveDate; 7]> {
    let first = day.with_day(1).unwrap_or(day);
    let days_in_month = days_in_month(first);
    let last = first + Days::new(u64::from(days_in_month) - 1);

    let mut start = week_start(first);
    let mut weeks = Vec::with_capacity(6);
    while start <= last {
        let mut week = [start; 7];
        for (offset, slot) in week.iter_mut().enumerate() {
            *slot = start + Days::new(offset as u64);
        }
        weeks.push(week);
        start = start + Days::new(7);
    }
    weeks
}

/// The Sunday on or before `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Days::new(u64::from(day.weekday().num_days_from_sunday()))
}

fn days_in_month(first: NaiveDate) -> u32 {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next.map(|n| (n - first).num_days() as u32).unwrap_or(31)
}

pub fn status_counts(posts: &[Post]) -> HashMap<PostStatus, usize> {
    let mut counts = HashMap::new();
    for post in posts {
        *counts.entry(post.status).or_default() += 1;
    }
    counts
}

/// Scheduled posts still ahead of `now`, soonest first.
pub fn upcoming(posts: &[Post], now: DateTime<Utc>) -> Vec<&Post> {
    let mut ahead: Vec<&Post> = posts
        .iter()
        .filter(|p| p.status == PostStatus::Scheduled)
        .filter(|p| p.scheduled_date.is_some_and(|d| d > now))
        .collect();
    ahead.sort_by_key(|p| p.scheduled_date);
    ahead
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, post};

    fn scheduled(id: &str, day: u32, hour: u32) -> Post {
        let mut p = post(id, PostStatus::Scheduled);
        p.scheduled_date = Some(at(day, hour));
        p
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    #[test]
    fn test_calendar_date_precedence() {
        let mut p = post("p", PostStatus::Published);
        p.created_at = Some(at(1, 8));
        assert_eq!(calendar_date(&p), Some(at(1, 8)));

        p.scheduled_date = Some(at(2, 9));
        assert_eq!(calendar_date(&p), Some(at(2, 9)));

        p.published_at = Some(at(3, 10));
        assert_eq!(calendar_date(&p), Some(at(3, 10)));

        // a publish time is ignored unless the post is published
        p.status = PostStatus::Failed;
        assert_eq!(calendar_date(&p), Some(at(2, 9)));
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let posts = vec![post("a", PostStatus::Draft), scheduled("b", 4, 9)];
        assert_eq!(PostFilter::default().apply(&posts).len(), 2);
    }

    #[test]
    fn test_platform_filter_keeps_untargeted_posts() {
        let mut untargeted = post("none", PostStatus::Draft);
        untargeted.platforms.clear();
        let mut tweet = post("tw", PostStatus::Draft);
        tweet.platforms = vec![Platform::Twitter];
        let posts = vec![post("ig", PostStatus::Draft), tweet, untargeted];

        let filter = PostFilter::default().with_platform(Platform::Instagram);
        let ids: Vec<_> = filter.apply(&posts).iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["ig", "none"]);
    }

    #[test]
    fn test_search_and_hashtag_ignore_case() {
        let mut launch = post("launch", PostStatus::Draft);
        launch.content = "Spring LAUNCH is here".to_string();
        launch.hashtags = vec!["#NewIn".to_string()];
        let posts = vec![launch, post("other", PostStatus::Draft)];

        assert_eq!(PostFilter::default().with_search("launch").apply(&posts).len(), 1);
        assert_eq!(PostFilter::default().with_search("newin").apply(&posts).len(), 1);
        assert_eq!(PostFilter::default().with_hashtag("NEW").apply(&posts).len(), 1);
        assert_eq!(PostFilter::default().with_hashtag("sale").apply(&posts).len(), 0);
        assert_eq!(PostFilter::default().with_search("  ").apply(&posts).len(), 2);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let posts = vec![scheduled("a", 2, 9), scheduled("b", 5, 9), post("undated", PostStatus::Draft)];
        let filter = PostFilter::default().between(Some(at(2, 9)), Some(at(4, 0)));
        let ids: Vec<_> = filter.apply(&posts).iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_status_filter_with_day_lookup() {
        let mut failed = scheduled("f", 4, 15);
        failed.status = PostStatus::Failed;
        let posts = vec![scheduled("a", 4, 9), failed, scheduled("c", 5, 9)];

        assert_eq!(posts_for_date(&posts, date(4), &PostFilter::default()).len(), 2);
        let only_failed = PostFilter::default().with_status(PostStatus::Failed);
        let hits = posts_for_date(&posts, date(4), &only_failed);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "f");
    }

    #[test]
    fn test_bucket_by_day() {
        let posts = vec![
            scheduled("a", 4, 9),
            scheduled("b", 4, 18),
            scheduled("c", 10, 9),
            post("undated", PostStatus::Draft),
        ];
        let buckets = bucket_by_day(&posts, &PostFilter::default());
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[&date(4)].len(), 2);
        assert_eq!(buckets[&date(10)][0].id, "c");
    }

    #[test]
    fn test_month_grid_starts_on_sunday() {
        // March 2026 starts on a Sunday and ends on a Tuesday
        let grid = month_grid(date(17));
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[0][0], date(1));
        assert_eq!(grid[4][2], date(31));
        assert_eq!(grid[4][6], NaiveDate::from_ymd_opt(2026, 4, 4).unwrap());

        // February 2026 starts on a Sunday and fills exactly four weeks
        let february = month_grid(NaiveDate::from_ymd_opt(2026, 2, 14).unwrap());
        assert_eq!(february.len(), 4);
        assert_eq!(week_start(date(4)), date(1));
    }

    #[test]
    fn test_status_counts() {
        let posts = vec![
            post("a", PostStatus::Draft),
            post("b", PostStatus::Draft),
            post("c", PostStatus::Published),
        ];
        let counts = status_counts(&posts);
        assert_eq!(counts[&PostStatus::Draft], 2);
        assert_eq!(counts.get(&PostStatus::Scheduled), None);
    }

    #[test]
    fn test_upcoming_sorted_and_future_only() {
        let posts = vec![scheduled("late", 20, 9), scheduled("past", 1, 9), scheduled("soon", 6, 9)];
        let ids: Vec<_> = upcoming(&posts, at(5, 0)).iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["soon", "late"]);
    }
}
