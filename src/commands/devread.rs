//! `/devread` — developer article search with a TTL cache in front of the
//! lookup service.
//!
//! Whitelisted topics are served from the cache while fresh; everything
//! else (and cache misses) goes to the lookup service. Successful lookups
//! are truncated and cached for the configured TTL.

use std::collections::HashMap;
use std::time::Duration;

use rand::seq::SliceRandom;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::bot::AppState;
use crate::cache::TtlCache;
use crate::error::{BotError, Result};
use crate::lookup::{Article, ArticleLookup};
use crate::utils::{render_template, ARTICLE_TEMPLATE};

/// Topics popular enough to be worth caching.
const TOPIC_WHITELIST: [&str; 6] = ["javascript", "php", "go", "c", "typescript", "python"];

/// How many articles go into one reply.
const SAMPLE_SIZE: usize = 3;

/// Per-article truncation applied before caching, so the cache file stays
/// small.
const MAX_CACHED_TITLE_LEN: usize = 50;
const MAX_CACHED_BODY_LEN: usize = 300;

const USAGE_TEXT: &str =
    "Usage: /devread &lt;topic&gt;\n\nExample: <code>/devread javascript</code>";
const NOT_FOUND_TEXT: &str = "Nothing found. Try another keyword.";
const LOOKUP_DOWN_TEXT: &str = "The article service is not reachable right now. Try again later.";

/// What the handler decided to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DevreadReply {
    Usage,
    NotFound,
    Articles(String),
}

/// Handle one `/devread` invocation end to end.
pub async fn handle(bot: &Bot, chat_id: ChatId, raw_query: &str, state: &AppState) -> Result<()> {
    let reply = match build_reply(raw_query, &state.cache, state.lookup.as_ref(), state.cache_ttl)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "devread lookup failed");
            bot.send_message(chat_id, LOOKUP_DOWN_TEXT).await?;
            return Ok(());
        }
    };
    let text = match reply {
        DevreadReply::Usage => USAGE_TEXT.to_string(),
        DevreadReply::NotFound => NOT_FOUND_TEXT.to_string(),
        DevreadReply::Articles(text) => text,
    };
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Decide what to reply, consulting the cache and the lookup service.
/// Separated from [`handle`] so tests can drive it without a Telegram
/// connection.
pub(crate) async fn build_reply(
    raw_query: &str,
    cache: &Mutex<TtlCache>,
    lookup: &dyn ArticleLookup,
    cache_ttl: Duration,
) -> Result<DevreadReply> {
    let query = raw_query.trim().to_lowercase();
    if query.is_empty() {
        return Ok(DevreadReply::Usage);
    }

    let cache_key = format!("devread:{query}");
    if TOPIC_WHITELIST.contains(&query.as_str()) {
        if let Some(raw) = cache.lock().await.get(&cache_key) {
            match serde_json::from_str::<Vec<Article>>(&raw) {
                Ok(articles) if !articles.is_empty() => {
                    debug!(query, "devread served from cache");
                    return Ok(DevreadReply::Articles(render_articles(&articles)));
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "discarding undecodable devread cache entry"),
            }
        }
    }

    let articles = lookup.search(&query).await?;
    if articles.is_empty() {
        return Ok(DevreadReply::NotFound);
    }
    let text = render_articles(&articles);

    // Cache a truncated copy of every successful lookup; only whitelisted
    // topics are ever read back, so the rest just ages out.
    let stored: Vec<Article> = articles.iter().map(truncate_article).collect();
    let payload =
        serde_json::to_string(&stored).map_err(|e| BotError::Cache(e.to_string()))?;
    cache.lock().await.put(cache_key, payload, cache_ttl);

    Ok(DevreadReply::Articles(text))
}

/// Render a random sample of articles as HTML, one template block each.
fn render_articles(articles: &[Article]) -> String {
    let mut rng = rand::thread_rng();
    articles
        .choose_multiple(&mut rng, SAMPLE_SIZE)
        .map(|article| {
            let fields: HashMap<&str, String> = HashMap::from([
                ("title", article.title.clone()),
                ("body", article.body.clone()),
                ("url", article.url.clone()),
            ]);
            render_template(ARTICLE_TEMPLATE, &fields)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate_article(article: &Article) -> Article {
    Article {
        title: truncate_with_ellipsis(&article.title, MAX_CACHED_TITLE_LEN),
        body: truncate_with_ellipsis(&article.body, MAX_CACHED_BODY_LEN),
        url: article.url.clone(),
    }
}

/// Truncate to `max` characters, ending with `...` when shortened.
fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::MockArticleLookup;
    use mockall::predicate::eq;

    fn article(title: &str) -> Article {
        Article {
            title: title.to_string(),
            body: format!("about {title}"),
            url: format!("https://reads.example.com/{title}"),
        }
    }

    fn temp_cache(dir: &tempfile::TempDir) -> Mutex<TtlCache> {
        Mutex::new(TtlCache::open(dir.path().join("cache.json"), 50))
    }

    const TTL: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_empty_query_yields_usage() {
        let dir = tempfile::tempdir().unwrap();
        let cache = temp_cache(&dir);
        let mut lookup = MockArticleLookup::new();
        lookup.expect_search().times(0);
        let reply = build_reply("   ", &cache, &lookup, TTL).await.unwrap();
        assert_eq!(reply, DevreadReply::Usage);
    }

    #[tokio::test]
    async fn test_empty_result_yields_not_found_and_caches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = temp_cache(&dir);
        let mut lookup = MockArticleLookup::new();
        lookup
            .expect_search()
            .with(eq("zig"))
            .times(1)
            .returning(|_| Ok(vec![]));
        let reply = build_reply("Zig", &cache, &lookup, TTL).await.unwrap();
        assert_eq!(reply, DevreadReply::NotFound);
        assert!(cache.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_success_renders_and_caches_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = temp_cache(&dir);
        let long_title = "t".repeat(80);
        let articles = vec![
            Article {
                title: long_title.clone(),
                body: "b".repeat(400),
                url: "https://reads.example.com/1".into(),
            },
            article("two"),
        ];
        let mut lookup = MockArticleLookup::new();
        let returned = articles.clone();
        lookup
            .expect_search()
            .with(eq("python"))
            .times(1)
            .returning(move |_| Ok(returned.clone()));

        let reply = build_reply("python", &cache, &lookup, TTL).await.unwrap();
        let DevreadReply::Articles(text) = reply else {
            panic!("expected articles");
        };
        assert!(text.contains("<a href="));

        let raw = cache.lock().await.get("devread:python").unwrap();
        let stored: Vec<Article> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].title.chars().count(), 49 + 3);
        assert!(stored[0].title.ends_with("..."));
        assert_eq!(stored[0].body.chars().count(), 299 + 3);
        // Short fields are stored untouched.
        assert_eq!(stored[1].title, "two");
    }

    #[tokio::test]
    async fn test_whitelisted_topic_served_from_cache_without_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = temp_cache(&dir);
        let payload = serde_json::to_string(&vec![article("go")]).unwrap();
        cache
            .lock()
            .await
            .put("devread:go".into(), payload, TTL);
        let mut lookup = MockArticleLookup::new();
        lookup.expect_search().times(0);

        let reply = build_reply("Go", &cache, &lookup, TTL).await.unwrap();
        assert!(matches!(reply, DevreadReply::Articles(_)));
    }

    #[tokio::test]
    async fn test_non_whitelisted_topic_skips_cache_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = temp_cache(&dir);
        // A cached entry exists, but "rust" is not whitelisted, so the
        // lookup must still be called.
        let payload = serde_json::to_string(&vec![article("rust")]).unwrap();
        cache
            .lock()
            .await
            .put("devread:rust".into(), payload, TTL);
        let mut lookup = MockArticleLookup::new();
        lookup
            .expect_search()
            .with(eq("rust"))
            .times(1)
            .returning(|_| Ok(vec![article("rust")]));

        let reply = build_reply("rust", &cache, &lookup, TTL).await.unwrap();
        assert!(matches!(reply, DevreadReply::Articles(_)));
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_falls_back_to_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = temp_cache(&dir);
        cache
            .lock()
            .await
            .put("devread:go".into(), "{not json".into(), TTL);
        let mut lookup = MockArticleLookup::new();
        lookup
            .expect_search()
            .times(1)
            .returning(|_| Ok(vec![article("go")]));

        let reply = build_reply("go", &cache, &lookup, TTL).await.unwrap();
        assert!(matches!(reply, DevreadReply::Articles(_)));
    }

    #[tokio::test]
    async fn test_lookup_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = temp_cache(&dir);
        let mut lookup = MockArticleLookup::new();
        lookup
            .expect_search()
            .times(1)
            .returning(|_| Err(BotError::Lookup("boom".into())));
        let err = build_reply("go", &cache, &lookup, TTL).await.unwrap_err();
        assert!(matches!(err, BotError::Lookup(_)));
    }

    #[test]
    fn test_render_articles_samples_at_most_three() {
        let articles: Vec<Article> = (0..10).map(|i| article(&format!("a{i}"))).collect();
        let text = render_articles(&articles);
        assert_eq!(text.matches("<a href=").count(), SAMPLE_SIZE);
    }

    #[test]
    fn test_render_articles_escapes_html() {
        let articles = vec![Article {
            title: "<script>".into(),
            body: "a & b".into(),
            url: "https://reads.example.com".into(),
        }];
        let text = render_articles(&articles);
        assert!(text.contains("&lt;script&gt;"));
        assert!(text.contains("a &amp; b"));
        assert!(!text.contains("<script>"));
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 50), "short");
        let long = "x".repeat(60);
        let truncated = truncate_with_ellipsis(&long, 50);
        assert_eq!(truncated.chars().count(), 52);
        assert!(truncated.ends_with("..."));
    }
}
