//! Decoding of the subreddit listing JSON.

use html_escape::decode_html_entities;
use serde::Deserialize;

use crate::app::FetchError;
use crate::domain::Post;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    stickied: bool,
}

impl From<PostData> for Post {
    fn from(data: PostData) -> Self {
        Self {
            permalink: data.permalink,
            title: decode_html_entities(&data.title).into_owned(),
            url: decode_html_entities(&data.url).into_owned(),
            author: data.author,
            body: decode_html_entities(&data.selftext).into_owned(),
            pinned: data.stickied,
        }
    }
}

/// Parse a listing body, dropping pinned posts and keeping upstream order.
pub fn parse_listing(body: &[u8]) -> Result<Vec<Post>, FetchError> {
    let listing: Listing = serde_json::from_slice(body)?;

    Ok(listing
        .data
        .children
        .into_iter()
        .map(|child| Post::from(child.data))
        .filter(|post| !post.pinned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::listing_json;

    #[test]
    fn test_parse_listing_keeps_order() {
        let body = listing_json(&[("/r/a/1", false), ("/r/a/2", false), ("/r/a/3", false)]);
        let posts = parse_listing(body.as_bytes()).unwrap();
        let links: Vec<_> = posts.iter().map(|p| p.permalink.as_str()).collect();
        assert_eq!(links, vec!["/r/a/1", "/r/a/2", "/r/a/3"]);
    }

    #[test]
    fn test_parse_listing_drops_pinned() {
        let body = listing_json(&[("/r/a/mod", true), ("/r/a/1", false), ("/r/a/rules", true)]);
        let posts = parse_listing(body.as_bytes()).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].permalink, "/r/a/1");
        assert!(posts.iter().all(|p| !p.pinned));
    }

    #[test]
    fn test_parse_listing_decodes_entities() {
        let body = r#"{"kind":"Listing","data":{"children":[{"kind":"t3","data":{
            "title":"Mice &amp; keyboards","url":"https://example.com/?a=1&amp;b=2",
            "author":"someone","permalink":"/r/a/1","selftext":"5 &gt; 3","stickied":false}}]}}"#;
        let posts = parse_listing(body.as_bytes()).unwrap();
        assert_eq!(posts[0].title, "Mice & keyboards");
        assert_eq!(posts[0].url, "https://example.com/?a=1&b=2");
        assert_eq!(posts[0].body, "5 > 3");
        assert_eq!(posts[0].author, "someone");
    }

    #[test]
    fn test_parse_listing_empty() {
        let posts = parse_listing(br#"{"data":{"children":[]}}"#).unwrap();
        assert!(posts.is_empty());
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        let err = parse_listing(b"<html>too many requests</html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
