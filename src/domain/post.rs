use serde::{Deserialize, Serialize};

const REDDIT_BASE: &str = "https://www.reddit.com";

/// A single listing entry. The permalink is the stable dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub permalink: String,
    pub title: String,
    pub url: String,
    pub author: String,
    pub body: String,
    pub pinned: bool,
}

impl Post {
    pub fn new(permalink: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            permalink: permalink.into(),
            title: title.into(),
            url: String::new(),
            author: String::new(),
            body: String::new(),
            pinned: false,
        }
    }

    /// Absolute link to the comment thread, if the post has a permalink.
    pub fn discussion_url(&self) -> Option<String> {
        if self.permalink.is_empty() {
            None
        } else {
            Some(format!("{}{}", REDDIT_BASE, self.permalink))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discussion_url() {
        let post = Post::new("/r/rust/comments/abc/hello/", "Hello");
        assert_eq!(
            post.discussion_url().as_deref(),
            Some("https://www.reddit.com/r/rust/comments/abc/hello/")
        );
    }

    #[test]
    fn test_discussion_url_without_permalink() {
        let post = Post::new("", "Hello");
        assert_eq!(post.discussion_url(), None);
    }
}
