use thiserror::Error;

use crate::domain::Article;
use crate::ports::NewsPort;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NewsError {
    #[error("news source unavailable: {0}")]
    NewsUnavailable(String),
}

#[derive(Debug, Clone)]
pub struct NewsFeed<N: NewsPort> {
    source: N,
    limit: usize,
}

impl<N: NewsPort> NewsFeed<N> {
    pub fn new(source: N, limit: usize) -> Self {
        Self { source, limit }
    }

    /// Articles with both a title and a link, capped at the feed limit.
    pub async fn headlines(&self, term: &str) -> Result<Vec<Article>, NewsError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(NewsError::NewsUnavailable("empty search term".to_owned()));
        }
        let articles = self
            .source
            .articles(term)
            .await
            .map_err(|e| NewsError::NewsUnavailable(e.to_string()))?;
        Ok(articles
            .into_iter()
            .filter(|a| !a.title.trim().is_empty() && !a.url.trim().is_empty())
            .take(self.limit)
            .collect())
    }
}
