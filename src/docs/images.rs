//! Inline image reference rewriting.
//!
//! Knowledge-base exports reference images by bare filename, e.g.
//! `![screenshot](dashboard.png)`. Before a document reaches the generator we
//! look up the page's image blocks and swap each filename for a resolvable
//! URL. Lookup failure leaves the content untouched; a broken image link is
//! better than a dropped document.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{extract_page_hash, Document};
use crate::core::errors::ApiError;

/// Page-based knowledge source that can list image resources by page id.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Map of image file name -> resolvable URL for the given page.
    async fn image_urls(&self, page_id: &str) -> Result<HashMap<String, String>, ApiError>;
}

/// `ImageSource` that never finds anything; used when no page provider is
/// configured.
pub struct NoopImageSource;

#[async_trait]
impl ImageSource for NoopImageSource {
    async fn image_urls(&self, _page_id: &str) -> Result<HashMap<String, String>, ApiError> {
        Ok(HashMap::new())
    }
}

/// Notion block-children API client (paginated).
pub struct NotionImageSource {
    api_key: String,
    client: Client,
}

impl NotionImageSource {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ImageSource for NotionImageSource {
    async fn image_urls(&self, page_id: &str) -> Result<HashMap<String, String>, ApiError> {
        let mut urls = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut url = format!(
                "https://api.notion.com/v1/blocks/{}/children?page_size=100",
                page_id
            );
            if let Some(c) = &cursor {
                url.push_str(&format!("&start_cursor={}", urlencoding::encode(c)));
            }

            let res = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .header("Notion-Version", "2022-06-28")
                .send()
                .await
                .map_err(ApiError::upstream)?;

            if !res.status().is_success() {
                return Err(ApiError::Upstream(format!(
                    "block listing failed for page {}: {}",
                    page_id,
                    res.status()
                )));
            }

            let payload: Value = res.json().await.map_err(ApiError::upstream)?;
            for block in payload["results"].as_array().unwrap_or(&Vec::new()) {
                if block["type"].as_str() != Some("image") {
                    continue;
                }
                let image_url = block["image"]["file"]["url"]
                    .as_str()
                    .or_else(|| block["image"]["external"]["url"].as_str());
                if let Some(image_url) = image_url {
                    if let Some(name) = file_name_of(image_url) {
                        urls.insert(name, image_url.to_string());
                    }
                }
            }

            cursor = payload["next_cursor"].as_str().map(String::from);
            if cursor.is_none() {
                break;
            }
        }

        Ok(urls)
    }
}

/// Last path segment of a URL with any query string stripped.
fn file_name_of(url: &str) -> Option<String> {
    let without_query = url.split('?').next().unwrap_or(url);
    let name = without_query.rsplit('/').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Rewrites `(filename)` references in a document's content to the URLs the
/// image source reports for the document's page. Documents without a page
/// hash, and pages whose lookup fails, pass through unchanged.
pub async fn resolve_image_references(source: &dyn ImageSource, document: Document) -> Document {
    let Some(page_id) = extract_page_hash(&document.source) else {
        return document;
    };

    let urls = match source.image_urls(&page_id).await {
        Ok(urls) => urls,
        Err(err) => {
            tracing::warn!("image lookup failed for page {}: {}", page_id, err);
            return document;
        }
    };

    let mut content = document.content;
    for url in urls.values() {
        if let Some(name) = file_name_of(url) {
            content = content.replace(&format!("({})", name), &format!("({})", url));
        }
    }

    Document {
        content,
        source: document.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedImages(HashMap<String, String>);

    #[async_trait]
    impl ImageSource for FixedImages {
        async fn image_urls(&self, _page_id: &str) -> Result<HashMap<String, String>, ApiError> {
            Ok(self.0.clone())
        }
    }

    struct FailingImages;

    #[async_trait]
    impl ImageSource for FailingImages {
        async fn image_urls(&self, _page_id: &str) -> Result<HashMap<String, String>, ApiError> {
            Err(ApiError::Upstream("listing failed".to_string()))
        }
    }

    const PAGE_SOURCE: &str = "kb/page-6787f93132944add80a8e1b1c662abdc";

    #[test]
    fn file_name_strips_query_string() {
        assert_eq!(
            file_name_of("https://files.example/abc/shot.png?X-Sig=123").as_deref(),
            Some("shot.png")
        );
        assert_eq!(file_name_of("https://files.example/"), None);
    }

    #[tokio::test]
    async fn rewrites_known_filenames() {
        let source = FixedImages(HashMap::from([(
            "shot.png".to_string(),
            "https://files.example/abc/shot.png?X-Sig=123".to_string(),
        )]));
        let doc = Document::new("See ![s](shot.png) and (other.png)", PAGE_SOURCE);

        let resolved = resolve_image_references(&source, doc).await;
        assert!(resolved
            .content
            .contains("(https://files.example/abc/shot.png?X-Sig=123)"));
        // Unknown filenames stay as-is.
        assert!(resolved.content.contains("(other.png)"));
    }

    #[tokio::test]
    async fn lookup_failure_leaves_content_untouched() {
        let doc = Document::new("![s](shot.png)", PAGE_SOURCE);
        let resolved = resolve_image_references(&FailingImages, doc.clone()).await;
        assert_eq!(resolved.content, doc.content);
    }

    #[tokio::test]
    async fn documents_without_page_hash_pass_through() {
        let source = FixedImages(HashMap::new());
        let doc = Document::new("(shot.png)", "tavily");
        let resolved = resolve_image_references(&source, doc.clone()).await;
        assert_eq!(resolved.content, doc.content);
    }
}
