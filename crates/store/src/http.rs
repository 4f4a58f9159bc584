use crate::error::{Result, StoreError};
use async_trait::async_trait;
use caption_engine::{CollectionStore, EngineError, Item, ItemId, MediaInfo};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Image record as listed by the remote image API (metadata only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteImage {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub filename: String,

    #[serde(rename = "contentType", default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub caption: Option<String>,

    /// ISO-8601 upload time as sent by the server
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl From<RemoteImage> for Item {
    fn from(remote: RemoteImage) -> Self {
        Item::new(
            remote.id,
            remote.filename,
            remote.caption.unwrap_or_default(),
        )
        .with_media(MediaInfo {
            content_type: remote.content_type,
            ..MediaInfo::default()
        })
    }
}

#[derive(Serialize)]
struct CaptionUpdate<'a> {
    caption: &'a str,
}

/// Collection served by a remote image API.
///
/// Endpoints: `GET /api/images`, `GET /api/images/:id` (raw bytes),
/// `PUT /api/images/:id` with `{"caption": ..}`, `DELETE /api/images/:id`,
/// `DELETE /api/images`. Uploading is not part of this client.
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: String,
    client: Client,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StoreError::InvalidUrl(base_url));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn images_url(&self) -> String {
        format!("{}/api/images", self.base_url)
    }

    fn image_url(&self, id: &ItemId) -> String {
        format!("{}/api/images/{}", self.base_url, id)
    }

    /// List image metadata in server order
    pub async fn list(&self) -> Result<Vec<RemoteImage>> {
        let url = self.images_url();
        let response = self.client.get(&url).send().await?;
        let response = check_status("GET", &url, response)?;
        Ok(response.json().await?)
    }

    /// Download the raw image bytes of one item
    pub async fn fetch_image(&self, id: &ItemId) -> Result<Vec<u8>> {
        let url = self.image_url(id);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(EngineError::ItemNotFound(id.to_string()).into());
        }
        let response = check_status("GET", &url, response)?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn put_caption(&self, id: &ItemId, caption: &str) -> Result<()> {
        let url = self.image_url(id);
        let response = self
            .client
            .put(&url)
            .json(&CaptionUpdate { caption })
            .send()
            .await?;
        let response = check_status("PUT", &url, response)?;
        // the server answers `null` when no document has this id
        let updated: Option<RemoteImage> = response.json().await?;
        if updated.is_none() {
            return Err(EngineError::ItemNotFound(id.to_string()).into());
        }
        log::debug!("PUT {url} ok");
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let response = self.client.delete(url).send().await?;
        check_status("DELETE", url, response)?;
        Ok(())
    }
}

fn check_status(method: &'static str, url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(StoreError::RemoteStatus {
        method,
        url: url.to_string(),
        status: status.as_u16(),
    })
}

#[async_trait]
impl CollectionStore for HttpStore {
    async fn get_all(&self) -> caption_engine::Result<Vec<Item>> {
        let images = self.list().await?;
        Ok(images.into_iter().map(Item::from).collect())
    }

    async fn set_caption(&self, id: &ItemId, caption: &str) -> caption_engine::Result<()> {
        Ok(self.put_caption(id, caption).await?)
    }

    async fn insert(&self, _items: Vec<Item>) -> caption_engine::Result<usize> {
        Err(EngineError::Unsupported("uploading items to a remote store"))
    }

    async fn remove(&self, id: &ItemId) -> caption_engine::Result<bool> {
        let exists = self.list().await?.iter().any(|image| image.id == id.as_str());
        if !exists {
            return Ok(false);
        }
        self.delete(&self.image_url(id)).await?;
        Ok(true)
    }

    async fn clear(&self) -> caption_engine::Result<usize> {
        let count = self.list().await?.len();
        self.delete(&self.images_url()).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            HttpStore::new("ftp://example.com"),
            Err(StoreError::InvalidUrl(_))
        ));
        let store = HttpStore::new(" http://localhost:3000/ ").unwrap();
        assert_eq!(store.base_url(), "http://localhost:3000");
    }

    #[test]
    fn remote_document_maps_to_item() {
        let raw = r#"{
            "_id": "65f0c0ffee",
            "filename": "cat.png",
            "contentType": "image/png",
            "caption": null,
            "timestamp": "2024-03-12T10:00:00.000Z",
            "__v": 0
        }"#;
        let remote: RemoteImage = serde_json::from_str(raw).unwrap();
        let item = Item::from(remote);

        assert_eq!(item.id, ItemId::new("65f0c0ffee"));
        assert_eq!(item.name, "cat.png");
        assert_eq!(item.caption, "");
        assert_eq!(item.media.content_type.as_deref(), Some("image/png"));
    }
}
