use crate::api::{ModelTag, TagsResponse};
use crate::utils::url::construct_api_url;

/// Models offered as suggestions when nothing is installed yet.
pub const SUGGESTED_MODELS: &[&str] = &["qwen2.5:7b", "llama3.2:8b", "mistral:7b", "phi3:3.8b"];

pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<TagsResponse, Box<dyn std::error::Error + Send + Sync>> {
    let tags_url = construct_api_url(base_url, "api/tags");
    let response = client.get(tags_url).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(format!("Model listing failed with status {status}: {error_text}").into());
    }

    let tags = response.json::<TagsResponse>().await?;
    Ok(tags)
}

/// Most recently modified first, then by name. Ollama timestamps are RFC 3339,
/// so lexical order matches chronological order.
pub fn sort_models(models: &mut [ModelTag]) {
    models.sort_by(|a, b| match (&a.modified_at, &b.modified_at) {
        (Some(a_at), Some(b_at)) => b_at.cmp(a_at).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
}
