use serde::{Deserialize, Serialize};

/// Download lifecycle of an image on the device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Downloading,
    Downloaded,
    Deleting,
}

/// An image tracked by the agent, keyed to the service it was fetched for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    pub image_id: u32,
    pub app_id: u32,
    pub service_id: u32,
    pub service_name: String,
    pub release_id: u32,
    /// Registry reference the image was requested under.
    pub name: String,
    /// Engine content digest; present once the download completed.
    pub docker_image_id: Option<String>,
    pub status: ImageStatus,
    pub download_progress: Option<u8>,
}

/// Compares two registry references, tolerating the usual spelling variance:
/// a leading registry host, an implied `latest` tag, and digest-pinned forms.
pub fn is_same_image(a: &str, b: &str) -> bool {
    let (repo_a, digest_a) = normalize(a);
    let (repo_b, digest_b) = normalize(b);

    if repo_a == repo_b {
        return true;
    }
    match (&digest_a, &digest_b) {
        (Some(d), _) if b.contains(d.as_str()) => true,
        (_, Some(d)) if a.contains(d.as_str()) => true,
        _ => false,
    }
}

/// Reduces a reference to canonical `repo:tag` plus an optional digest.
fn normalize(reference: &str) -> (String, Option<String>) {
    let (without_digest, digest) = match reference.split_once('@') {
        Some((head, digest)) => (head, Some(digest.to_string())),
        None => (reference, None),
    };

    let repo = strip_registry_host(without_digest);

    // The tag separator must come after the last path segment, otherwise a
    // port in a host name would be mistaken for a tag.
    let canonical = match repo.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => format!("{name}:{tag}"),
        _ => format!("{repo}:latest"),
    };

    (canonical, digest)
}

fn strip_registry_host(reference: &str) -> &str {
    match reference.split_once('/') {
        Some((head, rest))
            if head.contains('.') || head.contains(':') || head == "localhost" =>
        {
            rest
        }
        _ => reference,
    }
}
