//! Authenticated repository file operations
//!
//! Every operation first runs the token through [`TokenManager::refresh`]
//! and then issues exactly one request against the repository.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::core::config::CommitMessages;
use crate::core::token_manager::TokenManager;
use crate::error::{GiteaLinkError, Result};
use crate::gitea::auth::AccountToken;
use crate::gitea::client::GiteaClient;

/// Recursive listing of a branch
#[derive(Debug, Clone, Deserialize)]
pub struct GitTree {
    pub sha: String,
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    /// Set when the server cut the listing short
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    /// `blob` or `tree`
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

/// One entry of the commit history of a path
#[derive(Debug, Clone, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitSignature>,
    #[serde(default)]
    pub committer: Option<CommitSignature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitSignature {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date: Option<String>,
}

/// Result of a create, update or delete
#[derive(Debug, Clone, Deserialize)]
pub struct FileCommit {
    /// New file metadata; absent after a delete
    #[serde(default)]
    pub content: Option<FileContent>,
    pub commit: CommitRef,
}

impl FileCommit {
    /// Content hash to present on the next update or delete
    pub fn content_sha(&self) -> Option<&str> {
        self.content.as_ref().map(|content| content.sha.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileContent {
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Decoded file content and the hash it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub sha: String,
    pub data: Vec<u8>,
}

impl DownloadedFile {
    /// Content as UTF-8 text
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.data)
            .map_err(|_| GiteaLinkError::InvalidResponse("file content is not UTF-8 text".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteFileRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteFileRequest<'a> {
    message: String,
    sha: &'a str,
    branch: &'a str,
}

/// Repository a file operation targets
#[derive(Debug, Clone, Copy)]
pub struct RepoRef<'a> {
    /// Repository identifier, usually `owner/name`
    pub project_id: &'a str,
    pub branch: &'a str,
}

/// File operations handler
pub struct FileOperations<'a> {
    manager: &'a TokenManager,
    messages: &'a CommitMessages,
}

impl<'a> FileOperations<'a> {
    pub fn new(manager: &'a TokenManager, messages: &'a CommitMessages) -> Self {
        Self { manager, messages }
    }

    async fn client(&self, token: &AccountToken) -> Result<GiteaClient> {
        let token = self.manager.refresh(token).await?;
        Ok(GiteaClient::authenticated(self.manager.http().clone(), &token))
    }

    /// List every entry of a branch
    pub async fn tree(&self, token: &AccountToken, repo: RepoRef<'_>) -> Result<GitTree> {
        let client = self.client(token).await?;
        let path = format!("repos/{}/git/trees/{}", repo.project_id, repo.branch);
        client
            .get(&path, &[("recursive", "true"), ("per_page", "9999")])
            .await
    }

    /// Commit history of one file on a branch
    pub async fn commits(
        &self,
        token: &AccountToken,
        repo: RepoRef<'_>,
        path: &str,
    ) -> Result<Vec<CommitInfo>> {
        let client = self.client(token).await?;
        let endpoint = format!("repos/{}/commits", repo.project_id);
        client
            .get(&endpoint, &[("sha", repo.branch), ("path", path)])
            .await
    }

    /// Create a file, or update it when the previous content hash is known
    ///
    /// The server rejects the update if `sha` no longer matches the file.
    pub async fn upload(
        &self,
        token: &AccountToken,
        repo: RepoRef<'_>,
        path: &str,
        content: &[u8],
        sha: Option<&str>,
    ) -> Result<FileCommit> {
        let client = self.client(token).await?;
        let (method, message) = match sha {
            Some(_) => (Method::PUT, self.messages.update(path)),
            None => (Method::POST, self.messages.create(path)),
        };
        let body = WriteFileRequest {
            message,
            content: STANDARD.encode(content),
            sha,
            branch: repo.branch,
        };

        tracing::debug!(path, update = sha.is_some(), "writing file");
        client
            .request(method, &contents_path(repo.project_id, path), &[], Some(&body))
            .await
    }

    /// Delete a file at the given content hash
    pub async fn delete(
        &self,
        token: &AccountToken,
        repo: RepoRef<'_>,
        path: &str,
        sha: &str,
    ) -> Result<FileCommit> {
        let client = self.client(token).await?;
        let body = DeleteFileRequest {
            message: self.messages.delete(path),
            sha,
            branch: repo.branch,
        };

        client
            .request(
                Method::DELETE,
                &contents_path(repo.project_id, path),
                &[],
                Some(&body),
            )
            .await
    }

    /// Read a file and decode its content
    pub async fn download(
        &self,
        token: &AccountToken,
        repo: RepoRef<'_>,
        path: &str,
    ) -> Result<DownloadedFile> {
        let client = self.client(token).await?;
        let response: ContentsResponse = client
            .get(&contents_path(repo.project_id, path), &[("ref", repo.branch)])
            .await?;
        decode_contents(response)
    }
}

/// `repos/{id}/contents/{path}` with the file path escaped as one segment
fn contents_path(project_id: &str, path: &str) -> String {
    format!("repos/{}/contents/{}", project_id, urlencoding::encode(path))
}

fn decode_contents(response: ContentsResponse) -> Result<DownloadedFile> {
    if let Some(kind) = response.kind.as_deref() {
        if kind != "file" {
            return Err(GiteaLinkError::InvalidResponse(format!(
                "expected a file, found a {}",
                kind
            )));
        }
    }

    let Some(content) = response.content else {
        return Err(GiteaLinkError::InvalidResponse(format!(
            "no content returned for blob {}",
            response.sha
        )));
    };

    // Base64 content is wrapped across lines
    let encoded: String = content
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    Ok(DownloadedFile {
        sha: response.sha,
        data: STANDARD.decode(encoded)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_path_escapes_file_path() {
        assert_eq!(
            contents_path("org/notes", "docs/my file.md"),
            "repos/org/notes/contents/docs%2Fmy%20file.md"
        );
    }

    #[test]
    fn test_decode_strips_line_breaks() {
        let response: ContentsResponse = serde_json::from_value(serde_json::json!({
            "type": "file",
            "sha": "h1",
            "encoding": "base64",
            "content": "aGVs\nbG8=\n"
        }))
        .unwrap();

        let file = decode_contents(response).unwrap();
        assert_eq!(file.sha, "h1");
        assert_eq!(file.text().unwrap(), "hello");
    }

    #[test]
    fn test_decode_rejects_directories() {
        let response: ContentsResponse = serde_json::from_value(serde_json::json!({
            "type": "dir",
            "sha": "t1"
        }))
        .unwrap();
        assert!(decode_contents(response).is_err());
    }

    #[test]
    fn test_decode_rejects_missing_content() {
        let response: ContentsResponse = serde_json::from_value(serde_json::json!({
            "type": "file",
            "sha": "h1",
            "size": 5,
            "content": null
        }))
        .unwrap();
        assert!(matches!(
            decode_contents(response),
            Err(GiteaLinkError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_create_body_omits_sha() {
        let body = WriteFileRequest {
            message: "Create a.md".to_string(),
            content: STANDARD.encode("hello"),
            sha: None,
            branch: "main",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["content"], "aGVsbG8=");
        assert!(json.get("sha").is_none());
    }
}
