mod gitea_support;

use gitea_link::core::config::CommitMessages;
use gitea_link::error::GiteaLinkError;
use gitea_link::gitea::files::{FileOperations, RepoRef};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gitea_support::{manager, mount_user, token};

const REPO: RepoRef<'static> = RepoRef {
    project_id: "org/notes",
    branch: "main",
};

fn file_commit(content_sha: Option<&str>) -> ResponseTemplate {
    let content = content_sha.map(|sha| json!({ "path": "a.md", "sha": sha, "size": 5 }));
    ResponseTemplate::new(201).set_body_json(json!({
        "content": content,
        "commit": { "sha": "commit-1", "message": "msg" }
    }))
}

#[tokio::test]
async fn download_decodes_content_and_returns_sha() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/repos/org/notes/contents/a.md"))
        .and(query_param("ref", "main"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "file",
            "name": "a.md",
            "path": "a.md",
            "sha": "h1",
            "encoding": "base64",
            "content": "aGVsbG8="
        })))
        .expect(1)
        .mount(&server)
        .await;

    let account = token(&server, "a1", 3600);
    let (manager, _store) = manager(vec![account.clone()]);
    let messages = CommitMessages::default();
    let ops = FileOperations::new(&manager, &messages);

    let file = ops.download(&account, REPO, "a.md").await.unwrap();
    assert_eq!(file.sha, "h1");
    assert_eq!(file.text().unwrap(), "hello");
}

#[tokio::test]
async fn upload_without_sha_creates_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/repos/org/notes/contents/a.md"))
        .and(body_json(json!({
            "message": "Create a.md",
            "content": "aGVsbG8=",
            "branch": "main"
        })))
        .respond_with(file_commit(Some("h1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let account = token(&server, "a1", 3600);
    let (manager, _store) = manager(vec![account.clone()]);
    let messages = CommitMessages::default();
    let ops = FileOperations::new(&manager, &messages);

    let result = ops
        .upload(&account, REPO, "a.md", b"hello", None)
        .await
        .unwrap();
    assert_eq!(result.commit.sha, "commit-1");
    assert_eq!(result.content_sha(), Some("h1"));
}

#[tokio::test]
async fn upload_with_sha_updates_file() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/repos/org/notes/contents/a.md"))
        .and(body_json(json!({
            "message": "edit a.md",
            "content": "aGVsbG8=",
            "sha": "h1",
            "branch": "main"
        })))
        .respond_with(file_commit(Some("h2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let account = token(&server, "a1", 3600);
    let (manager, _store) = manager(vec![account.clone()]);
    let messages = CommitMessages {
        update_file: "edit {{path}}".to_string(),
        ..CommitMessages::default()
    };
    let ops = FileOperations::new(&manager, &messages);

    let result = ops
        .upload(&account, REPO, "a.md", b"hello", Some("h1"))
        .await
        .unwrap();
    assert_eq!(result.content_sha(), Some("h2"));
}

#[tokio::test]
async fn stale_sha_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/repos/org/notes/contents/a.md"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "sha does not match [given: h0, expected: h1]"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let account = token(&server, "a1", 3600);
    let (manager, _store) = manager(vec![account.clone()]);
    let messages = CommitMessages::default();
    let ops = FileOperations::new(&manager, &messages);

    let err = ops
        .upload(&account, REPO, "a.md", b"hello", Some("h0"))
        .await
        .unwrap_err();
    match err {
        GiteaLinkError::Api { status, message } => {
            assert_eq!(status, 409);
            assert!(message.contains("sha does not match"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_sends_message_sha_and_branch() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/repos/org/notes/contents/docs%2Fa.md"))
        .and(body_json(json!({
            "message": "Delete docs/a.md",
            "sha": "h1",
            "branch": "main"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": null,
            "commit": { "sha": "commit-2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let account = token(&server, "a1", 3600);
    let (manager, _store) = manager(vec![account.clone()]);
    let messages = CommitMessages::default();
    let ops = FileOperations::new(&manager, &messages);

    let result = ops.delete(&account, REPO, "docs/a.md", "h1").await.unwrap();
    assert_eq!(result.commit.sha, "commit-2");
    assert!(result.content_sha().is_none());
}

#[tokio::test]
async fn tree_lists_branch_recursively() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/repos/org/notes/git/trees/main"))
        .and(query_param("recursive", "true"))
        .and(query_param("per_page", "9999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "tree-1",
            "url": "https://git.example.com/api/v1/repos/org/notes/git/trees/tree-1",
            "tree": [
                { "path": "docs", "mode": "040000", "type": "tree", "sha": "t2" },
                { "path": "docs/a.md", "mode": "100644", "type": "blob", "sha": "h1", "size": 5 }
            ],
            "truncated": false,
            "page": 1,
            "total_count": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let account = token(&server, "a1", 3600);
    let (manager, _store) = manager(vec![account.clone()]);
    let messages = CommitMessages::default();
    let ops = FileOperations::new(&manager, &messages);

    let tree = ops.tree(&account, REPO).await.unwrap();
    assert_eq!(tree.sha, "tree-1");
    assert_eq!(tree.tree.len(), 2);
    assert!(!tree.tree[0].is_blob());
    assert!(tree.tree[1].is_blob());
    assert_eq!(tree.tree[1].size, Some(5));
}

#[tokio::test]
async fn commits_filter_by_branch_and_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/repos/org/notes/commits"))
        .and(query_param("sha", "main"))
        .and(query_param("path", "docs/a.md"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "sha": "c2",
                "html_url": "https://git.example.com/org/notes/commit/c2",
                "commit": {
                    "message": "Update docs/a.md\n\nmore",
                    "author": { "name": "alice", "email": "alice@example.com", "date": "2024-05-01T10:00:00Z" }
                }
            },
            {
                "sha": "c1",
                "commit": { "message": "Create docs/a.md" }
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let account = token(&server, "a1", 3600);
    let (manager, _store) = manager(vec![account.clone()]);
    let messages = CommitMessages::default();
    let ops = FileOperations::new(&manager, &messages);

    let commits = ops.commits(&account, REPO, "docs/a.md").await.unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].sha, "c2");
    assert_eq!(
        commits[0].commit.author.as_ref().map(|a| a.name.as_str()),
        Some("alice")
    );
    assert!(commits[1].commit.author.is_none());
}

#[tokio::test]
async fn expired_token_is_refreshed_before_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a2",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_user(&server, "alice").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/repos/org/notes/contents/a.md"))
        .and(header("Authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "file",
            "sha": "h1",
            "content": "aGVsbG8="
        })))
        .expect(1)
        .mount(&server)
        .await;

    let account = token(&server, "a1", -1);
    let (manager, store) = manager(vec![account.clone()]);
    let messages = CommitMessages::default();
    let ops = FileOperations::new(&manager, &messages);

    let file = ops.download(&account, REPO, "a.md").await.unwrap();
    assert_eq!(file.text().unwrap(), "hello");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn unlinked_account_is_rejected_without_network() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let account = token(&server, "a1", 3600);
    let (manager, _store) = manager(Vec::new());
    let messages = CommitMessages::default();
    let ops = FileOperations::new(&manager, &messages);

    let err = ops.tree(&account, REPO).await.unwrap_err();
    assert!(matches!(err, GiteaLinkError::AccountNotLinked(_)));
}
