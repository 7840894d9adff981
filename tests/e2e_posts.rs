//! E2E tests for posts, comments, likes and shares

mod common;

use common::TestServer;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

fn image_form(text: &str, bytes: Vec<u8>) -> Form {
    Form::new().text("text", text.to_string()).part(
        "media",
        Part::bytes(bytes)
            .file_name("photo.png")
            .mime_str("image/png")
            .unwrap(),
    )
}

#[tokio::test]
async fn test_create_text_post() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let post = server.create_post(&alice, "  Hello, world  ").await;

    assert_eq!(post["text"], "Hello, world");
    assert_eq!(post["user"], "alice@example.com");
    assert_eq!(post["username"], "alice");
    assert!(post["_id"].is_string());
    assert!(post["mediaUrl"].is_null());
    assert!(post["mediaType"].is_null());
    assert_eq!(post["likes"], json!([]));
    assert_eq!(post["comments"], json!([]));
}

#[tokio::test]
async fn test_create_post_requires_text() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let response = server
        .client
        .post(server.url("/posts"))
        .bearer_auth(&alice.token)
        .multipart(Form::new().text("text", "   "))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Post text is required");
    assert!(server.stored_posts().await.is_empty());
}

#[tokio::test]
async fn test_multipart_post_with_media_is_served_and_cleaned_up() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let response = server
        .client
        .post(server.url("/posts"))
        .bearer_auth(&alice.token)
        .multipart(image_form("look at this", vec![137, 80, 78, 71]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let post: Value = response.json().await.unwrap();
    assert_eq!(post["mediaType"], "image");
    let media_url = post["mediaUrl"].as_str().unwrap().to_string();
    assert!(media_url.starts_with("/uploads/"));

    let response = server.client.get(server.url(&media_url)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.bytes().await.unwrap().to_vec(), vec![137, 80, 78, 71]);

    let response = server
        .client
        .delete(server.url(&format!("/posts/{}", post["_id"].as_str().unwrap())))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Post deleted successfully");

    let response = server.client.get(server.url(&media_url)).send().await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_non_media_upload_is_rejected() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let form = Form::new().text("text", "notes").part(
        "media",
        Part::bytes(b"plain text".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let response = server
        .client
        .post(server.url("/posts"))
        .bearer_auth(&alice.token)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Only image and video files are allowed!");
    assert!(server.stored_posts().await.is_empty());
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let server = TestServer::with_max_upload_bytes(1024).await;
    let alice = server.create_user("alice").await;

    let response = server
        .client
        .post(server.url("/posts"))
        .bearer_auth(&alice.token)
        .multipart(image_form("too big", vec![0; 4096]))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 413);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());
    assert!(server.stored_posts().await.is_empty());
}

#[tokio::test]
async fn test_feed_get_and_search() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let first = server.create_post(&alice, "Learning Rust today").await;
    let second = server.create_post(&alice, "Coffee first").await;

    let feed: Value = server
        .client
        .get(server.url("/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = feed
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["_id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![second["_id"].as_str().unwrap(), first["_id"].as_str().unwrap()]
    );

    let response = server
        .client
        .get(server.url(&format!("/posts/{}", first["_id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .get(server.url("/posts/does-not-exist"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Post not found");

    let found: Value = server
        .client
        .get(server.url("/posts/search/RUST"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["_id"], first["_id"]);
}

#[tokio::test]
async fn test_like_toggles() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let post = server.create_post(&alice, "like me").await;
    let like_url = server.url(&format!("/posts/{}/like", post["_id"].as_str().unwrap()));

    let liked: Value = server
        .client
        .post(&like_url)
        .bearer_auth(&bob.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(liked, json!({"liked": true, "likesCount": 1}));

    let unliked: Value = server
        .client
        .post(&like_url)
        .bearer_auth(&bob.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unliked, json!({"liked": false, "likesCount": 0}));

    assert!(server.stored_posts().await[0].likes.is_empty());
}

#[tokio::test]
async fn test_only_author_can_delete_post() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let post = server.create_post(&alice, "mine").await;

    let response = server
        .client
        .delete(server.url(&format!("/posts/{}", post["_id"].as_str().unwrap())))
        .bearer_auth(&bob.token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "You can only delete your own posts");
    assert_eq!(server.stored_posts().await.len(), 1);
}

#[tokio::test]
async fn test_comments_add_and_delete() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let post = server.create_post(&alice, "discuss").await;
    let post_id = post["_id"].as_str().unwrap();

    for (user, text) in [(&bob, "first"), (&alice, "second"), (&bob, "third")] {
        let response = server
            .client
            .post(server.url(&format!("/posts/{}/comment", post_id)))
            .bearer_auth(&user.token)
            .json(&json!({ "text": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let response = server
        .client
        .post(server.url(&format!("/posts/{}/comment", post_id)))
        .bearer_auth(&bob.token)
        .json(&json!({ "text": " " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = server
        .client
        .post(server.url(&format!("/posts/{}/comment", post_id)))
        .bearer_auth(&bob.token)
        .header("Content-Type", "application/json")
        .body("{\"text\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());

    // Alice cannot delete Bob's comment.
    let response = server
        .client
        .delete(server.url(&format!("/posts/{}/comment/0", post_id)))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = server
        .client
        .delete(server.url(&format!("/posts/{}/comment/0", post_id)))
        .bearer_auth(&bob.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    let texts: Vec<&str> = updated["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["second", "third"]);
    assert_eq!(updated["text"], "discuss");

    let response = server
        .client
        .delete(server.url(&format!("/posts/{}/comment/9", post_id)))
        .bearer_auth(&bob.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Comment not found");

    let response = server
        .client
        .delete(server.url(&format!("/posts/{}/comment/abc", post_id)))
        .bearer_auth(&bob.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let third_id = updated["comments"][1]["id"].as_str().unwrap();
    let response = server
        .client
        .delete(server.url(&format!("/posts/{}/comments/{}", post_id, third_id)))
        .bearer_auth(&bob.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["comments"].as_array().unwrap().len(), 1);
    assert_eq!(updated["comments"][0]["text"], "second");
}

#[tokio::test]
async fn test_share_creates_attributed_copy() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let post = server.create_post(&alice, "worth sharing").await;

    let response = server
        .client
        .post(server.url(&format!("/posts/{}/share", post["_id"].as_str().unwrap())))
        .bearer_auth(&bob.token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Post shared successfully");
    let shared = &body["post"];
    assert_eq!(shared["text"], "🔄 @bob shared: worth sharing");
    assert_eq!(shared["user"], "bob@example.com");
    assert_eq!(shared["sharedFrom"]["username"], "alice");
    assert_eq!(shared["sharedFrom"]["postId"], post["_id"]);

    let stored = server.stored_posts().await;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, shared["_id"].as_str().unwrap());
}

#[tokio::test]
async fn test_concurrent_likes_are_all_recorded() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let post = server.create_post(&alice, "popular").await;
    let like_url = server.url(&format!("/posts/{}/like", post["_id"].as_str().unwrap()));

    let mut fans = Vec::new();
    for n in 0..5 {
        fans.push(server.create_user(&format!("fan{}", n)).await);
    }

    let mut handles = Vec::new();
    for fan in &fans {
        let request = server.client.post(&like_url).bearer_auth(&fan.token).send();
        handles.push(request);
    }
    for response in send_all(handles).await {
        assert_eq!(response.status(), 200);
    }

    assert_eq!(server.stored_posts().await[0].likes.len(), 5);
}

async fn send_all<F>(requests: Vec<F>) -> Vec<reqwest::Response>
where
    F: std::future::Future<Output = reqwest::Result<reqwest::Response>> + Send + 'static,
{
    let handles: Vec<_> = requests.into_iter().map(tokio::spawn).collect();
    let mut responses = Vec::new();
    for handle in handles {
        responses.push(handle.await.unwrap().unwrap());
    }
    responses
}

#[tokio::test]
async fn test_comment_without_stored_id_can_be_deleted_by_id() {
    let legacy = json!([{
        "_id": "1700000000000",
        "text": "from the old days",
        "user": "alice@example.com",
        "username": "alice",
        "mediaUrl": null,
        "mediaType": null,
        "likes": [],
        "date": "2024-01-01T00:00:00.000Z",
        "comments": [{
            "text": "still here",
            "user": "bob@example.com",
            "username": "bob",
            "date": "2024-01-01T00:01:00.000Z"
        }]
    }]);
    let server = TestServer::with_posts_file(&legacy.to_string()).await;
    let bob = server.create_user("bob").await;

    let stored = server.stored_posts().await;
    assert!(!stored[0].comments[0].id.is_empty());

    let post: Value = server
        .client
        .get(server.url("/posts/1700000000000"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let comment_id = post["comments"][0]["id"].as_str().unwrap();
    assert_eq!(comment_id, stored[0].comments[0].id);

    let response = server
        .client
        .delete(server.url(&format!("/posts/1700000000000/comments/{}", comment_id)))
        .bearer_auth(&bob.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["comments"], json!([]));
}
