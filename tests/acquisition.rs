//! HTTP-level tests for the acquisition cascade and enrichment, against a
//! local mock server standing in for both GitHub hosts.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mockito::{Matcher, Server};
use tempfile::TempDir;

use folio::enrich::{OPEN_SOURCE_ROLE, ProfileAssembler};
use folio::error::FetchError;
use folio::github::{
    AcquisitionCascade, AttemptOutcome, CancellationToken, Endpoints, FetchRequest, Fetcher,
    HttpFetcher, Provenance, Strategy,
};
use folio::store::{CacheAsideStore, FileStore, MemoryCache};

fn fetcher() -> Arc<HttpFetcher> {
    Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap())
}

fn cascade(server: &Server, token: Option<&str>) -> AcquisitionCascade {
    AcquisitionCascade::new(fetcher())
        .with_endpoints(Endpoints {
            api_base: server.url(),
            raw_base: server.url(),
        })
        .with_token(token.map(str::to_string))
}

/// README body as the contents API returns it, base64 wrapped at 60 columns
fn readme_body(text: &str) -> String {
    let encoded = STANDARD.encode(text);
    let wrapped: Vec<String> = encoded
        .as_bytes()
        .chunks(60)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();
    serde_json::json!({
        "name": "README.md",
        "encoding": "base64",
        "content": wrapped.join("\n"),
    })
    .to_string()
}

#[tokio::test]
async fn api_readme_is_decoded_and_authenticated() {
    let mut server = Server::new_async().await;
    let readme = server
        .mock("GET", "/repos/acme/widgets/readme")
        .match_header("authorization", "token s3cret")
        .match_header("accept", "application/vnd.github.v3+json")
        .with_status(200)
        .with_body(readme_body("# Widgets\n\nA toolkit.\n"))
        .expect(1)
        .create_async()
        .await;

    let acquisition = cascade(&server, Some("s3cret"))
        .acquire_str("https://github.com/acme/widgets", &CancellationToken::new())
        .await
        .unwrap();

    readme.assert_async().await;
    assert_eq!(acquisition.artifact.provenance, Provenance::Api);
    assert_eq!(acquisition.artifact.text, "# Widgets\n\nA toolkit.\n");
    assert_eq!(acquisition.attempts.len(), 1);
}

#[tokio::test]
async fn branch_reference_is_passed_as_ref() {
    let mut server = Server::new_async().await;
    let readme = server
        .mock("GET", "/repos/acme/widgets/readme")
        .match_query(Matcher::UrlEncoded("ref".into(), "dev".into()))
        .with_status(200)
        .with_body(readme_body("dev branch readme"))
        .create_async()
        .await;

    let acquisition = cascade(&server, None)
        .acquire_str(
            "https://github.com/acme/widgets/tree/dev",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    readme.assert_async().await;
    assert_eq!(acquisition.artifact.text, "dev branch readme");
}

#[tokio::test]
async fn branch_with_reserved_characters_is_encoded() {
    let mut server = Server::new_async().await;
    let readme = server
        .mock("GET", "/repos/acme/widgets/readme")
        .match_query(Matcher::UrlEncoded("ref".into(), "c++".into()))
        .with_status(200)
        .with_body(readme_body("c++ branch readme"))
        .create_async()
        .await;

    let acquisition = cascade(&server, None)
        .acquire_str(
            "https://github.com/acme/widgets/tree/c++",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    readme.assert_async().await;
    assert_eq!(acquisition.artifact.provenance, Provenance::Api);
    assert_eq!(acquisition.artifact.text, "c++ branch readme");
}

#[tokio::test]
async fn whitespace_readme_ends_the_search() {
    let mut server = Server::new_async().await;
    let _api = server
        .mock("GET", "/repos/acme/widgets/readme")
        .with_status(404)
        .create_async()
        .await;
    let blank = server
        .mock("GET", "/acme/widgets/main/README.md")
        .with_status(200)
        .with_body("\n")
        .create_async()
        .await;
    let second = server
        .mock("GET", "/acme/widgets/main/readme.md")
        .with_status(200)
        .with_body("second")
        .expect(0)
        .create_async()
        .await;

    let acquisition = cascade(&server, None)
        .acquire_str("github.com/acme/widgets", &CancellationToken::new())
        .await
        .unwrap();

    blank.assert_async().await;
    second.assert_async().await;
    assert_eq!(acquisition.artifact.text, "\n");
    assert_eq!(acquisition.artifact.provenance, Provenance::RawContent);
    assert_eq!(acquisition.attempts.len(), 2);
}

#[tokio::test]
async fn api_miss_falls_through_to_raw_content() {
    let mut server = Server::new_async().await;
    let _api = server
        .mock("GET", "/repos/acme/widgets/readme")
        .with_status(404)
        .create_async()
        .await;
    let _main = server
        .mock("GET", Matcher::Regex(r"^/acme/widgets/main/".to_string()))
        .with_status(404)
        .create_async()
        .await;
    let master = server
        .mock("GET", "/acme/widgets/master/README.md")
        .with_status(200)
        .with_body("# From master\n")
        .create_async()
        .await;

    let acquisition = cascade(&server, None)
        .acquire_str("github.com/acme/widgets", &CancellationToken::new())
        .await
        .unwrap();

    master.assert_async().await;
    assert_eq!(acquisition.artifact.provenance, Provenance::RawContent);
    assert_eq!(acquisition.artifact.text, "# From master\n");

    let first = &acquisition.attempts[0];
    assert_eq!(first.strategy, Strategy::Api);
    assert_eq!(first.outcome, AttemptOutcome::NotFound);
    // api, three main filenames, then master/README.md
    assert_eq!(acquisition.attempts.len(), 5);
    assert_eq!(acquisition.attempts[4].target, "master/README.md");
}

#[tokio::test]
async fn metadata_summary_when_no_readme_exists() {
    let mut server = Server::new_async().await;
    let _readmes = server
        .mock("GET", Matcher::Regex(r"(/readme$|\.md$)".to_string()))
        .with_status(404)
        .expect(10)
        .create_async()
        .await;
    let _metadata = server
        .mock("GET", "/repos/acme/widgets")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "name": "widgets",
                "full_name": "acme/widgets",
                "description": "Widget toolkit",
                "language": "Rust",
                "topics": ["gui"],
                "stargazers_count": 42,
                "forks_count": 7
            })
            .to_string(),
        )
        .create_async()
        .await;

    let acquisition = cascade(&server, None)
        .acquire_str("github.com/acme/widgets", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(acquisition.artifact.provenance, Provenance::MetadataSummary);
    assert!(acquisition.artifact.text.contains("# acme/widgets"));
    assert!(acquisition.artifact.text.contains("Widget toolkit"));
    assert!(acquisition.artifact.text.contains("Stars: 42"));
    assert_eq!(acquisition.attempts.len(), 11);
}

#[tokio::test]
async fn exhausted_cascade_records_remote_errors() {
    let mut server = Server::new_async().await;
    let _all = server
        .mock("GET", Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let acquisition = cascade(&server, None)
        .acquire_str("github.com/acme/widgets", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(acquisition.artifact.provenance, Provenance::None);
    assert!(acquisition.artifact.text.is_empty());
    assert!(
        acquisition
            .attempts
            .iter()
            .all(|a| a.outcome == AttemptOutcome::RemoteError { status: 500 })
    );
}

#[tokio::test]
async fn fetcher_classifies_statuses() {
    let mut server = Server::new_async().await;
    let _missing = server
        .mock("GET", "/missing")
        .with_status(404)
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/broken")
        .with_status(503)
        .create_async()
        .await;
    let _anonymous = server
        .mock("GET", "/anonymous")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let fetcher = fetcher();
    let cancel = CancellationToken::new();
    let url = |path: &str| format!("{}{}", server.url(), path);

    let missing = url("/missing");
    assert_eq!(
        fetcher.fetch(FetchRequest::new(&missing), &cancel).await,
        Err(FetchError::NotFound)
    );

    let broken = url("/broken");
    assert_eq!(
        fetcher.fetch(FetchRequest::new(&broken), &cancel).await,
        Err(FetchError::Remote { status: 503 })
    );

    // An empty token is never sent
    let anonymous = url("/anonymous");
    assert_eq!(
        fetcher
            .fetch(FetchRequest::new(&anonymous).token(Some("")), &cancel)
            .await,
        Ok("ok".to_string())
    );
}

#[tokio::test]
async fn enrich_appends_project_and_creates_profile() {
    let mut server = Server::new_async().await;
    let _readme = server
        .mock("GET", "/repos/acme/widgets/readme")
        .with_status(200)
        .with_body(readme_body(
            "# Widgets\n\nComposable UI widgets.\n\n- Fast\n- Themeable\n",
        ))
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(CacheAsideStore::new(
        Arc::new(FileStore::open_at(dir.path()).unwrap()),
        Arc::new(MemoryCache::new()),
    ));
    let assembler = ProfileAssembler::new(store.clone(), Arc::new(cascade(&server, None)));

    let enrichment = assembler
        .enrich(
            "alice",
            "https://github.com/acme/widgets",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(enrichment.project.name, "Widgets");
    assert_eq!(enrichment.project.role, OPEN_SOURCE_ROLE);
    assert_eq!(enrichment.project.description, "Composable UI widgets.");
    assert_eq!(enrichment.project.highlights, ["Fast", "Themeable"]);

    let stored = store.get("alice").unwrap();
    assert_eq!(stored.projects, vec![enrichment.project.clone()]);

    // A second enrichment appends rather than replaces
    assembler
        .enrich("alice", "github.com/acme/widgets", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(store.get("alice").unwrap().projects.len(), 2);
}

#[tokio::test]
async fn enrich_rejects_malformed_reference_without_requests() {
    let mut server = Server::new_async().await;
    let any = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(CacheAsideStore::uncached(Arc::new(
        FileStore::open_at(dir.path()).unwrap(),
    )));
    let assembler = ProfileAssembler::new(store.clone(), Arc::new(cascade(&server, None)));

    let err = assembler
        .enrich("alice", "https://gitlab.com/acme/widgets", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, folio::error::Error::MalformedReference(_)));
    any.assert_async().await;
    assert!(store.get("alice").is_err());
}
