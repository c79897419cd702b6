//! A fake archive: a cursor-paginated scrape listing plus descriptor files.

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SCRAPE_PATH: &str = "/services/search/v1/scrape";
pub const COLLECTION_QUERY: &str = "collection:(georgeblood)";

/// `count` identifiers named `prefix-0`, `prefix-1`, ...
pub fn identifiers(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}-{i}")).collect()
}

/// Splits identifiers into pages of at most `size`.
pub fn paginate(ids: &[String], size: usize) -> Vec<Vec<String>> {
    ids.chunks(size).map(<[String]>::to_vec).collect()
}

/// Cursor token handed out after page `index`.
pub fn cursor_after(index: usize) -> String {
    format!("cursor-{index}")
}

pub fn page_body(ids: &[String], cursor: Option<&str>, total: usize) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "identifier": id, "title": format!("Title of {id}") }))
        .collect();
    let mut body = json!({ "items": items, "count": ids.len(), "total": total });
    if let Some(cursor) = cursor {
        body["cursor"] = json!(cursor);
    }
    body
}

/// Mounts one mock per page. Page 0 answers requests without a cursor; page
/// `i` answers `cursor=cursor-{i-1}`. The last page carries no cursor.
pub async fn mount_listing(server: &MockServer, pages: &[Vec<String>], expected_hits: u64) {
    for index in 0..pages.len() {
        mount_page(server, pages, index, expected_hits).await;
    }
}

/// Mounts only page `index` of `pages`.
pub async fn mount_page(
    server: &MockServer,
    pages: &[Vec<String>],
    index: usize,
    expected_hits: u64,
) {
    let total: usize = pages.iter().map(Vec::len).sum();
    let next = (index + 1 < pages.len()).then(|| cursor_after(index));
    let body = page_body(&pages[index], next.as_deref(), total);
    let mock = Mock::given(method("GET"))
        .and(path(SCRAPE_PATH))
        .and(query_param("q", COLLECTION_QUERY));
    let mock = if index == 0 {
        mock.and(query_param_is_missing("cursor"))
    } else {
        mock.and(query_param("cursor", cursor_after(index - 1)))
    };
    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_hits)
        .named(format!("listing page {index}"))
        .mount(server)
        .await;
}

pub fn descriptor_path(id: &str) -> String {
    format!("/download/{id}/{id}_archive.torrent")
}

pub fn descriptor_body(id: &str) -> Vec<u8> {
    format!("d8:announce{id}e").into_bytes()
}

/// Serves a descriptor for every identifier, each fetched `expected_hits` times.
pub async fn mount_descriptors(server: &MockServer, ids: &[String], expected_hits: u64) {
    for id in ids {
        Mock::given(method("GET"))
            .and(path(descriptor_path(id)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(descriptor_body(id)))
            .expect(expected_hits)
            .mount(server)
            .await;
    }
}
