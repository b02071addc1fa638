#![allow(dead_code)]

use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tiny_http::{Header, Request, Response, Server};

pub type TestResponse = Response<Cursor<Vec<u8>>>;

/// Local HTTP server on an ephemeral port; records every request path.
pub struct TestServer {
    pub base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> TestResponse + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                seen.lock().unwrap().push(request.url().to_string());
                let response = handler(&request);
                let _ = request.respond(response);
            }
        });

        Self {
            base: format!("http://127.0.0.1:{port}/"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn header(name: &str, value: &str) -> Header {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap()
}

pub fn html(body: &str) -> TestResponse {
    Response::from_string(body).with_header(header("Content-Type", "text/html; charset=utf-8"))
}

pub fn json(body: &str) -> TestResponse {
    Response::from_string(body).with_header(header("Content-Type", "application/json"))
}

pub fn status(code: u16) -> TestResponse {
    Response::from_string("").with_status_code(code)
}

/// Value of `key` in the query of a request path like `/index.php?page=2`.
pub fn query_param(path: &str, key: &str) -> Option<String> {
    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    url.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}

pub fn request_header(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str().to_string())
}

/// Minimal valid PDF with `pages` empty pages, each tagged with `label` in
/// its content stream.
pub fn sample_pdf(label: &str, pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for index in 0..pages {
        let content = format!("% {label}-{index}\n").into_bytes();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data).unwrap();
    data
}
