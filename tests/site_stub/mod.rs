use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Route {
    status: u16,
    content_type: &'static str,
    body: String,
}

/// A tiny HTTP site whose robots.txt, sitemap and pages can be swapped
/// between requests.
pub struct SiteStub {
    /// `127.0.0.1:<port>`; served over plain http.
    pub domain: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl SiteStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start site stub server");
        let domain = server.server_addr().to_string();

        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::default();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let server_routes = Arc::clone(&routes);
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let route = server_routes
                    .lock()
                    .expect("routes lock")
                    .get(request.url())
                    .cloned();
                let Some(route) = route else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                };

                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    route.content_type.as_bytes(),
                )
                .expect("build header");
                let response = tiny_http::Response::from_string(route.body)
                    .with_status_code(route.status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            domain,
            routes,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.domain)
    }

    pub fn route(&self, path: &str, status: u16, content_type: &'static str, body: impl Into<String>) {
        self.routes.lock().expect("routes lock").insert(
            path.to_string(),
            Route {
                status,
                content_type,
                body: body.into(),
            },
        );
    }

    pub fn robots(&self, body: &str) {
        self.route("/robots.txt", 200, "text/plain", body);
    }

    /// Serve a `<urlset>` of the given paths at `at`.
    pub fn sitemap(&self, at: &str, paths: &[&str]) {
        let entries: String = paths
            .iter()
            .map(|path| format!("  <url><loc>{}</loc></url>\n", self.url(path)))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{entries}</urlset>\n"
        );
        self.route(at, 200, "application/xml", xml);
    }

    pub fn page(&self, path: &str, title: &str) {
        let html = format!(
            "<!doctype html>\n<html><head><title>{title}</title></head><body><h1>{title}</h1></body></html>\n"
        );
        self.route(path, 200, "text/html; charset=utf-8", html);
    }
}

impl Drop for SiteStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
