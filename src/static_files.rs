// Copyright 2026 The reading-archive Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::common::{Header, Method};
use crate::pages::{self, ListingEntry};
use crate::request::Request;
use crate::response::{Response, ResponseBox};

const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

fn get_content_type(path: &Path) -> &'static str {
    let extension = match path.extension().and_then(|e| e.to_str()) {
        None => return "application/octet-stream",
        Some(e) => e.to_ascii_lowercase(),
    };

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "csv" => "text/csv; charset=utf-8",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}

/// Splits a request target into its path and query, dropping the fragment.
fn split_target(target: &str) -> (&str, Option<&str>) {
    let target = target.split('#').next().unwrap_or("");
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

/// HTTP dates have a resolution of one second.
fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => UNIX_EPOCH + Duration::from_secs(elapsed.as_secs()),
        Err(_) => time,
    }
}

/// Serves the files below a root directory to GET and HEAD requests.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new<P>(root: P) -> StaticFiles
    where
        P: Into<PathBuf>,
    {
        StaticFiles { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps the path of a request target onto the filesystem.
    ///
    /// Percent-escapes are decoded, and empty, `.` and `..` segments are
    /// dropped, so the result always stays below the root.
    pub fn translate_path(&self, url_path: &str) -> PathBuf {
        let decoded = urlencoding::decode_binary(url_path.as_bytes());
        let decoded = String::from_utf8_lossy(&decoded);

        let mut path = self.root.clone();
        for segment in decoded.split('/') {
            let mut components = Path::new(segment).components();
            if let (Some(Component::Normal(name)), None) = (components.next(), components.next()) {
                path.push(name);
            }
        }
        path
    }

    /// Answers a request for a file or directory.
    pub fn respond(&self, request: &Request) -> ResponseBox {
        match request.method() {
            Method::Get | Method::Head => (),
            other => {
                return pages::error_page(501, &format!("Unsupported method ({})", other.as_str()))
            }
        }

        let (url_path, query) = split_target(request.url());
        let path = self.translate_path(url_path);

        if path.is_dir() {
            if !url_path.ends_with('/') {
                let location = match query {
                    Some(query) => format!("{}/?{}", url_path, query),
                    None => format!("{}/", url_path),
                };
                return match Header::with_value("Location", location) {
                    Some(location) => Response::empty(301).with_header(location).boxed(),
                    None => pages::error_page(400, "Bad request target"),
                };
            }

            for index in INDEX_FILES.iter() {
                let index = path.join(index);
                if index.is_file() {
                    return self.serve_file(&index, request);
                }
            }

            return self.list_directory(&path, url_path);
        }

        if url_path.ends_with('/') {
            return pages::error_page(404, "File not found");
        }

        self.serve_file(&path, request)
    }

    fn serve_file(&self, path: &Path, request: &Request) -> ResponseBox {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(_) => return pages::error_page(404, "File not found"),
        };

        let modified = match file.metadata() {
            Ok(metadata) if metadata.is_file() => metadata.modified().ok(),
            _ => return pages::error_page(404, "File not found"),
        };

        // If-None-Match takes precedence, and no entity tags are produced here
        if let (Some(modified), Some(since), None) = (
            modified,
            request.header("If-Modified-Since"),
            request.header("If-None-Match"),
        ) {
            if let Ok(since) = httpdate::parse_http_date(since) {
                if truncate_to_seconds(modified) <= since {
                    return Response::empty(304).boxed();
                }
            }
        }

        let response = match Response::from_file(file) {
            Ok(response) => response,
            Err(_) => return pages::error_page(404, "File not found"),
        };

        let mut response =
            response.with_header(Header::from_static("Content-Type", get_content_type(path)));

        if let Some(modified) = modified {
            if let Some(header) =
                Header::with_value("Last-Modified", httpdate::fmt_http_date(modified))
            {
                response.add_header(header);
            }
        }

        response.boxed()
    }

    fn list_directory(&self, path: &Path, url_path: &str) -> ResponseBox {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(_) => return pages::error_page(404, "No permission to list directory"),
        };

        let mut listing: Vec<ListingEntry> = entries
            .filter_map(Result::ok)
            .map(|entry| ListingEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.path().is_dir(),
            })
            .collect();
        listing.sort_by_key(|entry| entry.name.to_lowercase());

        let display_path = urlencoding::decode_binary(url_path.as_bytes());
        pages::directory_listing(&String::from_utf8_lossy(&display_path), &listing)
    }
}

#[cfg(test)]
mod tests {
    use super::{get_content_type, split_target, StaticFiles};
    use crate::common::{Header, Method};
    use crate::test::MockRequest;
    use crate::ResponseBox;
    use std::fs;
    use std::io::Read;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    fn body_of(response: ResponseBox) -> String {
        let mut body = String::new();
        response.into_reader().read_to_string(&mut body).unwrap();
        body
    }

    fn get(files: &StaticFiles, path: &'static str) -> ResponseBox {
        files.respond(&MockRequest::new().with_path(path).into())
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("articles.csv"), "id,title\n1,Foo\n").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs").join("index.html"), "<h1>docs</h1>").unwrap();
        fs::create_dir(dir.path().join("empty dir")).unwrap();
        dir
    }

    #[test]
    fn translate_path_stays_below_root() {
        let files = StaticFiles::new("/srv/site");
        assert_eq!(files.root(), Path::new("/srv/site"));

        assert_eq!(files.translate_path("/a/b.txt"), Path::new("/srv/site/a/b.txt"));
        assert_eq!(files.translate_path("/../../etc/passwd"), Path::new("/srv/site/etc/passwd"));
        assert_eq!(files.translate_path("/%2e%2e/secret"), Path::new("/srv/site/secret"));
        assert_eq!(files.translate_path("//./x//"), Path::new("/srv/site/x"));
        assert_eq!(files.translate_path("/my%20notes.csv"), Path::new("/srv/site/my notes.csv"));
    }

    #[test]
    fn split_target_drops_fragment() {
        assert_eq!(split_target("/a?b=1#c"), ("/a", Some("b=1")));
        assert_eq!(split_target("/a#c?d"), ("/a", None));
    }

    #[test]
    fn content_types() {
        assert_eq!(get_content_type(Path::new("a.CSV")), "text/csv; charset=utf-8");
        assert_eq!(get_content_type(Path::new("app.js")), "text/javascript; charset=utf-8");
        assert_eq!(get_content_type(Path::new("README")), "application/octet-stream");
    }

    #[test]
    fn serves_existing_file() {
        let dir = site();
        let files = StaticFiles::new(dir.path());

        let response = get(&files, "/articles.csv?v=2");
        assert_eq!(response.status_code().as_u16(), 200);
        assert_eq!(response.data_length(), Some(15));
        assert_eq!(response.header("Content-Type"), Some("text/csv; charset=utf-8"));
        assert!(response.header("Last-Modified").is_some());
        assert_eq!(body_of(response), "id,title\n1,Foo\n");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = site();
        let files = StaticFiles::new(dir.path());

        assert_eq!(get(&files, "/nope.csv").status_code().as_u16(), 404);
        assert_eq!(get(&files, "/articles.csv/").status_code().as_u16(), 404);
    }

    #[test]
    fn directory_without_slash_redirects() {
        let dir = site();
        let files = StaticFiles::new(dir.path());

        let response = get(&files, "/docs?x=1");
        assert_eq!(response.status_code().as_u16(), 301);
        assert_eq!(response.header("Location"), Some("/docs/?x=1"));
    }

    #[test]
    fn directory_serves_index() {
        let dir = site();
        let files = StaticFiles::new(dir.path());

        let response = get(&files, "/docs/");
        assert_eq!(response.status_code().as_u16(), 200);
        assert_eq!(body_of(response), "<h1>docs</h1>");
    }

    #[test]
    fn directory_without_index_is_listed() {
        let dir = site();
        let files = StaticFiles::new(dir.path());

        let response = get(&files, "/");
        assert_eq!(response.status_code().as_u16(), 200);
        let body = body_of(response);
        assert!(body.contains("<a href=\"articles.csv\">articles.csv</a>"));
        assert!(body.contains("<a href=\"docs/\">docs/</a>"));
        assert!(body.contains("<a href=\"empty%20dir/\">empty dir/</a>"));
        assert!(body.find("articles.csv").unwrap() < body.find("docs/").unwrap());
    }

    #[test]
    fn not_modified_since() {
        let dir = site();
        let files = StaticFiles::new(dir.path());

        let future = httpdate::fmt_http_date(SystemTime::now() + Duration::from_secs(3600));
        let request = MockRequest::new()
            .with_path("/articles.csv")
            .with_header(Header::from_bytes("If-Modified-Since", future.clone()).unwrap());
        assert_eq!(files.respond(&request.into()).status_code().as_u16(), 304);

        let request = MockRequest::new()
            .with_path("/articles.csv")
            .with_header(Header::from_bytes("If-Modified-Since", future).unwrap())
            .with_header(Header::from_static("If-None-Match", "\"abc\""));
        assert_eq!(files.respond(&request.into()).status_code().as_u16(), 200);

        let past = httpdate::fmt_http_date(SystemTime::now() - Duration::from_secs(3600));
        let request = MockRequest::new()
            .with_path("/articles.csv")
            .with_header(Header::from_bytes("If-Modified-Since", past).unwrap());
        assert_eq!(files.respond(&request.into()).status_code().as_u16(), 200);
    }

    #[test]
    fn other_methods_are_not_implemented() {
        let dir = site();
        let files = StaticFiles::new(dir.path());

        let request = MockRequest::new()
            .with_method(Method::Put)
            .with_path("/articles.csv");
        let response = files.respond(&request.into());

        assert_eq!(response.status_code().as_u16(), 501);
        assert!(body_of(response).contains("Unsupported method (PUT)"));
    }
}
