//! Blocking curl client for talking to the service under test.

use std::time::Duration;

#[derive(Debug)]
pub struct Reply {
    pub status: u32,
    /// Lowercased names.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }
}

/// Performs `method` on `url` with optional extra request headers.
pub fn request(method: &str, url: &str, headers: &[&str]) -> Reply {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).unwrap();
    easy.timeout(Duration::from_secs(20)).unwrap();
    match method {
        "GET" => {}
        "HEAD" => easy.nobody(true).unwrap(),
        other => easy.custom_request(other).unwrap(),
    }
    let mut list = curl::easy::List::new();
    for h in headers {
        list.append(h).unwrap();
    }
    easy.http_headers(list).unwrap();

    let mut raw_headers = Vec::new();
    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|line| {
                raw_headers.push(String::from_utf8_lossy(line).trim_end().to_string());
                true
            })
            .unwrap();
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .unwrap();
        transfer.perform().unwrap();
    }
    let headers = raw_headers
        .iter()
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    Reply {
        status: easy.response_code().unwrap(),
        headers,
        body,
    }
}

/// [`request`] on a blocking thread.
pub async fn fetch(method: &'static str, url: String, headers: Vec<String>) -> Reply {
    tokio::task::spawn_blocking(move || {
        let refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        request(method, &url, &refs)
    })
    .await
    .unwrap()
}
