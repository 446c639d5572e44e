// Copyright 2024-2025 Andres Morey
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use tokio_stream::StreamExt as _;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use logs_core::{LineFinder, SearchRequest};

const PREMATURE_END_TRAILER: &[u8] = b"Premature end of stream\n";

/// Builds the complete set of warp routes: `GET /logs` and `GET /healthz`.
/// Any other path falls through to warp's own 404 handling (spec §6).
pub fn routes(
    config: Arc<logs_core::Config>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let logs = warp::path("logs")
        .and(warp::path::end())
        .and(warp::get())
        .and(raw_query())
        .and(with_config(config))
        .and_then(handle_logs);

    let health = warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "ok");

    logs.or(health)
}

fn with_config(
    config: Arc<logs_core::Config>,
) -> impl Filter<Extract = (Arc<logs_core::Config>,), Error = Infallible> + Clone {
    warp::any().map(move || config.clone())
}

/// warp's built-in `query::raw` rejects when the request has no query string
/// at all; fold that case into an empty string instead.
fn raw_query() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::query::raw().or(warp::any().map(String::new)).unify()
}

#[derive(Debug)]
struct ParsedQuery {
    file: String,
    total: u64,
    keywords: Vec<Vec<u8>>,
}

#[derive(Debug)]
enum QueryError {
    MissingFile,
    InvalidTotal(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFile => write!(f, "missing or empty 'file' parameter"),
            Self::InvalidTotal(raw) => write!(f, "invalid 'total' parameter: {raw}"),
        }
    }
}

fn parse_query(raw: &str) -> Result<ParsedQuery, QueryError> {
    let mut file: Option<String> = None;
    let mut total_raw: Option<String> = None;
    let mut keywords = Vec::new();

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        match key.as_ref() {
            "file" => file = Some(value.into_owned()),
            "total" => total_raw = Some(value.into_owned()),
            "keywords" => keywords.push(value.into_owned().into_bytes()),
            _ => {}
        }
    }

    let file = file.filter(|f| !f.is_empty()).ok_or(QueryError::MissingFile)?;

    // A missing `total` defaults to the legal, immediately-exhausted `0`
    // (see DESIGN.md) rather than being rejected outright.
    let total_raw = total_raw.unwrap_or_else(|| "0".to_owned());
    let total: u64 = total_raw
        .parse()
        .map_err(|_| QueryError::InvalidTotal(total_raw.clone()))?;

    Ok(ParsedQuery {
        file,
        total,
        keywords,
    })
}

async fn handle_logs(
    raw_query: String,
    config: Arc<logs_core::Config>,
) -> Result<Box<dyn Reply>, Infallible> {
    let parsed = match parse_query(&raw_query) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "rejected malformed query");
            return Ok(unprocessable(&e.to_string()));
        }
    };

    let request = SearchRequest::new(parsed.file, parsed.total, parsed.keywords);

    let finder = match LineFinder::build(&config, &request) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "rejected invalid search");
            return Ok(unprocessable(&e.to_string()));
        }
    };

    let body_stream = finder.find_latest_lines().map(|item| match item {
        Ok(line) => Ok::<Bytes, Infallible>(Bytes::from(line)),
        Err(e) => {
            warn!(error = %e, "search ended with an error after streaming began");
            Ok(Bytes::from_static(PREMATURE_END_TRAILER))
        }
    });

    let response = warp::http::Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/octet-stream")
        .body(warp::hyper::Body::wrap_stream(body_stream))
        .expect("building a streaming response body never fails");

    Ok(Box::new(response))
}

fn unprocessable(message: &str) -> Box<dyn Reply> {
    Box::new(warp::reply::with_status(
        message.to_owned(),
        StatusCode::UNPROCESSABLE_ENTITY,
    ))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_file_total_and_repeated_keywords() {
        let parsed = parse_query("file=app.log&total=3&keywords=odd&keywords=1").unwrap();
        assert_eq!(parsed.file, "app.log");
        assert_eq!(parsed.total, 3);
        assert_eq!(parsed.keywords, vec![b"odd".to_vec(), b"1".to_vec()]);
    }

    #[test]
    fn missing_total_defaults_to_zero() {
        let parsed = parse_query("file=app.log").unwrap();
        assert_eq!(parsed.total, 0);
    }

    #[rstest]
    #[case::no_file("total=3")]
    #[case::empty_file("file=&total=3")]
    fn missing_or_empty_file_is_rejected(#[case] raw: &str) {
        let err = parse_query(raw).unwrap_err();
        assert!(matches!(err, QueryError::MissingFile));
    }

    #[rstest]
    #[case::negative("file=app.log&total=-1")]
    #[case::not_a_number("file=app.log&total=abc")]
    #[case::fractional("file=app.log&total=1.5")]
    fn malformed_total_is_rejected(#[case] raw: &str) {
        let err = parse_query(raw).unwrap_err();
        assert!(matches!(err, QueryError::InvalidTotal(_)));
    }
}
