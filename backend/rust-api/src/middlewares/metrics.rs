use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Records request count and latency per method, route and status.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Replaces caller-chosen path segments with route placeholders so label
/// cardinality stays bounded.
fn normalize_path(path: &str) -> String {
    let mut normalized = Vec::new();
    let mut previous = "";

    for segment in path.split('/') {
        let placeholder = match previous {
            "users" => Some("{user_id}"),
            "sessions" => Some("{session_id}"),
            "questions" => Some("{question_id}"),
            _ if is_uuid_like(segment) => Some("{id}"),
            _ => None,
        };
        normalized.push(match placeholder {
            Some(p) if !segment.is_empty() => p,
            _ => segment,
        });
        previous = segment;
    }

    normalized.join("/")
}

/// Check if string looks like a UUID
fn is_uuid_like(s: &str) -> bool {
    s.len() == 36 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_user_routes() {
        assert_eq!(
            normalize_path("/api/v1/users/alice/next"),
            "/api/v1/users/{user_id}/next"
        );
        assert_eq!(
            normalize_path("/api/v1/users/bob/sessions/550e8400-e29b-41d4-a716-446655440000/complete"),
            "/api/v1/users/{user_id}/sessions/{session_id}/complete"
        );
        assert_eq!(normalize_path("/api/v1/users/bob/sessions"), "/api/v1/users/{user_id}/sessions");
    }

    #[test]
    fn test_normalize_static_routes() {
        assert_eq!(
            normalize_path("/api/v1/catalog/questions/q-17"),
            "/api/v1/catalog/questions/{question_id}"
        );
        assert_eq!(normalize_path("/api/v1/catalog/questions"), "/api/v1/catalog/questions");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn test_is_uuid_like() {
        assert!(is_uuid_like("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_uuid_like("not-a-uuid"));
        assert!(!is_uuid_like("12345"));
    }
}
