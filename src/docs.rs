//! API documentation endpoints: the hand-maintained OpenAPI document and a Swagger UI
//! page that renders it.
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};

/// Path of the OpenAPI document, relative to the working directory.
pub const OPENAPI_PATH: &str = "openapi.yml";

/// Serves the OpenAPI specification YAML file.
///
/// Returns 404 when the file is missing from the working directory.
pub async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string(OPENAPI_PATH).await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Could not read {}: {}", OPENAPI_PATH, e);
            (
                StatusCode::NOT_FOUND,
                "OpenAPI spec not found. Run the server from the repository root.",
            )
                .into_response()
        }
    }
}

/// Serves the Swagger UI HTML page, pointed at `/api-docs/openapi.yml`.
pub async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Territory Scoring API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [SwaggerUIBundle.presets.apis]
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}
