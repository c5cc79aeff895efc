/// Integration tests for the SVG to PDF service.
///
/// These tests drive the full router with the real svg2pdf converter, from
/// API key check through validation to the PDF attachment response.
///
/// ## Running Tests
///
/// ```bash
/// cargo test --test convert_api_test
/// ```

#[cfg(test)]
mod tests {
    use axum::body::Bytes;
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::{TestResponse, TestServer};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use svg2pdf_service::{config::Config, routes, state::AppState};

    const TEST_API_KEY: &str = "test-api-key-123";
    const BOUNDARY: &str = "svg2pdf-test-boundary";

    const SAMPLE_SVG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg width="100" height="100" xmlns="http://www.w3.org/2000/svg">
  <circle cx="50" cy="50" r="40" fill="red"/>
</svg>"#;

    fn test_config() -> Config {
        Config {
            api_key: Some(TEST_API_KEY.to_string()),
            load_system_fonts: false,
            ..Config::default()
        }
    }

    fn server_with(config: Config) -> TestServer {
        TestServer::new(routes::router(AppState::with_svg2pdf(config))).unwrap()
    }

    fn server() -> TestServer {
        server_with(test_config())
    }

    fn key_header(value: &'static str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static(value),
        )
    }

    /// Builds a `multipart/form-data` body with a single `file` part.
    fn multipart_body(filename: Option<&str>, content_type: Option<&str>, content: &[u8]) -> Bytes {
        let mut disposition = "form-data; name=\"file\"".to_string();
        if let Some(filename) = filename {
            disposition.push_str(&format!("; filename=\"{filename}\""));
        }

        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Bytes::from(body)
    }

    async fn upload(
        server: &TestServer,
        filename: Option<&str>,
        content_type: Option<&str>,
        content: &[u8],
    ) -> TestResponse {
        let (name, value) = key_header(TEST_API_KEY);
        server
            .post("/v1/convert/svg/file")
            .add_header(name, value)
            .bytes(multipart_body(filename, content_type, content))
            .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
            .await
    }

    fn detail(response: &TestResponse) -> String {
        let body: Value = response.json();
        body["detail"].as_str().unwrap_or_default().to_string()
    }

    fn assert_pdf_attachment(response: &TestResponse, filename: &str) {
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "application/pdf");
        let disposition = response.header("content-disposition");
        let disposition = disposition.to_str().unwrap();
        assert!(disposition.starts_with("attachment"), "{disposition}");
        assert!(
            disposition.contains(&format!("filename=\"{filename}\"")),
            "{disposition}"
        );
        assert!(response.as_bytes().starts_with(b"%PDF"));
    }

    /// Test the health check endpoint.
    #[tokio::test]
    async fn test_health_endpoint() {
        let response = server().get("/health").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
    }

    /// Test SVG to PDF conversion via the JSON endpoint.
    #[tokio::test]
    async fn test_convert_svg_json() {
        let (name, value) = key_header(TEST_API_KEY);

        let response = server()
            .post("/v1/convert/svg")
            .add_header(name, value)
            .json(&json!({ "svg": SAMPLE_SVG, "filename": "circle.pdf" }))
            .await;

        assert_pdf_attachment(&response, "circle.pdf");
    }

    /// Test default and derived names on the JSON endpoint.
    #[tokio::test]
    async fn test_convert_svg_json_filenames() {
        let server = server();
        let cases = [
            (json!({ "svg": SAMPLE_SVG }), "output.pdf"),
            (json!({ "svg": SAMPLE_SVG, "filename": "myfile" }), "myfile.pdf"),
            (json!({ "svg": SAMPLE_SVG, "filename": "circle.svg" }), "circle.pdf"),
            (json!({ "svg": SAMPLE_SVG, "filename": null }), "output.pdf"),
        ];

        for (payload, expected) in cases {
            let (name, value) = key_header(TEST_API_KEY);
            let response = server
                .post("/v1/convert/svg")
                .add_header(name, value)
                .json(&payload)
                .await;

            assert_pdf_attachment(&response, expected);
        }
    }

    /// Test SVG to PDF conversion via file upload.
    #[tokio::test]
    async fn test_convert_svg_file() {
        let response = upload(
            &server(),
            Some("test.svg"),
            Some("image/svg+xml"),
            SAMPLE_SVG.as_bytes(),
        )
        .await;

        assert_pdf_attachment(&response, "test.pdf");
    }

    /// Test upload without a .svg extension but with an SVG content type.
    #[tokio::test]
    async fn test_convert_svg_file_without_extension() {
        let response = upload(
            &server(),
            Some("myfile"),
            Some("image/svg+xml"),
            SAMPLE_SVG.as_bytes(),
        )
        .await;

        assert_pdf_attachment(&response, "myfile.pdf");
    }

    /// Test that the filename extension is checked when the content type is missing.
    #[tokio::test]
    async fn test_convert_svg_file_extension_check() {
        let response = upload(&server(), Some("test.svg"), None, SAMPLE_SVG.as_bytes()).await;

        assert_pdf_attachment(&response, "test.pdf");
    }

    /// Test SVG without an XML declaration.
    #[tokio::test]
    async fn test_convert_svg_without_xml_declaration() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
    <rect x="10" y="10" width="80" height="80" fill="purple"/>
</svg>"#;

        let response = upload(&server(), Some("simple.svg"), Some("image/svg+xml"), svg).await;

        assert_pdf_attachment(&response, "simple.pdf");
    }

    /// Test conversion of an empty file.
    #[tokio::test]
    async fn test_convert_empty_file() {
        let response = upload(&server(), Some("empty.svg"), Some("image/svg+xml"), b"").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(detail(&response).to_lowercase().contains("empty"));
    }

    /// Test conversion with a non-SVG file.
    #[tokio::test]
    async fn test_convert_wrong_file_type() {
        let response = upload(&server(), Some("test.txt"), Some("text/plain"), b"plain text").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(detail(&response).to_lowercase().contains("invalid file type"));
    }

    /// Test conversion of content that is not SVG.
    #[tokio::test]
    async fn test_convert_invalid_svg() {
        let server = server();

        let response = upload(
            &server,
            Some("invalid.svg"),
            Some("image/svg+xml"),
            b"This is not valid SVG content",
        )
        .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(detail(&response).to_lowercase().contains("invalid svg"));

        let (name, value) = key_header(TEST_API_KEY);
        let response = server
            .post("/v1/convert/svg")
            .add_header(name, value)
            .json(&json!({ "svg": "not valid svg" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(detail(&response).to_lowercase().contains("invalid svg"));
    }

    /// Test an empty inline payload.
    #[tokio::test]
    async fn test_convert_empty_json() {
        let (name, value) = key_header(TEST_API_KEY);

        let response = server()
            .post("/v1/convert/svg")
            .add_header(name, value)
            .json(&json!({ "svg": "" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(detail(&response).contains("empty"));
    }

    /// Test conversion with an invalid API key.
    #[tokio::test]
    async fn test_convert_invalid_api_key() {
        let server = server();

        let (name, value) = key_header("wrong-key");
        let json_response = server
            .post("/v1/convert/svg")
            .add_header(name, value)
            .json(&json!({ "svg": SAMPLE_SVG, "filename": "fail.pdf" }))
            .await;
        json_response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(detail(&json_response), "Invalid API key");

        let (name, value) = key_header("wrong-key");
        let file_response = server
            .post("/v1/convert/svg/file")
            .add_header(name, value)
            .bytes(multipart_body(Some("test.svg"), Some("image/svg+xml"), SAMPLE_SVG.as_bytes()))
            .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
            .await;
        file_response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(detail(&file_response), "Invalid API key");
    }

    /// Test that a missing API key is rejected before the handler runs.
    #[tokio::test]
    async fn test_convert_missing_api_key() {
        let server = server();

        let json_response = server
            .post("/v1/convert/svg")
            .json(&json!({ "svg": SAMPLE_SVG }))
            .await;
        json_response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let file_response = server
            .post("/v1/convert/svg/file")
            .bytes(multipart_body(Some("test.svg"), Some("image/svg+xml"), SAMPLE_SVG.as_bytes()))
            .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
            .await;
        file_response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    /// Test that a server without a configured key rejects both endpoints.
    #[tokio::test]
    async fn test_convert_unconfigured_api_key() {
        let server = server_with(Config {
            load_system_fonts: false,
            ..Config::default()
        });

        let (name, value) = key_header(TEST_API_KEY);
        let json_response = server
            .post("/v1/convert/svg")
            .add_header(name, value)
            .json(&json!({ "svg": SAMPLE_SVG }))
            .await;
        json_response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail(&json_response), "API_KEY not configured on server");

        let file_response = upload(
            &server,
            Some("test.svg"),
            Some("image/svg+xml"),
            SAMPLE_SVG.as_bytes(),
        )
        .await;
        file_response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail(&file_response), "API_KEY not configured on server");
    }

    /// Test that an upload over the body limit is rejected with 413.
    #[tokio::test]
    async fn test_convert_oversized_upload() {
        let server = server_with(Config {
            max_upload_bytes: 512,
            ..test_config()
        });
        let padding = "x".repeat(4096);
        let svg = SAMPLE_SVG.replace("</svg>", &format!("<!-- {padding} --></svg>"));

        let response = upload(&server, Some("big.svg"), Some("image/svg+xml"), svg.as_bytes()).await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!detail(&response).is_empty());
    }

    /// Test that malformed XML is reported as invalid SVG, not a conversion error.
    #[tokio::test]
    async fn test_convert_malformed_attributes() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width=100 height="100"/>"#;

        let response = upload(&server(), Some("bad.svg"), Some("image/svg+xml"), svg).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let detail = detail(&response);
        assert!(detail.starts_with("Invalid SVG content"), "{detail}");
    }

    /// Test a multipart form without a `file` part.
    #[tokio::test]
    async fn test_convert_missing_file_field() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
        );
        let (name, value) = key_header(TEST_API_KEY);

        let response = server()
            .post("/v1/convert/svg/file")
            .add_header(name, value)
            .bytes(Bytes::from(body))
            .content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(detail(&response).contains("file"));
    }

    /// Converting the same SVG twice yields equivalent documents.
    #[tokio::test]
    async fn test_conversion_is_repeatable() {
        let server = server();
        let mut outputs = Vec::new();

        for _ in 0..2 {
            let (name, value) = key_header(TEST_API_KEY);
            let response = server
                .post("/v1/convert/svg")
                .add_header(name, value)
                .json(&json!({ "svg": SAMPLE_SVG }))
                .await;
            response.assert_status_ok();
            outputs.push(response.as_bytes().clone());
        }

        assert!(outputs.iter().all(|pdf| pdf.starts_with(b"%PDF")));
        assert_eq!(outputs[0].len(), outputs[1].len());
    }
}
