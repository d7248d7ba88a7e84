//! API integration tests for the conversion endpoint.
//!
//! Tests verify:
//! - Successful conversion of several input formats
//! - Download headers (`Content-Type`, `Content-Disposition`)
//! - Field validation and upload rejections
//! - HTTP response codes and JSON error bodies

use axum::http::StatusCode;
use http_body_util::BodyExt;
use image::ImageFormat;
use serde_json::Value;
use tower::ServiceExt;

use webp_converter::RouterConfig;

use super::test_utils::{
    convert_form, convert_request, create_test_image, create_test_rgba_png, is_valid_webp,
    webp_dimensions, MultipartBuilder, TestApp,
};

async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Successful Conversion
// =============================================================================

#[tokio::test]
async fn test_convert_png_success() {
    let app = TestApp::new();
    let png = create_test_image(64, 48, ImageFormat::Png);

    let response = app
        .router
        .clone()
        .oneshot(convert_request(convert_form(&png, "holiday", "80")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/webp"
    );
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"holiday.webp\""
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_webp(&body), "Response should be a valid WebP");
    assert_eq!(webp_dimensions(&body), (64, 48));
}

#[tokio::test]
async fn test_convert_jpeg_and_gif() {
    let app = TestApp::new();

    for format in [ImageFormat::Jpeg, ImageFormat::Gif, ImageFormat::Bmp] {
        let data = create_test_image(32, 32, format);
        let body = MultipartBuilder::new()
            .file("image", "input.bin", "image/anything", &data)
            .text("filename", "converted")
            .text("quality", "60")
            .build();

        let response = app
            .router
            .clone()
            .oneshot(convert_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "format {:?}", format);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(is_valid_webp(&body));
        assert_eq!(webp_dimensions(&body), (32, 32));
    }
}

#[tokio::test]
async fn test_convert_with_transparency() {
    let app = TestApp::new();
    let png = create_test_rgba_png(20, 20);

    let response = app
        .router
        .clone()
        .oneshot(convert_request(convert_form(&png, "alpha", "90")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let decoded = image::load_from_memory_with_format(&body, ImageFormat::WebP).unwrap();
    assert!(decoded.color().has_alpha());
}

#[tokio::test]
async fn test_quality_extremes_keep_dimensions() {
    let app = TestApp::new();
    let png = create_test_image(100, 60, ImageFormat::Png);

    let mut sizes = Vec::new();
    for quality in ["1", "100"] {
        let response = app
            .router
            .clone()
            .oneshot(convert_request(convert_form(&png, "q", quality)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(webp_dimensions(&body), (100, 60));
        sizes.push(body.len());
    }

    assert!(sizes[1] >= sizes[0], "q100 should not be smaller than q1");
}

#[tokio::test]
async fn test_filename_used_verbatim_in_header() {
    let app = TestApp::new();
    let png = create_test_image(8, 8, ImageFormat::Png);

    let response = app
        .router
        .clone()
        .oneshot(convert_request(convert_form(&png, "my photo", "50")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"my photo.webp\""
    );
}

#[tokio::test]
async fn test_path_like_filename_stays_in_scratch() {
    let app = TestApp::new();
    let png = create_test_image(8, 8, ImageFormat::Png);

    let response = app
        .router
        .clone()
        .oneshot(convert_request(convert_form(&png, "../../escape", "50")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let _ = response.into_body().collect().await.unwrap();

    assert!(!app.root.path().join("escape.webp").exists());
    assert!(app.scratch_is_empty());
}

// =============================================================================
// Validation Errors
// =============================================================================

#[tokio::test]
async fn test_invalid_quality_values() {
    let app = TestApp::new();
    let png = create_test_image(8, 8, ImageFormat::Png);

    for quality in ["0", "101", "abc", "50.5", ""] {
        let response = app
            .router
            .clone()
            .oneshot(convert_request(convert_form(&png, "x", quality)))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "quality {:?}",
            quality
        );

        let json = json_body(response).await;
        let errors = json["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["field"], "quality");
    }

    assert!(app.scratch_is_empty());
}

#[tokio::test]
async fn test_missing_or_empty_filename() {
    let app = TestApp::new();
    let png = create_test_image(8, 8, ImageFormat::Png);

    let empty = convert_form(&png, "", "80");
    let missing = MultipartBuilder::new()
        .file("image", "a.png", "image/png", &png)
        .text("quality", "80")
        .build();

    for body in [empty, missing] {
        let response = app
            .router
            .clone()
            .oneshot(convert_request(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        assert_eq!(json["errors"][0]["field"], "filename");
    }

    assert!(app.scratch_is_empty());
}

#[tokio::test]
async fn test_all_field_errors_reported_together() {
    let app = TestApp::new();
    let body = MultipartBuilder::new().text("quality", "999").build();

    let response = app
        .router
        .clone()
        .oneshot(convert_request(body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    let fields: Vec<_> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["filename", "quality"]);
}

#[tokio::test]
async fn test_missing_image() {
    let app = TestApp::new();
    let body = MultipartBuilder::new()
        .text("filename", "x")
        .text("quality", "80")
        .build();

    let response = app
        .router
        .clone()
        .oneshot(convert_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "No image was provided");
}

#[tokio::test]
async fn test_text_image_field_counts_as_missing_image() {
    let app = TestApp::new();
    let body = MultipartBuilder::new()
        .text("image", "not a file")
        .text("filename", "x")
        .text("quality", "80")
        .build();

    let response = app
        .router
        .clone()
        .oneshot(convert_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "No image was provided");
    assert!(app.scratch_is_empty());
}

// =============================================================================
// Upload Rejections
// =============================================================================

#[tokio::test]
async fn test_non_image_upload_rejected() {
    let app = TestApp::new();
    let body = MultipartBuilder::new()
        .file("image", "notes.txt", "text/plain", b"hello world")
        .text("filename", "notes")
        .text("quality", "80")
        .build();

    let response = app
        .router
        .clone()
        .oneshot(convert_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "The uploaded file is not a valid image");
    assert!(app.scratch_is_empty());
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let app = TestApp::with_config(
        RouterConfig::new()
            .with_tracing(false)
            .with_max_upload_size(1024),
    );
    let png = create_test_image(256, 256, ImageFormat::Png);
    assert!(png.len() > 1024);

    let response = app
        .router
        .clone()
        .oneshot(convert_request(convert_form(&png, "big", "80")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("File is too large"));
    assert!(app.scratch_is_empty());
}

#[tokio::test]
async fn test_unexpected_file_field_rejected() {
    let app = TestApp::new();
    let png = create_test_image(8, 8, ImageFormat::Png);
    let body = MultipartBuilder::new()
        .file("attachment", "a.png", "image/png", &png)
        .text("filename", "x")
        .text("quality", "80")
        .build();

    let response = app
        .router
        .clone()
        .oneshot(convert_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Unexpected field: attachment");
}

#[tokio::test]
async fn test_undecodable_image_is_server_error() {
    let app = TestApp::new();
    let body = MultipartBuilder::new()
        .file("image", "fake.png", "image/png", b"definitely not a png")
        .text("filename", "fake")
        .text("quality", "80")
        .build();

    let response = app
        .router
        .clone()
        .oneshot(convert_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Error processing the image");
    assert!(app.scratch_is_empty());
}
