use guia_puntana::storage::{
    Bucket, MockStorageService, S3StorageClient, StorageService, sanitize_key, upload_extension,
};
use uuid::Uuid;

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockStorageService::new();
        let key = "user-1/avatar.jpg";
        let url = mock
            .get_presigned_upload_url(Bucket::Avatars, key, "image/jpeg")
            .await
            .unwrap();

        assert!(url.contains("signature=fake"));
        assert!(url.contains("mock-avatars"));
        assert!(url.contains(key));
    }

    #[tokio::test]
    async fn test_mock_routes_documents_bucket() {
        let url = MockStorageService::new()
            .get_presigned_upload_url(Bucket::Documents, "user-1/dni.pdf", "application/pdf")
            .await
            .unwrap();

        assert!(url.contains("mock-documents"));
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        let result = mock
            .get_presigned_upload_url(Bucket::Avatars, "a.jpg", "image/jpeg")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let url = MockStorageService::new()
            .get_presigned_upload_url(Bucket::Avatars, "../../etc/passwd", "text/plain")
            .await
            .unwrap();

        assert!(!url.contains(".."));
        assert!(url.contains("etc/passwd"));
    }
}

mod key_tests {
    use super::*;

    #[test]
    fn test_sanitize_key_drops_traversal_segments() {
        assert_eq!(sanitize_key("a/../b/./c"), "a/b/c");
        assert_eq!(sanitize_key("//a//b"), "a/b");
        assert_eq!(sanitize_key(".."), "");
    }

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension("foto.JPG"), "jpg");
        assert_eq!(upload_extension("dni.frente.pdf"), "pdf");
        assert_eq!(upload_extension("sin-extension"), "bin");
        assert_eq!(upload_extension("raro.p$d"), "bin");
        assert_eq!(upload_extension("largo.abcdefghij"), "bin");
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    async fn client() -> S3StorageClient {
        S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "avatars",
            "documents",
        )
        .await
    }

    #[tokio::test]
    async fn test_s3_presigned_url_format() {
        let client = client().await;

        let key = format!("{}/dni.pdf", Uuid::new_v4());
        let url = client
            .get_presigned_upload_url(Bucket::Documents, &key, "application/pdf")
            .await
            .unwrap();

        // Presigning is local; no server has to be listening.
        assert!(url.contains("localhost:9000"));
        assert!(url.contains("/documents/"));
        assert!(url.contains(&key));
        assert!(url.contains("X-Amz-Signature"));
    }

    #[tokio::test]
    async fn test_s3_avatar_bucket_is_path_style() {
        let url = client()
            .await
            .get_presigned_upload_url(Bucket::Avatars, "u/a.png", "image/png")
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/avatars/u/a.png"));
    }
}
