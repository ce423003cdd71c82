use std::sync::Arc;

use axum::Router;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::minio::MinIO;
use testcontainers_modules::mongo::Mongo;

use deptkb::app::{build_router, AppState};
use deptkb::db::repositories::Repositories;
use deptkb::demo_seeder::seed_demo_data;
use deptkb::storage::client::{S3StorageClient, StorageClient};

/// Holds running containers and provides the Axum router for integration tests.
///
/// Containers are kept alive for as long as this struct lives. When dropped,
/// containers are stopped and cleaned up automatically.
pub struct TestEnv {
    _mongo: ContainerAsync<Mongo>,
    _minio: ContainerAsync<MinIO>,
    pub router: Router,
    pub repos: Repositories,
    pub storage: Arc<dyn StorageClient>,
}

impl TestEnv {
    /// Spin up MongoDB (as a replica set, for transactions) and MinIO, seed
    /// the demo data and build the router.
    pub async fn start() -> Self {
        let (mongo_container, minio_container) =
            tokio::join!(Mongo::repl_set().start(), MinIO::default().start());
        let mongo_container = mongo_container.expect("Failed to start MongoDB container");
        let minio_container = minio_container.expect("Failed to start MinIO container");

        // --- MongoDB ---
        let mongo_port = mongo_container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");
        let mongo_uri = format!("mongodb://127.0.0.1:{}/?directConnection=true", mongo_port);
        let mongo_client = mongodb::Client::with_uri_str(&mongo_uri)
            .await
            .expect("Failed to connect to MongoDB");
        let repos = Repositories::mongo(&mongo_client, "deptkb_test")
            .await
            .expect("Failed to prepare repositories");

        // --- MinIO (S3) ---
        let minio_port = minio_container
            .get_host_port_ipv4(9000)
            .await
            .expect("Failed to get MinIO port");
        let minio_endpoint = format!("http://127.0.0.1:{}", minio_port);

        unsafe {
            std::env::set_var("AWS_ACCESS_KEY_ID", "minioadmin");
            std::env::set_var("AWS_SECRET_ACCESS_KEY", "minioadmin");
        }

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .endpoint_url(&minio_endpoint)
            .region(aws_config::Region::new("us-east-1"))
            .load()
            .await;
        let s3_client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::config::Builder::from(&s3_config)
                .force_path_style(true)
                .build(),
        );

        let bucket_name = "deptkb-test";
        let _ = s3_client.create_bucket().bucket(bucket_name).send().await;

        let storage: Arc<dyn StorageClient> =
            Arc::new(S3StorageClient::new(s3_client, bucket_name.to_string()));

        seed_demo_data(&repos)
            .await
            .expect("Failed to seed demo data");

        let router = build_router(AppState {
            repos: repos.clone(),
            storage: storage.clone(),
            demo_mode: true,
        });

        Self {
            _mongo: mongo_container,
            _minio: minio_container,
            router,
            repos,
            storage,
        }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .expect_success_by_default()
            .build(self.router.clone())
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .build(self.router.clone())
    }

    /// Identifier of a seeded department.
    pub async fn department_id(&self, slug: &str) -> String {
        self.repos
            .departments
            .find_by_slug(slug)
            .await
            .expect("Failed to query departments")
            .expect("Department not seeded")
            .id
    }

    /// Identifier of a seeded category.
    pub async fn category_id(&self, department_slug: &str, name: &str) -> String {
        let department = self.department_id(department_slug).await;
        self.repos
            .categories
            .list(&deptkb::access::Scope::unrestricted())
            .await
            .expect("Failed to query categories")
            .into_iter()
            .find(|c| c.name == name && c.department_id == department)
            .expect("Category not seeded")
            .id
    }
}

/// Log in as a demo user; the session cookie is kept by the server.
pub async fn login(server: &axum_test::TestServer, username: &str) {
    server
        .post("/api/auth/login")
        .json(&serde_json::json!({
            "username": username,
            "password": username
        }))
        .await
        .assert_status_ok();
}
