use std::path::PathBuf;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use plotmap_shared::{decode_plot_file, encode_plot_file, PlotFileData};

const PLOT_FILE_NAME: &str = "plots.bin";

#[async_trait]
pub trait Storage: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    async fn load_plots(&self) -> Result<Option<PlotFileData>, String>;
    async fn save_plots(&self, data: &PlotFileData) -> Result<(), String>;
}

pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn path(&self) -> PathBuf {
        self.data_dir.join(PLOT_FILE_NAME)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load_plots(&self) -> Result<Option<PlotFileData>, String> {
        let path = self.path();
        let payload = match tokio::fs::read(&path).await {
            Ok(payload) => payload,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(format!("Failed to read {}: {error}", path.display())),
        };
        decode_plot_file(&payload)
            .map(Some)
            .map_err(|error| format!("Failed to decode {}: {error}", path.display()))
    }

    async fn save_plots(&self, data: &PlotFileData) -> Result<(), String> {
        let payload = encode_plot_file(data).map_err(|error| error.to_string())?;
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|error| format!("Failed to create {}: {error}", self.data_dir.display()))?;
        // Staged write, then rename over the live file.
        let path = self.path();
        let staging = path.with_extension("bin.tmp");
        tokio::fs::write(&staging, payload)
            .await
            .map_err(|error| format!("Failed to write {}: {error}", staging.display()))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|error| format!("Failed to replace {}: {error}", path.display()))
    }
}

#[derive(Clone, Debug)]
pub struct S3StorageConfig {
    pub bucket: String,
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl S3StorageConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            region: None,
            endpoint_url: None,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

pub struct S3Storage {
    bucket: String,
    prefix: String,
    client: Client,
}

impl S3Storage {
    pub async fn new(config: S3StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let (Some(access_key_id), Some(secret_access_key)) = (
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
        ) {
            let creds = Credentials::new(access_key_id, secret_access_key, None, None, "static");
            loader = loader.credentials_provider(creds);
        }
        if let Some(region) = config.region.clone() {
            loader = loader.region(aws_config::Region::new(region));
        }
        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint_url) = config.endpoint_url.as_ref() {
            builder = builder.endpoint_url(endpoint_url);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());
        let prefix = config
            .prefix
            .unwrap_or_default()
            .trim_matches('/')
            .to_string();
        Self {
            bucket: config.bucket,
            prefix,
            client,
        }
    }

    fn object_key(&self) -> String {
        object_key(&self.prefix)
    }
}

fn object_key(prefix: &str) -> String {
    if prefix.is_empty() {
        PLOT_FILE_NAME.to_string()
    } else {
        format!("{prefix}/{PLOT_FILE_NAME}")
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn load_plots(&self) -> Result<Option<PlotFileData>, String> {
        let key = self.object_key();
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;
        let output = match response {
            Ok(output) => output,
            Err(error) => {
                if let Some(service_error) = error.as_service_error() {
                    if service_error.is_no_such_key() {
                        return Ok(None);
                    }
                }
                return Err(format!("Failed to load s3://{}/{key}: {error:?}", self.bucket));
            }
        };
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|error| format!("Failed to read s3://{}/{key}: {error:?}", self.bucket))?
            .into_bytes();
        decode_plot_file(&bytes)
            .map(Some)
            .map_err(|error| format!("Failed to decode s3://{}/{key}: {error}", self.bucket))
    }

    async fn save_plots(&self, data: &PlotFileData) -> Result<(), String> {
        let key = self.object_key();
        let payload = encode_plot_file(data).map_err(|error| error.to_string())?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(payload))
            .send()
            .await
            .map(|_| ())
            .map_err(|error| format!("Failed to save s3://{}/{key}: {error:?}", self.bucket))
    }
}
