// Repository fetching - branch archives downloaded over HTTPS, no git protocol
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tracing::{debug, info};

use crate::ingest::{IngestError, Ingestor, LanguageSources};

pub const DEFAULT_BRANCH: &str = "main";

lazy_static! {
    static ref REPO_URL: Regex =
        Regex::new(r"^https://github\.com/([\w.-]+)/([\w.-]+?)(?:\.git)?/?(?:[/?#].*)?$").unwrap();
    static ref BRANCH_NAME: Regex = Regex::new(r"^[\w./-]+$").unwrap();
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Invalid GitHub repository URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid branch name: {0}")]
    InvalidBranch(String),

    #[error("Depth must be between 1 and 3, got {0}")]
    InvalidDepth(u8),

    #[error("Failed to download repository: {0}")]
    Download(String),

    #[error("Failed to download repository: HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error(transparent)]
    Archive(#[from] IngestError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRequest {
    pub repository_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Accepted for compatibility; analysis always covers the whole archive.
    #[serde(default = "default_depth")]
    pub depth: u8,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_depth() -> u8 {
    1
}

impl RepoRequest {
    pub fn validate(&self) -> Result<RepoRef, RepoError> {
        if !(1..=3).contains(&self.depth) {
            return Err(RepoError::InvalidDepth(self.depth));
        }
        if !BRANCH_NAME.is_match(&self.branch) || self.branch.contains("..") {
            return Err(RepoError::InvalidBranch(self.branch.clone()));
        }
        RepoRef::parse(&self.repository_url)
    }

    pub fn cache_key_source(&self) -> String {
        format!("{}:{}", self.repository_url, self.branch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    /// Repository name without a `.git` suffix
    pub repo: String,
}

impl RepoRef {
    pub fn parse(url: &str) -> Result<Self, RepoError> {
        let caps = REPO_URL
            .captures(url.trim())
            .ok_or_else(|| RepoError::InvalidUrl(url.to_string()))?;
        Ok(Self {
            owner: caps[1].to_string(),
            repo: caps[2].to_string(),
        })
    }

    pub fn archive_url(&self, base: &str, branch: &str) -> String {
        format!(
            "{}/{}/{}/archive/refs/heads/{}.zip",
            base.trim_end_matches('/'),
            self.owner,
            self.repo,
            branch
        )
    }
}

pub struct RepoFetcher {
    client: reqwest::Client,
    archive_base: String,
}

impl RepoFetcher {
    pub fn new(client: reqwest::Client, archive_base: impl Into<String>) -> Self {
        Self {
            client,
            archive_base: archive_base.into(),
        }
    }

    /// One GET of the branch archive; any non-2xx status is an error.
    pub async fn download(&self, repo: &RepoRef, branch: &str) -> Result<Vec<u8>, RepoError> {
        let url = repo.archive_url(&self.archive_base, branch);
        info!("Downloading {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RepoError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepoError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RepoError::Download(e.to_string()))?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    /// Download and extract a branch into sources. Extraction runs on the
    /// blocking pool and its scratch directory is gone when this returns.
    pub async fn fetch_sources(
        &self,
        repo: &RepoRef,
        branch: &str,
        ingestor: Ingestor,
    ) -> Result<LanguageSources, RepoError> {
        let bytes = self.download(repo, branch).await?;

        let sources = tokio::task::spawn_blocking(move || ingestor.ingest_archive(&bytes))
            .await
            .map_err(|e| RepoError::Archive(IngestError::Io(io::Error::other(e))))??;

        info!("{}/{}@{}: {} source files", repo.owner, repo.repo, branch, sources.len());
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::tests::zip_fixture;
    use axum::extract::Path as UrlPath;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;

    fn request(url: &str) -> RepoRequest {
        RepoRequest {
            repository_url: url.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            depth: 1,
        }
    }

    #[test]
    fn test_parse_urls() {
        let repo = RepoRef::parse("https://github.com/octo/hello-world.git").unwrap();
        assert_eq!(repo.owner, "octo");
        assert_eq!(repo.repo, "hello-world");

        let repo = RepoRef::parse("https://github.com/octo/my.repo/tree/dev").unwrap();
        assert_eq!(repo.repo, "my.repo");

        assert!(RepoRef::parse("https://gitlab.com/octo/repo").is_err());
        assert!(RepoRef::parse("http://github.com/octo/repo").is_err());
        assert!(RepoRef::parse("https://github.com/octo").is_err());
    }

    #[test]
    fn test_archive_url() {
        let repo = RepoRef::parse("https://github.com/octo/repo").unwrap();
        assert_eq!(
            repo.archive_url("https://github.com/", "dev"),
            "https://github.com/octo/repo/archive/refs/heads/dev.zip"
        );
    }

    #[test]
    fn test_request_validation() {
        assert!(request("https://github.com/a/b").validate().is_ok());

        let mut deep = request("https://github.com/a/b");
        deep.depth = 4;
        assert!(matches!(deep.validate(), Err(RepoError::InvalidDepth(4))));

        let mut branch = request("https://github.com/a/b");
        branch.branch = "../../etc".to_string();
        assert!(matches!(branch.validate(), Err(RepoError::InvalidBranch(_))));
    }

    #[test]
    fn test_request_defaults() {
        let req: RepoRequest =
            serde_json::from_str(r#"{"repository_url": "https://github.com/a/b"}"#).unwrap();
        assert_eq!(req.branch, "main");
        assert_eq!(req.depth, 1);
        assert_eq!(req.cache_key_source(), "https://github.com/a/b:main");
    }

    async fn archive_server() -> String {
        let app = Router::new().route(
            "/{owner}/{repo}/archive/refs/heads/{file}",
            get(|UrlPath((_, _, file)): UrlPath<(String, String, String)>| async move {
                if file == "main.zip" {
                    zip_fixture(&[("repo-main/app.py", "import flask\n")]).into_response()
                } else {
                    StatusCode::NOT_FOUND.into_response()
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_sources() {
        let base = archive_server().await;
        let fetcher = RepoFetcher::new(reqwest::Client::new(), base);
        let repo = RepoRef::parse("https://github.com/octo/repo").unwrap();

        let sources = fetcher
            .fetch_sources(&repo, "main", Ingestor::analysis(1024 * 1024))
            .await
            .unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources.files()[0].name, "repo-main/app.py");
    }

    #[tokio::test]
    async fn test_missing_branch_is_upstream_error() {
        let base = archive_server().await;
        let fetcher = RepoFetcher::new(reqwest::Client::new(), base);
        let repo = RepoRef::parse("https://github.com/octo/repo").unwrap();

        let err = fetcher.download(&repo, "nope").await.unwrap_err();
        assert!(matches!(err, RepoError::Status { status: 404, .. }));
    }
}
