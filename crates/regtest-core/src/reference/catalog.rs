//! Remote reference catalog (Girder REST API)

use crate::{
    error::CatalogError,
    runtime::RemoteSettings,
};
use reqwest::blocking::{
    Client as HttpClient,
    RequestBuilder,
};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    env,
    fs,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

const TOKEN_HEADER: &str = "Girder-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// A folder or item of the catalog with its nested entries by name.
///
/// Items are leaves without children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderNode {
    pub id: String,
    pub children: BTreeMap<String, FolderNode>,
}

impl FolderNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: BTreeMap::new(),
        }
    }

    pub fn with_child(
        mut self,
        name: impl Into<String>,
        child: FolderNode,
    ) -> Self {
        self.children.insert(name.into(), child);
        self
    }

    pub fn child(
        &self,
        name: &str,
    ) -> Option<&FolderNode> {
        self.children.get(name)
    }
}

/// Read access to a remote reference catalog
pub trait CatalogClient: Send {
    /// Full tree below the folder `root_id`
    fn folder_tree(
        &mut self,
        root_id: &str,
    ) -> Result<FolderNode, CatalogError>;

    /// Download an item into `dest_dir` under its item name
    fn download_item(
        &mut self,
        item_id: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, CatalogError>;

    /// Download every item directly inside a folder into `dest_dir`
    fn download_folder_files(
        &mut self,
        folder_id: &str,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "_id")]
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AuthToken {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    auth_token: AuthToken,
}

/// HTTP client of a Girder server; authenticates on first use.
#[derive(Debug)]
pub struct GirderCatalog {
    http: HttpClient,
    api_url: String,
    api_key_env: String,
    token: Option<String>,
}

impl GirderCatalog {
    pub fn new(settings: &RemoteSettings) -> Result<Self, CatalogError> {
        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key_env: settings.api_key_env.clone(),
            token: None,
        })
    }

    fn endpoint(
        &self,
        path: &str,
    ) -> String {
        format!("{}/{}", self.api_url, path)
    }

    fn token(&mut self) -> Result<String, CatalogError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let key = env::var(&self.api_key_env).map_err(|_| {
            CatalogError::Auth(format!("environment variable {} is not set", self.api_key_env))
        })?;
        let response = self
            .http
            .post(self.endpoint("api_key/token"))
            .query(&[("key", key.as_str())])
            .send()?;
        if !response.status().is_success() {
            return Err(CatalogError::Auth(format!(
                "server answered {}",
                response.status()
            )));
        }
        let token = response.json::<TokenResponse>()?.auth_token.token;
        tracing::debug!("Authenticated with {}", self.api_url);
        self.token = Some(token.clone());
        Ok(token)
    }

    fn get(
        &mut self,
        path: &str,
    ) -> Result<RequestBuilder, CatalogError> {
        let token = self.token()?;
        Ok(self.http.get(self.endpoint(path)).header(TOKEN_HEADER, token))
    }

    fn list_folders(
        &mut self,
        parent_id: &str,
    ) -> Result<Vec<Entry>, CatalogError> {
        Ok(self
            .get("folder")?
            .query(&[
                ("parentType", "folder"),
                ("parentId", parent_id),
                ("limit", "0"),
            ])
            .send()?
            .error_for_status()?
            .json()?)
    }

    fn list_items(
        &mut self,
        folder_id: &str,
    ) -> Result<Vec<Entry>, CatalogError> {
        Ok(self
            .get("item")?
            .query(&[("folderId", folder_id), ("limit", "0")])
            .send()?
            .error_for_status()?
            .json()?)
    }

    fn item_name(
        &mut self,
        item_id: &str,
    ) -> Result<String, CatalogError> {
        let entry: Entry = self
            .get(&format!("item/{}", item_id))?
            .send()?
            .error_for_status()?
            .json()?;
        if entry.id != item_id {
            return Err(CatalogError::Response(format!(
                "asked for item {}, got {}",
                item_id, entry.id
            )));
        }
        Ok(entry.name)
    }

    fn download_named(
        &mut self,
        item_id: &str,
        name: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, CatalogError> {
        let bytes = self
            .get(&format!("item/{}/download", item_id))?
            .send()?
            .error_for_status()?
            .bytes()?;
        fs::create_dir_all(dest_dir)?;
        let path = dest_dir.join(name);
        fs::write(&path, &bytes)?;
        Ok(path)
    }
}

impl CatalogClient for GirderCatalog {
    fn folder_tree(
        &mut self,
        root_id: &str,
    ) -> Result<FolderNode, CatalogError> {
        let mut node = FolderNode::new(root_id);
        for item in self.list_items(root_id)? {
            node.children.insert(item.name, FolderNode::new(item.id));
        }
        for folder in self.list_folders(root_id)? {
            let subtree = self.folder_tree(&folder.id)?;
            node.children.insert(folder.name, subtree);
        }
        Ok(node)
    }

    fn download_item(
        &mut self,
        item_id: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, CatalogError> {
        let name = self.item_name(item_id)?;
        self.download_named(item_id, &name, dest_dir)
    }

    fn download_folder_files(
        &mut self,
        folder_id: &str,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, CatalogError> {
        self.list_items(folder_id)?
            .into_iter()
            .map(|item| self.download_named(&item.id, &item.name, dest_dir))
            .collect()
    }
}
