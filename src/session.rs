use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{DeptError, Result};
use crate::types::AuthSession;

/// Backend URL used when nothing is stored and no flag is given.
pub const DEFAULT_BASE_URL: &str = "http://localhost:4000/";

pub trait SessionStore {
    fn session(&self) -> Result<Option<AuthSession>>;
    fn set_session(&self, session: &AuthSession) -> Result<()>;
    fn clear_session(&self) -> Result<()>;
    fn base_url(&self) -> Result<Option<String>>;
    fn set_base_url(&self, url: &str) -> Result<()>;
}

pub struct LocalFsStore {
    path: PathBuf,
}

impl LocalFsStore {
    pub fn new() -> Result<Self> {
        let proj = ProjectDirs::from("io", "deptctl", "deptctl").ok_or_else(|| {
            DeptError::storage_error("initialization", "could not resolve data dir")
        })?;
        let root = proj.data_local_dir();
        fs::create_dir_all(root)?;
        Ok(Self {
            path: root.join("session.json"),
        })
    }

    fn read_doc(&self) -> Result<SessionDoc> {
        if !self.path.exists() {
            return Ok(SessionDoc::default());
        }
        let file = fs::File::open(&self.path)?;
        Ok(serde_json::from_reader(file)?)
    }

    fn write_doc(&self, doc: &SessionDoc) -> Result<()> {
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/* ---------- On-disk document shape ----------
{
  "base_url": "http://localhost:4000/",
  "session": { "token": "...", "email": "...", "logged_in_at": "..." }
}
---------------------------------------------- */

#[derive(Serialize, Deserialize, Default)]
struct SessionDoc {
    base_url: Option<String>,
    session: Option<AuthSession>,
}

impl SessionStore for LocalFsStore {
    fn session(&self) -> Result<Option<AuthSession>> {
        Ok(self.read_doc()?.session)
    }

    fn set_session(&self, session: &AuthSession) -> Result<()> {
        let mut doc = self.read_doc()?;
        doc.session = Some(session.clone());
        self.write_doc(&doc)
    }

    fn clear_session(&self) -> Result<()> {
        let mut doc = self.read_doc()?;
        doc.session = None;
        self.write_doc(&doc)
    }

    fn base_url(&self) -> Result<Option<String>> {
        Ok(self.read_doc()?.base_url)
    }

    fn set_base_url(&self, url: &str) -> Result<()> {
        let mut doc = self.read_doc()?;
        doc.base_url = Some(url.to_string());
        self.write_doc(&doc)
    }
}
