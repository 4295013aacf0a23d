//! Persisted player list
//!
//! The YAML file is the only source of truth for which players exist. The
//! background checker re-reads it when its fingerprint changes; the HTTP layer
//! mutates it through read-modify-write cycles that end in an atomic rename.

use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, StoreError};
use crate::models::{Endpoint, IpPort, UpdatePlayerRequest};

const PLAYERS_KEY: &str = "players";

/// Whole contents of the players file
///
/// Unknown top-level keys and unknown per-player keys are kept as raw YAML so
/// they survive a rewrite untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayersDocument {
    root: Mapping,
}

impl PlayersDocument {
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let root = match serde_yaml::from_str::<Value>(text)? {
            Value::Mapping(map) => map,
            // Legacy files hold a bare list
            Value::Sequence(seq) => {
                let mut map = Mapping::new();
                map.insert(Value::from(PLAYERS_KEY), Value::Sequence(seq));
                map
            }
            Value::Null => Mapping::new(),
            other => {
                warn!(root = ?other, "Players file root is not a mapping, treating as empty");
                Mapping::new()
            }
        };
        Ok(Self { root })
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut root = self.root.clone();
        if !matches!(root.get(PLAYERS_KEY), Some(Value::Sequence(_))) {
            root.insert(Value::from(PLAYERS_KEY), Value::Sequence(Vec::new()));
        }
        serde_yaml::to_string(&root)
    }

    /// Raw access to a top-level key other than `players`
    pub fn extra(&self, key: &str) -> Option<&Value> {
        if key == PLAYERS_KEY {
            return None;
        }
        self.root.get(key)
    }

    fn entries(&self) -> &[Value] {
        match self.root.get(PLAYERS_KEY) {
            Some(Value::Sequence(seq)) => seq,
            _ => &[],
        }
    }

    fn entries_mut(&mut self) -> &mut Vec<Value> {
        let key = Value::from(PLAYERS_KEY);
        if !matches!(self.root.get(&key), Some(Value::Sequence(_))) {
            self.root.insert(key.clone(), Value::Sequence(Vec::new()));
        }
        match self.root.get_mut(&key) {
            Some(Value::Sequence(seq)) => seq,
            _ => unreachable!("players key was just set to a sequence"),
        }
    }

    /// Valid players in file order
    ///
    /// Entries without a name, without an address, with a malformed address or
    /// repeating an earlier address are skipped with a warning.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let mut seen = HashSet::new();
        let mut players = Vec::with_capacity(self.entries().len());

        for entry in self.entries() {
            let name = field_text(entry, "name");
            let ip_port = field_text(entry, "ip_port");

            let (Some(name), Some(ip_port)) = (name, ip_port) else {
                warn!(entry = ?entry, "Skip invalid player entry: missing name or ip_port");
                continue;
            };

            match Endpoint::new(Some(name.as_str()), &ip_port) {
                Ok(endpoint) => {
                    if seen.insert(endpoint.ip_port.clone()) {
                        players.push(endpoint);
                    } else {
                        warn!(ip_port = %endpoint.ip_port, "Skip duplicate player entry");
                    }
                }
                Err(e) => warn!(entry = ?entry, error = %e, "Skip invalid player entry"),
            }
        }

        players
    }

    pub fn contains(&self, ip_port: &IpPort) -> bool {
        self.position(ip_port).is_some()
    }

    fn position(&self, ip_port: &IpPort) -> Option<usize> {
        self.entries()
            .iter()
            .position(|entry| has_ip_port(entry, ip_port))
    }

    /// Append a player, rejecting an address that is already present
    pub fn add(&mut self, endpoint: &Endpoint) -> AppResult<()> {
        if self.contains(&endpoint.ip_port) {
            return Err(AppError::Conflict(format!(
                "player {} already exists",
                endpoint.ip_port
            )));
        }

        let mut entry = Mapping::new();
        entry.insert("name".into(), endpoint.name.clone().into());
        entry.insert("ip_port".into(), endpoint.ip_port.to_string().into());
        self.entries_mut().push(Value::Mapping(entry));
        Ok(())
    }

    /// Remove every entry with the given address, returning the first one
    pub fn remove(&mut self, ip_port: &IpPort) -> AppResult<Endpoint> {
        let index = self
            .position(ip_port)
            .ok_or_else(|| AppError::NotFound(format!("player {} not found", ip_port)))?;
        let name = field_text(&self.entries()[index], "name");
        self.entries_mut().retain(|entry| !has_ip_port(entry, ip_port));
        Ok(Endpoint::new(name.as_deref(), ip_port.as_str())?)
    }

    /// Edit name and/or address of a player in place, keeping its other keys
    pub fn update(&mut self, ip_port: &IpPort, req: &UpdatePlayerRequest) -> AppResult<Endpoint> {
        let index = self
            .position(ip_port)
            .ok_or_else(|| AppError::NotFound(format!("player {} not found", ip_port)))?;

        let target = match req.ip_port.as_deref() {
            Some(raw) => raw.parse::<IpPort>()?,
            None => ip_port.clone(),
        };
        if &target != ip_port && self.contains(&target) {
            return Err(AppError::Conflict(format!("player {} already exists", target)));
        }

        let current_name = field_text(&self.entries()[index], "name");
        let name = req.name.as_deref().or(current_name.as_deref());
        let updated = Endpoint::new(name, target.as_str())?;

        let entries = self.entries_mut();
        if let Value::Mapping(map) = &mut entries[index] {
            map.insert("name".into(), updated.name.clone().into());
            map.insert("ip_port".into(), updated.ip_port.to_string().into());
        }

        // Later repeats of the old address would resurface on the next load
        let mut position = 0;
        entries.retain(|entry| {
            let keep = position <= index || !has_ip_port(entry, ip_port);
            position += 1;
            keep
        });
        Ok(updated)
    }
}

fn has_ip_port(entry: &Value, ip_port: &IpPort) -> bool {
    field_text(entry, "ip_port").as_deref() == Some(ip_port.as_str())
}

/// Text of a scalar field, trimmed; `None` when absent or blank
fn field_text(entry: &Value, key: &str) -> Option<String> {
    let text = match entry.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Result of [`ConfigStore::load_if_changed`]
#[derive(Debug, Clone)]
pub enum Reload {
    /// The file was re-read
    Changed(Arc<Vec<Endpoint>>),
    /// Nothing changed since the last call; the cached list is returned
    Unchanged(Arc<Vec<Endpoint>>),
}

impl Reload {
    pub fn players(&self) -> &Arc<Vec<Endpoint>> {
        match self {
            Reload::Changed(p) | Reload::Unchanged(p) => p,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Reload::Changed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observed {
    Missing,
    Present { modified: SystemTime, len: u64 },
}

impl Observed {
    fn of(meta: &fs::Metadata) -> Self {
        Observed::Present {
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            len: meta.len(),
        }
    }
}

#[derive(Debug, Default)]
struct Cache {
    observed: Option<Observed>,
    players: Arc<Vec<Endpoint>>,
}

struct Inner {
    path: PathBuf,
    cache: Mutex<Cache>,
    parses: AtomicU64,
    write_lock: tokio::sync::Mutex<()>,
}

/// Loads and saves the players file; cheap to clone
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<Inner>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                cache: Mutex::new(Cache::default()),
                parses: AtomicU64::new(0),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Number of times the file has been read and parsed
    pub fn parse_count(&self) -> u64 {
        self.inner.parses.load(Ordering::Relaxed)
    }

    fn cache(&self) -> MutexGuard<'_, Cache> {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.inner.path.clone(),
            source,
        }
    }

    /// Read and parse the file; `None` when it does not exist
    fn read_existing(&self) -> Result<Option<(PlayersDocument, Observed)>, StoreError> {
        let mut file = match fs::File::open(&self.inner.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let observed = Observed::of(&file.metadata().map_err(|e| self.io_error(e))?);

        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|e| self.io_error(e))?;
        self.inner.parses.fetch_add(1, Ordering::Relaxed);

        let document = PlayersDocument::parse(&text).map_err(|source| StoreError::Parse {
            path: self.inner.path.clone(),
            source,
        })?;
        Ok(Some((document, observed)))
    }

    /// Full document, empty when the file does not exist
    pub fn read_document(&self) -> Result<PlayersDocument, StoreError> {
        Ok(self
            .read_existing()?
            .map(|(document, _)| document)
            .unwrap_or_default())
    }

    /// Valid players from the file, empty when the file does not exist
    pub fn load(&self) -> Result<Vec<Endpoint>, StoreError> {
        Ok(self.read_document()?.endpoints())
    }

    /// Re-read the file only when its modification time or size moved
    pub fn load_if_changed(&self) -> Result<Reload, StoreError> {
        let current = match fs::metadata(&self.inner.path) {
            Ok(meta) => Observed::of(&meta),
            Err(e) if e.kind() == ErrorKind::NotFound => Observed::Missing,
            Err(e) => return Err(self.io_error(e)),
        };

        {
            let cache = self.cache();
            if cache.observed == Some(current) {
                return Ok(Reload::Unchanged(cache.players.clone()));
            }
        }

        let (players, observed) = match self.read_existing()? {
            Some((document, observed)) => (document.endpoints(), observed),
            None => {
                warn!(path = %self.inner.path.display(), "Config not found");
                (Vec::new(), Observed::Missing)
            }
        };
        let players = Arc::new(players);
        info!(
            count = players.len(),
            path = %self.inner.path.display(),
            "Loaded players"
        );

        let mut cache = self.cache();
        cache.observed = Some(observed);
        cache.players = players.clone();
        Ok(Reload::Changed(players))
    }

    /// Atomically replace the file with `document`
    ///
    /// The content goes to a temporary file in the same directory which is
    /// synced and then renamed over the destination, so readers see either the
    /// old or the new file and a failed write leaves the old one intact.
    pub fn save(&self, document: &PlayersDocument) -> Result<(), StoreError> {
        let path = &self.inner.path;
        let persist_err = |operation: &'static str| {
            move |source: std::io::Error| StoreError::Persist {
                path: path.clone(),
                operation,
                source,
            }
        };

        let yaml = document.to_yaml().map_err(StoreError::Encode)?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(persist_err("create directory"))?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&dir).map_err(persist_err("create temporary file"))?;
        tmp.write_all(yaml.as_bytes())
            .map_err(persist_err("write temporary file"))?;
        if let Ok(meta) = fs::metadata(path) {
            fs::set_permissions(tmp.path(), meta.permissions())
                .map_err(persist_err("copy permissions"))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(persist_err("sync temporary file"))?;
        tmp.persist(path)
            .map_err(|e| persist_err("rename temporary file")(e.error))?;

        // Force the next load_if_changed to re-read
        self.cache().observed = None;
        debug!(path = %path.display(), "Saved players file");
        Ok(())
    }

    /// Read-modify-write of the document, serialized against other mutations
    async fn mutate<T, F>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PlayersDocument) -> AppResult<T> + Send + 'static,
    {
        let _guard = self.inner.write_lock.lock().await;
        let store = self.clone();
        tokio::task::spawn_blocking(move || -> AppResult<T> {
            let mut document = store.read_document()?;
            let out = op(&mut document)?;
            store.save(&document)?;
            Ok(out)
        })
        .await
        .map_err(StoreError::from)?
    }

    pub async fn add(&self, endpoint: Endpoint) -> AppResult<Endpoint> {
        let added = self
            .mutate(move |doc| {
                doc.add(&endpoint)?;
                Ok(endpoint)
            })
            .await?;
        info!(name = %added.name, ip_port = %added.ip_port, "Player added");
        Ok(added)
    }

    pub async fn remove(&self, ip_port: &IpPort) -> AppResult<Endpoint> {
        let key = ip_port.clone();
        let removed = self.mutate(move |doc| doc.remove(&key)).await?;
        info!(name = %removed.name, ip_port = %removed.ip_port, "Player removed");
        Ok(removed)
    }

    pub async fn update(&self, ip_port: &IpPort, req: UpdatePlayerRequest) -> AppResult<Endpoint> {
        let key = ip_port.clone();
        let updated = self.mutate(move |doc| doc.update(&key, &req)).await?;
        info!(from = %ip_port, name = %updated.name, ip_port = %updated.ip_port, "Player updated");
        Ok(updated)
    }
}
