//! File-backed [`CommunityStore`] implementation.
//!
//! Layout under the data directory:
//!
//! ```text
//! settings.toml            one table per community id
//! suggestions/<id>.csv     header `name,submitterId,submittedAt`
//! votes/<id>.csv           header `memberId,<option names...>`
//! votes/<id>.prompts       one prompt message id per line, order significant
//! ```
//!
//! Every save rewrites the whole artifact through a sibling temp file followed
//! by a rename, so a crash mid-write leaves the previous contents intact.

/// Comma-separated table codec shared by the suggestions and votes artifacts.
pub mod tables;

use std::{
    collections::{HashMap, HashSet},
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tracing::warn;
use uuid::Uuid;

use crate::dao::{
    community_store::CommunityStore,
    models::{
        BallotRowEntity, CommunityId, MessageId, PersistedState, SettingsEntity, SuggestionEntity,
        VoteSessionEntity,
    },
    storage::{StorageError, StorageResult},
};

const SETTINGS_FILE: &str = "settings.toml";
const SUGGESTIONS_DIR: &str = "suggestions";
const VOTES_DIR: &str = "votes";
const TABLE_SUFFIX: &str = "csv";
const PROMPTS_SUFFIX: &str = "prompts";

const SUGGESTIONS_HEADER: [&str; 3] = ["name", "submitterId", "submittedAt"];
const VOTES_MEMBER_COLUMN: &str = "memberId";

/// Store keeping all engine state in plain files under one data directory.
#[derive(Clone)]
pub struct FileStore {
    root: Arc<PathBuf>,
}

impl FileStore {
    /// Open (and create when missing) the data directory tree.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        for dir in [root.clone(), root.join(SUGGESTIONS_DIR), root.join(VOTES_DIR)] {
            fs::create_dir_all(&dir).map_err(|source| {
                StorageError::unavailable(format!("creating data directory `{}`", dir.display()), source)
            })?;
        }
        Ok(Self { root: Arc::new(root) })
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    fn suggestions_path(&self, id: CommunityId) -> PathBuf {
        self.root.join(SUGGESTIONS_DIR).join(format!("{id}.{TABLE_SUFFIX}"))
    }

    fn votes_path(&self, id: CommunityId) -> PathBuf {
        self.root.join(VOTES_DIR).join(format!("{id}.{TABLE_SUFFIX}"))
    }

    fn prompts_path(&self, id: CommunityId) -> PathBuf {
        self.root.join(VOTES_DIR).join(format!("{id}.{PROMPTS_SUFFIX}"))
    }

    fn load_all_sync(&self) -> StorageResult<PersistedState> {
        Ok(PersistedState {
            settings: self.load_settings_sync()?,
            suggestions: self.load_suggestions_sync()?,
            votes: self.load_votes_sync()?,
        })
    }

    fn load_settings_sync(&self) -> StorageResult<HashMap<CommunityId, SettingsEntity>> {
        let path = self.settings_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(source) => {
                return Err(StorageError::unavailable(
                    format!("reading `{}`", path.display()),
                    source,
                ));
            }
        };

        let raw: HashMap<String, SettingsEntity> = match toml::from_str(&contents) {
            Ok(raw) => raw,
            Err(err) => {
                // One corrupt artifact must not block the other two.
                warn!(path = %path.display(), error = %err, "settings artifact is malformed; ignoring it");
                return Ok(HashMap::new());
            }
        };

        let mut settings = HashMap::with_capacity(raw.len());
        for (key, entity) in raw {
            match key.parse::<CommunityId>() {
                Ok(id) => {
                    settings.insert(id, entity);
                }
                Err(_) => {
                    warn!(key, "settings table key is not a community id; skipping record");
                }
            }
        }
        Ok(settings)
    }

    fn load_suggestions_sync(&self) -> StorageResult<HashMap<CommunityId, Vec<SuggestionEntity>>> {
        let mut suggestions = HashMap::new();
        for (id, path) in self.artifact_files(SUGGESTIONS_DIR, TABLE_SUFFIX)? {
            match self.read_suggestions_file(&path) {
                Ok(rows) => {
                    suggestions.insert(id, rows);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "suggestions artifact is malformed; skipping community");
                }
            }
        }
        Ok(suggestions)
    }

    fn read_suggestions_file(&self, path: &Path) -> StorageResult<Vec<SuggestionEntity>> {
        let contents = fs::read_to_string(path)
            .map_err(|source| StorageError::unavailable(format!("reading `{}`", path.display()), source))?;
        let mut lines = contents.lines();

        let header = lines.next().unwrap_or_default();
        let header = decode(path, header)?;
        if header != SUGGESTIONS_HEADER {
            return Err(StorageError::malformed(
                path.display().to_string(),
                "missing or unexpected header row",
            ));
        }

        let mut rows = Vec::new();
        for line in lines.filter(|line| !line.is_empty()) {
            let fields = decode(path, line)?;
            let [name, submitter, submitted_at] = fields.as_slice() else {
                return Err(StorageError::malformed(
                    path.display().to_string(),
                    format!("expected 3 columns, got {}", fields.len()),
                ));
            };
            rows.push(SuggestionEntity {
                name: name.clone(),
                submitter_id: parse_number(path, submitter)?,
                submitted_at: parse_number(path, submitted_at)?,
            });
        }
        Ok(rows)
    }

    fn load_votes_sync(&self) -> StorageResult<HashMap<CommunityId, VoteSessionEntity>> {
        let mut votes = HashMap::new();
        for (id, path) in self.artifact_files(VOTES_DIR, TABLE_SUFFIX)? {
            match self.read_votes_file(&path) {
                Ok(Some(mut entity)) => {
                    entity.prompt_messages = self.read_prompts_file(id);
                    votes.insert(id, entity);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "votes artifact is malformed; skipping community");
                }
            }
        }
        Ok(votes)
    }

    fn read_votes_file(&self, path: &Path) -> StorageResult<Option<VoteSessionEntity>> {
        let contents = fs::read_to_string(path)
            .map_err(|source| StorageError::unavailable(format!("reading `{}`", path.display()), source))?;
        let mut lines = contents.lines();

        let header = decode(path, lines.next().unwrap_or_default())?;
        let Some((member_column, options)) = header.split_first() else {
            return Err(StorageError::malformed(path.display().to_string(), "empty header row"));
        };
        if member_column != VOTES_MEMBER_COLUMN {
            return Err(StorageError::malformed(
                path.display().to_string(),
                format!("first column must be `{VOTES_MEMBER_COLUMN}`"),
            ));
        }
        if options.is_empty() {
            // A session exists iff it has options; an option-less file is stale.
            return Ok(None);
        }

        let mut ballots = Vec::new();
        for line in lines.filter(|line| !line.is_empty()) {
            let fields = decode(path, line)?;
            let Some((member, flags)) = fields.split_first() else {
                continue;
            };
            if flags.len() != options.len() {
                return Err(StorageError::malformed(
                    path.display().to_string(),
                    format!("ballot width {} does not match {} options", flags.len(), options.len()),
                ));
            }
            let flags = flags
                .iter()
                .map(|flag| match flag.as_str() {
                    "0" => Ok(0),
                    "1" => Ok(1),
                    other => Err(StorageError::malformed(
                        path.display().to_string(),
                        format!("ballot flag must be 0 or 1, got `{other}`"),
                    )),
                })
                .collect::<StorageResult<Vec<u8>>>()?;
            ballots.push(BallotRowEntity {
                member_id: parse_number(path, member)?,
                flags,
            });
        }

        Ok(Some(VoteSessionEntity {
            options: options.to_vec(),
            ballots,
            prompt_messages: Vec::new(),
        }))
    }

    fn read_prompts_file(&self, id: CommunityId) -> Vec<MessageId> {
        let path = self.prompts_path(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read prompt list; assuming none");
                return Vec::new();
            }
        };

        let mut ids = Vec::new();
        for line in contents.lines().filter(|line| !line.is_empty()) {
            match line.parse::<Uuid>() {
                Ok(id) => ids.push(id),
                Err(err) => {
                    // Prompt ids are UI references only; a bad list just means
                    // the stale prompts cannot be retired.
                    warn!(path = %path.display(), error = %err, "invalid prompt message id; dropping list");
                    return Vec::new();
                }
            }
        }
        ids
    }

    fn save_settings_sync(&self, all: Vec<(CommunityId, SettingsEntity)>) -> StorageResult<()> {
        let map: HashMap<String, SettingsEntity> =
            all.into_iter().map(|(id, entity)| (id.to_string(), entity)).collect();
        let contents = toml::to_string_pretty(&map)
            .map_err(|source| StorageError::unavailable("encoding settings artifact".into(), source))?;
        atomic_write(&self.settings_path(), &contents)
    }

    fn save_suggestions_sync(
        &self,
        all: Vec<(CommunityId, Vec<SuggestionEntity>)>,
    ) -> StorageResult<()> {
        let mut kept = HashSet::new();
        for (id, rows) in all {
            let mut contents = String::new();
            push_row(&mut contents, &SUGGESTIONS_HEADER);
            for row in &rows {
                push_row(
                    &mut contents,
                    &[
                        row.name.as_str(),
                        &row.submitter_id.to_string(),
                        &row.submitted_at.to_string(),
                    ],
                );
            }
            let path = self.suggestions_path(id);
            atomic_write(&path, &contents)?;
            kept.insert(path);
        }
        self.remove_stale(SUGGESTIONS_DIR, TABLE_SUFFIX, &kept)
    }

    fn save_votes_sync(
        &self,
        all: Vec<(CommunityId, Option<VoteSessionEntity>)>,
    ) -> StorageResult<()> {
        let mut kept = HashSet::new();
        for (id, session) in all {
            let Some(session) = session else {
                continue;
            };

            let mut table = String::new();
            let mut header = Vec::with_capacity(session.options.len() + 1);
            header.push(VOTES_MEMBER_COLUMN.to_string());
            header.extend(session.options.iter().cloned());
            push_row(&mut table, &header);
            for ballot in &session.ballots {
                let mut row = Vec::with_capacity(ballot.flags.len() + 1);
                row.push(ballot.member_id.to_string());
                row.extend(ballot.flags.iter().map(|flag| flag.to_string()));
                push_row(&mut table, &row);
            }

            let prompts = session
                .prompt_messages
                .iter()
                .map(|id| format!("{id}\n"))
                .collect::<String>();

            let table_path = self.votes_path(id);
            let prompts_path = self.prompts_path(id);
            atomic_write(&table_path, &table)?;
            atomic_write(&prompts_path, &prompts)?;
            kept.insert(table_path);
            kept.insert(prompts_path);
        }
        self.remove_stale(VOTES_DIR, TABLE_SUFFIX, &kept)?;
        self.remove_stale(VOTES_DIR, PROMPTS_SUFFIX, &kept)
    }

    fn health_check_sync(&self) -> StorageResult<()> {
        let probe = self.root.join(".health");
        fs::write(&probe, b"ok")
            .and_then(|()| fs::remove_file(&probe))
            .map_err(|source| {
                StorageError::unavailable(format!("probing `{}`", self.root.display()), source)
            })
    }

    /// Return `(community id, path)` for every artifact with the given suffix.
    fn artifact_files(
        &self,
        dir: &str,
        suffix: &str,
    ) -> StorageResult<Vec<(CommunityId, PathBuf)>> {
        let dir = self.root.join(dir);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::unavailable(
                    format!("listing `{}`", dir.display()),
                    source,
                ));
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| {
                StorageError::unavailable(format!("listing `{}`", dir.display()), source)
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(suffix) {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<CommunityId>().ok())
            else {
                warn!(path = %path.display(), "artifact filename is not a community id; skipping");
                continue;
            };
            files.push((id, path));
        }
        Ok(files)
    }

    fn remove_stale(&self, dir: &str, suffix: &str, kept: &HashSet<PathBuf>) -> StorageResult<()> {
        for (_, path) in self.artifact_files(dir, suffix)? {
            if !kept.contains(&path) {
                if let Err(err) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %err, "failed to remove stale artifact");
                }
            }
        }
        Ok(())
    }
}

impl CommunityStore for FileStore {
    fn load_all(&self) -> BoxFuture<'static, StorageResult<PersistedState>> {
        let store = self.clone();
        Box::pin(async move { run_blocking(move || store.load_all_sync()).await })
    }

    fn save_settings(
        &self,
        all: Vec<(CommunityId, SettingsEntity)>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { run_blocking(move || store.save_settings_sync(all)).await })
    }

    fn save_suggestions(
        &self,
        all: Vec<(CommunityId, Vec<SuggestionEntity>)>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { run_blocking(move || store.save_suggestions_sync(all)).await })
    }

    fn save_votes(
        &self,
        all: Vec<(CommunityId, Option<VoteSessionEntity>)>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { run_blocking(move || store.save_votes_sync(all)).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { run_blocking(move || store.health_check_sync()).await })
    }
}

/// Run a blocking filesystem closure off the async runtime.
async fn run_blocking<T: Send + 'static>(
    work: impl FnOnce() -> StorageResult<T> + Send + 'static,
) -> StorageResult<T> {
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|source| StorageError::unavailable("storage task failed".into(), source))?
}

/// Whole-file replace: write next to the target, then rename into place.
fn atomic_write(path: &Path, contents: &str) -> StorageResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)
        .and_then(|()| fs::rename(&tmp, path))
        .map_err(|source| {
            StorageError::unavailable(format!("writing `{}`", path.display()), source)
        })
}

fn push_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    out.push_str(&tables::encode_row(fields));
    out.push('\n');
}

fn decode(path: &Path, line: &str) -> StorageResult<Vec<String>> {
    tables::decode_row(line)
        .map_err(|err| StorageError::malformed(path.display().to_string(), err.to_string()))
}

fn parse_number<T: std::str::FromStr>(path: &Path, value: &str) -> StorageResult<T> {
    value.parse::<T>().map_err(|_| {
        StorageError::malformed(
            path.display().to_string(),
            format!("expected a number, got `{value}`"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store(tag: &str) -> (FileStore, PathBuf) {
        let root = std::env::temp_dir().join(format!(
            "game-night-back-{tag}-{}-{}",
            std::process::id(),
            Uuid::new_v4().simple()
        ));
        (FileStore::open(root.clone()).unwrap(), root)
    }

    fn sample_settings() -> SettingsEntity {
        SettingsEntity {
            announcement_channel: Some(100),
            vote_channel: Some(200),
            announcement_role: None,
            vote_role: Some(300),
            max_suggestions_per_member: Some(5),
            retain_threshold: None,
            last_vote_started_at: Some(1_700_000_000),
        }
    }

    #[test]
    fn fresh_directory_loads_empty() {
        let (store, root) = scratch_store("empty");
        let state = store.load_all_sync().unwrap();
        assert_eq!(state, PersistedState::default());
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn settings_round_trip() {
        let (store, root) = scratch_store("settings");
        store.save_settings_sync(vec![(7, sample_settings())]).unwrap();

        let loaded = store.load_settings_sync().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[&7], sample_settings());
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn suggestions_round_trip_preserves_order_and_odd_names() {
        let (store, root) = scratch_store("suggestions");
        let rows = vec![
            SuggestionEntity {
                name: "Worms, Armageddon".into(),
                submitter_id: 11,
                submitted_at: 1_700_000_001,
            },
            SuggestionEntity {
                name: "Baba Is \"You\"".into(),
                submitter_id: 12,
                submitted_at: 1_700_000_002,
            },
        ];
        store.save_suggestions_sync(vec![(9, rows.clone())]).unwrap();

        let loaded = store.load_suggestions_sync().unwrap();
        assert_eq!(loaded[&9], rows);
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn votes_round_trip_including_prompts() {
        let (store, root) = scratch_store("votes");
        let session = VoteSessionEntity {
            options: vec!["Celeste".into(), "Hades".into()],
            ballots: vec![
                BallotRowEntity { member_id: 1, flags: vec![1, 0] },
                BallotRowEntity { member_id: 2, flags: vec![1, 1] },
            ],
            prompt_messages: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        store.save_votes_sync(vec![(5, Some(session.clone()))]).unwrap();

        let loaded = store.load_votes_sync().unwrap();
        assert_eq!(loaded[&5], session);

        // Closing the session removes both files.
        store.save_votes_sync(vec![(5, None)]).unwrap();
        assert!(store.load_votes_sync().unwrap().is_empty());
        assert!(!store.votes_path(5).exists());
        assert!(!store.prompts_path(5).exists());
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn corrupt_artifact_does_not_block_the_others() {
        let (store, root) = scratch_store("corrupt");
        store.save_settings_sync(vec![(3, sample_settings())]).unwrap();
        fs::write(root.join("suggestions").join("3.csv"), "no header here\n\"").unwrap();

        let state = store.load_all_sync().unwrap();
        assert_eq!(state.settings.len(), 1);
        assert!(state.suggestions.is_empty());
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn writes_leave_no_temp_files_behind() {
        let (store, root) = scratch_store("tmp");
        store.save_settings_sync(vec![(1, sample_settings())]).unwrap();
        store
            .save_suggestions_sync(vec![(1, vec![SuggestionEntity {
                name: "Hades".into(),
                submitter_id: 4,
                submitted_at: 0,
            }])])
            .unwrap();

        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    assert_ne!(path.extension().and_then(|e| e.to_str()), Some("tmp"));
                }
            }
        }
        fs::remove_dir_all(root).unwrap();
    }
}
