//! In-memory implementation of the GitHub Git Data API.
//!
//! Serves the endpoints the commit pipeline uses (refs, commits, trees,
//! blobs, contents) over an in-process object graph, so the whole pipeline
//! can run without a network. Behaviour mirrors GitHub where the pipeline
//! depends on it:
//!
//! - blob ids are real git blob ids (`sha1("blob <len>\0" + bytes)`)
//! - `POST /git/trees` merges the listed entries onto `base_tree`
//! - `PATCH /git/refs/heads/{branch}` rejects non-fast-forward updates
//!   with 422 unless `force` is set
//!
//! Trees are flat maps from full path to blob id; nested tree objects are
//! not modelled. Every request is logged, and failures can be injected per
//! endpoint to exercise the error paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha1::{Digest, Sha1};

use crate::ports::http::{
    encode_path, HttpFuture, HttpRequest, HttpResponse, HttpTransport, Method, TransportError,
};

/// Base URL the in-memory store answers on.
pub const MEMORY_API_BASE: &str = "https://github.invalid/api/v3";

const FILE_MODE: &str = "100644";

/// One request the store has received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// HTTP verb.
    pub method: Method,
    /// URL path below the API base, without the query string.
    pub path: String,
}

/// In-memory GitHub repository reachable through [`HttpTransport`].
///
/// Cloning is cheap and clones share state, so a test can hand one clone to
/// the pipeline and inspect another afterwards.
#[derive(Clone)]
pub struct InMemoryGitHub {
    repo: String,
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    blobs: HashMap<String, Vec<u8>>,
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, StoredCommit>,
    refs: BTreeMap<String, String>,
    calls: Vec<RecordedCall>,
    faults: Vec<Fault>,
    races: Vec<String>,
    clock: u64,
}

#[derive(Debug, Clone)]
struct StoredCommit {
    tree: String,
    parents: Vec<String>,
    message: String,
}

struct Fault {
    method: Method,
    fragment: String,
    skip: usize,
    times: Option<usize>,
    kind: FaultKind,
}

#[derive(Debug, Clone, Copy)]
enum FaultKind {
    Status(u16),
    Disconnect,
}

impl InMemoryGitHub {
    /// An empty repository named `owner/name` with no branches.
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// The API root to pass as `CommitOptions::api_base`.
    #[must_use]
    pub fn api_base(&self) -> &'static str {
        MEMORY_API_BASE
    }

    /// Creates `branch` pointing at a fresh root commit with an empty tree.
    ///
    /// Returns the root commit id.
    pub fn create_branch(&self, branch: &str) -> String {
        let mut state = self.lock();
        let tree = state.insert_tree(BTreeMap::new());
        let commit = state.insert_commit(tree, Vec::new(), "Initial commit".into());
        state.refs.insert(branch.to_string(), commit.clone());
        commit
    }

    /// Commits text files to `branch` as another writer would, bypassing the API.
    ///
    /// # Panics
    ///
    /// Panics if `branch` does not exist.
    pub fn commit_directly(&self, branch: &str, files: &[(&str, &str)], message: &str) -> String {
        let files: Vec<(String, Vec<u8>)> = files
            .iter()
            .map(|(path, text)| ((*path).to_string(), text.as_bytes().to_vec()))
            .collect();
        self.lock()
            .commit_on(branch, &files, message)
            .unwrap_or_else(|| panic!("InMemoryGitHub: unknown branch {branch:?}"))
    }

    /// Commit the branch currently points at.
    #[must_use]
    pub fn tip(&self, branch: &str) -> Option<String> {
        self.lock().refs.get(branch).cloned()
    }

    /// Parent ids of a commit (empty for unknown commits).
    #[must_use]
    pub fn parents(&self, commit: &str) -> Vec<String> {
        self.lock()
            .commits
            .get(commit)
            .map(|c| c.parents.clone())
            .unwrap_or_default()
    }

    /// Message of a commit.
    #[must_use]
    pub fn message(&self, commit: &str) -> Option<String> {
        self.lock().commits.get(commit).map(|c| c.message.clone())
    }

    /// Sorted file paths in a commit's tree.
    #[must_use]
    pub fn paths(&self, commit: &str) -> Vec<String> {
        let state = self.lock();
        state
            .commits
            .get(commit)
            .and_then(|c| state.trees.get(&c.tree))
            .map(|tree| tree.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Contents of `path` at the tip of `branch`.
    #[must_use]
    pub fn read_file(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        let state = self.lock();
        let blob = state.lookup(branch, path)?;
        state.blobs.get(blob).cloned()
    }

    /// Number of distinct blobs stored.
    #[must_use]
    pub fn blob_count(&self) -> usize {
        self.lock().blobs.len()
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Number of requests with `method` whose path contains `fragment`.
    #[must_use]
    pub fn count_calls(&self, method: Method, fragment: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path.contains(fragment))
            .count()
    }

    /// Answers every matching request with `status`.
    pub fn fail_on(&self, method: Method, fragment: &str, status: u16) {
        self.push_fault(method, fragment, 0, None, FaultKind::Status(status));
    }

    /// Answers only the `n`-th (1-based) matching request with `status`.
    pub fn fail_nth(&self, method: Method, fragment: &str, n: usize, status: u16) {
        let skip = n.saturating_sub(1);
        self.push_fault(method, fragment, skip, Some(1), FaultKind::Status(status));
    }

    /// Makes every matching request fail without a response.
    pub fn disconnect_on(&self, method: Method, fragment: &str) {
        self.push_fault(method, fragment, 0, None, FaultKind::Disconnect);
    }

    /// Lets another writer commit to `branch` just before the next ref update lands.
    pub fn race_next_ref_update(&self, branch: &str) {
        self.lock().races.push(branch.to_string());
    }

    fn push_fault(
        &self,
        method: Method,
        fragment: &str,
        skip: usize,
        times: Option<usize>,
        kind: FaultKind,
    ) {
        self.lock().faults.push(Fault {
            method,
            fragment: fragment.to_string(),
            skip,
            times,
            kind,
        });
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.lock();
        let Some(rest) = request.url.strip_prefix(MEMORY_API_BASE) else {
            let message = format!("InMemoryGitHub: no route to {}", request.url);
            return Err(message.into());
        };
        // A fragment never reaches the server.
        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        state.calls.push(RecordedCall {
            method: request.method,
            path: path.to_string(),
        });

        if let Some(kind) = state.take_fault(request.method, path) {
            return match kind {
                FaultKind::Status(status) => {
                    Ok(HttpResponse::new(status, json!({"message": "Injected failure"})))
                }
                FaultKind::Disconnect => Err("connection reset by peer".into()),
            };
        }

        let prefix = format!("/repos/{}/", self.repo);
        let Some(route) = path.strip_prefix(&prefix) else {
            return Ok(not_found());
        };
        let urls = Urls { repo: &self.repo };
        Ok(state.route(
            &urls,
            request.method,
            route,
            query,
            request.body.as_ref(),
        ))
    }
}

impl HttpTransport for InMemoryGitHub {
    fn send(&self, request: &HttpRequest) -> HttpFuture<'_> {
        let result = self.handle(request);
        Box::pin(async move { result })
    }
}

/// Builds the `url` fields GitHub embeds in its responses.
struct Urls<'a> {
    repo: &'a str,
}

impl Urls<'_> {
    fn object(&self, kind: &str, sha: &str) -> String {
        format!("{MEMORY_API_BASE}/repos/{}/git/{kind}/{sha}", self.repo)
    }

    fn branch(&self, branch: &str) -> String {
        let branch = encode_path(branch);
        format!(
            "{MEMORY_API_BASE}/repos/{}/git/refs/heads/{branch}",
            self.repo
        )
    }
}

#[derive(Deserialize)]
struct BlobBody {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct TreeBody {
    #[serde(default)]
    base_tree: Option<String>,
    tree: Vec<TreeEntryBody>,
}

#[derive(Deserialize)]
struct TreeEntryBody {
    path: String,
    mode: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Deserialize)]
struct CommitBody {
    message: String,
    tree: String,
    #[serde(default)]
    parents: Vec<String>,
}

#[derive(Deserialize)]
struct RefUpdateBody {
    sha: String,
    #[serde(default)]
    force: bool,
}

impl State {
    fn take_fault(&mut self, method: Method, path: &str) -> Option<FaultKind> {
        let index = self.faults.iter_mut().position(|fault| {
            if fault.method != method || !path.contains(&fault.fragment) {
                return false;
            }
            if fault.skip > 0 {
                fault.skip -= 1;
                return false;
            }
            true
        })?;

        let fault = &mut self.faults[index];
        let kind = fault.kind;
        let exhausted = match fault.times.as_mut() {
            Some(times) => {
                *times -= 1;
                *times == 0
            }
            None => false,
        };
        if exhausted {
            self.faults.remove(index);
        }
        Some(kind)
    }

    fn route(
        &mut self,
        urls: &Urls<'_>,
        method: Method,
        route: &str,
        query: Option<&str>,
        body: Option<&Value>,
    ) -> HttpResponse {
        match method {
            Method::Get => {
                if let Some(branch) = route.strip_prefix("git/refs/heads/") {
                    match urlencoding::decode(branch) {
                        Ok(branch) => self.get_ref(urls, &branch),
                        Err(_) => not_found(),
                    }
                } else if let Some(sha) = route.strip_prefix("git/commits/") {
                    self.get_commit(urls, sha)
                } else if let Some(sha) = route.strip_prefix("git/trees/") {
                    self.get_tree(urls, sha)
                } else if let Some(path) = route.strip_prefix("contents/") {
                    self.get_contents(path, query)
                } else {
                    not_found()
                }
            }
            Method::Post => match route {
                "git/blobs" => with_body(body, |b: BlobBody| self.create_blob(urls, b)),
                "git/trees" => with_body(body, |b: TreeBody| self.create_tree(urls, b)),
                "git/commits" => with_body(body, |b: CommitBody| self.create_commit(urls, b)),
                _ => not_found(),
            },
            Method::Patch => {
                let branch = route
                    .strip_prefix("git/refs/heads/")
                    .and_then(|branch| urlencoding::decode(branch).ok());
                match branch {
                    Some(branch) => {
                        with_body(body, |b: RefUpdateBody| self.update_ref(urls, &branch, b))
                    }
                    None => not_found(),
                }
            }
        }
    }

    fn get_ref(&self, urls: &Urls<'_>, branch: &str) -> HttpResponse {
        match self.refs.get(branch) {
            Some(sha) => HttpResponse::new(200, ref_json(urls, branch, sha)),
            None => not_found(),
        }
    }

    fn get_commit(&self, urls: &Urls<'_>, sha: &str) -> HttpResponse {
        match self.commits.get(sha) {
            Some(commit) => HttpResponse::new(200, commit_json(urls, sha, commit)),
            None => not_found(),
        }
    }

    fn get_tree(&self, urls: &Urls<'_>, sha: &str) -> HttpResponse {
        match self.trees.get(sha) {
            Some(tree) => HttpResponse::new(200, tree_json(urls, sha, tree)),
            None => not_found(),
        }
    }

    fn get_contents(&self, path: &str, query: Option<&str>) -> HttpResponse {
        let Ok(path) = urlencoding::decode(path) else {
            return not_found();
        };
        let branch = query
            .into_iter()
            .flat_map(|q| q.split('&'))
            .find_map(|pair| pair.strip_prefix("ref="))
            .and_then(|value| urlencoding::decode(value).ok())
            .map_or_else(|| "main".to_string(), |value| value.into_owned());

        if !self.refs.contains_key(&branch) {
            let message = format!("No commit found for the ref {branch}");
            return HttpResponse::new(422, json!({ "message": message }));
        }
        let found = self
            .lookup(&branch, &path)
            .and_then(|sha| Some((sha, self.blobs.get(sha)?)));
        match found {
            Some((sha, bytes)) => HttpResponse::new(
                200,
                json!({
                    "type": "file",
                    "path": path,
                    "sha": sha,
                    "size": bytes.len(),
                    "encoding": "base64",
                    "content": STANDARD.encode(bytes),
                }),
            ),
            None => not_found(),
        }
    }

    fn create_blob(&mut self, urls: &Urls<'_>, body: BlobBody) -> HttpResponse {
        let bytes = match body.encoding.as_deref() {
            None | Some("utf-8" | "utf8") => body.content.into_bytes(),
            Some("base64") => {
                let compact: String = body
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                match STANDARD.decode(compact) {
                    Ok(bytes) => bytes,
                    Err(_) => return unprocessable("Invalid base64 content"),
                }
            }
            Some(other) => return unprocessable(&format!("Unsupported encoding: {other}")),
        };
        let sha = self.insert_blob(bytes);
        HttpResponse::new(201, json!({"sha": sha, "url": urls.object("blobs", &sha)}))
    }

    fn create_tree(&mut self, urls: &Urls<'_>, body: TreeBody) -> HttpResponse {
        let mut entries = match body.base_tree.as_deref() {
            Some(base) => match self.trees.get(base) {
                Some(tree) => tree.clone(),
                None => return unprocessable("base_tree is not a valid tree"),
            },
            None => BTreeMap::new(),
        };
        for entry in body.tree {
            let valid = entry.kind == "blob"
                && entry.mode == FILE_MODE
                && self.blobs.contains_key(&entry.sha);
            if !valid {
                return unprocessable("GitRPC::BadObjectState");
            }
            entries.insert(entry.path, entry.sha);
        }
        let sha = self.insert_tree(entries);
        let tree = &self.trees[&sha];
        HttpResponse::new(201, tree_json(urls, &sha, tree))
    }

    fn create_commit(&mut self, urls: &Urls<'_>, body: CommitBody) -> HttpResponse {
        if !self.trees.contains_key(&body.tree) {
            return unprocessable("Tree SHA does not exist");
        }
        if body.parents.iter().any(|parent| !self.commits.contains_key(parent)) {
            return unprocessable("Parent SHA does not exist or is not a commit object");
        }
        let sha = self.insert_commit(body.tree, body.parents, body.message);
        let commit = &self.commits[&sha];
        HttpResponse::new(201, commit_json(urls, &sha, commit))
    }

    fn update_ref(&mut self, urls: &Urls<'_>, branch: &str, body: RefUpdateBody) -> HttpResponse {
        if let Some(index) = self.races.iter().position(|b| b == branch) {
            self.races.remove(index);
            let other = vec![(
                "concurrent.txt".to_string(),
                b"from another writer".to_vec(),
            )];
            self.commit_on(branch, &other, "Concurrent commit");
        }

        let Some(current) = self.refs.get(branch).cloned() else {
            return unprocessable("Reference does not exist");
        };
        if !self.commits.contains_key(&body.sha) {
            return unprocessable("Object does not exist");
        }
        if !body.force && !self.is_ancestor(&current, &body.sha) {
            return unprocessable("Update is not a fast forward");
        }
        self.refs.insert(branch.to_string(), body.sha.clone());
        HttpResponse::new(200, ref_json(urls, branch, &body.sha))
    }

    fn lookup(&self, branch: &str, path: &str) -> Option<&String> {
        let tip = self.refs.get(branch)?;
        let tree = self.trees.get(&self.commits.get(tip)?.tree)?;
        tree.get(path)
    }

    /// Whether `ancestor` is reachable from `descendant` (or equal to it).
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![descendant.to_string()];
        while let Some(sha) = pending.pop() {
            if sha == ancestor {
                return true;
            }
            if !seen.insert(sha.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&sha) {
                pending.extend(commit.parents.iter().cloned());
            }
        }
        false
    }

    fn commit_on(
        &mut self,
        branch: &str,
        files: &[(String, Vec<u8>)],
        message: &str,
    ) -> Option<String> {
        let tip = self.refs.get(branch)?.clone();
        let mut entries = self.trees.get(&self.commits.get(&tip)?.tree)?.clone();
        for (path, bytes) in files {
            let sha = self.insert_blob(bytes.clone());
            entries.insert(path.clone(), sha);
        }
        let tree = self.insert_tree(entries);
        let commit = self.insert_commit(tree, vec![tip], message.to_string());
        self.refs.insert(branch.to_string(), commit.clone());
        Some(commit)
    }

    fn insert_blob(&mut self, bytes: Vec<u8>) -> String {
        let sha = object_id("blob", &bytes);
        self.blobs.entry(sha.clone()).or_insert(bytes);
        sha
    }

    fn insert_tree(&mut self, entries: BTreeMap<String, String>) -> String {
        let mut payload = Vec::new();
        for (path, sha) in &entries {
            payload.extend_from_slice(format!("{FILE_MODE} {path}\0{sha}").as_bytes());
        }
        let sha = object_id("tree", &payload);
        self.trees.entry(sha.clone()).or_insert(entries);
        sha
    }

    fn insert_commit(&mut self, tree: String, parents: Vec<String>, message: String) -> String {
        self.clock += 1;
        let mut payload = format!("tree {tree}\n");
        for parent in &parents {
            payload.push_str(&format!("parent {parent}\n"));
        }
        let clock = self.clock;
        payload.push_str(&format!(
            "committer ghcommit <ghcommit@invalid> {clock} +0000\n\n{message}"
        ));
        let sha = object_id("commit", payload.as_bytes());
        self.commits.insert(
            sha.clone(),
            StoredCommit {
                tree,
                parents,
                message,
            },
        );
        sha
    }
}

fn object_id(kind: &str, payload: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{kind} {}\0", payload.len()).as_bytes());
    hasher.update(payload);
    hex::encode(hasher.finalize())
}

fn with_body<T: DeserializeOwned>(
    body: Option<&Value>,
    handler: impl FnOnce(T) -> HttpResponse,
) -> HttpResponse {
    let Some(body) = body else {
        return HttpResponse::new(400, json!({"message": "Problems parsing JSON"}));
    };
    match serde_json::from_value(body.clone()) {
        Ok(parsed) => handler(parsed),
        Err(e) => unprocessable(&format!("Invalid request.\n\n{e}")),
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::new(
        404,
        json!({
            "message": "Not Found",
            "documentation_url": "https://docs.github.com/rest",
        }),
    )
}

fn unprocessable(message: &str) -> HttpResponse {
    HttpResponse::new(422, json!({ "message": message }))
}

fn ref_json(urls: &Urls<'_>, branch: &str, sha: &str) -> Value {
    json!({
        "ref": format!("refs/heads/{branch}"),
        "url": urls.branch(branch),
        "object": {"type": "commit", "sha": sha, "url": urls.object("commits", sha)},
    })
}

fn commit_json(urls: &Urls<'_>, sha: &str, commit: &StoredCommit) -> Value {
    json!({
        "sha": sha,
        "url": urls.object("commits", sha),
        "message": commit.message,
        "tree": {"sha": commit.tree, "url": urls.object("trees", &commit.tree)},
        "parents": commit
            .parents
            .iter()
            .map(|parent| json!({"sha": parent, "url": urls.object("commits", parent)}))
            .collect::<Vec<_>>(),
    })
}

fn tree_json(urls: &Urls<'_>, sha: &str, tree: &BTreeMap<String, String>) -> Value {
    json!({
        "sha": sha,
        "url": urls.object("trees", sha),
        "tree": tree
            .iter()
            .map(|(path, blob)| json!({
                "path": path,
                "mode": FILE_MODE,
                "type": "blob",
                "sha": blob,
                "url": urls.object("blobs", blob),
            }))
            .collect::<Vec<_>>(),
        "truncated": false,
    })
}
