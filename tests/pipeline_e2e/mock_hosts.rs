//! Mock external hosts for pipeline E2E tests.
//!
//! One in-process HTTP server stands in for the generation API (`/v0`), the
//! component registry (`/registry`), GitHub (`/github`), Bitbucket (`/bitbucket`)
//! and Vercel (`/vercel`).
//! Every request is recorded so tests can assert on what was (not) called.

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

/// Session whose generation lookup returns 404.
pub const MISSING_SESSION: &str = "missing-session";

/// Session whose generation lookup has no files.
pub const EMPTY_SESSION: &str = "empty-session";

/// Layout source using the `geist` package fonts.
pub const GEIST_LAYOUT: &str = r#"import type { Metadata } from 'next'
import { GeistSans } from 'geist/font/sans'
import { GeistMono } from 'geist/font/mono'
import './globals.css'

export const metadata: Metadata = { title: 'Bakery' }

export default function RootLayout({ children }: { children: React.ReactNode }) {
  return (
    <html lang="en">
      <body className={`${GeistSans.variable} ${GeistMono.variable}`}>{children}</body>
    </html>
  )
}
"#;

const PAGE: &str = r#"import { Button } from '@/components/ui/button'
import { Card } from '@/components/ui/card'
import { Badge } from '@/components/ui/badge'

export default function Page() {
  return <Card><Badge>New</Badge><Button>Order</Button></Card>
}
"#;

/// Mutable behaviour and call log shared with the server.
#[derive(Debug)]
pub struct MockState {
    /// Every request as `"METHOD /path"`, in arrival order.
    pub calls: Vec<String>,
    /// Repository names GitHub and Bitbucket report as taken.
    pub existing_repos: HashSet<String>,
    /// Branch GitHub reports as the new repository's default.
    pub default_branch: String,
    /// Fail Vercel project creation.
    pub fail_provision: bool,
    /// Deployment strategies (`git-source`, `deploy-hook`, `redeploy`) to reject.
    pub failing_strategies: HashSet<&'static str>,
    /// Fail GitHub repository deletion.
    pub fail_repo_delete: bool,
    /// Tree entries of the last committed tree.
    pub committed_tree: Vec<Value>,
    /// Path whose Bitbucket source commit is rejected.
    pub failing_bitbucket_file: Option<String>,
    /// Paths committed to Bitbucket, in arrival order.
    pub bitbucket_files: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        MockState {
            calls: Vec::new(),
            existing_repos: HashSet::new(),
            default_branch: "trunk".to_string(),
            fail_provision: false,
            failing_strategies: HashSet::new(),
            fail_repo_delete: false,
            committed_tree: Vec::new(),
            failing_bitbucket_file: None,
            bitbucket_files: Vec::new(),
        }
    }
}

type SharedState = web::Data<Arc<Mutex<MockState>>>;

fn record(state: &SharedState, req: &HttpRequest) {
    state
        .lock()
        .unwrap()
        .calls
        .push(format!("{} {}", req.method(), req.path()));
}

fn vercel_error(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "error": { "code": "bad_request", "message": message } }))
}

// ---------------------------------------------------------------- generation

async fn get_chat(req: HttpRequest, state: SharedState, path: web::Path<String>) -> HttpResponse {
    record(&state, &req);
    let chat_id = path.into_inner();
    match chat_id.as_str() {
        MISSING_SESSION => HttpResponse::NotFound().json(json!({ "error": "Chat not found" })),
        EMPTY_SESSION => HttpResponse::Ok().json(json!({ "id": chat_id, "files": [] })),
        _ => HttpResponse::Ok().json(json!({
            "id": chat_id,
            "title": "Bakery landing page",
            "files": [
                { "lang": "tsx", "source": GEIST_LAYOUT, "meta": { "file": "app/layout.tsx" } },
                { "lang": "tsx", "source": PAGE, "meta": { "file": "app/page.tsx" } },
                {
                    "lang": "tsx",
                    "source": "export function Card() { return null }",
                    "meta": { "file": "components/ui/ui/card.tsx" }
                },
            ],
        })),
    }
}

// ------------------------------------------------------------------ registry

async fn registry_component(
    req: HttpRequest,
    state: SharedState,
    path: web::Path<String>,
) -> HttpResponse {
    record(&state, &req);
    match path.into_inner().as_str() {
        "button.json" => HttpResponse::Ok().json(json!({
            "name": "button",
            "dependencies": ["@radix-ui/react-slot"],
            "files": [
                {
                    "path": "registry/default/ui/button.tsx",
                    "content": "export function Button() { return null } // registry"
                }
            ],
        })),
        _ => HttpResponse::NotFound().finish(),
    }
}

// -------------------------------------------------------------------- GitHub

async fn create_repo(req: HttpRequest, state: SharedState, body: web::Json<Value>) -> HttpResponse {
    record(&state, &req);
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let state = state.lock().unwrap();
    if state.existing_repos.contains(&name) {
        return HttpResponse::UnprocessableEntity().json(json!({
            "message": "Repository creation failed.",
            "errors": [{ "message": "name already exists on this account" }],
        }));
    }
    HttpResponse::Created().json(json!({
        "name": name,
        "full_name": format!("acme/{}", name),
        "html_url": format!("https://github.com/acme/{}", name),
        "clone_url": format!("https://github.com/acme/{}.git", name),
        "default_branch": state.default_branch,
        "private": body["private"],
    }))
}

async fn get_ref(req: HttpRequest, state: SharedState) -> HttpResponse {
    record(&state, &req);
    HttpResponse::Ok().json(json!({ "object": { "sha": "head-sha", "type": "commit" } }))
}

async fn get_commit(req: HttpRequest, state: SharedState) -> HttpResponse {
    record(&state, &req);
    HttpResponse::Ok().json(json!({ "sha": "head-sha", "tree": { "sha": "base-tree-sha" } }))
}

async fn create_tree(req: HttpRequest, state: SharedState, body: web::Json<Value>) -> HttpResponse {
    record(&state, &req);
    let entries = body["tree"].as_array().cloned().unwrap_or_default();
    state.lock().unwrap().committed_tree = entries;
    HttpResponse::Created().json(json!({ "sha": "tree-sha" }))
}

async fn create_commit(req: HttpRequest, state: SharedState) -> HttpResponse {
    record(&state, &req);
    HttpResponse::Created().json(json!({ "sha": "commit-sha" }))
}

async fn update_ref(req: HttpRequest, state: SharedState) -> HttpResponse {
    record(&state, &req);
    HttpResponse::Ok().json(json!({ "object": { "sha": "commit-sha" } }))
}

async fn delete_repo(req: HttpRequest, state: SharedState) -> HttpResponse {
    record(&state, &req);
    if state.lock().unwrap().fail_repo_delete {
        return HttpResponse::Forbidden().json(json!({ "message": "Must have admin rights" }));
    }
    HttpResponse::NoContent().finish()
}

// ----------------------------------------------------------------- Bitbucket

async fn bitbucket_create_repo(
    req: HttpRequest,
    state: SharedState,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    record(&state, &req);
    let (workspace, repo) = path.into_inner();
    if state.lock().unwrap().existing_repos.contains(&repo) {
        return HttpResponse::BadRequest().json(json!({
            "type": "error",
            "error": { "message": "Repository with this Slug and Owner already exists." },
        }));
    }
    HttpResponse::Ok().json(json!({
        "full_name": format!("{}/{}", workspace, repo),
        "links": {
            "html": { "href": format!("https://bitbucket.org/{}/{}", workspace, repo) },
            "clone": [
                { "name": "ssh", "href": format!("git@bitbucket.org:{}/{}.git", workspace, repo) },
                { "name": "https", "href": format!("https://bitbucket.org/{}/{}.git", workspace, repo) },
            ],
        },
    }))
}

/// Source commit: the file is the one form field that is not `message` or `branch`.
async fn bitbucket_commit_file(
    req: HttpRequest,
    state: SharedState,
    form: web::Form<HashMap<String, String>>,
) -> HttpResponse {
    record(&state, &req);
    let Some(file) = form
        .keys()
        .find(|k| k.as_str() != "message" && k.as_str() != "branch")
        .cloned()
    else {
        return HttpResponse::BadRequest().json(json!({ "error": { "message": "No file" } }));
    };

    let mut state = state.lock().unwrap();
    if state.failing_bitbucket_file.as_deref() == Some(file.as_str()) {
        return HttpResponse::InternalServerError()
            .json(json!({ "error": { "message": "Something went wrong" } }));
    }
    state.bitbucket_files.push(file);
    HttpResponse::Created().finish()
}

// -------------------------------------------------------------------- Vercel

fn project_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "accountId": "team_acme",
        "framework": "nextjs",
        "link": { "type": "github", "repoId": 987654 },
    })
}

async fn create_project(
    req: HttpRequest,
    state: SharedState,
    body: web::Json<Value>,
) -> HttpResponse {
    record(&state, &req);
    if state.lock().unwrap().fail_provision {
        return vercel_error("Project name is invalid");
    }
    let name = body["name"].as_str().unwrap_or_default();
    HttpResponse::Ok().json(project_json("prj_123", name))
}

async fn get_project(req: HttpRequest, state: SharedState, path: web::Path<String>) -> HttpResponse {
    record(&state, &req);
    HttpResponse::Ok().json(project_json(&path.into_inner(), "bakery-site"))
}

async fn delete_project(req: HttpRequest, state: SharedState) -> HttpResponse {
    record(&state, &req);
    HttpResponse::NoContent().finish()
}

async fn git_deployment(req: HttpRequest, state: SharedState) -> HttpResponse {
    record(&state, &req);
    if state.lock().unwrap().failing_strategies.contains("git-source") {
        return vercel_error("gitSource repoId mismatch");
    }
    HttpResponse::Ok().json(json!({
        "id": "dpl_git",
        "url": "bakery-site-git.vercel.app",
        "readyState": "QUEUED",
    }))
}

async fn deploy_hook(req: HttpRequest, state: SharedState) -> HttpResponse {
    record(&state, &req);
    if state.lock().unwrap().failing_strategies.contains("deploy-hook") {
        return vercel_error("Deploy hook not found");
    }
    HttpResponse::Created().json(json!({ "job": { "id": "job_hook", "state": "PENDING" } }))
}

async fn redeploy(req: HttpRequest, state: SharedState) -> HttpResponse {
    record(&state, &req);
    if state.lock().unwrap().failing_strategies.contains("redeploy") {
        return vercel_error("No previous deployment to redeploy");
    }
    HttpResponse::Ok().json(json!({
        "uid": "dpl_redeploy",
        "url": "bakery-site-redeploy.vercel.app",
        "state": "BUILDING",
    }))
}

/// Running mock server.
pub struct MockHosts {
    pub base_url: String,
    pub state: Arc<Mutex<MockState>>,
}

impl MockHosts {
    /// Start the mock on an ephemeral port.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockState::default()));

        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let state_data = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(state_data.clone()))
                .route("/v0/chats/{chat_id}", web::get().to(get_chat))
                .route("/registry/styles/default/{file}", web::get().to(registry_component))
                .route("/registry/{file}", web::get().to(registry_component))
                .route("/github/user/repos", web::post().to(create_repo))
                .route(
                    "/github/repos/{owner}/{repo}/git/refs/heads/{branch}",
                    web::get().to(get_ref),
                )
                .route(
                    "/github/repos/{owner}/{repo}/git/refs/heads/{branch}",
                    web::patch().to(update_ref),
                )
                .route(
                    "/github/repos/{owner}/{repo}/git/commits/{sha}",
                    web::get().to(get_commit),
                )
                .route(
                    "/github/repos/{owner}/{repo}/git/trees",
                    web::post().to(create_tree),
                )
                .route(
                    "/github/repos/{owner}/{repo}/git/commits",
                    web::post().to(create_commit),
                )
                .route("/github/repos/{owner}/{repo}", web::delete().to(delete_repo))
                .app_data(web::FormConfig::default().limit(1 << 20))
                .route(
                    "/bitbucket/repositories/{workspace}/{repo}",
                    web::post().to(bitbucket_create_repo),
                )
                .route(
                    "/bitbucket/repositories/{workspace}/{repo}/src",
                    web::post().to(bitbucket_commit_file),
                )
                .route("/vercel/v9/projects", web::post().to(create_project))
                .route("/vercel/v9/projects/{id}", web::get().to(get_project))
                .route("/vercel/v9/projects/{id}", web::delete().to(delete_project))
                .route("/vercel/v13/deployments", web::post().to(git_deployment))
                .route(
                    "/vercel/v1/integrations/deploy/{id}/{branch}",
                    web::post().to(deploy_hook),
                )
                .route("/vercel/v9/projects/{id}/redeploy", web::post().to(redeploy))
        })
        .workers(1)
        .listen(listener)
        .expect("failed to listen")
        .disable_signals()
        .run();

        tokio::spawn(server);

        MockHosts { base_url, state }
    }

    pub fn url(&self, prefix: &str) -> String {
        format!("{}/{}", self.base_url, prefix)
    }

    /// Recorded calls whose `"METHOD /path"` contains `needle`.
    pub fn calls_matching(&self, needle: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.contains(needle))
            .cloned()
            .collect()
    }

    pub fn committed_tree(&self) -> Vec<Value> {
        self.state.lock().unwrap().committed_tree.clone()
    }

    pub fn bitbucket_files(&self) -> Vec<String> {
        self.state.lock().unwrap().bitbucket_files.clone()
    }

    pub fn set<F: FnOnce(&mut MockState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }
}
