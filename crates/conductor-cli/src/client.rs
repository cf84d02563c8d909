use anyhow::{Context, anyhow};
use serde_json::Value;

const API_PREFIX: &str = "/api/v1";
const USER_ID_HEADER: &str = "X-User-Id";

/// Blocking client for the `/api/v1` surface of `conductord`.
pub struct ConductorClient {
    base_url: String,
    owner: Option<i64>,
    agent: ureq::Agent,
}

impl ConductorClient {
    pub fn new(base_url: &str, owner: Option<i64>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            owner,
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    pub fn submit(&self, body: &Value) -> anyhow::Result<Value> {
        let request = self.request("POST", "/workflows");
        finish(request.send_json(body.clone()))
    }

    pub fn get(&self, id: &str) -> anyhow::Result<Value> {
        finish(self.request("GET", &workflow_path(id)).call())
    }

    pub fn wait(&self, id: &str, timeout_ms: u64) -> anyhow::Result<Value> {
        let request = self
            .request("GET", &workflow_path(id))
            .query("wait_ms", &timeout_ms.to_string());
        finish(request.call())
    }

    pub fn list(&self) -> anyhow::Result<Value> {
        finish(self.request("GET", "/workflows").call())
    }

    pub fn cancel(&self, id: &str) -> anyhow::Result<Value> {
        let path = format!("{}/cancel", workflow_path(id));
        finish(self.request("POST", &path).call())
    }

    pub fn summary(&self) -> anyhow::Result<Value> {
        finish(self.request("GET", "/analytics/summary").call())
    }

    pub fn top_capabilities(&self, limit: Option<u32>) -> anyhow::Result<Value> {
        let request = self.request("GET", "/analytics/top-capabilities");
        let request = match limit {
            Some(limit) => request.query("limit", &limit.to_string()),
            None => request,
        };
        finish(request.call())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let request = self.agent.request(method, &self.url(path));
        match self.owner {
            Some(owner) => request.set(USER_ID_HEADER, &owner.to_string()),
            None => request,
        }
    }
}

fn workflow_path(id: &str) -> String {
    format!("/workflows/{id}")
}

fn finish(result: Result<ureq::Response, ureq::Error>) -> anyhow::Result<Value> {
    match result {
        Ok(response) => response
            .into_json::<Value>()
            .context("server returned a non-JSON body"),
        Err(ureq::Error::Status(code, response)) => {
            let message = response
                .into_json::<Value>()
                .ok()
                .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_owned))
                .unwrap_or_else(|| "no error message".to_owned());
            Err(anyhow!("request failed with status {code}: {message}"))
        }
        Err(error) => Err(anyhow!("could not reach conductor server: {error}")),
    }
}
