mod client;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};

use crate::client::ConductorClient;

#[derive(Parser, Debug)]
#[command(name = "conductorctl", version, about = "Submit and inspect Conductor workflows")]
struct Cli {
    /// Base URL of the conductord server.
    #[arg(long, global = true, env = "CONDUCTOR_URL", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// User id sent as `X-User-Id`.
    #[arg(long, global = true, env = "CONDUCTOR_OWNER")]
    owner: Option<i64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a workflow and print the pending record.
    Submit {
        #[arg(long)]
        agent: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        capability: String,
        /// Capability input as a JSON object.
        #[arg(long, conflicts_with = "prompt")]
        input: Option<String>,
        /// Shorthand for `--input '{"prompt": "..."}'`.
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Show one workflow.
    Get { id: String },
    /// List the caller's workflows.
    List,
    /// Cancel a pending or running workflow.
    Cancel { id: String },
    /// Block until a workflow finishes or the timeout passes.
    Wait {
        id: String,
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,
    },
    /// Show the caller's workflow analytics.
    Summary,
    /// Rank the caller's most used capabilities.
    TopCapabilities {
        #[arg(long)]
        limit: Option<u32>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = ConductorClient::new(&cli.server, cli.owner);

    let response = match cli.command {
        Command::Submit {
            agent,
            target,
            capability,
            input,
            prompt,
        } => {
            let input = build_input(input.as_deref(), prompt.as_deref())?;
            client.submit(&submit_body(&agent, &target, &capability, input))?
        }
        Command::Get { id } => client.get(&id)?,
        Command::List => client.list()?,
        Command::Cancel { id } => client.cancel(&id)?,
        Command::Wait { id, timeout_ms } => client.wait(&id, timeout_ms)?,
        Command::Summary => client.summary()?,
        Command::TopCapabilities { limit } => client.top_capabilities(limit)?,
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn build_input(raw: Option<&str>, prompt: Option<&str>) -> anyhow::Result<Map<String, Value>> {
    if let Some(prompt) = prompt {
        let mut input = Map::new();
        input.insert("prompt".to_owned(), Value::String(prompt.to_owned()));
        return Ok(input);
    }

    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw).context("--input is not valid JSON")? {
        Value::Object(input) => Ok(input),
        _ => bail!("--input must be a JSON object"),
    }
}

fn submit_body(agent: &str, target: &str, capability: &str, input: Map<String, Value>) -> Value {
    json!({
        "agent_id": agent,
        "target_id": target,
        "capability_id": capability,
        "input": input,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use clap::Parser;

    use super::{Cli, Command, build_input, submit_body};

    #[test]
    fn prompt_shorthand_builds_the_input_object() {
        let input = build_input(None, Some("hello")).unwrap();
        assert_eq!(
            submit_body("a", "t", "c", input),
            json!({
                "agent_id": "a",
                "target_id": "t",
                "capability_id": "c",
                "input": { "prompt": "hello" },
            })
        );
    }

    #[test]
    fn input_must_be_a_json_object() {
        assert!(build_input(Some("[1, 2]"), None).is_err());
        assert!(build_input(Some("{oops"), None).is_err());
        assert_eq!(
            build_input(Some(r#"{"prompt":"x","n":1}"#), None).unwrap().len(),
            2
        );
        assert!(build_input(None, None).unwrap().is_empty());
    }

    #[test]
    fn top_capabilities_takes_an_optional_limit() {
        let cli = Cli::try_parse_from(["conductorctl", "top-capabilities", "--limit", "3"]).unwrap();
        assert!(matches!(cli.command, Command::TopCapabilities { limit: Some(3) }));

        let cli = Cli::try_parse_from(["conductorctl", "top-capabilities"]).unwrap();
        assert!(matches!(cli.command, Command::TopCapabilities { limit: None }));
    }
}
