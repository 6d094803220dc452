//! api-agent CLI entrypoint
//! Inspects API descriptions, runs scenarios and checks response templates.
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use api_agent::application::{AgentDefinition, AppContext, PresetMatcher};
use api_agent::core::Settings;
use api_agent::execution::ExtractedEntity;
use api_agent::infrastructure::openapi::{CompositeSpecLoader, LoadedSpec, SpecLoader};
use clap::Parser;
use serde_json::Value as JsonValue;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "api-agent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Parse an OpenAPI description and list its endpoints
    Inspect {
        /// Path or URL to the OpenAPI description (YAML or JSON)
        #[arg(long)]
        spec: String,
    },
    /// Run one scenario of an agent with the given entity values
    Run {
        /// Path or URL to the OpenAPI description (YAML or JSON)
        #[arg(long)]
        spec: String,
        /// Agent definition file (YAML or JSON)
        #[arg(long)]
        agent: PathBuf,
        /// Scenario name or id
        #[arg(long)]
        scenario: String,
        /// Entity value as name=value; values that parse as JSON are used as JSON
        #[arg(long = "entity", value_parser = parse_entity)]
        entities: Vec<ExtractedEntity>,
        /// Question text passed to the agent
        #[arg(long)]
        question: Option<String>,
        /// Answer from documented examples instead of calling the API
        #[arg(long)]
        mock: bool,
    },
    /// Response template tooling
    Template {
        #[command(subcommand)]
        action: TemplateActions,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum TemplateActions {
    /// Check a template for syntax errors
    Validate {
        #[command(flatten)]
        source: TemplateSource,
    },
    /// List the variables a template reads
    Variables {
        #[command(flatten)]
        source: TemplateSource,
    },
    /// Render a template against sample JSON data
    Render {
        #[command(flatten)]
        source: TemplateSource,
        /// JSON file with sample data
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
pub struct TemplateSource {
    /// Template text
    #[arg(long)]
    text: Option<String>,
    /// Template file
    #[arg(long)]
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with default level INFO; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())
        .await
        .context("Failed to load settings")?;

    match cli.command {
        Commands::Inspect { spec } => inspect(&spec).await?,
        Commands::Run {
            spec,
            agent,
            scenario,
            entities,
            question,
            mock,
        } => {
            run_scenario(RunParams {
                settings,
                spec: &spec,
                agent: &agent,
                scenario,
                entities,
                question,
                mock,
            })
            .await?
        }
        Commands::Template { action } => run_template(settings, action).await?,
    }
    Ok(())
}

async fn load_spec(source: &str) -> anyhow::Result<LoadedSpec> {
    let loader = CompositeSpecLoader::new().context("Failed to create spec loader")?;
    let loaded = loader
        .load(source)
        .await
        .with_context(|| format!("Failed to load API description from {source}"))?;
    for warning in &loaded.warnings {
        warn!("{warning}");
    }
    Ok(loaded)
}

/// Print the normalized endpoint list
async fn inspect(source: &str) -> anyhow::Result<()> {
    let LoadedSpec { spec, warnings } = load_spec(source).await?;

    println!("{} {}", spec.title, spec.version);
    if !spec.base_url.is_empty() {
        println!("Base URL: {}", spec.base_url);
    }
    println!("Endpoints ({}):", spec.endpoints.len());
    for endpoint in &spec.endpoints {
        println!("  {:<7} {} ({})", endpoint.method, endpoint.path, endpoint.operation_id);
        for parameter in &endpoint.parameters {
            let required = if parameter.required { ", required" } else { "" };
            println!(
                "          - {} [{:?}{}]",
                parameter.name, parameter.location, required
            );
        }
    }
    if !warnings.is_empty() {
        println!("Warnings ({}):", warnings.len());
        for warning in &warnings {
            println!("  {warning}");
        }
    }
    Ok(())
}

struct RunParams<'a> {
    settings: Settings,
    spec: &'a str,
    agent: &'a Path,
    scenario: String,
    entities: Vec<ExtractedEntity>,
    question: Option<String>,
    mock: bool,
}

/// Answer with a fixed scenario choice and print the response as JSON
async fn run_scenario(params: RunParams<'_>) -> anyhow::Result<()> {
    let spec = load_spec(params.spec).await?.spec;

    let content = tokio::fs::read_to_string(params.agent)
        .await
        .with_context(|| format!("Failed to read agent definition {}", params.agent.display()))?;
    let definition = AgentDefinition::from_path_content(params.agent, &content)
        .context("Failed to parse agent definition")?;

    let question = params
        .question
        .unwrap_or_else(|| params.scenario.clone());
    let matcher = PresetMatcher::new(params.scenario, params.entities);
    let context = AppContext::new(params.settings, Arc::new(matcher));
    let agent_id = context
        .create_agent(definition, Arc::new(spec), params.mock)
        .await
        .context("Failed to create agent")?;

    info!(agent = %agent_id, mock = params.mock, "Running scenario");
    let response = context.answer(&agent_id, &question).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_template(settings: Settings, action: TemplateActions) -> anyhow::Result<()> {
    let context = AppContext::new(settings, Arc::new(PresetMatcher::none()));
    match action {
        TemplateActions::Validate { source } => {
            let template = source.read().await?;
            match context.validate_template(&template) {
                (true, _) => println!("Template is valid"),
                (false, message) => {
                    bail!(message.unwrap_or_else(|| "Template is invalid".to_string()))
                }
            }
        }
        TemplateActions::Variables { source } => {
            let template = source.read().await?;
            for variable in context.extract_variables(&template) {
                println!("{variable}");
            }
        }
        TemplateActions::Render { source, data } => {
            let template = source.read().await?;
            let sample = match data {
                Some(path) => {
                    let content = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str(&content).context("Sample data is not valid JSON")?
                }
                None => JsonValue::Object(serde_json::Map::new()),
            };
            println!("{}", context.preview_template(&template, &sample));
        }
    }
    Ok(())
}

impl TemplateSource {
    async fn read(self) -> anyhow::Result<String> {
        match (self.text, self.file) {
            (Some(text), _) => Ok(text),
            (None, Some(path)) => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read template {}", path.display())),
            (None, None) => bail!("Either --text or --file is required"),
        }
    }
}

/// Parse `name=value`; the value is JSON when it parses as JSON, else a string
fn parse_entity(raw: &str) -> Result<ExtractedEntity, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("entity name is empty in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()));
    Ok(ExtractedEntity::new(name, value))
}
