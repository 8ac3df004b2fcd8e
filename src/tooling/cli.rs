//! CLI Tooling
//!
//! Command-line interface over the provisioning core: provision an agent,
//! inspect classification and templates, show configuration, and list
//! persisted agents.

use crate::agent::{AgentRepository, AgentSnapshot, AgentSpec, AgentStatus, XdgAgentRepository};
use crate::config::{BerthConfig, ConfigLoader, EnrichmentMode};
use crate::enrichment::{EnrichmentOutcome, UnitStatus};
use crate::error::ProvisionError;
use crate::logging::{LogFormat, LogOutput, LoggingConfig};
use crate::provision::{PersistenceStatus, Provisioner, Tier};
use crate::template::KeywordTable;
use crate::types::ConfigMap;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Berth CLI - fast agent provisioning
#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "Provision agents under a latency budget with background enrichment")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<LogOutput>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging configuration with command-line overrides applied
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut logging = base.clone();
        if self.verbose {
            logging.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            logging.format = format;
        }
        if let Some(output) = self.log_output {
            logging.output = output;
        }
        if let Some(file) = &self.log_file {
            logging.file = Some(file.clone());
        }
        logging
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision an agent
    Provision {
        /// Agent name (2-100 characters)
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Agent id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        goal: Option<String>,
        #[arg(long)]
        backstory: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Tool identifier (repeatable)
        #[arg(long = "tool")]
        tools: Vec<String>,
        /// Configuration entry KEY=VALUE; VALUE is parsed as JSON when possible (repeatable)
        #[arg(long = "set")]
        settings: Vec<String>,
        /// Knowledge source id; enables retrieval (repeatable)
        #[arg(long = "rag-source")]
        rag_sources: Vec<String>,
        /// Return before enrichment finishes
        #[arg(long)]
        detached: bool,
        /// Do not persist the agent
        #[arg(long)]
        no_save: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show which template a name and description select
    Classify {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List role templates
    Templates {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Persisted agent commands
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the merged configuration
    Show {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Validate the merged configuration
    Validate,
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// List persisted agents
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Filter by status (provisioning, ready, degraded)
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one persisted agent
    Show {
        agent_id: String,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Remove a persisted agent
    Remove { agent_id: String },
}

/// CLI context holding merged configuration and the async runtime
pub struct CliContext {
    config: BerthConfig,
    runtime: tokio::runtime::Runtime,
}

impl CliContext {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ProvisionError> {
        let config = ConfigLoader::load_optional(config_path.as_deref())?;
        Self::with_config(config)
    }

    pub fn with_config(config: BerthConfig) -> Result<Self, ProvisionError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self { config, runtime })
    }

    pub fn config(&self) -> &BerthConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ProvisionError> {
        match command {
            Commands::Provision {
                name,
                description,
                id,
                role,
                goal,
                backstory,
                model,
                temperature,
                max_tokens,
                tools,
                settings,
                rag_sources,
                detached,
                no_save,
                format,
            } => {
                let spec = AgentSpec {
                    id: id.clone(),
                    name: name.clone(),
                    description: description.clone(),
                    role: role.clone(),
                    goal: goal.clone(),
                    backstory: backstory.clone(),
                    model: model.clone(),
                    temperature: *temperature,
                    max_tokens: *max_tokens,
                    tools: tools.clone(),
                    config: parse_settings(settings)?,
                    rag_enabled: !rag_sources.is_empty(),
                    rag_sources: rag_sources.clone(),
                };
                self.handle_provision(spec, *detached, *no_save, format)
            }
            Commands::Classify {
                name,
                description,
                format,
            } => {
                let category = KeywordTable::builtin().classify(name, description.as_deref());
                let template = self.config.template_catalog().get(category).clone();
                match format.as_str() {
                    "json" => to_json(&json!({ "category": category, "template": template })),
                    _ => Ok(format!(
                        "Category: {}\nRole: {}\nGoal: {}\n",
                        category, template.role, template.goal
                    )),
                }
            }
            Commands::Templates { format } => {
                let catalog = self.config.template_catalog();
                match format.as_str() {
                    "json" => {
                        let templates: serde_json::Map<String, Value> = catalog
                            .iter()
                            .map(|(c, t)| (c.to_string(), json!(t)))
                            .collect();
                        to_json(&Value::Object(templates))
                    }
                    _ => {
                        let mut table = Table::new();
                        table.load_preset(UTF8_BORDERS_ONLY);
                        table.set_header(vec!["Category", "Role", "Goal"]);
                        for (category, template) in catalog.iter() {
                            table.add_row(vec![
                                category.to_string(),
                                template.role.clone(),
                                template.goal.clone(),
                            ]);
                        }
                        Ok(format!("{}\n\n{}\n", format_section_heading("Templates"), table))
                    }
                }
            }
            Commands::Config { command } => match command {
                ConfigCommands::Show { format } => match format.as_str() {
                    "json" => to_json(&self.config),
                    _ => toml::to_string_pretty(&self.config).map_err(|e| {
                        ProvisionError::ConfigError(format!("Failed to render config: {}", e))
                    }),
                },
                ConfigCommands::Validate => {
                    self.config.validate()?;
                    Ok("Configuration is valid.".to_string())
                }
            },
            Commands::Agents { command } => self.handle_agents(command),
        }
    }

    fn handle_provision(
        &self,
        spec: AgentSpec,
        detached: bool,
        no_save: bool,
        format: &str,
    ) -> Result<String, ProvisionError> {
        let mut config = self.config.clone();
        if detached {
            config.provisioning.enrichment_mode = EnrichmentMode::Detached;
        }
        let mut builder = Provisioner::builder(config);
        if !no_save {
            builder = builder.repository(Arc::new(XdgAgentRepository::from_config(
                &self.config.storage,
            )?));
        }
        let provisioner = builder.build();

        let (provisioned, outcome, persistence) = self.runtime.block_on(async {
            provisioner.warm();
            let provisioned = provisioner.provision(spec).await?;
            let tier = provisioned.tier;
            let latency_ms = provisioned.latency_ms;
            let entity = Arc::clone(&provisioned.entity);
            let escalations = provisioned.escalations.clone();
            // Detached work must finish before the runtime is dropped
            let (outcome, persistence) = provisioned.settle().await;
            Ok::<_, ProvisionError>((
                ProvisionSummary {
                    snapshot: entity.snapshot(),
                    tier,
                    latency_ms,
                    escalations: escalations.into_iter().map(|e| e.reason).collect(),
                },
                outcome,
                persistence,
            ))
        })?;

        info!(
            agent_id = %provisioned.snapshot.id,
            tier = %provisioned.tier,
            "Provision command complete"
        );

        match format {
            "json" => to_json(&json!({
                "agent": provisioned.snapshot,
                "tier": provisioned.tier,
                "latency_ms": provisioned.latency_ms,
                "escalations": provisioned.escalations,
                "enrichment": outcome,
                "persistence": persistence,
            })),
            _ => Ok(format_provision_text(&provisioned, outcome.as_ref(), &persistence)),
        }
    }

    fn handle_agents(&self, command: &AgentCommands) -> Result<String, ProvisionError> {
        let repository = XdgAgentRepository::from_config(&self.config.storage)?;
        match command {
            AgentCommands::List { format, status } => {
                let filter = status.as_deref().map(parse_status).transpose()?;
                let agents: Vec<AgentSnapshot> = repository
                    .list()?
                    .into_iter()
                    .filter(|a| filter.map(|s| a.status == s).unwrap_or(true))
                    .collect();
                match format.as_str() {
                    "json" => to_json(&json!({ "agents": agents, "total": agents.len() })),
                    _ => Ok(format_agent_list_text(&agents)),
                }
            }
            AgentCommands::Show { agent_id, format } => {
                let agent = repository.load(agent_id)?.ok_or_else(|| {
                    ProvisionError::Persistence(format!("Agent not found: {}", agent_id))
                })?;
                match format.as_str() {
                    "json" => to_json(&agent),
                    _ => Ok(format_agent_text(&agent)),
                }
            }
            AgentCommands::Remove { agent_id } => {
                if repository.delete(agent_id)? {
                    Ok(format!("Removed agent {}", agent_id))
                } else {
                    Err(ProvisionError::Persistence(format!(
                        "Agent not found: {}",
                        agent_id
                    )))
                }
            }
        }
    }
}

struct ProvisionSummary {
    snapshot: AgentSnapshot,
    tier: Tier,
    latency_ms: u64,
    escalations: Vec<String>,
}

/// Parse repeated `KEY=VALUE` entries into a config map
fn parse_settings(entries: &[String]) -> Result<ConfigMap, ProvisionError> {
    let mut map = ConfigMap::new();
    for entry in entries {
        let (key, raw) = entry.split_once('=').ok_or_else(|| {
            ProvisionError::ConfigError(format!("Expected KEY=VALUE, got '{}'", entry))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ProvisionError::ConfigError(format!(
                "Empty key in setting '{}'",
                entry
            )));
        }
        let value = serde_json::from_str(raw.trim()).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

fn parse_status(s: &str) -> Result<AgentStatus, ProvisionError> {
    match s.to_lowercase().as_str() {
        "provisioning" => Ok(AgentStatus::Provisioning),
        "ready" => Ok(AgentStatus::Ready),
        "degraded" => Ok(AgentStatus::Degraded),
        other => Err(ProvisionError::ConfigError(format!(
            "Invalid status: {} (must be 'provisioning', 'ready', or 'degraded')",
            other
        ))),
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ProvisionError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ProvisionError::ConfigError(format!("Failed to render JSON: {}", e)))
}

/// Format a section heading with bold/underline
fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn format_tier(tier: Tier) -> String {
    match tier {
        Tier::Optimized => tier.green().to_string(),
        Tier::Fallback => tier.yellow().to_string(),
        Tier::Emergency => tier.red().to_string(),
    }
}

fn format_provision_text(
    summary: &ProvisionSummary,
    outcome: Option<&EnrichmentOutcome>,
    persistence: &PersistenceStatus,
) -> String {
    let agent = &summary.snapshot;
    let mut out = format!("{}\n\n", format_section_heading("Agent Provisioned"));
    out.push_str(&format!("  Id:        {}\n", agent.id));
    out.push_str(&format!("  Name:      {}\n", agent.name));
    out.push_str(&format!("  Category:  {}\n", agent.category));
    out.push_str(&format!("  Tier:      {}\n", format_tier(summary.tier)));
    out.push_str(&format!("  Status:    {}\n", agent.status));
    out.push_str(&format!("  Latency:   {}ms\n", summary.latency_ms));
    out.push_str(&format!(
        "  Model:     {}{}\n",
        agent.llm.model,
        if agent.llm.pooled { "" } else { " (unbound)" }
    ));
    out.push_str(&format!("  Role:      {}\n", agent.role));
    out.push_str(&format!("  Goal:      {}\n", agent.goal));
    for reason in &summary.escalations {
        out.push_str(&format!("  Escalated: {}\n", reason));
    }

    if let Some(outcome) = outcome {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Enrichment")));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Unit", "Status", "Elapsed", "Error"]);
        for unit in &outcome.units {
            let status = match unit.status {
                UnitStatus::Succeeded => "ok",
                UnitStatus::Skipped => "skipped",
                UnitStatus::Failed => "failed",
            };
            table.add_row(vec![
                unit.unit.to_string(),
                status.to_string(),
                format!("{}ms", unit.elapsed_ms),
                unit.error.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
        out.push_str(&format!("{}\n", table));
        if !outcome.skipped_tools.is_empty() {
            out.push_str(&format!("  Unknown tools: {}\n", outcome.skipped_tools.join(", ")));
        }
    }

    let tools: Vec<&str> = agent.tools.iter().map(|t| t.tool_id.as_str()).collect();
    out.push_str(&format!(
        "\n  Tools:     {}\n",
        if tools.is_empty() { "-".to_string() } else { tools.join(", ") }
    ));
    out.push_str(&format!(
        "  Memory:    {}\n",
        if agent.memory.enabled { "enabled" } else { "off" }
    ));
    out.push_str(&format!(
        "  Persisted: {}\n",
        match persistence {
            PersistenceStatus::Saved => "yes".to_string(),
            PersistenceStatus::Disabled => "no".to_string(),
            PersistenceStatus::Pending => "pending".to_string(),
            PersistenceStatus::Failed(e) => format!("failed ({})", e),
        }
    ));
    out
}

fn format_agent_list_text(agents: &[AgentSnapshot]) -> String {
    if agents.is_empty() {
        return "No agents found.\n\nUse 'berth provision <name>' to create one.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Agent", "Name", "Category", "Status", "Created"]);
    for agent in agents {
        table.add_row(vec![
            agent.id.clone(),
            agent.name.clone(),
            agent.category.to_string(),
            agent.status.to_string(),
            agent.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    format!(
        "{}\n\n{}\n\nTotal: {} agent(s)\n",
        format_section_heading("Agents"),
        table,
        agents.len()
    )
}

fn format_agent_text(agent: &AgentSnapshot) -> String {
    let mut out = format!("{}\n\n", format_section_heading(&agent.name));
    out.push_str(&format!("  Id:        {}\n", agent.id));
    out.push_str(&format!("  Category:  {}\n", agent.category));
    out.push_str(&format!("  Status:    {}\n", agent.status));
    out.push_str(&format!("  Role:      {}\n", agent.role));
    out.push_str(&format!("  Goal:      {}\n", agent.goal));
    out.push_str(&format!("  Backstory: {}\n", agent.backstory));
    out.push_str(&format!("  Model:     {}\n", agent.llm.model));
    if let Some(ms) = agent.creation_latency_ms {
        out.push_str(&format!("  Latency:   {}ms\n", ms));
    }
    for tool in &agent.tools {
        out.push_str(&format!("  Tool:      {} ({})\n", tool.tool_id, tool.name));
    }
    for knowledge in &agent.knowledge {
        out.push_str(&format!("  Knowledge: {}\n", knowledge.description));
    }
    out
}
