use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use ticketsync_core::models::{ServerTicketPayload, TicketStatus};
use ticketsync_core::remote::RemoteResult;
use ticketsync_core::{
    ClientConfig, ConnectivityMonitor, HttpTicketApi, NewTicket, RemoteError,
    RemoteTicketService, ServerTicket, SyncEngine, Ticket, TicketController, TicketId,
    TicketPatch, TicketStore,
};

use crate::cli::GlobalOptions;
use crate::error::CliError;

/// Everything a command needs: the controller plus how it was wired
pub struct App {
    pub controller: TicketController,
    pub api_base_url: Option<String>,
}

impl App {
    /// Load config, open the store and probe the API.
    pub async fn open(options: &GlobalOptions) -> Result<Self, CliError> {
        let mut config = ClientConfig::load()?;
        if let Some(url) = options.api_url.clone() {
            config.api_base_url = Some(url);
            config = config.normalized()?;
        }

        let db_path = config.resolve_db_path(options.db_path.clone())?;
        let store = TicketStore::open_path(db_path)?;

        let Some(api_base_url) = config.api_base_url.clone() else {
            return Self::local(store).await;
        };

        let api = HttpTicketApi::from_config(&config)?;
        let online = if options.offline {
            false
        } else {
            api.probe().await
        };
        if !online && !options.offline {
            tracing::info!(api = %api_base_url, "Ticket API unreachable; working offline");
        }

        Self::wire(store, Arc::new(api), online, Some(api_base_url)).await
    }

    /// Store-only app that never goes online
    pub async fn local(store: TicketStore) -> Result<Self, CliError> {
        Self::wire(store, Arc::new(NoRemote), false, None).await
    }

    async fn wire(
        store: TicketStore,
        remote: Arc<dyn RemoteTicketService>,
        online: bool,
        api_base_url: Option<String>,
    ) -> Result<Self, CliError> {
        let connectivity = ConnectivityMonitor::new(online);
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            remote,
            connectivity.clone(),
        ));
        let controller = TicketController::new(store, engine, connectivity);
        controller.refresh().await?;

        Ok(Self {
            controller,
            api_base_url,
        })
    }

    pub const fn has_remote(&self) -> bool {
        self.api_base_url.is_some()
    }
}

/// Stand-in when no API URL is configured; the app is then always offline.
struct NoRemote;

impl NoRemote {
    fn unconfigured<T>() -> RemoteResult<T> {
        Err(RemoteError::InvalidConfiguration(
            "no ticket API configured".to_string(),
        ))
    }
}

#[async_trait]
impl RemoteTicketService for NoRemote {
    async fn list_all(&self) -> RemoteResult<Vec<ServerTicketPayload>> {
        Self::unconfigured()
    }

    async fn get(&self, _id: &str) -> RemoteResult<ServerTicket> {
        Self::unconfigured()
    }

    async fn create(&self, _ticket: &NewTicket) -> RemoteResult<ServerTicket> {
        Self::unconfigured()
    }

    async fn update(&self, _id: &str, _patch: &TicketPatch) -> RemoteResult<ServerTicket> {
        Self::unconfigured()
    }

    async fn delete(&self, _id: &str) -> RemoteResult<()> {
        Self::unconfigured()
    }
}

#[derive(Debug, Serialize)]
pub struct TicketListItem {
    pub id: String,
    pub server_id: Option<String>,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub is_synced: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
}

pub async fn resolve_ticket(query: &str, store: &TicketStore) -> Result<Ticket, CliError> {
    if let Ok(ticket_id) = query.parse::<TicketId>() {
        if let Some(ticket) = store.get(&ticket_id).await? {
            return Ok(ticket);
        }
    }

    let matching_ids = store.list_ids_by_prefix(query, 3).await?;

    match matching_ids.len() {
        0 => Err(CliError::TicketNotFound(query.to_string())),
        1 => {
            let resolved_id = matching_ids[0]
                .parse::<TicketId>()
                .map_err(|_| CliError::TicketNotFound(query.to_string()))?;
            store
                .get(&resolved_id)
                .await?
                .ok_or_else(|| CliError::TicketNotFound(query.to_string()))
        }
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousTicketId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn format_ticket_lines(tickets: &[Ticket]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    tickets
        .iter()
        .map(|ticket| {
            let id = short_id(&ticket.id.to_string());
            let title = ticket_preview(&ticket.title, 40);
            let status = ticket.status.label();
            let relative_time = format_relative_time(ticket.updated_at, now_ms);
            let marker = if ticket.is_synced { ' ' } else { '*' };

            format!("{id:<13} {marker} {status:<11}  {title:<40}  {relative_time}")
        })
        .collect()
}

pub fn ticket_to_list_item(ticket: &Ticket) -> TicketListItem {
    let now_ms = Utc::now().timestamp_millis();

    TicketListItem {
        id: ticket.id.to_string(),
        server_id: ticket.server_id.clone(),
        title: ticket.title.clone(),
        description: ticket.description.clone(),
        status: ticket.status,
        is_synced: ticket.is_synced,
        created_at: ticket.created_at,
        updated_at: ticket.updated_at,
        relative_time: format_relative_time(ticket.updated_at, now_ms),
    }
}

pub fn ticket_preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Title and description for a new ticket.
///
/// The title comes from the arguments, else the first line piped on stdin.
/// The description comes from `--description`, else the remaining piped
/// lines, else it repeats the title (the ticket API requires one).
pub fn resolve_ticket_fields(
    title_parts: &[String],
    description: Option<&str>,
) -> Result<(String, String), CliError> {
    let piped = if normalize_content(&title_parts.join(" ")).is_some() {
        None
    } else {
        read_piped_stdin()?
    };
    split_ticket_input(title_parts, description, piped.as_deref())
}

pub fn split_ticket_input(
    title_parts: &[String],
    description: Option<&str>,
    piped: Option<&str>,
) -> Result<(String, String), CliError> {
    let mut piped_lines = piped.unwrap_or_default().lines();
    let title = normalize_content(&title_parts.join(" "))
        .or_else(|| piped_lines.next().and_then(normalize_content))
        .ok_or(CliError::EmptyTitle)?;

    let rest = piped_lines.collect::<Vec<_>>().join("\n");
    let description = description
        .and_then(normalize_content)
        .or_else(|| normalize_content(&rest))
        .unwrap_or_else(|| title.clone());

    Ok((title, description))
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_ticket_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTicketId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

/// Let the user edit `initial_content` in their editor.
///
/// Returns the trimmed result; an emptied buffer yields an empty string.
pub fn capture_editor_input_with_initial(initial_content: &str) -> Result<String, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_ticket_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let edited = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(edited.trim().to_string())
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let status = Command::new(program).args(parts).arg(file_path).status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_ticket_file_path() -> PathBuf {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    env::temp_dir().join(format!("tix-ticket-{}-{now}.md", std::process::id()))
}
