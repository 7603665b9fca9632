use anyhow::Result;
use tokio::task::JoinHandle;

use vendas_core::state::{AnalyzeResponse, ChatMessage, ChatRole, FileInfo, ReloadResponse};

use crate::api::ApiClient;

pub const WELCOME: &str = "Hi! I'm the Vendas sales analyst. Load your sales spreadsheets and \
    ask questions in plain language - I'll turn the data into answers.";

/// Appended to the transcript whenever a request fails, so the conversation
/// never ends on a pending state. The underlying error goes to the notice.
pub const REQUEST_FAILED: &str =
    "Something went wrong while processing your question. Please try again.";

pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "Which product sold the most in the third quarter?",
    "What is the percentage change in revenue between January and December?",
    "Show me sales performance by region",
];

pub struct App {
    pub api: ApiClient,
    pub messages: Vec<ChatMessage>,
    next_id: u64,
    pub input: String,
    pub cursor: usize,
    /// True while a request is in flight; submission is disabled until the
    /// reply (or failure) lands
    pub typing: bool,
    pub spinner_frame: usize,
    pub scroll: u16,
    /// Follow the transcript bottom until the user scrolls away
    pub follow: bool,
    pub notice: Option<String>,
    pub show_files: bool,
    pub files: Vec<FileInfo>,
    pub files_loading: bool,
    pub should_quit: bool,
    request_task: Option<JoinHandle<Result<AnalyzeResponse>>>,
    files_task: Option<JoinHandle<Result<Vec<FileInfo>>>>,
    reload_task: Option<JoinHandle<Result<ReloadResponse>>>,
}

impl App {
    pub fn new(api: ApiClient) -> Self {
        let mut app = Self {
            api,
            messages: Vec::new(),
            next_id: 0,
            input: String::new(),
            cursor: 0,
            typing: false,
            spinner_frame: 0,
            scroll: 0,
            follow: true,
            notice: None,
            show_files: false,
            files: Vec::new(),
            files_loading: false,
            should_quit: false,
            request_task: None,
            files_task: None,
            reload_task: None,
        };
        app.push_message(ChatRole::Assistant, WELCOME.to_string());
        app
    }

    fn push_message(&mut self, role: ChatRole, content: String) {
        let id = self.next_id.to_string();
        self.next_id += 1;
        self.messages.push(ChatMessage { id, role, content });
        self.follow = true;
    }

    /// Only the welcome message so far: the UI shows example questions.
    pub fn transcript_is_fresh(&self) -> bool {
        self.messages.len() == 1 && !self.typing
    }

    /// Submit the current input as a question.
    ///
    /// One request per transcript at a time: submission while a request is
    /// in flight is ignored, as is an empty input.
    pub fn submit(&mut self) {
        if self.typing {
            return;
        }
        let prompt = self.input.trim().to_string();
        if prompt.is_empty() {
            return;
        }

        self.push_message(ChatRole::User, prompt.clone());
        self.input.clear();
        self.cursor = 0;
        self.typing = true;
        self.notice = None;

        let api = self.api.clone();
        self.request_task = Some(tokio::spawn(async move { api.analyze(&prompt).await }));
    }

    pub fn toggle_files(&mut self) {
        self.show_files = !self.show_files;
        if self.show_files && self.files_task.is_none() {
            self.refresh_files();
        }
    }

    pub fn refresh_files(&mut self) {
        self.files_loading = true;
        let api = self.api.clone();
        self.files_task = Some(tokio::spawn(async move { api.list_files().await }));
    }

    pub fn trigger_reload(&mut self) {
        if self.reload_task.is_some() {
            return;
        }
        self.notice = Some("Reloading spreadsheets...".to_string());
        let api = self.api.clone();
        self.reload_task = Some(tokio::spawn(async move { api.reload().await }));
    }

    pub fn tick(&mut self) {
        if self.typing {
            self.spinner_frame = (self.spinner_frame + 1) % 4;
        }
    }

    /// Collect results of finished background tasks. Called on every tick.
    pub async fn poll_tasks(&mut self) {
        if matches!(&self.request_task, Some(task) if task.is_finished()) {
            if let Some(task) = self.request_task.take() {
                match task.await {
                    Ok(Ok(reply)) => {
                        self.push_message(ChatRole::Assistant, reply.response);
                    }
                    Ok(Err(err)) => {
                        self.push_message(ChatRole::Assistant, REQUEST_FAILED.to_string());
                        self.notice = Some(err.to_string());
                    }
                    Err(err) => {
                        self.push_message(ChatRole::Assistant, REQUEST_FAILED.to_string());
                        self.notice = Some(format!("request task failed: {err}"));
                    }
                }
                self.typing = false;
            }
        }

        if matches!(&self.files_task, Some(task) if task.is_finished()) {
            if let Some(task) = self.files_task.take() {
                match task.await {
                    Ok(Ok(files)) => self.files = files,
                    Ok(Err(err)) => self.notice = Some(err.to_string()),
                    Err(err) => self.notice = Some(format!("file listing task failed: {err}")),
                }
                self.files_loading = false;
            }
        }

        if matches!(&self.reload_task, Some(task) if task.is_finished()) {
            if let Some(task) = self.reload_task.take() {
                match task.await {
                    Ok(Ok(reply)) => {
                        self.notice = Some(reply.message);
                        if self.show_files {
                            self.refresh_files();
                        }
                    }
                    Ok(Err(err)) => self.notice = Some(err.to_string()),
                    Err(err) => self.notice = Some(format!("reload task failed: {err}")),
                }
            }
        }
    }

    // -- input editing, cursor measured in characters --

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }
}

/// Convert a character index to a byte index for UTF-8 safe edits.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map(|(i, _)| i).unwrap_or(s.len())
}
