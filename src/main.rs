use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use rag::{
    Config as RagConfig, DocumentSummary, IndexProgress, Orchestrator, PRACTICE_QUESTIONS_DEFAULT,
    PRACTICE_QUESTIONS_MAX, PRACTICE_QUESTIONS_MIN, RagError,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> io::Result<()> {
    let rag_cfg = RagConfig::from_env();
    init_tracing(&rag_cfg.log_file)?;
    info!("starting astra");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(Arc::new(Orchestrator::new(rag_cfg)));
    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

/// Stdout belongs to the terminal UI, so logs go to a file.
fn init_tracing(path: &str) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

struct App {
    input: String,
    cursor: usize,
    orchestrator: Arc<Orchestrator>,
    input_mode: InputMode,
    output_focus: OutputFocus,
    initialized: bool,
    document: Option<DocumentSummary>,
    status: String,
    conversation: Vec<String>,
    question_count: usize,
    task: Option<JoinHandle<()>>,
    task_id: u64,
    status_scroll: usize,
    status_content_len: usize,
    status_view_height: usize,
    status_auto_scroll: bool,
    conversation_scroll: usize,
    conversation_content_len: usize,
    conversation_view_height: usize,
    conversation_auto_scroll: bool,
    is_loading: bool,
    spinner_idx: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputMode {
    Question,
    Upload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFocus {
    Status,
    Conversation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tool {
    PracticeQuestions(usize),
    Summary,
    KeyPoints,
}

impl Tool {
    fn title(self) -> String {
        match self {
            Tool::PracticeQuestions(n) => format!("Practice questions ({})", n),
            Tool::Summary => "Summary".to_string(),
            Tool::KeyPoints => "Key points".to_string(),
        }
    }
}

type Outbox = mpsc::UnboundedSender<(u64, Response)>;

/// Sends a task's responses tagged with the id it was started under.
#[derive(Clone)]
struct Reply {
    task_id: u64,
    tx: Outbox,
}

impl Reply {
    fn send(&self, response: Response) {
        let _ = self.tx.send((self.task_id, response));
    }
}

enum Response {
    Init(Result<String, RagError>),
    Progress(IndexProgress),
    Indexed(Result<DocumentSummary, RagError>),
    Answer {
        question: String,
        result: Result<String, RagError>,
    },
    Tool {
        tool: Tool,
        result: Result<String, RagError>,
    },
}

impl App {
    fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            orchestrator,
            input_mode: InputMode::Question,
            output_focus: OutputFocus::Conversation,
            initialized: false,
            document: None,
            status: "Press F2 to initialize Astra.".to_string(),
            conversation: Vec::new(),
            question_count: PRACTICE_QUESTIONS_DEFAULT,
            task: None,
            task_id: 0,
            status_scroll: 0,
            status_content_len: 0,
            status_view_height: 0,
            status_auto_scroll: false,
            conversation_scroll: 0,
            conversation_content_len: 0,
            conversation_view_height: 0,
            conversation_auto_scroll: false,
            is_loading: false,
            spinner_idx: 0,
        }
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.input.insert(at, c);
        self.cursor += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_offset(self.cursor);
        self.input.remove(at);
    }

    fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    fn start_task<F, Fut>(&mut self, tx: Outbox, make: F)
    where
        F: FnOnce(Reply) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.task_id += 1;
        let reply = Reply {
            task_id: self.task_id,
            tx,
        };
        self.is_loading = true;
        self.status_auto_scroll = true;
        self.conversation_auto_scroll = true;
        self.task = Some(tokio::spawn(make(reply)));
    }

    fn initialize(&mut self, tx: Outbox) {
        if self.is_loading {
            return;
        }
        self.status = "Initializing Astra...".to_string();
        let orch = self.orchestrator.clone();
        self.start_task(tx, |reply| async move {
            reply.send(Response::Init(orch.initialize().await));
        });
    }

    fn submit(&mut self, tx: Outbox) {
        if self.input.trim().is_empty() || self.is_loading {
            return;
        }

        let text = self.input.trim().to_string();
        let orch = self.orchestrator.clone();

        match self.input_mode {
            InputMode::Question => {
                self.conversation.push(format!("You: {}", text));
                self.start_task(tx, |reply| async move {
                    let result = orch.answer(&text).await;
                    reply.send(Response::Answer {
                        question: text,
                        result,
                    });
                });
            }
            InputMode::Upload => {
                self.status = String::new();
                self.start_task(tx, |reply| async move {
                    let (ptx, mut prx) = mpsc::unbounded_channel::<IndexProgress>();
                    let fwd = reply.clone();
                    let forward = tokio::spawn(async move {
                        while let Some(event) = prx.recv().await {
                            fwd.send(Response::Progress(event));
                        }
                    });
                    let result = orch.index_file(text, Some(&ptx)).await;
                    drop(ptx);
                    let _ = forward.await;
                    reply.send(Response::Indexed(result));
                });
            }
        }

        self.input.clear();
        self.cursor = 0;
    }

    fn run_tool(&mut self, tool: Tool, tx: Outbox) {
        if self.is_loading {
            return;
        }
        let orch = self.orchestrator.clone();
        self.start_task(tx, |reply| async move {
            let result = match tool {
                Tool::PracticeQuestions(n) => orch.generate_practice_questions(n).await,
                Tool::Summary => orch.generate_summary().await,
                Tool::KeyPoints => orch.generate_key_points().await,
            };
            reply.send(Response::Tool { tool, result });
        });
    }

    /// Dropping the task's future is safe: the orchestrator only commits
    /// state once a pipeline has fully succeeded.
    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                task.abort();
                warn!("in-flight task cancelled by user");
                self.status.push_str("\nCancelled.");
                self.status_auto_scroll = true;
            }
        }
        self.task_id += 1;
        self.is_loading = false;
    }

    fn adjust_question_count(&mut self, up: bool) {
        self.question_count = if up {
            (self.question_count + 1).min(PRACTICE_QUESTIONS_MAX)
        } else {
            self.question_count.saturating_sub(1).max(PRACTICE_QUESTIONS_MIN)
        };
    }

    fn handle_response(&mut self, task_id: u64, response: Response) {
        // Cancelled or superseded tasks can still have responses queued.
        if task_id != self.task_id {
            debug!(task_id, current = self.task_id, "dropping stale response");
            return;
        }
        match response {
            Response::Progress(event) => {
                if !self.status.is_empty() {
                    self.status.push('\n');
                }
                self.status.push_str(&event.to_string());
                self.status_auto_scroll = true;
                return;
            }
            Response::Init(res) => match res {
                Ok(msg) => {
                    self.initialized = true;
                    self.status = msg;
                }
                Err(err) => self.status = format!("Error: {}", err),
            },
            Response::Indexed(res) => match res {
                Ok(summary) => {
                    self.status = summary.to_string();
                    self.document = Some(summary);
                }
                Err(err) => {
                    self.status.push_str(&format!("\nError: {}", err));
                }
            },
            Response::Answer { question, result } => {
                info!(chars = question.len(), ok = result.is_ok(), "question handled");
                self.conversation.push(match result {
                    Ok(answer) => format!("Astra: {}", answer.trim_end()),
                    Err(err) => format!("Error: {}", err),
                });
            }
            Response::Tool { tool, result } => {
                self.conversation.push(match result {
                    Ok(text) => format!("[{}]\n{}", tool.title(), text.trim_end()),
                    Err(err) => format!("[{}] Error: {}", tool.title(), err),
                });
            }
        }
        self.is_loading = false;
        self.task = None;
        self.status_auto_scroll = true;
        self.conversation_auto_scroll = true;
    }

    fn phase_label(&self) -> String {
        match (&self.document, self.initialized) {
            (Some(doc), _) => format!("Document ready: {}", doc.name),
            (None, true) => "Ready, no document loaded".to_string(),
            (None, false) => "Not initialized".to_string(),
        }
    }

    fn scroll_up(&mut self, by: usize) {
        match self.output_focus {
            OutputFocus::Status => {
                self.status_scroll = self.status_scroll.saturating_sub(by);
            }
            OutputFocus::Conversation => {
                self.conversation_scroll = self.conversation_scroll.saturating_sub(by);
            }
        }
    }

    fn scroll_down(&mut self, by: usize) {
        match self.output_focus {
            OutputFocus::Status => {
                let max_scroll = self
                    .status_content_len
                    .saturating_sub(self.status_view_height);
                self.status_scroll = (self.status_scroll + by).min(max_scroll);
            }
            OutputFocus::Conversation => {
                let max_scroll = self
                    .conversation_content_len
                    .saturating_sub(self.conversation_view_height);
                self.conversation_scroll = (self.conversation_scroll + by).min(max_scroll);
            }
        }
    }

    fn scroll_to_start(&mut self) {
        match self.output_focus {
            OutputFocus::Status => self.status_scroll = 0,
            OutputFocus::Conversation => self.conversation_scroll = 0,
        }
    }

    fn scroll_to_end(&mut self) {
        match self.output_focus {
            OutputFocus::Status => {
                self.status_scroll = self
                    .status_content_len
                    .saturating_sub(self.status_view_height);
            }
            OutputFocus::Conversation => {
                self.conversation_scroll = self
                    .conversation_content_len
                    .saturating_sub(self.conversation_view_height);
            }
        }
    }

    fn focused_view_height(&self) -> usize {
        match self.output_focus {
            OutputFocus::Status => self.status_view_height,
            OutputFocus::Conversation => self.conversation_view_height,
        }
    }
}

fn inner_width(area: ratatui::layout::Rect) -> usize {
    area.width.saturating_sub(2) as usize
}

fn inner_height(area: ratatui::layout::Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

/// First char of the visible slice of an input line `len` chars long.
fn view_start(len: usize, cursor: usize, max_width: usize) -> usize {
    if len <= max_width {
        return 0;
    }
    let cursor = cursor.min(len);
    let start = cursor.saturating_sub(max_width / 2);
    start.min(len - max_width)
}

fn truncate_input(input: &str, cursor: usize, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    let len = input.chars().count();
    let start = view_start(len, cursor, max_width);
    input.chars().skip(start).take(max_width).collect()
}

fn cursor_x_in_view(input: &str, cursor: usize, max_width: usize) -> usize {
    if max_width == 0 {
        return 0;
    }
    let len = input.chars().count();
    let start = view_start(len, cursor, max_width);
    cursor.min(len).saturating_sub(start).min(max_width)
}

fn line_count(text: &str) -> usize {
    let count = text.lines().count();
    if count == 0 { 1 } else { count }
}

fn draw_ui(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    let spinner = ["|", "/", "-", "\\"];

    terminal.draw(|frame| {
        let title_style = Style::default().fg(Color::Black).add_modifier(Modifier::BOLD);
        let info_border = Style::default().fg(Color::Black);
        let input_border = Style::default().fg(Color::DarkGray);
        let help_border = Style::default().fg(Color::DarkGray);
        let info_text_style = Style::default().fg(Color::Blue);
        let help_text_style = Style::default().fg(Color::DarkGray);
        let input_text_style = Style::default().fg(Color::DarkGray);

        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);
        let output_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(chunks[0]);

        let status_text = format!(
            "{} | Practice questions: {}\n\n{}",
            app.phase_label(),
            app.question_count,
            app.status
        );
        let conversation_text = if app.conversation.is_empty() {
            "Load a document, then ask a question below and press Enter.".to_string()
        } else {
            app.conversation.join("\n\n")
        };

        let focus_mark = |focus: OutputFocus| if app.output_focus == focus { " *" } else { "" };
        let status_title = format!("Status{}", focus_mark(OutputFocus::Status));
        let conversation_title = if app.is_loading {
            format!(
                "Conversation {}{}",
                spinner[app.spinner_idx],
                focus_mark(OutputFocus::Conversation)
            )
        } else {
            format!("Conversation{}", focus_mark(OutputFocus::Conversation))
        };

        let status_block = Block::bordered()
            .title(status_title)
            .title_style(title_style)
            .border_style(info_border);
        let conversation_block = Block::bordered()
            .title(conversation_title)
            .title_style(title_style)
            .border_style(info_border);

        let status_view_height = inner_height(output_chunks[0]);
        app.status_content_len = line_count(&status_text);
        app.status_view_height = status_view_height;
        if app.status_auto_scroll {
            app.status_scroll = app.status_content_len.saturating_sub(app.status_view_height);
            app.status_auto_scroll = false;
        } else if app.status_scroll > app.status_content_len.saturating_sub(app.status_view_height) {
            app.status_scroll = app.status_content_len.saturating_sub(app.status_view_height);
        }

        let conversation_view_height = inner_height(output_chunks[1]);
        app.conversation_content_len = line_count(&conversation_text);
        app.conversation_view_height = conversation_view_height;
        if app.conversation_auto_scroll {
            app.conversation_scroll = app
                .conversation_content_len
                .saturating_sub(app.conversation_view_height);
            app.conversation_auto_scroll = false;
        } else if app.conversation_scroll
            > app.conversation_content_len.saturating_sub(app.conversation_view_height)
        {
            app.conversation_scroll = app
                .conversation_content_len
                .saturating_sub(app.conversation_view_height);
        }

        let status = Paragraph::new(status_text)
            .style(info_text_style)
            .scroll((app.status_scroll as u16, 0))
            .wrap(Wrap { trim: true })
            .block(status_block);
        frame.render_widget(status, output_chunks[0]);

        let mut status_scrollbar = ScrollbarState::new(app.status_content_len).position(app.status_scroll);
        let status_scrollbar_widget = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .track_style(Style::default().fg(Color::DarkGray))
            .thumb_style(Style::default().fg(Color::Blue));
        frame.render_stateful_widget(
            status_scrollbar_widget,
            output_chunks[0].inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut status_scrollbar,
        );

        let conversation = Paragraph::new(conversation_text)
            .style(info_text_style)
            .scroll((app.conversation_scroll as u16, 0))
            .wrap(Wrap { trim: true })
            .block(conversation_block);
        frame.render_widget(conversation, output_chunks[1]);

        let mut conversation_scrollbar =
            ScrollbarState::new(app.conversation_content_len).position(app.conversation_scroll);
        let conversation_scrollbar_widget = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .track_style(Style::default().fg(Color::DarkGray))
            .thumb_style(Style::default().fg(Color::Blue));
        frame.render_stateful_widget(
            conversation_scrollbar_widget,
            output_chunks[1].inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut conversation_scrollbar,
        );

        let input_title = match app.input_mode {
            InputMode::Question => "Question",
            InputMode::Upload => "Document path (.pdf, .txt, .md)",
        };
        let input_block = Block::bordered()
            .title(input_title)
            .title_style(title_style)
            .border_style(input_border);
        let input_view = truncate_input(&app.input, app.cursor, inner_width(chunks[1]));
        let input = Paragraph::new(input_view)
            .style(input_text_style)
            .block(input_block)
            .wrap(Wrap { trim: false });
        frame.render_widget(input, chunks[1]);

        let cursor_x = cursor_x_in_view(&app.input, app.cursor, inner_width(chunks[1]));
        let x = chunks[1].x + 1 + cursor_x as u16;
        let y = chunks[1].y + 1;
        frame.set_cursor_position((x, y));

        let help_block = Block::bordered()
            .title("Controls")
            .title_style(title_style)
            .border_style(help_border);
        let help_text = match app.input_mode {
            InputMode::Question => {
                "Enter: Ask | F2: Init | Tab: Upload mode | F3: Questions | F4: Summary | F5: Key points | F6/F7: Count -/+ | Ctrl+X: Cancel | Ctrl+O: Focus | Esc: Quit"
            }
            InputMode::Upload => {
                "Enter: Process document | F2: Init | Tab: Question mode | F3: Questions | F4: Summary | F5: Key points | Ctrl+X: Cancel | Ctrl+O: Focus | Esc: Quit"
            }
        };
        let help = Paragraph::new(help_text)
            .style(help_text_style)
            .wrap(Wrap { trim: true })
            .block(help_block);
        frame.render_widget(help, chunks[2]);
    })?;

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<(u64, Response)>();
    let mut events = EventStream::new();
    let mut spinner_tick = tokio::time::interval(Duration::from_millis(100));
    spinner_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    draw_ui(terminal, app)?;

    loop {
        tokio::select! {
            _ = spinner_tick.tick() => {
                if app.is_loading {
                    app.spinner_idx = (app.spinner_idx + 1) % 4;
                    draw_ui(terminal, app)?;
                }
            }
            maybe_response = rx.recv() => {
                if let Some((task_id, response)) = maybe_response {
                    app.handle_response(task_id, response);
                    draw_ui(terminal, app)?;
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                        match key.code {
                            KeyCode::Char('c') if ctrl => return Ok(()),
                            KeyCode::Char('x') if ctrl => app.cancel(),
                            KeyCode::Char('o') if ctrl => {
                                app.output_focus = match app.output_focus {
                                    OutputFocus::Status => OutputFocus::Conversation,
                                    OutputFocus::Conversation => OutputFocus::Status,
                                };
                            }
                            KeyCode::Esc => return Ok(()),
                            KeyCode::F(2) => app.initialize(tx.clone()),
                            KeyCode::F(3) => {
                                let tool = Tool::PracticeQuestions(app.question_count);
                                app.run_tool(tool, tx.clone());
                            }
                            KeyCode::F(4) => app.run_tool(Tool::Summary, tx.clone()),
                            KeyCode::F(5) => app.run_tool(Tool::KeyPoints, tx.clone()),
                            KeyCode::F(6) => app.adjust_question_count(false),
                            KeyCode::F(7) => app.adjust_question_count(true),
                            KeyCode::Enter => app.submit(tx.clone()),
                            KeyCode::Up => app.scroll_up(1),
                            KeyCode::Down => app.scroll_down(1),
                            KeyCode::PageUp => app.scroll_up(app.focused_view_height().max(1)),
                            KeyCode::PageDown => app.scroll_down(app.focused_view_height().max(1)),
                            KeyCode::Home => app.scroll_to_start(),
                            KeyCode::End => app.scroll_to_end(),
                            KeyCode::Tab => {
                                app.input_mode = match app.input_mode {
                                    InputMode::Question => InputMode::Upload,
                                    InputMode::Upload => InputMode::Question,
                                };
                                app.input.clear();
                                app.cursor = 0;
                            }
                            KeyCode::Left => app.move_left(),
                            KeyCode::Right => app.move_right(),
                            KeyCode::Backspace => app.delete_char(),
                            KeyCode::Char(ch) => app.insert_char(ch),
                            _ => {}
                        }
                        draw_ui(terminal, app)?;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => {}
                    None => return Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(Arc::new(Orchestrator::new(RagConfig::default())))
    }

    #[test]
    fn edits_input_by_char_not_byte() {
        let mut app = app();
        for c in "résumé".chars() {
            app.insert_char(c);
        }
        app.move_left();
        app.delete_char();
        assert_eq!(app.input, "résué");
        app.move_right();
        app.move_right();
        assert_eq!(app.cursor, 5);
    }

    #[test]
    fn input_view_follows_cursor() {
        let text = "0123456789";
        assert_eq!(truncate_input(text, 10, 4), "6789");
        assert_eq!(cursor_x_in_view(text, 10, 4), 4);
        assert_eq!(truncate_input(text, 0, 4), "0123");
        assert_eq!(truncate_input("ab", 1, 4), "ab");
    }

    #[test]
    fn question_count_stays_in_slider_range() {
        let mut app = app();
        for _ in 0..20 {
            app.adjust_question_count(true);
        }
        assert_eq!(app.question_count, PRACTICE_QUESTIONS_MAX);
        for _ in 0..20 {
            app.adjust_question_count(false);
        }
        assert_eq!(app.question_count, PRACTICE_QUESTIONS_MIN);
    }

    #[test]
    fn progress_lines_accumulate_in_status() {
        let mut app = app();
        app.status.clear();
        app.is_loading = true;
        app.handle_response(0, Response::Progress(IndexProgress::Chunking));
        app.handle_response(0, Response::Progress(IndexProgress::Embedding { chunks: 4 }));
        assert!(app.is_loading);
        assert_eq!(
            app.status,
            "Splitting text into chunks...\nGenerating embeddings for 4 chunks..."
        );

        app.handle_response(0, Response::Indexed(Err(RagError::EmptyDocument("a.pdf".into()))));
        assert!(!app.is_loading);
        assert!(app.status.contains("Error: empty document"));
    }

    #[tokio::test]
    async fn late_response_from_an_earlier_task_is_ignored() {
        let mut app = app();
        let (tx, mut rx) = mpsc::unbounded_channel();

        app.start_task(tx.clone(), |reply| async move {
            reply.send(Response::Tool {
                tool: Tool::Summary,
                result: Ok("old summary".to_string()),
            });
        });
        let first = rx.recv().await.expect("first task replies");
        app.is_loading = false;

        app.start_task(tx, |_reply| std::future::pending::<()>());
        assert_eq!(app.task_id, 2);

        let (stale_id, stale) = first;
        app.handle_response(stale_id, stale);
        assert!(app.is_loading);
        assert!(app.task.is_some());
        assert!(app.conversation.is_empty());

        app.cancel();
        assert!(!app.is_loading);
        assert!(app.status.ends_with("Cancelled."));
        app.handle_response(
            2,
            Response::Answer {
                question: "q".to_string(),
                result: Ok("late".to_string()),
            },
        );
        assert!(app.conversation.is_empty());
    }
}
