use std::io::stdout;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use tui_widgets::popup::PopupState;

use crate::config::{self, Config, UiColors};
use crate::contact::{Contact, Field};
use crate::latex;
use crate::store::{ContactId, ContactStore};

use super::draw;
use super::edit::{ContactForm, FormTarget};

/// One row of the contact list pane.
#[derive(Debug, Clone)]
pub struct ListRow {
    pub id: ContactId,
    pub name: String,
    pub organization: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFocus {
    Input,
    Results,
}

#[derive(Debug, Clone)]
pub struct ConfirmModal {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    Delete(ContactId),
    NewList,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPurpose {
    Open,
    SaveAs,
}

impl PathPurpose {
    pub fn title(self) -> &'static str {
        match self {
            PathPurpose::Open => "OPEN FILE",
            PathPurpose::SaveAs => "SAVE AS",
        }
    }
}

pub struct PathModal {
    pub purpose: PathPurpose,
    pub input: Input,
}

/// Scrollable viewer for the LaTeX export (or the reason it failed).
#[derive(Debug, Clone)]
pub struct ExportModal {
    pub lines: Vec<String>,
    pub failed: bool,
    pub scroll: usize,
    pub viewport_height: usize,
}

impl ExportModal {
    fn new(text: &str, failed: bool) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            failed,
            scroll: 0,
            viewport_height: 0,
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.lines.len().saturating_sub(self.viewport_height);
        self.scroll = (self.scroll + lines).min(max_scroll);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn can_scroll_up(&self) -> bool {
        self.scroll > 0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.scroll + self.viewport_height < self.lines.len()
    }
}

pub struct App<'a> {
    store: &'a mut ContactStore,
    config: &'a mut Config,
    pub search_input: Input,
    pub search_focus: SearchFocus,
    pub rows: Vec<ListRow>,
    pub selected: usize,
    pub form: Option<ContactForm>,
    pub confirm_modal: Option<ConfirmModal>,
    pub path_modal: Option<PathModal>,
    pub export_modal: Option<ExportModal>,
    // Popup state for modal dialogs (tui-widgets popup)
    pub modal_popup: PopupState,
    pub status: Option<String>,
}

impl<'a> App<'a> {
    pub fn new(store: &'a mut ContactStore, config: &'a mut Config) -> Self {
        let mut app = Self {
            store,
            config,
            search_input: Input::default(),
            search_focus: SearchFocus::Results,
            rows: Vec::new(),
            selected: 0,
            form: None,
            confirm_modal: None,
            path_modal: None,
            export_modal: None,
            modal_popup: PopupState::default(),
            status: None,
        };
        app.refresh_rows();
        app
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns true when the session should end.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return true;
        }

        if self.export_modal.is_some() {
            self.handle_export_modal_key(key);
            return false;
        }

        if self.form.is_some() {
            self.handle_form_key(key);
            return false;
        }

        if self.confirm_modal.is_some() {
            return self.handle_confirm_modal_key(key);
        }

        if self.path_modal.is_some() {
            self.handle_path_modal_key(key);
            return false;
        }

        match self.search_focus {
            SearchFocus::Input => {
                self.handle_search_input_key(key);
                false
            }
            SearchFocus::Results => self.handle_results_key(key),
        }
    }

    fn handle_search_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.search_focus = SearchFocus::Results;
            }
            KeyCode::Down | KeyCode::Tab => self.move_selection(1),
            KeyCode::Up | KeyCode::BackTab => self.move_selection(-1),
            _ => {
                if let Some(change) = self.search_input.handle_event(&Event::Key(key)) {
                    if change.value {
                        self.refresh_rows();
                    }
                }
            }
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return self.request_quit(),
            KeyCode::Char('/') => self.search_focus = SearchFocus::Input,
            KeyCode::Esc => {
                if !self.search_input.value().is_empty() {
                    self.search_input.reset();
                    self.refresh_rows();
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::Char('a') => self.form = Some(ContactForm::new_contact()),
            KeyCode::Char('e') | KeyCode::Enter => self.begin_edit(),
            KeyCode::Char('x') | KeyCode::Delete => self.request_delete(),
            KeyCode::Char('s') => self.save(),
            KeyCode::Char('S') => self.open_path_modal(PathPurpose::SaveAs),
            KeyCode::Char('o') => self.open_path_modal(PathPurpose::Open),
            KeyCode::Char('n') => self.request_new_list(),
            KeyCode::Char('L') => self.show_export(),
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.form = None;
                self.set_status("Edit cancelled");
            }
            KeyCode::Enter => self.commit_form(),
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
            _ => {
                form.handle_key_event(key);
            }
        }
    }

    fn commit_form(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };
        let contact = form.to_contact();
        let name = contact.display_name().to_string();
        match form.target() {
            FormTarget::New => {
                let id = self.store.add(contact);
                self.refresh_rows();
                self.select_id(id);
                self.set_status(format!("Added {}", name));
            }
            FormTarget::Existing(id) => match self.store.replace_by_id(id, contact) {
                Ok(()) => {
                    self.refresh_rows();
                    self.select_id(id);
                    self.set_status(format!("Updated {}", name));
                }
                Err(err) => self.set_status(format!("Update failed: {}", err)),
            },
        }
    }

    fn handle_confirm_modal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                let Some(modal) = self.confirm_modal.take() else {
                    return false;
                };
                match modal.action {
                    ConfirmAction::Delete(id) => self.delete_contact(id),
                    ConfirmAction::NewList => {
                        self.store.clear();
                        self.search_input.reset();
                        self.refresh_rows();
                        self.set_status("Started a new contact list");
                    }
                    ConfirmAction::Quit => return true,
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm_modal = None;
            }
            _ => {}
        }
        false
    }

    fn handle_path_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.path_modal.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.path_modal = None,
            KeyCode::Enter => {
                let purpose = modal.purpose;
                let raw = modal.input.value().trim().to_string();
                if raw.is_empty() {
                    self.set_status("Enter a file path");
                    return;
                }
                self.path_modal = None;
                let path = config::expand_tilde(Path::new(&raw));
                match purpose {
                    PathPurpose::Open => self.open_file(&path),
                    PathPurpose::SaveAs => self.save_as(&path),
                }
            }
            _ => {
                modal.input.handle_event(&Event::Key(key));
            }
        }
    }

    fn handle_export_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.export_modal.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.export_modal = None,
            KeyCode::Char('j') | KeyCode::Down => modal.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => modal.scroll_up(1),
            KeyCode::PageDown | KeyCode::Char(' ') => modal.scroll_down(10),
            KeyCode::PageUp => modal.scroll_up(10),
            KeyCode::Char('g') => modal.scroll = 0,
            _ => {}
        }
    }

    fn begin_edit(&mut self) {
        let Some(id) = self.selected_id() else {
            self.set_status("No contact selected");
            return;
        };
        if let Some(contact) = self.store.get(id) {
            self.form = Some(ContactForm::edit(id, contact));
        }
    }

    fn request_delete(&mut self) {
        let Some(row) = self.rows.get(self.selected) else {
            self.set_status("No contact selected");
            return;
        };
        self.modal_popup = PopupState::default();
        self.confirm_modal = Some(ConfirmModal {
            title: "DELETE CONTACT".to_string(),
            message: format!("Delete {}?", row.name),
            action: ConfirmAction::Delete(row.id),
        });
    }

    fn delete_contact(&mut self, id: ContactId) {
        match self.store.delete_by_id(id) {
            Ok(contact) => {
                self.refresh_rows();
                self.set_status(format!("Deleted {}", contact.display_name()));
            }
            Err(err) => self.set_status(format!("Delete failed: {}", err)),
        }
    }

    fn request_new_list(&mut self) {
        if !self.store.is_modified() {
            self.store.clear();
            self.search_input.reset();
            self.refresh_rows();
            self.set_status("Started a new contact list");
            return;
        }
        self.modal_popup = PopupState::default();
        self.confirm_modal = Some(ConfirmModal {
            title: "NEW LIST".to_string(),
            message: "Discard unsaved changes and start a new list?".to_string(),
            action: ConfirmAction::NewList,
        });
    }

    fn request_quit(&mut self) -> bool {
        if !self.store.is_modified() {
            return true;
        }
        self.modal_popup = PopupState::default();
        self.confirm_modal = Some(ConfirmModal {
            title: "QUIT".to_string(),
            message: "Quit without saving changes?".to_string(),
            action: ConfirmAction::Quit,
        });
        false
    }

    fn open_path_modal(&mut self, purpose: PathPurpose) {
        let current = self
            .store
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        self.modal_popup = PopupState::default();
        self.path_modal = Some(PathModal {
            purpose,
            input: Input::new(current),
        });
    }

    /// Open `path`, replacing the current list. A failure keeps the list.
    pub fn open_file(&mut self, path: &Path) {
        match self.store.open(path, self.config) {
            Ok(()) => {
                self.search_input.reset();
                self.refresh_rows();
                self.set_status(format!(
                    "Loaded {} contacts from {}",
                    self.store.len(),
                    path.display()
                ));
            }
            Err(err) => self.set_status(format!("Open failed: {}", err)),
        }
    }

    fn save(&mut self) {
        if self.store.path().is_none() {
            self.open_path_modal(PathPurpose::SaveAs);
            return;
        }
        match self.store.save_current() {
            Ok(path) => self.set_status(format!("Saved to {}", path.display())),
            Err(err) => self.set_status(format!("Save failed: {}", err)),
        }
    }

    fn save_as(&mut self, path: &Path) {
        match self.store.save_as(path, self.config) {
            Ok(()) => self.set_status(format!("Saved to {}", path.display())),
            Err(err) => self.set_status(format!("Save failed: {}", err)),
        }
    }

    fn show_export(&mut self) {
        if self.store.is_empty() {
            self.set_status("No contacts to export");
            return;
        }
        let modal = match latex::export(&self.store.contacts()) {
            Ok(text) => ExportModal::new(&text, false),
            Err(err) => ExportModal::new(&format!("Export failed: {}", err), true),
        };
        self.export_modal = Some(modal);
    }

    /// Rebuild the visible rows from the store and the current query,
    /// keeping the selected contact selected when it is still visible.
    fn refresh_rows(&mut self) {
        let previous = self.selected_id();
        self.rows = self
            .store
            .filter(self.search_input.value())
            .into_iter()
            .map(|hit| ListRow {
                id: hit.id,
                name: hit.contact.display_name().to_string(),
                organization: hit
                    .contact
                    .present(Field::Organization)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();

        match previous {
            Some(id) if self.rows.iter().any(|row| row.id == id) => self.select_id(id),
            _ => self.selected = self.selected.min(self.rows.len().saturating_sub(1)),
        }
    }

    fn select_id(&mut self, id: ContactId) {
        if let Some(index) = self.rows.iter().position(|row| row.id == id) {
            self.selected = index;
        }
    }

    fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.selected = 0;
            return;
        }
        let max = self.rows.len() as isize - 1;
        let next = (self.selected as isize + delta).clamp(0, max);
        self.selected = next as usize;
    }

    pub fn selected_id(&self) -> Option<ContactId> {
        self.rows.get(self.selected).map(|row| row.id)
    }

    pub fn selected_contact(&self) -> Option<&Contact> {
        self.selected_id().and_then(|id| self.store.get(id))
    }

    pub fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        self.store.path().map(Path::to_path_buf)
    }

    pub fn is_modified(&self) -> bool {
        self.store.is_modified()
    }

    pub fn total_contacts(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_or_init, ConfigFile};
    use tempfile::TempDir;

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn contact(name: &str, org: &str) -> Contact {
        Contact {
            name: Some(name.into()),
            email: Some(format!("{}@x.com", name.to_lowercase())),
            organization: Some(org.into()),
            ..Contact::default()
        }
    }

    fn setup() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let config = load_or_init(&dir.path().join("config.json"), &ConfigFile::default()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_add_through_form() {
        let (_dir, mut config) = setup();
        let mut store = ContactStore::new();
        let mut app = App::new(&mut store, &mut config);

        press(&mut app, KeyCode::Char('a'));
        assert!(app.form.is_some());
        type_text(&mut app, "Ana Lima");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "ana@x.com");
        press(&mut app, KeyCode::Enter);

        assert!(app.form.is_none());
        assert_eq!(app.rows.len(), 1);
        assert_eq!(app.rows[0].name, "Ana Lima");
        assert_eq!(
            app.selected_contact().and_then(|c| c.email.as_deref()),
            Some("ana@x.com")
        );
        assert!(app.is_modified());
    }

    #[test]
    fn test_edit_in_filtered_view_targets_the_right_contact() {
        let (_dir, mut config) = setup();
        let mut store = ContactStore::new();
        store.add(contact("Ana", "Univ X"));
        store.add(contact("Bob", "Univ Y"));
        store.add(contact("Cid", "Univ Y"));
        let mut app = App::new(&mut store, &mut config);

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "univ y");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.rows.len(), 2);

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('e'));
        let form = app.form.as_mut().unwrap();
        for _ in 0..3 {
            form.handle_key_event(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        }
        type_text(&mut app, "Cidália");
        press(&mut app, KeyCode::Enter);

        let names: Vec<String> = store_names(&app);
        assert_eq!(names, vec!["Ana", "Bob", "Cidália"]);
    }

    fn store_names(app: &App) -> Vec<String> {
        app.store
            .entries()
            .iter()
            .map(|entry| entry.contact.display_name().to_string())
            .collect()
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let (_dir, mut config) = setup();
        let mut store = ContactStore::new();
        store.add(contact("Ana", "Univ X"));
        store.add(contact("Bob", "Univ Y"));
        let mut app = App::new(&mut store, &mut config);

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('x'));
        assert!(app.confirm_modal.is_some());
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.rows.len(), 2);

        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(store_names(&app), vec!["Ana"]);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_quit_asks_when_modified() {
        let (_dir, mut config) = setup();
        let mut store = ContactStore::new();
        let mut app = App::new(&mut store, &mut config);
        assert!(press(&mut app, KeyCode::Char('q')));

        app.store.add(contact("Ana", "Univ X"));
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert!(app.confirm_modal.is_some());
        assert!(press(&mut app, KeyCode::Char('y')));
    }

    #[test]
    fn test_export_failure_is_shown_in_viewer() {
        let (_dir, mut config) = setup();
        let mut store = ContactStore::new();
        let mut incomplete = contact("Ana", "Univ X");
        incomplete.email = Some(String::new());
        store.add(incomplete);
        let mut app = App::new(&mut store, &mut config);

        press(&mut app, KeyCode::Char('L'));
        let modal = app.export_modal.as_ref().unwrap();
        assert!(modal.failed);
        assert!(modal.lines[0].contains("has no email"));
    }

    #[test]
    fn test_save_as_then_save() {
        let (dir, mut config) = setup();
        let mut store = ContactStore::new();
        store.add(contact("Ana", "Univ X"));
        let target = dir.path().join("team.AcademicContacts.json");
        {
            let mut app = App::new(&mut store, &mut config);
            press(&mut app, KeyCode::Char('s'));
            let modal = app.path_modal.as_ref().unwrap();
            assert_eq!(modal.purpose, PathPurpose::SaveAs);
            type_text(&mut app, &target.display().to_string());
            press(&mut app, KeyCode::Enter);
            assert!(!app.is_modified());
            assert_eq!(app.file_path(), Some(target.clone()));
        }
        assert_eq!(config.last_file(), Some(target.clone()));
        assert_eq!(crate::store::load(&target).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_open_keeps_list() {
        let (dir, mut config) = setup();
        let mut store = ContactStore::new();
        store.add(contact("Ana", "Univ X"));
        let mut app = App::new(&mut store, &mut config);

        app.open_file(&dir.path().join("missing.json"));
        assert_eq!(app.rows.len(), 1);
        assert!(app.status.as_deref().unwrap().starts_with("Open failed"));
    }
}
