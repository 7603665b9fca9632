use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

/// Keyboard handling. The input line is always focused; panel toggles and
/// reload ride on control chords so they never collide with typed text.
pub fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('f') => app.toggle_files(),
            KeyCode::Char('r') => app.trigger_reload(),
            KeyCode::Char('u') => app.scroll_up(5),
            KeyCode::Char('d') => app.scroll_down(5),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            // First Esc clears the notice, the next one quits
            if app.notice.take().is_none() {
                app.should_quit = true;
            }
        }
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(10),
        KeyCode::PageDown => app.scroll_down(10),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;

    fn app() -> App {
        App::new(ApiClient::new("http://localhost:3001"))
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[tokio::test]
    async fn typed_characters_land_in_the_input() {
        let mut app = app();
        for c in "total?".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        assert_eq!(app.input, "total?");
    }

    #[tokio::test]
    async fn ctrl_c_quits() {
        let mut app = app();
        handle_key(&mut app, ctrl('c'));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn ctrl_f_toggles_the_files_panel() {
        let mut app = app();
        handle_key(&mut app, ctrl('f'));
        assert!(app.show_files);
        handle_key(&mut app, ctrl('f'));
        assert!(!app.show_files);
    }

    #[tokio::test]
    async fn esc_clears_the_notice_before_quitting() {
        let mut app = app();
        app.notice = Some("boom".to_string());

        handle_key(&mut app, key(KeyCode::Esc));
        assert!(app.notice.is_none());
        assert!(!app.should_quit);

        handle_key(&mut app, key(KeyCode::Esc));
        assert!(app.should_quit);
    }
}
